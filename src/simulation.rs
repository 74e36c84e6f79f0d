//! # Simulation モジュール
//!
//! ヒーロー要素の飛行セッションを管理するエンジンを提供します。
//!
//! このモジュールは、1つの運動制御（[`MotionController`]）と、それを取り巻く
//! ホスト側の仕組み（ライフサイクルイベント、自動起動タイムアウト、
//! ワンダー揺らぎタイマー、待機中の再配置タスク、フレームループ）を束ねます。
//!
//! ## 1回のポンプ（`pump`）での処理順序
//!
//! 1. **自動起動タイムアウト**: 期限に達していれば Idle → Launching
//! 2. **ワンダータイマー**: ワンダー目標角を揺らす
//! 3. **再配置タスク**: 待機中ならアンカー位置へ再着座
//! 4. **フレーム**: dtを計算して運動制御を1フレーム進め、配置を要素へ適用
//!
//! すべて同じスレッドの同じ呼び出しの中で順に実行されるため、
//! フレーム更新とタイマー処理が並行して状態を書き換えることはありません。
//!
//! ## 使用例
//!
//! ```rust
//! use heroflight::scenario::ScenarioConfig;
//! use heroflight::simulation::run_headless;
//!
//! let scenario = ScenarioConfig::default();
//! let stats = run_headless(&scenario, 0).expect("ステージが不完全です");
//! stats.print_summary();
//! ```

use crate::models::*;
use crate::scenario::{HostEvent, HostEventKind, MotionTuning, ScenarioConfig};
use crate::scheduler::{FrameClock, IntervalTimer, ManualTimeSource, OneShotTimer, TimeSource};
use tracing::{debug, info, trace};

/// ホストから届くライフサイクル信号
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifecycleSignal {
    FontsReady,
    Load,
    Resize,
    VisibilityChange { visible: bool },
}

/// セッション統計
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub frames: u64,
    pub total_distance: f64,
    pub waypoints_reached: u32,
    pub waypoints_expired: u32,
    pub wander_nudges: u32,
    pub reseats: u32,
    pub resamples: u32,
    /// 起動のきっかけと時刻
    pub activation: Option<(ActivationSource, f64)>,
    /// Flightへ昇格した時刻
    pub flight_at: Option<f64>,
    /// 旋回量 / 最大旋回量 の最大値（1以下であること）
    pub peak_turn_ratio: f64,
    pub final_position: Vec2,
    pub final_heading: f64,
    pub session_time: f64,
}

impl SessionStats {
    /// 統計の概要を表示
    pub fn print_summary(&self) {
        println!("=== セッション結果 ===");
        println!("セッション時間: {:.2}秒", self.session_time);
        println!("フレーム数: {}", self.frames);
        println!("飛行距離: {:.1}px", self.total_distance);
        match self.activation {
            Some((source, at)) => {
                let label = match source {
                    ActivationSource::Explicit => "クリック",
                    ActivationSource::Timeout => "自動起動",
                };
                println!("起動: {} ({:.2}秒)", label, at);
            }
            None => println!("起動: なし（待機のまま終了）"),
        }
        match self.flight_at {
            Some(at) => println!("巡航開始: {:.2}秒", at),
            None => println!("巡航開始: なし"),
        }
        println!(
            "ウェイポイント更新: 到達 {} 回 / 期限切れ {} 回",
            self.waypoints_reached, self.waypoints_expired
        );
        println!("ワンダー揺らぎ: {} 回", self.wander_nudges);
        println!("待機中の再配置: {} 回", self.reseats);
        println!("境界再取得: {} 回", self.resamples);
        println!("最大旋回率: {:.3}", self.peak_turn_ratio);
        println!(
            "最終位置: ({:.1}, {:.1}) 方向 {:.1}度",
            self.final_position.x,
            self.final_position.y,
            math_utils::rad_to_deg(self.final_heading)
        );
    }
}

/// 飛行セッションエンジン
///
/// ステージ（`S`）と飛行要素（`E`）をホストとして受け取り、運動制御と
/// 補助タイマーを所有します。時刻源は注入され、テストでは仮想時刻で駆動します。
pub struct SessionEngine<S: IStage, E: IElementSink> {
    clock: Box<dyn TimeSource>,
    stage: S,
    element: E,
    controller: MotionController,
    boundary: Boundary,
    frames: FrameClock,
    auto_launch: OneShotTimer,
    wander_timer: IntervalTimer,
    idle_reseat: IntervalTimer,
    pub stats: SessionStats,
    verbose_level: u8,
}

impl<S: IStage, E: IElementSink> SessionEngine<S, E> {
    /// ドキュメント準備完了時のインストール
    ///
    /// 飛行要素または境界コンテナが存在しない場合は何もインストールせずNoneを返します。
    pub fn install(
        clock: Box<dyn TimeSource>,
        stage: S,
        mut element: E,
        tuning: MotionTuning,
        seed: u64,
        verbose_level: u8,
    ) -> Option<Self> {
        let (Some(boundary), Some(footprint)) = (stage.boundary(), stage.footprint()) else {
            debug!("SESSION_NOT_INSTALLED: 飛行要素または境界コンテナがありません");
            return None;
        };

        let now = clock.now();
        let controller = MotionController::new(
            tuning.clone(),
            footprint,
            boundary,
            stage.anchor_rect(),
            seed,
            now,
        );

        element.set_launched(false);
        element.set_interactive(true);
        element.apply_placement(&controller.placement());

        if verbose_level > 0 {
            info!(
                width = boundary.width,
                height = boundary.height,
                launch_delay = tuning.launch_delay_s,
                "SESSION_INSTALLED: 飛行セッションを開始しました"
            );
        }

        Some(Self {
            clock,
            stage,
            element,
            controller,
            boundary,
            frames: FrameClock::new(tuning.max_frame_dt_s),
            auto_launch: OneShotTimer::schedule(now, tuning.launch_delay_s),
            wander_timer: IntervalTimer::start(now, tuning.wander_interval_s),
            idle_reseat: IntervalTimer::start(now, tuning.idle_reseat_interval_s),
            stats: SessionStats::default(),
            verbose_level,
        })
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn controller(&self) -> &MotionController {
        &self.controller
    }

    pub fn mode(&self) -> FlightMode {
        self.controller.mode()
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn is_auto_launch_pending(&self) -> bool {
        self.auto_launch.is_pending()
    }

    pub fn is_idle_reseat_active(&self) -> bool {
        self.idle_reseat.is_active()
    }

    /// 要素のクリック（明示的な起動）
    pub fn activate(&mut self) -> bool {
        self.launch(ActivationSource::Explicit)
    }

    fn launch(&mut self, source: ActivationSource) -> bool {
        let now = self.now();
        if !self.controller.begin_launch(now, source) {
            return false;
        }

        // 自動起動と再配置タスクはこの場で同期的に止める
        self.auto_launch.cancel();
        self.idle_reseat.cancel();

        self.element.set_launched(true);
        self.element.set_interactive(false);
        self.stats.activation = Some((source, now));
        true
    }

    /// ライフサイクル信号の処理（いずれも境界とアンカーを再取得する）
    pub fn handle_lifecycle(&mut self, signal: LifecycleSignal) {
        if let LifecycleSignal::VisibilityChange { visible } = signal {
            if visible {
                self.frames.resume();
            } else {
                self.frames.pause();
            }
            debug!(visible, "SESSION_VISIBILITY: 表示状態が変化しました");
        }
        self.resample();
    }

    fn resample(&mut self) {
        if let Some(boundary) = self.stage.boundary() {
            self.boundary = boundary;
        }
        self.controller.on_resize(self.boundary, self.stage.anchor_rect());
        self.stats.resamples += 1;

        if self.controller.mode() == FlightMode::Idle {
            self.element.apply_placement(&self.controller.placement());
        }
    }

    /// 待機中の再配置
    ///
    /// 通知なしに動いたタイトル（遅れて読み込まれたフォントなど）にも追従するため、
    /// 境界とアンカーをステージから読み直してから着座させます。
    fn reseat_from_stage(&mut self) -> bool {
        if self.controller.mode() != FlightMode::Idle {
            return false;
        }
        if let Some(boundary) = self.stage.boundary() {
            self.boundary = boundary;
        }
        self.controller.set_layout(self.boundary, self.stage.anchor_rect());
        self.controller.seat_at_anchor()
    }

    /// タイマーとフレームを現在時刻まで進める
    pub fn pump(&mut self) {
        let now = self.now();

        if self.auto_launch.poll(now) {
            if self.verbose_level > 0 {
                info!(time = now, "SESSION_AUTO_LAUNCH: 自動起動タイムアウトに達しました");
            }
            self.launch(ActivationSource::Timeout);
        }

        if self.wander_timer.poll(now) {
            self.controller.nudge_wander();
            self.stats.wander_nudges += 1;
        }

        if self.idle_reseat.poll(now) && self.reseat_from_stage() {
            self.stats.reseats += 1;
            self.element.apply_placement(&self.controller.placement());
        }

        let Some(dt) = self.frames.tick(now) else {
            return;
        };
        self.frame(now, dt);
    }

    fn frame(&mut self, now: f64, dt: f64) {
        let report = self.controller.step(now, dt, &self.boundary);

        self.stats.frames += 1;
        self.stats.total_distance += report.distance;
        self.stats.session_time = now;
        if report.max_turn > 0.0 {
            let ratio = report.heading_change.abs() / report.max_turn;
            self.stats.peak_turn_ratio = self.stats.peak_turn_ratio.max(ratio);
        }
        if report.promoted {
            self.stats.flight_at = Some(now);
        }
        match report.waypoint_replaced {
            Some(WaypointReason::Reached) => self.stats.waypoints_reached += 1,
            Some(WaypointReason::Expired) => self.stats.waypoints_expired += 1,
            _ => {}
        }

        let placement = self.controller.placement();
        self.element.apply_placement(&placement);
        self.stats.final_position = self.controller.get_position();
        self.stats.final_heading = self.controller.get_heading();

        if self.verbose_level > 2 {
            trace!(
                time = now,
                dt = report.dt,
                mode = ?self.controller.mode(),
                x = self.stats.final_position.x,
                y = self.stats.final_position.y,
                heading = self.stats.final_heading,
                "SESSION_FRAME"
            );
        }
    }
}

impl<E: IElementSink> SessionEngine<ScriptedStage, E> {
    /// シナリオのホストイベントを適用
    pub fn apply_host_event(&mut self, kind: &HostEventKind) {
        match *kind {
            HostEventKind::Activate => {
                self.activate();
            }
            HostEventKind::Resize { width_px, height_px } => {
                self.stage.resize(width_px, height_px);
                self.handle_lifecycle(LifecycleSignal::Resize);
            }
            HostEventKind::Visibility { visible } => {
                self.handle_lifecycle(LifecycleSignal::VisibilityChange { visible });
            }
            HostEventKind::FontsReady { anchor_shift_y_px } => {
                self.stage.shift_anchor(anchor_shift_y_px);
                self.handle_lifecycle(LifecycleSignal::FontsReady);
            }
            HostEventKind::Load => {
                self.handle_lifecycle(LifecycleSignal::Load);
            }
        }
    }

    /// 現在時刻までに発生すべきイベントを順に適用し、次の未適用位置を返す
    pub fn apply_due_events(&mut self, events: &[HostEvent], mut cursor: usize) -> usize {
        let now = self.now();
        while let Some(event) = events.get(cursor) {
            if event.at_s > now {
                break;
            }
            if self.verbose_level > 1 {
                debug!(at = event.at_s, kind = ?event.kind, "SESSION_HOST_EVENT: ホストイベントを適用します");
            }
            self.apply_host_event(&event.kind);
            cursor += 1;
        }
        cursor
    }
}

/// シナリオを仮想時刻で実行（ヘッドレス）
///
/// 固定フレーム間隔で時刻を進め、セッション統計を返します。
/// ステージが不完全でエンジンをインストールできない場合はNoneです。
pub fn run_headless(scenario: &ScenarioConfig, verbose_level: u8) -> Option<SessionStats> {
    let clock = ManualTimeSource::new(0.0);
    let mut engine = SessionEngine::install(
        Box::new(clock.clone()),
        ScriptedStage::from_config(&scenario.stage),
        RecordingElement::new(),
        scenario.tuning.clone(),
        scenario.sim.seed,
        verbose_level,
    )?;

    info!("=== 飛行セッション開始（ヘッドレス） ===");

    let frame_dt = scenario.sim.frame_dt_s;
    let total_frames = (scenario.sim.duration_s / frame_dt).ceil() as u64;
    let mut cursor = 0;

    for frame in 0..=total_frames {
        clock.set(frame as f64 * frame_dt);
        cursor = engine.apply_due_events(&scenario.events, cursor);
        engine.pump();

        if frame % 600 == 0 && verbose_level > 0 {
            let progress = (frame as f64 / total_frames.max(1) as f64) * 100.0;
            info!(
                "進行状況: {:.1}% ({:.1}/{:.1}秒) モード: {:?}",
                progress,
                engine.now(),
                scenario.sim.duration_s,
                engine.mode()
            );
        }
    }

    info!("=== 飛行セッション完了 ===");
    Some(engine.stats.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{HostEvent, ScenarioConfig};

    const FRAME: f64 = 1.0 / 60.0;

    fn install(clock: &ManualTimeSource) -> SessionEngine<ScriptedStage, RecordingElement> {
        let config = ScenarioConfig::default();
        SessionEngine::install(
            Box::new(clock.clone()),
            ScriptedStage::from_config(&config.stage),
            RecordingElement::new(),
            config.tuning.clone(),
            config.sim.seed,
            0,
        )
        .expect("default stage is complete")
    }

    fn run_until(engine: &mut SessionEngine<ScriptedStage, RecordingElement>, clock: &ManualTimeSource, until: f64) {
        while clock.now() + FRAME <= until + 1e-9 {
            clock.advance(FRAME);
            engine.pump();
        }
    }

    #[test]
    fn test_missing_element_is_not_installed() {
        let clock = ManualTimeSource::new(0.0);
        let stage = ScriptedStage::new(Some(Boundary::new(800.0, 400.0)), None, None);
        let engine = SessionEngine::install(
            Box::new(clock),
            stage,
            RecordingElement::new(),
            MotionTuning::default(),
            1,
            0,
        );
        assert!(engine.is_none());
    }

    #[test]
    fn test_install_seats_and_enables_pointer() {
        let clock = ManualTimeSource::new(0.0);
        let engine = install(&clock);
        assert_eq!(engine.mode(), FlightMode::Idle);
        assert!(engine.element().interactive);
        assert!(!engine.element().launched);
        assert!(engine.element().last_placement.is_some());
    }

    #[test]
    fn test_explicit_activation_cancels_auto_launch() {
        let clock = ManualTimeSource::new(0.0);
        let mut engine = install(&clock);

        run_until(&mut engine, &clock, 1.2);
        assert!(engine.activate());
        let activated_at = engine.now();
        assert!((activated_at - 1.2).abs() < 1e-6);
        assert_eq!(engine.mode(), FlightMode::Launching);
        assert!(!engine.is_auto_launch_pending());
        assert!(!engine.is_idle_reseat_active());
        assert!(engine.element().launched);
        assert!(!engine.element().interactive);

        run_until(&mut engine, &clock, 6.0);
        assert_eq!(engine.stats.activation, Some((ActivationSource::Explicit, activated_at)));
        assert_eq!(engine.mode(), FlightMode::Flight);
    }

    #[test]
    fn test_auto_launch_after_delay_then_click_is_noop() {
        let clock = ManualTimeSource::new(0.0);
        let mut engine = install(&clock);

        run_until(&mut engine, &clock, 4.9);
        assert_eq!(engine.mode(), FlightMode::Idle);
        run_until(&mut engine, &clock, 5.05);
        assert_eq!(engine.mode(), FlightMode::Launching);
        let (source, at) = engine.stats.activation.unwrap();
        assert_eq!(source, ActivationSource::Timeout);

        assert!(!engine.activate());
        assert_eq!(engine.stats.activation, Some((ActivationSource::Timeout, at)));
    }

    #[test]
    fn test_idle_reseat_absorbs_late_layout_shift() {
        let clock = ManualTimeSource::new(0.0);
        let mut engine = install(&clock);
        let before = engine.controller().get_position();

        // タイトルだけ動かし、ライフサイクル信号は送らない
        engine.stage_mut().shift_anchor(20.0);
        run_until(&mut engine, &clock, 2.0);

        let after = engine.controller().get_position();
        assert!((after.y - (before.y + 20.0)).abs() < 1e-9);
        assert!((after.x - before.x).abs() < 1e-9);
        assert_eq!(engine.stats.resamples, 0);
        assert!(engine.stats.reseats > 0);

        let placement = engine.element().last_placement.unwrap();
        assert_eq!(placement, engine.controller().placement());
    }

    #[test]
    fn test_reseat_stops_after_launch() {
        let clock = ManualTimeSource::new(0.0);
        let mut engine = install(&clock);
        run_until(&mut engine, &clock, 0.6);
        engine.activate();
        let reseats = engine.stats.reseats;

        engine.stage_mut().shift_anchor(40.0);
        run_until(&mut engine, &clock, 1.5);
        assert_eq!(engine.stats.reseats, reseats);
    }

    #[test]
    fn test_flight_speed_exactly_cruise_after_promotion() {
        let clock = ManualTimeSource::new(0.0);
        let mut engine = install(&clock);
        engine.activate();
        run_until(&mut engine, &clock, 2.0);
        assert_eq!(engine.mode(), FlightMode::Flight);
        assert_eq!(engine.controller().state.speed, MotionTuning::default().cruise_speed_pxps);
        assert!(engine.stats.flight_at.is_some());
    }

    #[test]
    fn test_hidden_tab_does_not_integrate_pause() {
        let clock = ManualTimeSource::new(0.0);
        let mut engine = install(&clock);
        engine.activate();
        run_until(&mut engine, &clock, 3.0);

        engine.handle_lifecycle(LifecycleSignal::VisibilityChange { visible: false });
        let frames_before = engine.stats.frames;
        let position_before = engine.controller().get_position();
        clock.advance(30.0);
        engine.pump();
        assert_eq!(engine.stats.frames, frames_before);

        engine.handle_lifecycle(LifecycleSignal::VisibilityChange { visible: true });
        engine.pump();
        assert_eq!(engine.controller().get_position(), position_before);

        clock.advance(FRAME);
        engine.pump();
        let moved = engine.controller().get_position().distance(&position_before);
        assert!(moved <= 160.0 * FRAME + 1e-6);
    }

    #[test]
    fn test_resize_event_keeps_element_contained() {
        let clock = ManualTimeSource::new(0.0);
        let mut engine = install(&clock);
        engine.activate();
        run_until(&mut engine, &clock, 4.0);
        engine.apply_host_event(&HostEventKind::Resize { width_px: 400.0, height_px: 240.0 });

        let containment = engine.controller().containment();
        assert!(containment.contains(&engine.controller().get_position()));
        run_until(&mut engine, &clock, 10.0);
        assert!(containment.contains(&engine.controller().get_position()));
    }

    #[test]
    fn test_run_headless_with_scripted_click() {
        let mut scenario = ScenarioConfig::default();
        scenario.sim.duration_s = 8.0;
        scenario.events = vec![HostEvent { at_s: 1.2, kind: HostEventKind::Activate }];

        let stats = run_headless(&scenario, 0).unwrap();
        let (source, at) = stats.activation.unwrap();
        assert_eq!(source, ActivationSource::Explicit);
        assert!((at - 1.2).abs() < 2.0 * FRAME);
        assert!(stats.flight_at.unwrap() >= at + 1.2 - 1e-9);
        assert!(stats.peak_turn_ratio <= 1.0 + 1e-9);
        assert!(stats.total_distance > 0.0);
    }
}
