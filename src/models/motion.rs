use crate::models::{
    common::{math_utils, Boundary, Footprint, Placement, Rect, Vec2},
    steering,
    traits::ISteerable,
    waypoint::WaypointPicker,
    wander::Wander,
};
use crate::scenario::MotionTuning;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace};

/// 飛行モード
///
/// `Idle → Launching → Flight` の順にのみ遷移し、Flightは終端です。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightMode {
    /// 待機（タイトル上に着座）
    Idle,
    /// 起動加速中
    Launching,
    /// 巡航飛行
    Flight,
}

/// 起動のきっかけ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationSource {
    /// 要素のクリック
    Explicit,
    /// 自動起動タイムアウト
    Timeout,
}

/// ウェイポイント更新理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointReason {
    Initial,
    Reached,
    Expired,
}

/// 運動状態
#[derive(Debug, Clone)]
pub struct MotionState {
    pub mode: FlightMode,
    /// 要素中心の位置（領域ローカル座標）
    pub position: Vec2,
    /// 進行方向（rad、(−π, π]）
    pub heading: f64,
    /// 前進速度（px/s）
    pub speed: f64,
    pub wander: Wander,
    pub waypoint: Vec2,
    /// この時刻を過ぎたらウェイポイントを強制更新
    pub waypoint_deadline: f64,
    /// Launching開始時刻
    pub launch_start_time: Option<f64>,
}

/// 1フレームの更新結果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameReport {
    /// クランプ後のdt
    pub dt: f64,
    /// このフレームの最大旋回量（rad）
    pub max_turn: f64,
    /// 実際の旋回量（rad、符号付き）
    pub heading_change: f64,
    /// 移動距離（px）
    pub distance: f64,
    /// Flightへ昇格したフレームかどうか
    pub promoted: bool,
    /// ウェイポイントを更新した場合の理由
    pub waypoint_replaced: Option<WaypointReason>,
}

/// ヒーロー要素の運動制御
///
/// 巡航・ワンダー・壁回避・ウェイポイント追従を合成して進行方向を決め、
/// 動的な旋回レート制限のもとで位置を積分します。
/// 1セッションにつき1インスタンスで、状態はすべてこの構造体が所有します。
#[derive(Debug, Clone)]
pub struct MotionController {
    pub state: MotionState,
    tuning: MotionTuning,
    footprint: Footprint,
    boundary: Boundary,
    anchor: Option<Rect>,
    picker: WaypointPicker,
    rng: StdRng,
}

impl MotionController {
    /// 新しい運動制御を作成します
    ///
    /// 位置はアンカー（タイトル中心の少し上）に着座し、進行方向は初期値、
    /// 最初のウェイポイントは`now`時点で抽選されます。
    pub fn new(
        tuning: MotionTuning,
        footprint: Footprint,
        boundary: Boundary,
        anchor: Option<Rect>,
        seed: u64,
        now: f64,
    ) -> Self {
        let picker = WaypointPicker::new(
            tuning.waypoint_margin_px,
            tuning.waypoint_timeout_s,
            tuning.waypoint_timeout_jitter,
        );
        let wander = Wander::new(
            tuning.wander_max_rad,
            tuning.wander_jitter_rad,
            tuning.wander_smooth_rate,
        );
        let heading = math_utils::normalize_angle(math_utils::deg_to_rad(tuning.initial_heading_deg));

        let mut controller = Self {
            state: MotionState {
                mode: FlightMode::Idle,
                position: boundary.center(),
                heading,
                speed: 0.0,
                wander,
                waypoint: boundary.center(),
                waypoint_deadline: now,
                launch_start_time: None,
            },
            tuning,
            footprint,
            boundary,
            anchor,
            picker,
            rng: StdRng::seed_from_u64(seed),
        };

        controller.seat_at_anchor();
        controller.replace_waypoint(now, WaypointReason::Initial);
        controller
    }

    pub fn mode(&self) -> FlightMode {
        self.state.mode
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// 要素中心が動ける矩形
    pub fn containment(&self) -> Rect {
        self.boundary.containment(&self.footprint, self.tuning.edge_pad_px)
    }

    /// 待機位置（タイトル中心を持ち上げた点、なければ境界中央）
    pub fn anchor_point(&self) -> Vec2 {
        let raw = match self.anchor {
            Some(rect) => rect.center() - Vec2::new(0.0, self.tuning.anchor_lift_px),
            None => self.boundary.center(),
        };
        self.containment().clamp_point(raw)
    }

    /// 待機中のみ、アンカー位置へ再配置
    ///
    /// 戻り値は再配置したかどうか。
    pub fn seat_at_anchor(&mut self) -> bool {
        if self.state.mode != FlightMode::Idle {
            return false;
        }
        self.state.position = self.anchor_point();
        self.state.heading = math_utils::normalize_angle(math_utils::deg_to_rad(self.tuning.initial_heading_deg));
        true
    }

    /// 境界とアンカー矩形の差し替え（フォント読み込みなどによるレイアウト変化）
    ///
    /// ウェイポイントは新しい抽選範囲へクランプします。位置には触れません。
    pub fn set_layout(&mut self, boundary: Boundary, anchor: Option<Rect>) {
        self.boundary = boundary;
        self.anchor = anchor;
        self.state.waypoint = self.picker.pick_area(&self.boundary).clamp_point(self.state.waypoint);
    }

    /// Idle → Launching 遷移
    ///
    /// 待機中以外では何もせずfalseを返します。
    pub fn begin_launch(&mut self, now: f64, source: ActivationSource) -> bool {
        if self.state.mode != FlightMode::Idle {
            debug!(
                mode = ?self.state.mode,
                source = ?source,
                "FLIGHT_ACTIVATION_IGNORED: 待機中ではないため起動要求を無視しました"
            );
            return false;
        }

        self.state.mode = FlightMode::Launching;
        self.state.speed = 0.0;
        self.state.launch_start_time = Some(now);

        info!(
            source = ?source,
            time = now,
            position_x = self.state.position.x,
            position_y = self.state.position.y,
            heading = self.state.heading,
            "FLIGHT_MODE_TRANSITION: Idle → Launching"
        );

        true
    }

    /// リサイズ時の処理
    ///
    /// 位置とウェイポイントを新しい境界へクランプし直し、待機中なら再着座します。
    pub fn on_resize(&mut self, boundary: Boundary, anchor: Option<Rect>) {
        self.set_layout(boundary, anchor);
        self.state.position = self.containment().clamp_point(self.state.position);
        self.seat_at_anchor();

        debug!(
            width = boundary.width,
            height = boundary.height,
            mode = ?self.state.mode,
            position_x = self.state.position.x,
            position_y = self.state.position.y,
            "FLIGHT_BOUNDARY_RESAMPLED: 境界を再取得しました"
        );
    }

    /// ワンダー目標を揺らす（タイマーから呼ばれる）
    pub fn nudge_wander(&mut self) {
        self.state.wander.nudge(&mut self.rng);
    }

    fn replace_waypoint(&mut self, now: f64, reason: WaypointReason) {
        let pick = self.picker.pick(&mut self.rng, self.state.position, &self.boundary, now);
        self.state.waypoint = pick.point;
        self.state.waypoint_deadline = pick.deadline;

        trace!(
            reason = ?reason,
            waypoint_x = pick.point.x,
            waypoint_y = pick.point.y,
            deadline = pick.deadline,
            attempts = pick.attempts,
            "WAYPOINT_SELECTED: 新しいウェイポイントを選択しました"
        );
    }

    /// 起動加速（Launching中の速度更新とFlightへの昇格）
    fn update_launch(&mut self, now: f64) -> bool {
        let start = self.state.launch_start_time.unwrap_or(now);
        let accel = self.tuning.accel_duration_s;
        let t = if accel > 0.0 { (now - start) / accel } else { 1.0 };

        if t >= 1.0 {
            self.state.mode = FlightMode::Flight;
            self.state.speed = self.tuning.cruise_speed_pxps;

            info!(
                time = now,
                launch_elapsed = now - start,
                speed = self.state.speed,
                "FLIGHT_MODE_TRANSITION: Launching → Flight"
            );
            return true;
        }

        self.state.speed = self.tuning.cruise_speed_pxps * math_utils::smoothstep(t);
        false
    }

    /// 1フレーム分の状態更新
    ///
    /// 手順: 起動加速 → ワンダー平滑 → 影響ベクトル合成 → 旋回制限 → 位置積分
    /// → ウェイポイント到達判定。到達判定は更新前のウェイポイントベクトルで行い、
    /// 新しいウェイポイントは次フレームから効きます。
    pub fn step(&mut self, now: f64, dt: f64, boundary: &Boundary) -> FrameReport {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.tuning.max_frame_dt_s)
        } else {
            0.0
        };
        self.boundary = *boundary;

        let mut report = FrameReport {
            dt,
            ..FrameReport::default()
        };

        if self.state.mode == FlightMode::Idle {
            return report;
        }

        if self.state.mode == FlightMode::Launching {
            report.promoted = self.update_launch(now);
        }

        self.state.wander.smooth(dt);

        let to_waypoint = self.state.waypoint - self.state.position;
        let waypoint_distance = to_waypoint.magnitude();

        let forces = steering::compute_forces(
            self.state.heading,
            self.state.wander.offset,
            self.state.position,
            to_waypoint,
            &self.boundary,
            &self.tuning,
        );
        let desired_heading = forces.desired_direction().angle();

        let previous_heading = self.state.heading;
        let (heading, max_turn) = steering::limit_turn(
            previous_heading,
            desired_heading,
            self.tuning.max_turn_rate_rad_s,
            forces.repulsion_strength(),
            dt,
        );
        self.state.heading = heading;
        report.max_turn = max_turn;
        report.heading_change = math_utils::angle_difference(previous_heading, heading);

        let previous_position = self.state.position;
        let advanced = previous_position + Vec2::from_angle(heading) * (self.state.speed * dt);
        self.state.position = self.containment().clamp_point(advanced);
        report.distance = previous_position.distance(&self.state.position);

        let reason = if waypoint_distance <= self.tuning.waypoint_reach_px {
            Some(WaypointReason::Reached)
        } else if now >= self.state.waypoint_deadline {
            Some(WaypointReason::Expired)
        } else {
            None
        };
        if let Some(reason) = reason {
            self.replace_waypoint(now, reason);
            report.waypoint_replaced = Some(reason);
        }

        report
    }
}

impl ISteerable for MotionController {
    fn get_position(&self) -> Vec2 {
        self.state.position
    }

    fn get_heading(&self) -> f64 {
        self.state.heading
    }

    fn placement(&self) -> Placement {
        Placement::from_pose(
            self.state.position,
            self.state.heading,
            &self.footprint,
            self.tuning.rotation_offset_deg,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const DT: f64 = 0.016;

    fn controller_in(boundary: Boundary) -> MotionController {
        let anchor = Some(Rect::from_origin_size(
            boundary.width / 2.0 - 150.0,
            boundary.height / 2.0,
            300.0,
            60.0,
        ));
        MotionController::new(MotionTuning::default(), Footprint::new(56.0, 56.0), boundary, anchor, 42, 0.0)
    }

    fn fly(controller: &mut MotionController, boundary: &Boundary, from: f64, seconds: f64) -> f64 {
        let mut now = from;
        let frames = (seconds / DT) as usize;
        for _ in 0..frames {
            now += DT;
            controller.step(now, DT, boundary);
        }
        now
    }

    #[test]
    fn test_initial_seat_is_lifted_above_title() {
        let boundary = Boundary::new(1280.0, 560.0);
        let controller = controller_in(boundary);
        assert_eq!(controller.mode(), FlightMode::Idle);
        assert_eq!(controller.state.position, Vec2::new(640.0, 310.0 - 36.0));
        assert!((controller.state.heading + PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_anchor_absent_falls_back_to_center() {
        let boundary = Boundary::new(800.0, 400.0);
        let controller = MotionController::new(
            MotionTuning::default(), Footprint::new(40.0, 40.0), boundary, None, 1, 0.0,
        );
        assert_eq!(controller.state.position, boundary.center());
    }

    #[test]
    fn test_idle_frames_do_not_move() {
        let boundary = Boundary::new(1280.0, 560.0);
        let mut controller = controller_in(boundary);
        let start = controller.state.position;
        fly(&mut controller, &boundary, 0.0, 2.0);
        assert_eq!(controller.state.position, start);
        assert_eq!(controller.state.speed, 0.0);
    }

    #[test]
    fn test_launch_eases_then_pins_cruise_speed() {
        let boundary = Boundary::new(1280.0, 560.0);
        let mut controller = controller_in(boundary);
        assert!(controller.begin_launch(1.0, ActivationSource::Explicit));
        assert_eq!(controller.state.speed, 0.0);

        controller.step(1.6, DT, &boundary);
        assert_eq!(controller.mode(), FlightMode::Launching);
        let expected = 160.0 * math_utils::smoothstep(0.5);
        assert!((controller.state.speed - expected).abs() < 1e-9);

        let report = controller.step(2.2 + 1e-9, DT, &boundary);
        assert!(report.promoted);
        assert_eq!(controller.mode(), FlightMode::Flight);
        assert_eq!(controller.state.speed, 160.0);
    }

    #[test]
    fn test_modes_only_move_forward() {
        let boundary = Boundary::new(1280.0, 560.0);
        let mut controller = controller_in(boundary);
        let mut history = vec![controller.mode()];
        controller.begin_launch(0.5, ActivationSource::Timeout);
        let mut now = 0.5;
        for _ in 0..400 {
            now += DT;
            controller.step(now, DT, &boundary);
            controller.begin_launch(now, ActivationSource::Explicit);
            if history.last() != Some(&controller.mode()) {
                history.push(controller.mode());
            }
        }
        assert_eq!(history, vec![FlightMode::Idle, FlightMode::Launching, FlightMode::Flight]);
    }

    #[test]
    fn test_second_activation_is_noop() {
        let boundary = Boundary::new(1280.0, 560.0);
        let mut controller = controller_in(boundary);
        assert!(controller.begin_launch(1.2, ActivationSource::Explicit));
        assert!(!controller.begin_launch(3.0, ActivationSource::Timeout));
        assert_eq!(controller.state.launch_start_time, Some(1.2));
    }

    #[test]
    fn test_heading_normalized_turn_bounded_and_contained() {
        let boundary = Boundary::new(900.0, 420.0);
        let mut controller = controller_in(boundary);
        controller.begin_launch(0.0, ActivationSource::Explicit);
        let containment = controller.containment();
        let mut now = 0.0;
        for frame in 0..6000 {
            if frame % 50 == 0 {
                controller.nudge_wander();
            }
            now += DT;
            let before = controller.state.heading;
            let report = controller.step(now, DT, &boundary);
            let after = controller.state.heading;
            assert!(after > -PI && after <= PI);
            let change = math_utils::angle_difference(before, after).abs();
            assert!(change <= report.max_turn + 1e-12);
            assert!(report.max_turn <= 2.4 * steering::TURN_FACTOR_MAX * DT + 1e-12);
            assert!(containment.contains(&controller.state.position));
        }
    }

    #[test]
    fn test_cruise_straight_toward_far_waypoint() {
        let boundary = Boundary::new(2000.0, 1000.0);
        let mut controller = MotionController::new(
            MotionTuning::default(), Footprint::new(56.0, 56.0), boundary, None, 5, 0.0,
        );
        controller.state.mode = FlightMode::Flight;
        controller.state.speed = 160.0;
        controller.state.heading = 0.0;
        controller.state.position = Vec2::new(1000.0, 500.0);
        controller.state.waypoint = Vec2::new(1900.0, 500.0);
        controller.state.waypoint_deadline = 100.0;

        let report = controller.step(1.0, DT, &boundary);
        assert!(controller.state.heading.abs() < 1e-9);
        assert!((controller.state.position.x - 1002.56).abs() < 1e-9);
        assert!((controller.state.position.y - 500.0).abs() < 1e-9);
        assert!(report.waypoint_replaced.is_none());
    }

    #[test]
    fn test_reached_waypoint_replaced_before_next_frame() {
        let boundary = Boundary::new(1280.0, 560.0);
        let mut controller = controller_in(boundary);
        controller.state.mode = FlightMode::Flight;
        controller.state.speed = 160.0;
        controller.state.position = Vec2::new(400.0, 300.0);
        controller.state.waypoint = Vec2::new(420.0, 300.0);
        controller.state.waypoint_deadline = 100.0;

        let report = controller.step(1.0, DT, &boundary);
        assert_eq!(report.waypoint_replaced, Some(WaypointReason::Reached));
        assert_ne!(controller.state.waypoint, Vec2::new(420.0, 300.0));
        assert!(controller.state.waypoint_deadline > 1.0);
    }

    #[test]
    fn test_expired_waypoint_replaced() {
        let boundary = Boundary::new(1280.0, 560.0);
        let mut controller = controller_in(boundary);
        controller.state.mode = FlightMode::Flight;
        controller.state.speed = 160.0;
        controller.state.position = Vec2::new(200.0, 200.0);
        controller.state.waypoint = Vec2::new(1100.0, 400.0);
        controller.state.waypoint_deadline = 0.5;

        let report = controller.step(1.0, DT, &boundary);
        assert_eq!(report.waypoint_replaced, Some(WaypointReason::Expired));
    }

    #[test]
    fn test_dt_is_capped() {
        let boundary = Boundary::new(1280.0, 560.0);
        let mut controller = controller_in(boundary);
        controller.state.mode = FlightMode::Flight;
        controller.state.speed = 160.0;
        let report = controller.step(10.0, 5.0, &boundary);
        assert_eq!(report.dt, 0.06);
        assert!(report.distance <= 160.0 * 0.06 + 1e-9);
    }

    #[test]
    fn test_resize_reclamps_and_reseats_when_idle() {
        let boundary = Boundary::new(1280.0, 560.0);
        let mut controller = controller_in(boundary);
        let small = Boundary::new(600.0, 300.0);
        let anchor = Some(Rect::from_origin_size(150.0, 120.0, 300.0, 60.0));
        controller.on_resize(small, anchor);
        assert_eq!(controller.state.position, Vec2::new(300.0, 150.0 - 36.0));
        assert!(controller.picker.pick_area(&small).contains(&controller.state.waypoint));
    }

    #[test]
    fn test_set_layout_moves_idle_seat_only_when_reseated() {
        let boundary = Boundary::new(1280.0, 560.0);
        let mut controller = controller_in(boundary);
        let before = controller.state.position;
        let shifted = Some(Rect::from_origin_size(490.0, 300.0, 300.0, 60.0));

        controller.set_layout(boundary, shifted);
        assert_eq!(controller.state.position, before);
        assert!(controller.seat_at_anchor());
        assert_eq!(controller.state.position, Vec2::new(640.0, 330.0 - 36.0));
    }

    #[test]
    fn test_resize_in_flight_reclamps_without_reseat() {
        let boundary = Boundary::new(1280.0, 560.0);
        let mut controller = controller_in(boundary);
        controller.begin_launch(0.0, ActivationSource::Explicit);
        controller.state.position = Vec2::new(1200.0, 500.0);
        controller.on_resize(Boundary::new(600.0, 300.0), None);
        assert_eq!(controller.state.position, Vec2::new(600.0 - 30.0, 300.0 - 30.0));
    }

    #[test]
    fn test_zero_boundary_is_stationary_and_safe() {
        let boundary = Boundary::new(0.0, 0.0);
        let mut controller = MotionController::new(
            MotionTuning::default(), Footprint::new(56.0, 56.0), boundary, None, 9, 0.0,
        );
        controller.begin_launch(0.0, ActivationSource::Explicit);
        fly(&mut controller, &boundary, 0.0, 3.0);
        assert_eq!(controller.state.position, Vec2::ZERO);
        assert!(controller.state.heading.is_finite());
    }
}
