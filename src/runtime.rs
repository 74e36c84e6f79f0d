//! # Runtime モジュール
//!
//! 実時間でセッションを駆動します。
//!
//! tokioのシングルスレッドランタイム上で、表示リフレッシュ相当の間隔の
//! `interval`をフレームの供給源とし、実時間の時刻源から読んだ現在時刻で
//! エンジンをポンプします。フレームが遅れた場合は取りこぼしたティックを
//! まとめて実行せずにスキップし、dtの上限クランプに任せます。

use crate::models::{RecordingElement, ScriptedStage};
use crate::scenario::ScenarioConfig;
use crate::scheduler::{SystemTimeSource, TimeSource};
use crate::simulation::{SessionEngine, SessionStats};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// シナリオを実時間で実行
///
/// ステージが不完全でエンジンをインストールできない場合は`Ok(None)`です。
pub fn run_realtime(scenario: &ScenarioConfig, verbose_level: u8) -> std::io::Result<Option<SessionStats>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    Ok(runtime.block_on(drive(scenario, verbose_level)))
}

async fn drive(scenario: &ScenarioConfig, verbose_level: u8) -> Option<SessionStats> {
    let clock = SystemTimeSource::new();
    let mut engine = SessionEngine::install(
        Box::new(clock),
        ScriptedStage::from_config(&scenario.stage),
        RecordingElement::new(),
        scenario.tuning.clone(),
        scenario.sim.seed,
        verbose_level,
    )?;

    info!("=== 飛行セッション開始（実時間） ===");

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(scenario.sim.frame_dt_s));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut cursor = 0;
    let mut last_report = 0.0;
    loop {
        ticker.tick().await;
        let now = clock.now();
        if now >= scenario.sim.duration_s {
            break;
        }

        cursor = engine.apply_due_events(&scenario.events, cursor);
        engine.pump();

        if verbose_level > 0 && now - last_report >= 1.0 {
            last_report = now;
            let position = engine.controller().state.position;
            info!(
                "経過: {:.1}/{:.1}秒 モード: {:?} 位置: ({:.0}, {:.0})",
                now,
                scenario.sim.duration_s,
                engine.mode(),
                position.x,
                position.y
            );
        }
    }

    info!("=== 飛行セッション完了 ===");
    Some(engine.stats.clone())
}
