//! # heroflight
//!
//! ヒーローバナー上を飛び回る装飾要素の運動制御です。
//!
//! 巡航・ワンダー・壁回避・ウェイポイント追従を合成した操舵と、
//! `Idle → Launching → Flight` の起動シーケンスを、注入可能な時刻源と
//! ポーリング型タイマーの上で駆動します。

pub mod logging;
pub mod models;
pub mod runtime;
pub mod scenario;
pub mod scheduler;
pub mod simulation;
