// 基本的なデータ型と数学ユーティリティ
pub mod common;

// ホスト・要素・操舵のインターフェース（trait）定義
pub mod traits;

// 操舵アルゴリズムの構成要素
pub mod steering;
pub mod waypoint;
pub mod wander;

// 運動制御本体とホスト実装
pub mod motion;
pub mod stage;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use motion::{ActivationSource, FlightMode, FrameReport, MotionController, MotionState, WaypointReason};
pub use stage::{RecordingElement, ScriptedStage};
pub use steering::SteeringForces;
pub use waypoint::{WaypointPick, WaypointPicker};
pub use wander::Wander;
