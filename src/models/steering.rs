//! 操舵ベクトル場
//!
//! 巡航・ワンダー・壁回避・ウェイポイント誘引の4つの影響ベクトルと、
//! それらを合成した目標方向、動的旋回レート上限を計算する純粋関数群です。

use crate::models::common::{math_utils, Boundary, Vec2};
use crate::scenario::MotionTuning;
use std::f64::consts::FRAC_PI_2;

/// 動的旋回係数の下限
pub const TURN_FACTOR_MIN: f64 = 0.85;
/// 動的旋回係数の上限
pub const TURN_FACTOR_MAX: f64 = 2.1;
/// 壁回避の強さに対する旋回係数の重み
pub const TURN_REPULSION_WEIGHT: f64 = 0.9;
/// 角度差に対する旋回係数の重み
pub const TURN_ANGLE_WEIGHT: f64 = 0.6;

/// 1フレーム分の影響ベクトル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringForces {
    pub cruise: Vec2,
    pub wander: Vec2,
    /// ゲイン適用前の壁回避ベクトル（各成分は[−1, 1]）
    pub repulsion_raw: Vec2,
    /// ゲイン適用後の壁回避ベクトル
    pub repulsion: Vec2,
    pub attraction: Vec2,
}

impl SteeringForces {
    /// 4ベクトルの合計
    pub fn sum(&self) -> Vec2 {
        self.cruise + self.wander + self.repulsion + self.attraction
    }

    /// 合計を正規化した目標方向（合計が零ベクトルなら除数1）
    pub fn desired_direction(&self) -> Vec2 {
        self.sum().normalize_or_zero()
    }

    /// 壁回避の強さ（[0, 1]にクランプ）
    pub fn repulsion_strength(&self) -> f64 {
        math_utils::clamp01(self.repulsion_raw.magnitude())
    }
}

/// 1辺ぶんの押し戻し量
///
/// 辺からの距離`distance`がマージン以上なら0、辺上で1。
fn edge_push(distance: f64, margin: f64) -> f64 {
    if margin <= 0.0 || distance >= margin {
        return 0.0;
    }
    math_utils::smoothstep((margin - distance) / margin)
}

/// 壁回避ベクトル（ゲイン適用前）
///
/// 4辺それぞれについて、マージン内に入り込んだ深さのスムーズステップで
/// 辺から離れる向きに押し戻し、軸ごとに合算します。
pub fn edge_repulsion(position: Vec2, boundary: &Boundary, margin: f64) -> Vec2 {
    let left = edge_push(position.x, margin);
    let right = edge_push(boundary.width - position.x, margin);
    let top = edge_push(position.y, margin);
    let bottom = edge_push(boundary.height - position.y, margin);

    Vec2::new(left - right, top - bottom)
}

/// ウェイポイントへの誘引ベクトル
pub fn waypoint_attraction(to_waypoint: Vec2, gain: f64) -> Vec2 {
    to_waypoint.normalize_or_zero() * gain
}

/// 4つの影響ベクトルを計算
///
/// ワンダーの混合率、壁回避のマージンとゲイン、ウェイポイント誘引のゲインは
/// `tuning`から取ります。
pub fn compute_forces(
    heading: f64,
    wander_offset: f64,
    position: Vec2,
    to_waypoint: Vec2,
    boundary: &Boundary,
    tuning: &MotionTuning,
) -> SteeringForces {
    let repulsion_raw = edge_repulsion(position, boundary, tuning.avoid_margin_px);

    SteeringForces {
        cruise: Vec2::from_angle(heading),
        wander: Vec2::from_angle(heading + wander_offset) * tuning.wander_blend,
        repulsion_raw,
        repulsion: repulsion_raw * tuning.avoid_gain,
        attraction: waypoint_attraction(to_waypoint, tuning.waypoint_gain),
    }
}

/// 動的旋回係数
///
/// 壁に近いほど、また目標方向とのずれが大きいほど速く旋回できるようにします。
pub fn turn_factor(repulsion_strength: f64, angle_gap: f64) -> f64 {
    let angle_factor = math_utils::clamp01(angle_gap.abs() / FRAC_PI_2);
    (TURN_FACTOR_MIN
        + TURN_REPULSION_WEIGHT * math_utils::clamp01(repulsion_strength)
        + TURN_ANGLE_WEIGHT * angle_factor)
        .clamp(TURN_FACTOR_MIN, TURN_FACTOR_MAX)
}

/// 旋回レート制限付きで進行方向を更新
///
/// 戻り値は(新しい進行方向, このフレームの最大旋回量)。
pub fn limit_turn(heading: f64, desired_heading: f64, base_turn_rate: f64, repulsion_strength: f64, dt: f64) -> (f64, f64) {
    let delta = math_utils::angle_difference(heading, desired_heading);
    let max_turn = base_turn_rate * turn_factor(repulsion_strength, delta) * dt;
    let applied = delta.clamp(-max_turn, max_turn);

    (math_utils::normalize_angle(heading + applied), max_turn)
}
