use crate::models::common::{Boundary, Rect, Vec2};
use rand::Rng;

/// 抽選の最大試行回数
pub const MAX_PICK_ATTEMPTS: u32 = 10;
/// 近傍とみなす境界サイズ比
pub const NEAR_FRACTION: f64 = 0.25;

/// ウェイポイント抽選器
///
/// 境界内（マージン分内側）から一様に候補点を選び、現在位置の近傍
/// （幅・高さそれぞれ25%以内）なら棄却して引き直します。
/// 画面全体を巡回させるための偏りです。
#[derive(Debug, Clone)]
pub struct WaypointPicker {
    /// 抽選範囲の内側マージン（px）
    pub margin: f64,
    /// 有効期限の基準値（秒）
    pub timeout: f64,
    /// 有効期限に掛ける乱数係数の範囲
    pub timeout_jitter: [f64; 2],
}

/// 抽選結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointPick {
    pub point: Vec2,
    pub deadline: f64,
    /// 何回目の候補で採用されたか
    pub attempts: u32,
}

/// `[lo, hi]`から一様に値を取る（範囲が退化していれば`lo`）
fn sample_range<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

impl WaypointPicker {
    pub fn new(margin: f64, timeout: f64, timeout_jitter: [f64; 2]) -> Self {
        Self {
            margin,
            timeout,
            timeout_jitter,
        }
    }

    /// 候補点を抽選する矩形
    pub fn pick_area(&self, boundary: &Boundary) -> Rect {
        boundary.inset(self.margin, self.margin)
    }

    /// 現在位置から十分離れているかどうか
    fn is_far_enough(candidate: Vec2, current: Vec2, boundary: &Boundary) -> bool {
        let near_x = (candidate.x - current.x).abs() < boundary.width * NEAR_FRACTION;
        let near_y = (candidate.y - current.y).abs() < boundary.height * NEAR_FRACTION;
        !(near_x && near_y)
    }

    /// 新しいウェイポイントを抽選
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R, current: Vec2, boundary: &Boundary, now: f64) -> WaypointPick {
        let area = self.pick_area(boundary);
        let mut candidate = area.center();
        let mut attempts = 0;

        while attempts < MAX_PICK_ATTEMPTS {
            attempts += 1;
            candidate = Vec2::new(
                sample_range(rng, area.min_x, area.max_x),
                sample_range(rng, area.min_y, area.max_y),
            );
            if Self::is_far_enough(candidate, current, boundary) {
                break;
            }
        }

        let [lo, hi] = self.timeout_jitter;
        let deadline = now + self.timeout * sample_range(rng, lo, hi);

        WaypointPick {
            point: candidate,
            deadline,
            attempts,
        }
    }
}
