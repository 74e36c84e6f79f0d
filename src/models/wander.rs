use crate::models::common::math_utils;
use rand::Rng;

/// ワンダー（ゆっくり変化する進行方向のバイアス）
///
/// 目標角はタイマーで間欠的に揺らし、オフセットは毎フレーム指数平滑で
/// 目標角に追従させます。乱数の粒度と見た目の滑らかさを切り離すためです。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wander {
    /// 現在のオフセット角（rad）
    pub offset: f64,
    /// 目標角（rad）
    pub target: f64,
    /// 目標角の上限（rad）
    pub max: f64,
    /// 1回の揺らぎ幅（rad）
    pub jitter: f64,
    /// 追従レート（1/s）
    pub smooth_rate: f64,
}

impl Wander {
    pub fn new(max: f64, jitter: f64, smooth_rate: f64) -> Self {
        Self {
            offset: 0.0,
            target: 0.0,
            max,
            jitter,
            smooth_rate,
        }
    }

    /// 目標角を[−jitter, +jitter]だけ揺らし、[−max, +max]にクランプ
    pub fn nudge<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let step = if self.jitter > 0.0 {
            rng.gen_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        self.target = (self.target + step).clamp(-self.max, self.max);
    }

    /// オフセットを目標角へ指数平滑で近づける
    pub fn smooth(&mut self, dt: f64) {
        let alpha = math_utils::clamp01(dt * self.smooth_rate);
        self.offset += (self.target - self.offset) * alpha;
    }
}
