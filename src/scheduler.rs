//! # Scheduler モジュール
//!
//! フレームループと補助タイマーのための時間管理を提供します。
//!
//! - **TimeSource**: 注入可能な時刻源（実時間 / 手動進行の仮想時間）
//! - **FrameClock**: フレーム間隔dtの計算（上限クランプ、非表示からの復帰時の再同期）
//! - **OneShotTimer**: 一度だけ発火するタイマー（自動起動タイムアウト）
//! - **IntervalTimer**: 固定間隔タイマー（ワンダー揺らぎ、待機中の再配置）
//!
//! タイマーはすべてポーリング型で、同じシングルスレッドの駆動ループから
//! 呼ばれるため、フレーム更新と並行して実行されることはありません。

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// 時刻源のインターフェース（秒単位の単調増加時刻）
pub trait TimeSource {
    fn now(&self) -> f64;
}

/// 実時間の時刻源（生成時刻を原点とする）
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// 手動で進める仮想時刻源
///
/// クローンは同じ時刻を共有するため、エンジンに渡した後もテストや
/// ヘッドレス実行側から時刻を進められます。
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    now: Rc<Cell<f64>>,
}

impl ManualTimeSource {
    pub fn new(start: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// 時刻を設定（過去には戻さない）
    pub fn set(&self, now: f64) {
        if now > self.now.get() {
            self.now.set(now);
        }
    }

    /// 時刻を`dt`秒進める
    pub fn advance(&self, dt: f64) {
        if dt > 0.0 {
            self.now.set(self.now.get() + dt);
        }
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// フレーム間隔の計算器
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<f64>,
    max_dt: f64,
    paused: bool,
}

impl FrameClock {
    pub fn new(max_dt: f64) -> Self {
        Self {
            last: None,
            max_dt,
            paused: false,
        }
    }

    /// フレームの到来。停止中はNone、それ以外はクランプ済みdtを返す
    ///
    /// 基準時刻がない最初のフレーム（および再開直後）はdt = 0です。
    pub fn tick(&mut self, now: f64) -> Option<f64> {
        if self.paused {
            return None;
        }
        let dt = match self.last {
            Some(last) => (now - last).clamp(0.0, self.max_dt),
            None => 0.0,
        };
        self.last = Some(now);
        Some(dt)
    }

    /// フレーム配信の停止（タブ非表示）
    pub fn pause(&mut self) {
        self.paused = true;
        self.last = None;
    }

    /// フレーム配信の再開。停止期間を積分しないよう基準時刻を捨てる
    pub fn resume(&mut self) {
        self.paused = false;
        self.last = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OneShotState {
    Pending { due: f64 },
    Fired,
    Cancelled,
}

/// 一度だけ発火するタイマー
#[derive(Debug, Clone, PartialEq)]
pub struct OneShotTimer {
    state: OneShotState,
}

impl OneShotTimer {
    /// `now + delay`で発火するタイマーを作成
    pub fn schedule(now: f64, delay: f64) -> Self {
        Self {
            state: OneShotState::Pending {
                due: now + delay.max(0.0),
            },
        }
    }

    /// 発火時刻に達していればtrue（以後は二度と発火しない）
    pub fn poll(&mut self, now: f64) -> bool {
        match self.state {
            OneShotState::Pending { due } if now >= due => {
                self.state = OneShotState::Fired;
                true
            }
            _ => false,
        }
    }

    /// 未発火なら取り消してtrue
    pub fn cancel(&mut self) -> bool {
        if matches!(self.state, OneShotState::Pending { .. }) {
            self.state = OneShotState::Cancelled;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, OneShotState::Pending { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == OneShotState::Cancelled
    }
}

/// 固定間隔タイマー
///
/// 発火が遅れても取りこぼした回数分をまとめて発火させず、1回だけ発火して
/// 次回予定を現在時刻基準に合わせ直します。
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalTimer {
    period: f64,
    next_due: f64,
    active: bool,
}

impl IntervalTimer {
    pub fn start(now: f64, period: f64) -> Self {
        Self {
            period,
            next_due: now + period,
            active: period > 0.0,
        }
    }

    /// 発火予定に達していればtrue
    pub fn poll(&mut self, now: f64) -> bool {
        if !self.active || now < self.next_due {
            return false;
        }
        self.next_due += self.period;
        if self.next_due <= now {
            self.next_due = now + self.period;
        }
        true
    }

    /// タイマーを停止。稼働中だった場合はtrue
    pub fn cancel(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        was_active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
