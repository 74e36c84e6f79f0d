use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// セッション実行設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// 仮想フレーム間隔（秒）。ヘッドレス実行で使用
    pub frame_dt_s: f64,
    /// セッション長（秒）
    pub duration_s: f64,
    /// 乱数シード（ウェイポイント・ワンダー）
    pub seed: u64,
    /// 実時間で実行するかどうか
    #[serde(default)]
    pub realtime: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SizeConfig {
    pub width_px: f64,
    pub height_px: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RectConfig {
    pub x_px: f64,
    pub y_px: f64,
    pub width_px: f64,
    pub height_px: f64,
}

/// ステージ（ヒーロー領域）設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageConfig {
    pub boundary: SizeConfig,
    pub footprint: SizeConfig,
    /// タイトル要素の矩形（省略時は境界中央に配置）
    #[serde(default)]
    pub title: Option<RectConfig>,
}

/// 運動制御のチューニング定数
///
/// 全フィールドにデフォルト値があり、シナリオでは変更したい値だけ記述できます。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionTuning {
    /// 巡航速度（px/s）
    pub cruise_speed_pxps: f64,
    /// 基本最大旋回レート（rad/s）
    pub max_turn_rate_rad_s: f64,
    /// 壁回避を開始する距離（px）
    pub avoid_margin_px: f64,
    /// 壁回避ゲイン
    pub avoid_gain: f64,
    /// ワンダー角の上限（rad）
    pub wander_max_rad: f64,
    /// ワンダー目標の1回あたり揺らぎ幅（rad）
    pub wander_jitter_rad: f64,
    /// ワンダー目標の更新間隔（秒）
    pub wander_interval_s: f64,
    /// ワンダーオフセットの追従レート（1/s）
    pub wander_smooth_rate: f64,
    /// ワンダー方向の混合係数（巡航方向比）
    pub wander_blend: f64,
    /// ウェイポイント誘引ゲイン
    pub waypoint_gain: f64,
    /// ウェイポイント抽選時の内側マージン（px）
    pub waypoint_margin_px: f64,
    /// ウェイポイント到達判定距離（px）
    pub waypoint_reach_px: f64,
    /// ウェイポイント有効期限の基準値（秒）
    pub waypoint_timeout_s: f64,
    /// 有効期限に掛ける乱数係数の範囲
    pub waypoint_timeout_jitter: [f64; 2],
    /// 自動起動までの待ち時間（秒）
    pub launch_delay_s: f64,
    /// 起動加速にかける時間（秒）
    pub accel_duration_s: f64,
    /// 待機中の再配置間隔（秒）
    pub idle_reseat_interval_s: f64,
    /// タイトル中心からの持ち上げ量（px）
    pub anchor_lift_px: f64,
    /// 初期進行方向（度）
    pub initial_heading_deg: f64,
    /// 収容矩形の端パディング（px）
    pub edge_pad_px: f64,
    /// フレーム間隔の上限（秒）
    pub max_frame_dt_s: f64,
    /// 表示上の回転オフセット（度）
    pub rotation_offset_deg: f64,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            cruise_speed_pxps: 160.0,
            max_turn_rate_rad_s: 2.4,
            avoid_margin_px: 90.0,
            avoid_gain: 1.6,
            wander_max_rad: 0.6,
            wander_jitter_rad: 0.22,
            wander_interval_s: 0.9,
            wander_smooth_rate: 1.8,
            wander_blend: 0.55,
            waypoint_gain: 0.9,
            waypoint_margin_px: 60.0,
            waypoint_reach_px: 40.0,
            waypoint_timeout_s: 4.5,
            waypoint_timeout_jitter: [0.7, 1.5],
            launch_delay_s: 5.0,
            accel_duration_s: 1.2,
            idle_reseat_interval_s: 0.25,
            anchor_lift_px: 36.0,
            initial_heading_deg: -45.0,
            edge_pad_px: 2.0,
            max_frame_dt_s: 0.06,
            rotation_offset_deg: 45.0,
        }
    }
}

/// ホストから届くイベントの種類
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEventKind {
    /// 要素のクリック（明示的な起動）
    Activate,
    /// ビューポートのリサイズ
    Resize { width_px: f64, height_px: f64 },
    /// タブ表示状態の変化
    Visibility { visible: bool },
    /// フォント読み込み完了（タイトル位置のずれを伴うことがある）
    FontsReady {
        #[serde(default)]
        anchor_shift_y_px: f64,
    },
    /// ウィンドウのloadイベント
    Load,
}

/// 時刻付きホストイベント
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HostEvent {
    pub at_s: f64,
    #[serde(flatten)]
    pub kind: HostEventKind,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub stage: StageConfig,
    #[serde(default)]
    pub tuning: MotionTuning,
    #[serde(default)]
    pub events: Vec<HostEvent>,
}

impl Default for ScenarioConfig {
    /// 組み込みのデフォルトシナリオ（1280×560のヒーロー領域、クリックなし）
    fn default() -> Self {
        Self {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "default".to_string(),
                description: "組み込みデフォルト: 自動起動のみ".to_string(),
            },
            sim: SimulationConfig {
                frame_dt_s: 1.0 / 60.0,
                duration_s: 20.0,
                seed: 42,
                realtime: false,
            },
            stage: StageConfig {
                boundary: SizeConfig { width_px: 1280.0, height_px: 560.0 },
                footprint: SizeConfig { width_px: 56.0, height_px: 56.0 },
                title: Some(RectConfig {
                    x_px: 440.0,
                    y_px: 220.0,
                    width_px: 400.0,
                    height_px: 72.0,
                }),
            },
            tuning: MotionTuning::default(),
            events: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        Self::from_yaml_str(&contents).map_err(|e| match e {
            ScenarioError::ParseError(_, err) => ScenarioError::ParseError(path.to_path_buf(), err),
            other => other,
        })
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let mut config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::ParseError(PathBuf::from("<inline>"), e))?;

        config.validate()?;

        // 発生時刻順に並べておく（同時刻は記述順）
        config.events.sort_by(|a, b| a.at_s.total_cmp(&b.at_s));

        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        // NaNと無限大もここで弾く
        if !(self.sim.frame_dt_s.is_finite() && self.sim.frame_dt_s > 0.0) {
            return Err(ScenarioError::ValidationError("frame_dt_s must be positive and finite".to_string()));
        }
        if !(self.sim.duration_s.is_finite() && self.sim.duration_s > 0.0) {
            return Err(ScenarioError::ValidationError("duration_s must be positive and finite".to_string()));
        }

        let boundary = &self.stage.boundary;
        if boundary.width_px < 0.0 || boundary.height_px < 0.0 {
            return Err(ScenarioError::ValidationError("boundary size must not be negative".to_string()));
        }
        let footprint = &self.stage.footprint;
        if footprint.width_px < 0.0 || footprint.height_px < 0.0 {
            return Err(ScenarioError::ValidationError("footprint size must not be negative".to_string()));
        }
        if let Some(title) = &self.stage.title {
            if title.width_px < 0.0 || title.height_px < 0.0 {
                return Err(ScenarioError::ValidationError("title size must not be negative".to_string()));
            }
        }

        self.validate_tuning()?;

        for event in &self.events {
            if !(event.at_s >= 0.0 && event.at_s <= self.sim.duration_s) {
                return Err(ScenarioError::ValidationError(format!(
                    "event {:?} at {}s is outside session duration {}s",
                    event.kind, event.at_s, self.sim.duration_s
                )));
            }
            if let HostEventKind::Resize { width_px, height_px } = event.kind {
                if !(width_px >= 0.0 && height_px >= 0.0) {
                    return Err(ScenarioError::ValidationError(format!(
                        "resize at {}s has negative size", event.at_s
                    )));
                }
            }
        }

        Ok(())
    }

    fn validate_tuning(&self) -> Result<(), ScenarioError> {
        let t = &self.tuning;
        let positive = [
            ("cruise_speed_pxps", t.cruise_speed_pxps),
            ("max_turn_rate_rad_s", t.max_turn_rate_rad_s),
            ("wander_interval_s", t.wander_interval_s),
            ("waypoint_timeout_s", t.waypoint_timeout_s),
            ("idle_reseat_interval_s", t.idle_reseat_interval_s),
            ("max_frame_dt_s", t.max_frame_dt_s),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ScenarioError::ValidationError(format!("{} must be positive", name)));
            }
        }

        let non_negative = [
            ("avoid_margin_px", t.avoid_margin_px),
            ("avoid_gain", t.avoid_gain),
            ("wander_max_rad", t.wander_max_rad),
            ("wander_jitter_rad", t.wander_jitter_rad),
            ("wander_smooth_rate", t.wander_smooth_rate),
            ("wander_blend", t.wander_blend),
            ("waypoint_gain", t.waypoint_gain),
            ("waypoint_margin_px", t.waypoint_margin_px),
            ("waypoint_reach_px", t.waypoint_reach_px),
            ("launch_delay_s", t.launch_delay_s),
            ("accel_duration_s", t.accel_duration_s),
            ("edge_pad_px", t.edge_pad_px),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ScenarioError::ValidationError(format!("{} must not be negative", name)));
            }
        }

        let [lo, hi] = t.waypoint_timeout_jitter;
        if !(lo > 0.0 && lo <= hi) {
            return Err(ScenarioError::ValidationError(
                "waypoint_timeout_jitter must be [lo, hi] with 0 < lo <= hi".to_string(),
            ));
        }

        Ok(())
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== セッション設定 ===");
        println!("フレーム間隔: {:.4}秒 ({:.1}Hz)", self.sim.frame_dt_s, 1.0 / self.sim.frame_dt_s);
        println!("セッション長: {:.1}秒", self.sim.duration_s);
        println!("シード値: {}", self.sim.seed);
        println!("実時間実行: {}", if self.sim.realtime { "はい" } else { "いいえ" });
        println!();

        println!("=== ステージ ===");
        println!("境界: {:.0}×{:.0}px", self.stage.boundary.width_px, self.stage.boundary.height_px);
        println!("要素: {:.0}×{:.0}px", self.stage.footprint.width_px, self.stage.footprint.height_px);
        match &self.stage.title {
            Some(title) => println!(
                "タイトル: ({:.0}, {:.0}) {:.0}×{:.0}px",
                title.x_px, title.y_px, title.width_px, title.height_px
            ),
            None => println!("タイトル: なし（境界中央に配置）"),
        }
        println!();

        println!("=== 運動パラメータ ===");
        println!("巡航速度: {:.1}px/s", self.tuning.cruise_speed_pxps);
        println!("最大旋回レート: {:.2}rad/s", self.tuning.max_turn_rate_rad_s);
        println!("自動起動: {:.1}秒後 / 加速: {:.2}秒", self.tuning.launch_delay_s, self.tuning.accel_duration_s);
        println!();

        println!("=== ホストイベント ===");
        println!("イベント数: {}", self.events.len());
        for event in &self.events {
            println!("  {:>6.2}秒: {:?}", event.at_s, event.kind);
        }
    }
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    IoError(PathBuf, #[source] std::io::Error),
    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] serde_yaml::Error),
    #[error("設定検証エラー: {0}")]
    ValidationError(String),
}
