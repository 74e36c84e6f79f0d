use crate::models::{
    common::{Boundary, Footprint, Placement, Rect},
    traits::{IElementSink, IStage},
};
use crate::scenario::StageConfig;
use tracing::{debug, trace};

/// シナリオで駆動されるステージ
///
/// ヒーロー領域・タイトル要素・飛行要素の計測値を保持し、
/// シナリオのリサイズやフォント読み込みイベントで値を書き換えます。
#[derive(Debug, Clone)]
pub struct ScriptedStage {
    boundary: Option<Boundary>,
    footprint: Option<Footprint>,
    anchor: Option<Rect>,
}

impl ScriptedStage {
    pub fn new(boundary: Option<Boundary>, footprint: Option<Footprint>, anchor: Option<Rect>) -> Self {
        Self {
            boundary,
            footprint,
            anchor,
        }
    }

    pub fn from_config(config: &StageConfig) -> Self {
        Self::new(
            Some(Boundary::new(config.boundary.width_px, config.boundary.height_px)),
            Some(Footprint::new(config.footprint.width_px, config.footprint.height_px)),
            config
                .title
                .map(|t| Rect::from_origin_size(t.x_px, t.y_px, t.width_px, t.height_px)),
        )
    }

    /// ビューポートのリサイズ
    ///
    /// タイトル要素はサイズを保ったまま、中心の相対位置を維持して移動します。
    pub fn resize(&mut self, width: f64, height: f64) {
        let new_boundary = Boundary::new(width, height);

        if let (Some(old), Some(anchor)) = (self.boundary, self.anchor) {
            let center = anchor.center();
            let rel_x = if old.width > 0.0 { center.x / old.width } else { 0.5 };
            let rel_y = if old.height > 0.0 { center.y / old.height } else { 0.5 };
            let new_center_x = rel_x * new_boundary.width;
            let new_center_y = rel_y * new_boundary.height;
            self.anchor = Some(Rect::from_origin_size(
                new_center_x - anchor.width() / 2.0,
                new_center_y - anchor.height() / 2.0,
                anchor.width(),
                anchor.height(),
            ));
        }

        self.boundary = Some(new_boundary);
        debug!(width, height, "STAGE_RESIZED: ステージサイズが変更されました");
    }

    /// タイトル要素を縦方向にずらす（フォント差し替えによるレイアウト変化）
    pub fn shift_anchor(&mut self, dy: f64) {
        if let Some(anchor) = self.anchor.as_mut() {
            anchor.min_y += dy;
            anchor.max_y += dy;
        }
    }
}

impl IStage for ScriptedStage {
    fn boundary(&self) -> Option<Boundary> {
        self.boundary
    }

    fn footprint(&self) -> Option<Footprint> {
        self.footprint
    }

    fn anchor_rect(&self) -> Option<Rect> {
        self.anchor
    }
}

/// 配置を記録する飛行要素
///
/// 実際の描画先の代わりに、最後の配置と各種切り替えの履歴を保持します。
#[derive(Debug, Clone)]
pub struct RecordingElement {
    pub last_placement: Option<Placement>,
    pub placement_count: u64,
    pub launched: bool,
    pub interactive: bool,
    /// (launched, interactive) の変化履歴
    pub toggles: Vec<(bool, bool)>,
}

impl RecordingElement {
    pub fn new() -> Self {
        Self {
            last_placement: None,
            placement_count: 0,
            launched: false,
            interactive: true,
            toggles: Vec::new(),
        }
    }
}

impl Default for RecordingElement {
    fn default() -> Self {
        Self::new()
    }
}

impl IElementSink for RecordingElement {
    fn apply_placement(&mut self, placement: &Placement) {
        self.last_placement = Some(*placement);
        self.placement_count += 1;
        trace!(transform = %placement.to_css_transform(), "ELEMENT_PLACEMENT");
    }

    fn set_launched(&mut self, launched: bool) {
        if self.launched != launched {
            self.launched = launched;
            self.toggles.push((self.launched, self.interactive));
        }
    }

    fn set_interactive(&mut self, interactive: bool) {
        if self.interactive != interactive {
            self.interactive = interactive;
            self.toggles.push((self.launched, self.interactive));
        }
    }
}
