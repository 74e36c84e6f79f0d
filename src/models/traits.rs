use crate::models::common::*;

/// ヒーロー領域（ステージ）を提供するホストのインターフェース
///
/// ブラウザでいう「ヒーローコンテナ」「タイトル要素」「飛行要素」の
/// 計測値をまとめて提供します。
pub trait IStage {
    /// 境界矩形の取得（コンテナが存在しない場合はNone）
    fn boundary(&self) -> Option<Boundary>;

    /// 飛行要素のフットプリント取得（要素が存在しない場合はNone）
    fn footprint(&self) -> Option<Footprint>;

    /// タイトル要素の境界矩形（領域ローカル座標、存在しない場合はNone）
    fn anchor_rect(&self) -> Option<Rect>;
}

/// 飛行要素への出力インターフェース
pub trait IElementSink {
    /// 配置（平行移動 + 回転）の適用
    fn apply_placement(&mut self, placement: &Placement);

    /// 起動後スタイル（クラス）の切り替え
    fn set_launched(&mut self, launched: bool);

    /// ポインタ入力の受付可否
    fn set_interactive(&mut self, interactive: bool);
}

/// 操舵可能な要素のインターフェース
pub trait ISteerable {
    /// 現在位置（中心）の取得
    fn get_position(&self) -> Vec2;

    /// 現在の進行方向（ラジアン）の取得
    fn get_heading(&self) -> f64;

    /// 現在の配置の取得
    fn placement(&self) -> Placement;
}
