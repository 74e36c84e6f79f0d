use std::ops::{Add, Mul, Sub};

/// 2次元ベクトル（位置・方向・力の共通表現）
///
/// 座標系はヒーロー領域のローカル座標（左上原点、x右向き、y下向き、単位px）です。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64, // px
    pub y: f64, // px
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 角度（ラジアン）から単位ベクトルを作成
    pub fn from_angle(angle_rad: f64) -> Self {
        Self::new(angle_rad.cos(), angle_rad.sin())
    }

    /// ベクトルの長さ
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }

    /// 2点間の距離
    pub fn distance(&self, other: &Vec2) -> f64 {
        (*other - *self).magnitude()
    }

    /// ベクトルの向き（ラジアン、atan2）
    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// 正規化（長さ0の場合は除数1で割るため、そのまま零ベクトルを返す）
    pub fn normalize_or_zero(&self) -> Self {
        let mag = self.magnitude();
        let divisor = if mag > 0.0 { mag } else { 1.0 };
        Self::new(self.x / divisor, self.y / divisor)
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

/// ヒーロー領域（境界矩形）のサイズ
///
/// リサイズ・ロード時に再取得されます。幅・高さ0の退化した境界も許容し、
/// その場合要素は中央で静止します。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Boundary {
    pub width: f64,  // px
    pub height: f64, // px
}

impl Boundary {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// 境界の中心点
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// 全辺を`inset_x`/`inset_y`だけ内側に寄せた矩形
    ///
    /// 内側矩形が反転する（境界が小さすぎる）軸は中心線に潰れます。
    pub fn inset(&self, inset_x: f64, inset_y: f64) -> Rect {
        let center = self.center();
        let (min_x, max_x) = if self.width - 2.0 * inset_x >= 0.0 {
            (inset_x, self.width - inset_x)
        } else {
            (center.x, center.x)
        };
        let (min_y, max_y) = if self.height - 2.0 * inset_y >= 0.0 {
            (inset_y, self.height - inset_y)
        } else {
            (center.y, center.y)
        };
        Rect::new(min_x, min_y, max_x, max_y)
    }

    /// 要素の収容矩形（フットプリントの半分 + 端パディングだけ内側）
    pub fn containment(&self, footprint: &Footprint, edge_pad: f64) -> Rect {
        self.inset(
            footprint.width / 2.0 + edge_pad,
            footprint.height / 2.0 + edge_pad,
        )
    }
}

/// 軸平行矩形（min/max表現）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// 左上座標とサイズから作成
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// 点を矩形内にクランプ
    pub fn clamp_point(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(self.min_x, self.max_x),
            point.y.clamp(self.min_y, self.max_y),
        )
    }

    /// 点が矩形内（境界含む）かどうか
    pub fn contains(&self, point: &Vec2) -> bool {
        point.x >= self.min_x && point.x <= self.max_x &&
        point.y >= self.min_y && point.y <= self.max_y
    }
}

/// 要素の占有サイズ（フットプリント）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub width: f64,  // px
    pub height: f64, // px
}

impl Footprint {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn half(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// 要素へ適用する配置（平行移動 + 回転）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub translate_x: f64,  // px
    pub translate_y: f64,  // px
    pub rotation_deg: f64, // deg
}

impl Placement {
    /// 中心位置・進行方向から配置を計算
    ///
    /// 平行移動は左上基準（中心 − フットプリント/2）、回転は進行方向に
    /// 見た目合わせのオフセットを加えた角度です。
    pub fn from_pose(position: Vec2, heading_rad: f64, footprint: &Footprint, rotation_offset_deg: f64) -> Self {
        let origin = position - footprint.half();
        Self {
            translate_x: origin.x,
            translate_y: origin.y,
            rotation_deg: math_utils::rad_to_deg(heading_rad) + rotation_offset_deg,
        }
    }

    /// CSS transform文字列表現
    pub fn to_css_transform(&self) -> String {
        format!(
            "translate({:.2}px, {:.2}px) rotate({:.2}deg)",
            self.translate_x, self.translate_y, self.rotation_deg
        )
    }
}

/// 数学ユーティリティ関数
pub mod math_utils {
    use std::f64::consts::PI;

    /// ラジアンを度に変換
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * 180.0 / PI
    }

    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * PI / 180.0
    }

    /// [0, 1]へのクランプ
    pub fn clamp01(value: f64) -> f64 {
        value.clamp(0.0, 1.0)
    }

    /// スムーズステップ t²(3−2t)（t≤0で0、t≥1で1）
    pub fn smoothstep(t: f64) -> f64 {
        if t <= 0.0 {
            0.0
        } else if t >= 1.0 {
            1.0
        } else {
            t * t * (3.0 - 2.0 * t)
        }
    }

    /// 角度を(−π, π]の範囲に正規化
    pub fn normalize_angle(angle_rad: f64) -> f64 {
        if !angle_rad.is_finite() {
            return 0.0;
        }
        let two_pi = 2.0 * PI;
        let mut normalized = angle_rad % two_pi;
        if normalized > PI {
            normalized -= two_pi;
        } else if normalized <= -PI {
            normalized += two_pi;
        }
        normalized
    }

    /// `from`から`to`への最短符号付き角度差（(−π, π]）
    pub fn angle_difference(from_rad: f64, to_rad: f64) -> f64 {
        normalize_angle(to_rad - from_rad)
    }
}

#[cfg(test)]
mod tests {
    use super::math_utils::*;
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(-0.5), 0.0);
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(2.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_angle_range() {
        assert!((normalize_angle(PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((normalize_angle(7.0 * PI) - PI).abs() < 1e-9);
        assert_eq!(normalize_angle(f64::NAN), 0.0);
    }

    #[test]
    fn test_angle_difference_wraps_shortest_way() {
        let diff = angle_difference(PI - 0.1, -PI + 0.1);
        assert!((diff - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_containment_collapses_on_tiny_boundary() {
        let boundary = Boundary::new(40.0, 400.0);
        let rect = boundary.containment(&Footprint::new(64.0, 64.0), 2.0);
        assert_eq!(rect.min_x, 20.0);
        assert_eq!(rect.max_x, 20.0);
        assert_eq!(rect.min_y, 34.0);
        assert_eq!(rect.max_y, 366.0);
    }

    #[test]
    fn test_normalize_zero_vector_is_safe() {
        assert_eq!(Vec2::ZERO.normalize_or_zero(), Vec2::ZERO);
    }

    #[test]
    fn test_placement_from_pose() {
        let placement = Placement::from_pose(Vec2::new(100.0, 50.0), 0.0, &Footprint::new(40.0, 20.0), 45.0);
        assert_eq!(placement.translate_x, 80.0);
        assert_eq!(placement.translate_y, 40.0);
        assert_eq!(placement.rotation_deg, 45.0);
        assert_eq!(placement.to_css_transform(), "translate(80.00px, 40.00px) rotate(45.00deg)");
    }
}
