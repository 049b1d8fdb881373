//! 좌표계 태그가 붙은 기하 타입.
//!
//! 원본 이미지 픽셀 좌표(`PixelRect`)와 화면 표시 좌표(`DisplayRect`)는
//! 타입 수준에서 구분된다. 좌표계 간 변환은 이름 있는 변환 함수
//! (`PixelRect::to_display`, `DisplayRect::to_crop_region`)로만 가능하다.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================
// 좌표계 태그
// ============================================================

/// 좌표계 마커 trait
pub trait CoordinateSpace:
    Copy + Default + fmt::Debug + PartialEq + Send + Sync + 'static
{
    /// 로그/에러 메시지용 좌표계 이름
    const NAME: &'static str;
}

/// 원본 이미지 픽셀 좌표계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelSpace;

impl CoordinateSpace for PixelSpace {
    const NAME: &'static str = "pixel";
}

/// 화면 표시 좌표계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplaySpace;

impl CoordinateSpace for DisplaySpace {
    const NAME: &'static str = "display";
}

// ============================================================
// Rect
// ============================================================

/// 좌상단 기준 축 정렬 사각형
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Rect<S: CoordinateSpace> {
    /// 좌상단 X
    pub x: f64,
    /// 좌상단 Y
    pub y: f64,
    /// 너비
    pub width: f64,
    /// 높이
    pub height: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

/// 원본 이미지 픽셀 좌표 사각형
pub type PixelRect = Rect<PixelSpace>;

/// 화면 표시 좌표 사각형
pub type DisplayRect = Rect<DisplaySpace>;

impl<S: CoordinateSpace> Rect<S> {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            space: PhantomData,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// AABB 교차 판정 (경계 접촉 포함)
    pub fn intersects(&self, other: &Rect<S>) -> bool {
        !(self.right() < other.x
            || self.x > other.right()
            || self.bottom() < other.y
            || self.y > other.bottom())
    }

    /// `other`가 이 사각형 안에 완전히 포함되는지
    pub fn contains_rect(&self, other: &Rect<S>) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    fn scaled<T: CoordinateSpace>(&self, sx: f64, sy: f64) -> Rect<T> {
        Rect::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }
}

impl<S: CoordinateSpace> fmt::Display for Rect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({:.1}, {:.1}, {:.1}x{:.1})",
            S::NAME,
            self.x,
            self.y,
            self.width,
            self.height
        )
    }
}

impl PixelRect {
    /// 픽셀 좌표 → 화면 좌표 (균일 배율)
    pub fn to_display(&self, scale: DisplayScale) -> DisplayRect {
        self.scaled(scale.factor(), scale.factor())
    }
}

impl DisplayRect {
    /// 드래그 시작/끝 좌표로 정규화된 선택 사각형 생성
    ///
    /// 드래그 방향과 무관하게 너비/높이는 항상 0 이상이다.
    pub fn from_drag(start: DisplayPoint, end: DisplayPoint) -> Self {
        Self::new(
            start.x.min(end.x),
            start.y.min(end.y),
            (end.x - start.x).abs(),
            (end.y - start.y).abs(),
        )
    }

    /// 두 축 모두 `min` 이상인지
    pub fn meets_minimum(&self, min: f64) -> bool {
        self.width >= min && self.height >= min
    }

    /// 화면 선택 영역 → 원본 이미지 크롭 영역 (역배율, 정수 반올림)
    ///
    /// 결과는 이미지 경계 안으로 잘린다.
    pub fn to_crop_region(
        &self,
        image: ImageSize,
        display: DisplaySize,
    ) -> Result<CropRegion, CoreError> {
        if display.width <= 0.0 || display.height <= 0.0 {
            return Err(CoreError::Validation {
                field: "display_size".to_string(),
                message: format!("표시 크기는 양수여야 함: {}x{}", display.width, display.height),
            });
        }

        let sx = f64::from(image.width) / display.width;
        let sy = f64::from(image.height) / display.height;
        let pixel: PixelRect = self.scaled(sx, sy);

        let x = clamp_axis(pixel.x.round(), image.width);
        let y = clamp_axis(pixel.y.round(), image.height);
        let width = clamp_axis(pixel.width.round(), image.width - x);
        let height = clamp_axis(pixel.height.round(), image.height - y);

        Ok(CropRegion {
            x,
            y,
            width,
            height,
        })
    }
}

fn clamp_axis(value: f64, max: u32) -> u32 {
    if value <= 0.0 {
        0
    } else if value >= f64::from(max) {
        max
    } else {
        value as u32
    }
}

// ============================================================
// 점, 크기, 배율
// ============================================================

/// 화면 좌표의 포인터 위치
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
}

impl DisplayPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 원본 이미지 크기 (픽셀)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// 화면 표시 크기
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

/// 이미지 → 화면 균일 배율
///
/// 표시 너비가 고정되고 높이는 파생되므로 두 축에 같은 배율이 적용된다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    factor: f64,
}

impl DisplayScale {
    /// 표시 너비에 맞춘 배율 (`display_width / image_width`)
    pub fn fit_width(image: ImageSize, display_width: f64) -> Self {
        let factor = if image.width == 0 || display_width <= 0.0 {
            1.0
        } else {
            display_width / f64::from(image.width)
        };
        Self { factor }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// 배율 적용 후 화면 크기
    pub fn display_size(&self, image: ImageSize) -> DisplaySize {
        DisplaySize {
            width: f64::from(image.width) * self.factor,
            height: f64::from(image.height) * self.factor,
        }
    }
}

// ============================================================
// CropRegion
// ============================================================

/// 재인식용 원본 이미지 크롭 영역 (정수 픽셀, 저장하지 않음)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_rect(&self) -> PixelRect {
        PixelRect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.width),
            f64::from(self.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_drag_normalizes() {
        let rect = DisplayRect::from_drag(DisplayPoint::new(10.0, 10.0), DisplayPoint::new(5.0, 5.0));
        assert_eq!(rect, DisplayRect::new(5.0, 5.0, 5.0, 5.0));
    }

    #[test]
    fn intersects_touching_edges() {
        let a = DisplayRect::new(0.0, 0.0, 10.0, 10.0);
        let b = DisplayRect::new(10.0, 10.0, 5.0, 5.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn intersects_disjoint() {
        let a = DisplayRect::new(0.0, 0.0, 10.0, 10.0);
        let b = DisplayRect::new(10.5, 0.0, 5.0, 5.0);
        assert!(!a.intersects(&b));
        let c = DisplayRect::new(0.0, 20.0, 5.0, 5.0);
        assert!(!a.intersects(&c));
    }

    #[test]
    fn zero_area_point_far_from_box() {
        let line = DisplayRect::new(50.0, 50.0, 100.0, 20.0);
        let point = DisplayRect::from_drag(DisplayPoint::new(5.0, 5.0), DisplayPoint::new(5.0, 5.0));
        assert!(point.area().abs() < f64::EPSILON);
        assert!(!point.intersects(&line));
    }

    #[test]
    fn pixel_to_display_uniform_scale() {
        let image = ImageSize::new(1200, 1600);
        let scale = DisplayScale::fit_width(image, 300.0);
        assert!((scale.factor() - 0.25).abs() < f64::EPSILON);

        let line = PixelRect::new(400.0, 800.0, 200.0, 40.0);
        let shown = line.to_display(scale);
        assert_eq!(shown, DisplayRect::new(100.0, 200.0, 50.0, 10.0));

        let size = scale.display_size(image);
        assert!((size.height - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn crop_region_inverse_scale_rounds() {
        let image = ImageSize::new(1000, 2000);
        let display = DisplaySize {
            width: 300.0,
            height: 600.0,
        };
        let selection = DisplayRect::new(30.0, 60.0, 101.0, 50.0);
        let region = selection.to_crop_region(image, display).unwrap();

        assert_eq!(region.x, 100);
        assert_eq!(region.y, 200);
        // round(101 * 1000 / 300) = round(336.67)
        assert_eq!(region.width, 337);
        assert_eq!(region.height, 167);
    }

    #[test]
    fn crop_region_clamped_to_image() {
        let image = ImageSize::new(100, 100);
        let display = DisplaySize {
            width: 100.0,
            height: 100.0,
        };
        let selection = DisplayRect::new(80.0, 90.0, 50.0, 50.0);
        let region = selection.to_crop_region(image, display).unwrap();
        assert_eq!(region, CropRegion { x: 80, y: 90, width: 20, height: 10 });
    }

    #[test]
    fn crop_region_rejects_degenerate_display() {
        let selection = DisplayRect::new(0.0, 0.0, 30.0, 30.0);
        let display = DisplaySize {
            width: 0.0,
            height: 100.0,
        };
        assert!(selection
            .to_crop_region(ImageSize::new(100, 100), display)
            .is_err());
    }

    #[test]
    fn rect_serde_omits_space_tag() {
        let rect = PixelRect::new(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&rect).unwrap();
        assert_eq!(json, r#"{"x":1.0,"y":2.0,"width":3.0,"height":4.0}"#);
        let back: PixelRect = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rect);
    }

    #[test]
    fn display_format_names_space() {
        let rect = DisplayRect::new(1.0, 2.0, 3.0, 4.0);
        assert!(rect.to_string().starts_with("display("));
    }
}
