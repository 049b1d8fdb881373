//! OCR 인식 텍스트 줄.

use serde::{Deserialize, Serialize};

use super::geometry::{DisplayRect, DisplayScale, PixelRect};

/// OCR 협력자가 반환한 텍스트 줄 (원본 이미지 픽셀 좌표, 생성 후 불변)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedTextLine {
    /// 줄 식별자
    pub id: String,
    /// 인식된 텍스트
    pub text: String,
    /// 바운딩 박스 (픽셀 좌표)
    pub bounds: PixelRect,
    /// 인식 신뢰도 (0.0 ~ 1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl RecognizedTextLine {
    pub fn new(id: impl Into<String>, text: impl Into<String>, bounds: PixelRect) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            bounds,
            confidence: default_confidence(),
        }
    }
}

/// 화면 배율이 적용된 텍스트 줄
///
/// `display_bounds`는 항상 `bounds * scale`이며 배율이 바뀔 때만 다시 계산된다.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledTextLine {
    line: RecognizedTextLine,
    display_bounds: DisplayRect,
}

impl ScaledTextLine {
    pub fn new(line: RecognizedTextLine, scale: DisplayScale) -> Self {
        let display_bounds = line.bounds.to_display(scale);
        Self {
            line,
            display_bounds,
        }
    }

    pub fn line(&self) -> &RecognizedTextLine {
        &self.line
    }

    pub fn display_bounds(&self) -> &DisplayRect {
        &self.display_bounds
    }

    /// 새 배율로 화면 좌표 재계산
    pub fn rescale(&mut self, scale: DisplayScale) {
        self.display_bounds = self.line.bounds.to_display(scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::geometry::ImageSize;

    #[test]
    fn scaled_line_tracks_scale() {
        let line = RecognizedTextLine::new("l1", "첫 줄", PixelRect::new(100.0, 40.0, 600.0, 30.0));
        let image = ImageSize::new(1000, 1400);

        let mut scaled = ScaledTextLine::new(line, DisplayScale::fit_width(image, 500.0));
        assert_eq!(*scaled.display_bounds(), DisplayRect::new(50.0, 20.0, 300.0, 15.0));

        scaled.rescale(DisplayScale::fit_width(image, 250.0));
        assert_eq!(*scaled.display_bounds(), DisplayRect::new(25.0, 10.0, 150.0, 7.5));
        assert_eq!(scaled.line().bounds, PixelRect::new(100.0, 40.0, 600.0, 30.0));
    }

    #[test]
    fn recognized_line_default_confidence() {
        let json = r#"{"id":"a","text":"문장","bounds":{"x":0.0,"y":0.0,"width":10.0,"height":5.0}}"#;
        let line: RecognizedTextLine = serde_json::from_str(json).unwrap();
        assert!((line.confidence - 1.0).abs() < f64::EPSILON);
    }
}
