//! 수동 영역 재인식.
//!
//! 화면 선택 사각형 → 원본 픽셀 크롭 → 영역 OCR → 문장 정제 → 문장마다 수동 후보.

use std::sync::Arc;

use tracing::{debug, info};

use pagequote_core::error::CoreError;
use pagequote_core::models::candidate::Candidate;
use pagequote_core::models::geometry::{DisplayRect, DisplaySize, ImageSize};
use pagequote_core::ports::image_cropper::ImageCropper;
use pagequote_core::ports::ocr_provider::OcrProvider;
use pagequote_text::SentenceSegmenter;

/// 영역 재인식 요청
#[derive(Debug, Clone, Copy)]
pub struct RegionRequest<'a> {
    pub image_id: &'a str,
    pub image: &'a [u8],
    pub image_format: &'a str,
    /// 화면 좌표 선택 사각형
    pub selection: DisplayRect,
    /// 원본 이미지 크기
    pub image_size: ImageSize,
    /// 선택 당시 화면 표시 크기
    pub display_size: DisplaySize,
}

/// 선택 영역 → 수동 후보 추출기
#[derive(Clone)]
pub struct RegionExtractor {
    ocr: Arc<dyn OcrProvider>,
    cropper: Arc<dyn ImageCropper>,
    segmenter: SentenceSegmenter,
    min_selection_px: f64,
}

impl RegionExtractor {
    pub fn new(
        ocr: Arc<dyn OcrProvider>,
        cropper: Arc<dyn ImageCropper>,
        segmenter: SentenceSegmenter,
        min_selection_px: f64,
    ) -> Self {
        Self {
            ocr,
            cropper,
            segmenter,
            min_selection_px,
        }
    }

    /// 선택 영역 재인식 → 문장마다 새 id의 수동 후보 (인식 순서 유지)
    ///
    /// - 한 축이라도 최소 크기 미만이면 `SelectionTooSmall` (협력자 호출 없음)
    /// - 이미지 경계로 잘린 영역이 비면 `EmptyCropResult` (협력자 호출 없음)
    /// - 정제 후 남는 문장이 없으면 `EmptyCropResult`
    pub async fn extract(&self, request: RegionRequest<'_>) -> Result<Vec<Candidate>, CoreError> {
        let selection = request.selection;
        if !selection.meets_minimum(self.min_selection_px) {
            debug!(selection = %selection, min = self.min_selection_px, "선택 영역 최소 크기 미달");
            return Err(CoreError::SelectionTooSmall {
                width: selection.width,
                height: selection.height,
                min: self.min_selection_px,
            });
        }

        let region = selection.to_crop_region(request.image_size, request.display_size)?;
        if region.is_empty() {
            return Err(CoreError::EmptyCropResult);
        }

        let cropped = self
            .cropper
            .crop(request.image, request.image_format, &region)
            .await?;
        let text = self
            .ocr
            .recognize_text(&cropped, self.cropper.output_format())
            .await?;

        let sentences = self.segmenter.process_ocr_text(&text);
        if sentences.is_empty() {
            debug!(image_id = request.image_id, "영역 재인식 결과 없음");
            return Err(CoreError::EmptyCropResult);
        }

        info!(
            image_id = request.image_id,
            provider = self.ocr.provider_name(),
            sentences = sentences.len(),
            "영역 재인식 완료: {}x{} at ({}, {})",
            region.width,
            region.height,
            region.x,
            region.y
        );
        let source_box = region.as_rect();
        Ok(sentences
            .into_iter()
            .map(|sentence| Candidate::manual(request.image_id, sentence, source_box))
            .collect())
    }
}
