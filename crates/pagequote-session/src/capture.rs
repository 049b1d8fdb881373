//! 캡처 세션.
//!
//! 이미지 배치, 후보 집합, 수동 선택 세션(최대 하나)을 소유한다.
//! 저장이 끝나거나 `reset`하면 전부 비운다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use pagequote_core::config::AppConfig;
use pagequote_core::error::CoreError;
use pagequote_core::models::candidate::Candidate;
use pagequote_core::ports::image_cropper::ImageCropper;
use pagequote_core::ports::ocr_provider::OcrProvider;
use pagequote_core::ports::quote_sink::QuoteSink;
use pagequote_text::{ExtractionNormalizer, SentenceSegmenter};
use pagequote_vision::crop::image_size;
use pagequote_vision::region::{RegionExtractor, RegionRequest};
use pagequote_vision::selection::{SelectionSession, TextLineLayer};

use crate::batch::{BatchExtractor, BatchImage, BatchMembership, BatchProgress, BatchReport, ImageStatus};
use crate::candidate_set::{CandidateGroup, CandidateSet};

/// 캡처 흐름 한 번의 상태
pub struct CaptureSession {
    ocr: Arc<dyn OcrProvider>,
    batch: BatchExtractor,
    region: RegionExtractor,
    display_width: f64,
    images: Vec<BatchImage>,
    membership: BatchMembership,
    /// 배치 처리를 마친 이미지
    processed: HashSet<String>,
    page_numbers: HashMap<String, u32>,
    candidates: CandidateSet,
    selection: Option<SelectionSession>,
}

impl CaptureSession {
    pub fn new(
        config: &AppConfig,
        ocr: Arc<dyn OcrProvider>,
        cropper: Arc<dyn ImageCropper>,
    ) -> Self {
        let segmenter = SentenceSegmenter::new(config.segmenter.min_sentence_chars);
        let normalizer = ExtractionNormalizer::new(config.extraction.clone(), segmenter);
        let batch = BatchExtractor::new(ocr.clone(), normalizer, config.batch.max_concurrency);
        let region = RegionExtractor::new(
            ocr.clone(),
            cropper,
            segmenter,
            config.selection.min_selection_px,
        );

        Self {
            ocr,
            batch,
            region,
            display_width: config.selection.display_width,
            images: Vec::new(),
            membership: BatchMembership::new(),
            processed: HashSet::new(),
            page_numbers: HashMap::new(),
            candidates: CandidateSet::new(),
            selection: None,
        }
    }

    // ── 배치 ──

    /// 이미지 추가 (id 중복 불가)
    pub fn add_image(&mut self, image: BatchImage) -> Result<(), CoreError> {
        if image.id.trim().is_empty() {
            return Err(CoreError::Validation {
                field: "image_id".to_string(),
                message: "이미지 id가 비어 있음".to_string(),
            });
        }
        if self.images.iter().any(|i| i.id == image.id) {
            return Err(CoreError::Validation {
                field: "image_id".to_string(),
                message: format!("이미 추가된 이미지: {}", image.id),
            });
        }
        self.membership.insert(image.id.clone());
        debug!(image_id = %image.id, size = image.bytes.len(), "이미지 추가");
        self.images.push(image);
        Ok(())
    }

    /// 이미지 제거 (후보, 페이지 번호, 열린 선택 세션 포함) → 있었는지 여부
    ///
    /// 진행 중인 OCR 호출은 끝까지 기다리되 결과는 버려진다.
    pub fn remove_image(&mut self, image_id: &str) -> bool {
        self.membership.remove(image_id);
        let before = self.images.len();
        self.images.retain(|i| i.id != image_id);
        let existed = self.images.len() != before;

        self.processed.remove(image_id);
        self.page_numbers.remove(image_id);
        let removed = self.candidates.remove_image(image_id);
        if self
            .selection
            .as_ref()
            .is_some_and(|s| s.image_id() == image_id)
        {
            self.selection = None;
        }
        if existed {
            info!(image_id, candidates = removed, "이미지 제거");
        }
        existed
    }

    pub fn images(&self) -> &[BatchImage] {
        &self.images
    }

    /// 다른 흐름에서 이미지를 배치에서 빼는 핸들
    pub fn membership(&self) -> BatchMembership {
        self.membership.clone()
    }

    /// 아직 처리하지 않은 이미지 배치 실행 → 보고서
    ///
    /// 후보는 이미지 입력 순서로 후보 집합 뒤에 붙는다.
    pub async fn process_batch<F>(&mut self, progress: F) -> BatchReport
    where
        F: FnMut(&BatchProgress),
    {
        let pending: Vec<BatchImage> = self
            .images
            .iter()
            .filter(|i| !self.processed.contains(&i.id))
            .cloned()
            .collect();

        let run = self.batch.run(&pending, &self.membership, progress).await;

        // 핸들로 빠진 이미지 정리
        let membership = &self.membership;
        self.images.retain(|i| membership.contains(&i.id));

        for outcome in &run.report.outcomes {
            match outcome.status {
                ImageStatus::Extracted { .. } => {
                    self.processed.insert(outcome.image_id.clone());
                    if let Some(page) = outcome.page_number {
                        self.page_numbers.insert(outcome.image_id.clone(), page);
                    }
                }
                // 실패 이미지는 다음 배치에서 다시 시도
                ImageStatus::Failed { .. } | ImageStatus::Discarded => {}
            }
        }
        self.candidates.add_candidates(run.candidates);

        if let Some(notice) = run.report.failure_notice() {
            warn!("{notice}");
        }
        run.report
    }

    // ── 후보 ──

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut CandidateSet {
        &mut self.candidates
    }

    /// 이미지 입력 순서 기준 후보 그룹
    ///
    /// 재시도로 늦게 들어온 이미지의 후보도 원래 자리에 놓인다.
    pub fn grouped(&self) -> Vec<CandidateGroup<'_>> {
        self.candidates
            .group_by_image_ordered(self.images.iter().map(|i| i.id.as_str()))
    }

    pub fn page_number(&self, image_id: &str) -> Option<u32> {
        self.page_numbers.get(image_id).copied()
    }

    // ── 수동 선택 ──

    /// 이미지의 텍스트 줄을 인식해 선택 세션 열기 (기존 세션은 폐기)
    pub async fn open_selection(&mut self, image_id: &str) -> Result<&mut SelectionSession, CoreError> {
        self.selection = None;
        let image = self.find_image(image_id)?.clone();

        let size = image_size(&image.bytes)?;
        let lines = self.ocr.recognize_lines(&image.bytes, &image.format).await?;
        if !self.membership.contains(image_id) {
            debug!(image_id, "줄 인식 중 이미지가 제거됨");
            return Err(not_found_image(image_id));
        }

        debug!(image_id, lines = lines.len(), "선택 세션 시작");
        let layer = TextLineLayer::new(size, lines, self.display_width);
        Ok(self.selection.insert(SelectionSession::new(image_id, layer)))
    }

    pub fn selection(&self) -> Option<&SelectionSession> {
        self.selection.as_ref()
    }

    pub fn selection_mut(&mut self) -> Option<&mut SelectionSession> {
        self.selection.as_mut()
    }

    /// 표시 너비 변경 (열린 선택 세션의 화면 좌표도 다시 계산)
    pub fn set_display_width(&mut self, display_width: f64) {
        self.display_width = display_width;
        if let Some(selection) = self.selection.as_mut() {
            selection.rescale(display_width);
        }
    }

    /// 완료된 드래그 영역 재인식 → 문장별 새 후보를 후보 집합 뒤에 추가
    ///
    /// 같은 이미지의 기존 후보와 합치거나 대체하지 않는다.
    pub async fn extract_selection(&mut self) -> Result<Vec<Candidate>, CoreError> {
        let session = self.selection.as_mut().ok_or_else(|| CoreError::NotFound {
            resource_type: "selection".to_string(),
            id: "열린 선택 세션 없음".to_string(),
        })?;
        let selection = session.take_selection().ok_or_else(|| CoreError::Validation {
            field: "selection".to_string(),
            message: "완료된 선택 영역이 없음".to_string(),
        })?;
        let image_id = session.image_id().to_string();
        let layer = session.layer();
        let (size, display_size) = (layer.image_size(), layer.display_size());

        let image = self.find_image(&image_id)?.clone();
        let candidates = self
            .region
            .extract(RegionRequest {
                image_id: &image_id,
                image: &image.bytes,
                image_format: &image.format,
                selection,
                image_size: size,
                display_size,
            })
            .await?;

        if !self.membership.contains(&image_id) {
            debug!(image_id = %image_id, "재인식 중 이미지가 제거됨, 결과 폐기");
            return Err(not_found_image(&image_id));
        }
        self.candidates.add_candidates(candidates.iter().cloned());
        Ok(candidates)
    }

    pub fn close_selection(&mut self) {
        self.selection = None;
    }

    // ── 저장 / 초기화 ──

    /// 선택된 비어 있지 않은 후보를 저장소에 넘기고 세션을 비움 → 저장된 개수
    ///
    /// 저장 대상이 없으면 저장소를 호출하지 않는다. 저장 실패 시 상태는 그대로 남는다.
    pub async fn save(&mut self, sink: &dyn QuoteSink) -> Result<usize, CoreError> {
        let drafts = self.candidates.to_quote_drafts(&self.page_numbers);
        if drafts.is_empty() {
            debug!("저장할 후보 없음");
            return Ok(0);
        }

        let saved = sink.save(&drafts).await?;
        info!(count = saved, "인용 저장 완료");
        self.reset();
        Ok(saved)
    }

    /// 전체 초기화
    pub fn reset(&mut self) {
        self.images.clear();
        self.membership.clear();
        self.processed.clear();
        self.page_numbers.clear();
        self.candidates.remove_all();
        self.selection = None;
    }

    fn find_image(&self, image_id: &str) -> Result<&BatchImage, CoreError> {
        self.images
            .iter()
            .find(|i| i.id == image_id && self.membership.contains(image_id))
            .ok_or_else(|| not_found_image(image_id))
    }
}

fn not_found_image(image_id: &str) -> CoreError {
    CoreError::NotFound {
        resource_type: "image".to_string(),
        id: image_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pagequote_core::models::candidate::QuoteDraft;
    use pagequote_core::models::extraction::{ParsedExtraction, StructuredOcrResult};
    use pagequote_core::models::geometry::{CropRegion, DisplayPoint, PixelRect};
    use pagequote_core::models::text_line::RecognizedTextLine;

    struct FakeOcr;

    #[async_trait]
    impl OcrProvider for FakeOcr {
        async fn recognize_structured(
            &self,
            image: &[u8],
            _image_format: &str,
        ) -> Result<ParsedExtraction, CoreError> {
            if image.starts_with(b"broken") {
                return Err(CoreError::ServiceUnavailable("503".into()));
            }
            Ok(ParsedExtraction::Parsed(StructuredOcrResult {
                paragraphs: vec!["오늘 나는 인생은 짧다 라고 생각했다".to_string()],
                underlined_sentences: vec!["인생은 짧다".to_string()],
                book_title: None,
                page_number: Some(7),
            }))
        }

        async fn recognize_lines(
            &self,
            _image: &[u8],
            _image_format: &str,
        ) -> Result<Vec<RecognizedTextLine>, CoreError> {
            Ok(vec![RecognizedTextLine::new(
                "l1",
                "영역 안의 문장",
                PixelRect::new(10.0, 10.0, 80.0, 20.0),
            )])
        }

        async fn recognize_text(&self, _image: &[u8], _image_format: &str) -> Result<String, CoreError> {
            Ok("영역에서 다시 읽은 문장입니다.".to_string())
        }

        fn provider_name(&self) -> &str {
            "fake"
        }
    }

    struct PassthroughCropper;

    #[async_trait]
    impl ImageCropper for PassthroughCropper {
        async fn crop(
            &self,
            image: &[u8],
            _image_format: &str,
            _region: &CropRegion,
        ) -> Result<Vec<u8>, CoreError> {
            Ok(image.to_vec())
        }

        fn output_format(&self) -> &str {
            "png"
        }
    }

    #[derive(Default)]
    struct MemorySink {
        saved: Mutex<Vec<QuoteDraft>>,
    }

    #[async_trait]
    impl QuoteSink for MemorySink {
        async fn save(&self, quotes: &[QuoteDraft]) -> Result<usize, CoreError> {
            self.saved.lock().extend_from_slice(quotes);
            Ok(quotes.len())
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn session() -> CaptureSession {
        CaptureSession::new(
            &AppConfig::default_config(),
            Arc::new(FakeOcr),
            Arc::new(PassthroughCropper),
        )
    }

    #[tokio::test]
    async fn batch_populates_candidates_and_page_numbers() {
        let mut session = session();
        session.add_image(BatchImage::new("p1", png(100, 100), "png")).unwrap();
        session.add_image(BatchImage::new("p2", b"broken".to_vec(), "png")).unwrap();

        let report = session.process_batch(|_| {}).await;
        assert_eq!(report.failed_count(), 1);
        assert_eq!(session.candidates().len(), 2);
        assert_eq!(session.page_number("p1"), Some(7));

        let groups = session.candidates().group_by_image();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].candidates[0].is_underlined());

        // 처리된 이미지는 다시 처리하지 않고, 실패한 이미지만 재시도
        let report = session.process_batch(|_| {}).await;
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].image_id, "p2");
        assert_eq!(session.candidates().len(), 2);
    }

    /// 첫 호출만 실패하는 OCR (바이트가 `flaky`로 시작하는 이미지)
    #[derive(Default)]
    struct FailOnceOcr {
        failed: Mutex<HashSet<Vec<u8>>>,
    }

    #[async_trait]
    impl OcrProvider for FailOnceOcr {
        async fn recognize_structured(
            &self,
            image: &[u8],
            _image_format: &str,
        ) -> Result<ParsedExtraction, CoreError> {
            if image.starts_with(b"flaky") && self.failed.lock().insert(image.to_vec()) {
                return Err(CoreError::ServiceUnavailable("일시 장애".into()));
            }
            Ok(ParsedExtraction::Fallback {
                raw_text: format!("{} 페이지의 본문입니다", String::from_utf8_lossy(image)),
            })
        }

        async fn recognize_lines(
            &self,
            _image: &[u8],
            _image_format: &str,
        ) -> Result<Vec<RecognizedTextLine>, CoreError> {
            Ok(Vec::new())
        }

        fn provider_name(&self) -> &str {
            "fail-once"
        }
    }

    #[tokio::test]
    async fn retried_image_keeps_input_position() {
        let mut session = CaptureSession::new(
            &AppConfig::default_config(),
            Arc::new(FailOnceOcr::default()),
            Arc::new(PassthroughCropper),
        );
        session.add_image(BatchImage::new("p1", b"flaky-p1".to_vec(), "png")).unwrap();
        session.add_image(BatchImage::new("p2", b"p2".to_vec(), "png")).unwrap();

        let report = session.process_batch(|_| {}).await;
        assert_eq!(report.failed_count(), 1);
        let report = session.process_batch(|_| {}).await;
        assert_eq!(report.failed_count(), 0);
        assert_eq!(report.outcomes[0].image_id, "p1");

        let order: Vec<&str> = session.grouped().iter().map(|g| g.image_id).collect();
        assert_eq!(order, vec!["p1", "p2"]);
        assert_eq!(session.grouped()[0].candidates[0].content, "flaky-p1 페이지의 본문입니다");
    }

    #[tokio::test]
    async fn duplicate_or_empty_image_id_rejected() {
        let mut session = session();
        session.add_image(BatchImage::new("p1", png(10, 10), "png")).unwrap();
        assert!(session.add_image(BatchImage::new("p1", png(10, 10), "png")).is_err());
        assert!(session.add_image(BatchImage::new(" ", png(10, 10), "png")).is_err());
    }

    #[tokio::test]
    async fn remove_image_drops_candidates_and_selection() {
        let mut session = session();
        session.add_image(BatchImage::new("p1", png(100, 100), "png")).unwrap();
        session.process_batch(|_| {}).await;
        session.open_selection("p1").await.unwrap();

        assert!(session.remove_image("p1"));
        assert!(session.candidates().is_empty());
        assert!(session.selection().is_none());
        assert!(!session.membership().contains("p1"));
        assert!(!session.remove_image("p1"));
    }

    #[tokio::test]
    async fn manual_selection_appends_candidate() {
        let mut session = session();
        session.add_image(BatchImage::new("p1", png(720, 1000), "png")).unwrap();
        session.process_batch(|_| {}).await;

        // 720px 이미지 → 360px 표시 (배율 0.5)
        let selection = session.open_selection("p1").await.unwrap();
        assert_eq!(selection.layer().lines().len(), 1);
        selection.pointer_down(DisplayPoint::new(0.0, 0.0));
        selection.pointer_up(DisplayPoint::new(50.0, 40.0));
        assert!(selection.is_selected("l1"));

        let candidates = session.extract_selection().await.unwrap();
        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.content, "영역에서 다시 읽은 문장입니다.");
        assert_eq!(
            candidate.source_box(),
            Some(&PixelRect::new(0.0, 0.0, 100.0, 80.0))
        );
        assert_eq!(session.candidates().len(), 3);
        assert_eq!(session.candidates().iter().last().unwrap().id(), candidate.id());

        // 선택 영역은 소비됨
        assert!(matches!(
            session.extract_selection().await,
            Err(CoreError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn small_selection_rejected_without_adding() {
        let mut session = session();
        session.add_image(BatchImage::new("p1", png(720, 1000), "png")).unwrap();
        let selection = session.open_selection("p1").await.unwrap();
        selection.pointer_down(DisplayPoint::new(0.0, 0.0));
        selection.pointer_up(DisplayPoint::new(15.0, 30.0));

        assert!(matches!(
            session.extract_selection().await,
            Err(CoreError::SelectionTooSmall { .. })
        ));
        assert!(session.candidates().is_empty());
    }

    #[tokio::test]
    async fn extract_without_open_selection_is_error() {
        let mut session = session();
        assert!(matches!(
            session.extract_selection().await,
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            session.open_selection("없음").await,
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn save_hands_off_selected_and_resets() {
        let mut session = session();
        session.add_image(BatchImage::new("p1", png(100, 100), "png")).unwrap();
        session.process_batch(|_| {}).await;

        let sink = MemorySink::default();
        let saved = session.save(&sink).await.unwrap();
        assert_eq!(saved, 1);
        assert_eq!(
            sink.saved.lock().clone(),
            vec![QuoteDraft {
                content: "인생은 짧다".to_string(),
                image_id: "p1".to_string(),
                page_number: Some(7),
            }]
        );
        assert!(session.candidates().is_empty());
        assert!(session.images().is_empty());
        assert_eq!(session.save(&sink).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn display_width_change_rescales_open_selection() {
        let mut session = session();
        session.add_image(BatchImage::new("p1", png(720, 1000), "png")).unwrap();
        session.open_selection("p1").await.unwrap();

        session.set_display_width(720.0);
        let layer = session.selection().unwrap().layer();
        assert!((layer.scale().factor() - 1.0).abs() < f64::EPSILON);
    }
}
