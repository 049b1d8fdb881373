//! 이미지 배치 추출.
//!
//! 이미지마다 구조화 OCR → 정규화를 수행한다. 동시 처리 수는 `max_concurrency`로
//! 제한하고(기본 1 = 순차), 결과는 완료 순서와 무관하게 입력 순서로 모은다.
//! 한 이미지의 실패는 그 이미지의 후보만 비울 뿐 배치를 멈추지 않는다.
//!
//! OCR 호출 도중 이미지가 배치에서 빠질 수 있으므로, 결과를 합치기 전에
//! [`BatchMembership`]으로 소속을 다시 확인하고 빠진 이미지의 결과는 버린다.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use pagequote_core::error::CoreError;
use pagequote_core::models::candidate::Candidate;
use pagequote_core::ports::ocr_provider::OcrProvider;
use pagequote_text::ExtractionNormalizer;

// ============================================================
// 입력 / 소속
// ============================================================

/// 배치에 들어간 페이지 이미지
#[derive(Debug, Clone, PartialEq)]
pub struct BatchImage {
    pub id: String,
    pub bytes: Arc<[u8]>,
    /// 이미지 형식 ("png", "jpeg" 등)
    pub format: String,
}

impl BatchImage {
    pub fn new(id: impl Into<String>, bytes: impl Into<Arc<[u8]>>, format: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bytes: bytes.into(),
            format: format.into(),
        }
    }
}

/// 현재 배치 소속 이미지 id 집합 (복제해도 같은 집합을 공유)
///
/// OCR 호출이 진행 중인 동안 다른 흐름에서 이미지를 빼는 데 쓴다.
#[derive(Debug, Clone, Default)]
pub struct BatchMembership {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl BatchMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// 추가 → 새로 들어갔는지 여부
    pub fn insert(&self, image_id: impl Into<String>) -> bool {
        self.inner.write().insert(image_id.into())
    }

    /// 제거 → 소속이었는지 여부
    pub fn remove(&self, image_id: &str) -> bool {
        self.inner.write().remove(image_id)
    }

    pub fn contains(&self, image_id: &str) -> bool {
        self.inner.read().contains(image_id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

// ============================================================
// 진행 / 결과
// ============================================================

/// 이미지 하나 처리 후 진행 상황
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// 처리 완료된 이미지 수 (이번 이미지 포함)
    pub completed: usize,
    pub total: usize,
    pub image_id: String,
}

/// 이미지 한 장의 처리 결과
#[derive(Debug, Clone, PartialEq)]
pub enum ImageStatus {
    /// 후보 추출 완료 (`fallback`: 구조화 해석 실패로 원문을 문단 하나로 사용)
    Extracted { candidates: usize, fallback: bool },
    /// OCR 호출 실패 → 후보 없음
    Failed { error: String, recoverable: bool },
    /// 처리 중 배치에서 빠져 결과를 버림
    Discarded,
}

/// 이미지별 결과 항목
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOutcome {
    pub image_id: String,
    pub status: ImageStatus,
    pub page_number: Option<u32>,
    pub book_title: Option<String>,
}

impl ImageOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, ImageStatus::Failed { .. })
    }

    fn bare(image_id: &str, status: ImageStatus) -> Self {
        Self {
            image_id: image_id.to_string(),
            status,
            page_number: None,
            book_title: None,
        }
    }
}

/// 배치 처리 보고서 (이미지 입력 순서)
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<ImageOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn discarded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == ImageStatus::Discarded)
            .count()
    }

    pub fn candidate_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                ImageStatus::Extracted { candidates, .. } => candidates,
                _ => 0,
            })
            .sum()
    }

    /// 배치당 한 번만 보여줄 실패 안내 (실패가 없으면 `None`)
    pub fn failure_notice(&self) -> Option<String> {
        let failed = self.failed_count();
        if failed == 0 {
            return None;
        }
        let total = self.outcomes.len() - self.discarded_count();
        Some(format!(
            "이미지 {}장 중 {}장에서 텍스트를 인식하지 못했습니다. 해당 이미지는 후보 없이 건너뜁니다.",
            total, failed
        ))
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// 배치 실행 결과 (후보는 이미지 입력 순서, 이미지 안에서는 정규화 순서)
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub report: BatchReport,
    pub candidates: Vec<Candidate>,
}

// ============================================================
// BatchExtractor
// ============================================================

/// 구조화 OCR + 정규화 배치 실행기
#[derive(Clone)]
pub struct BatchExtractor {
    ocr: Arc<dyn OcrProvider>,
    normalizer: ExtractionNormalizer,
    max_concurrency: usize,
}

impl BatchExtractor {
    pub fn new(
        ocr: Arc<dyn OcrProvider>,
        normalizer: ExtractionNormalizer,
        max_concurrency: usize,
    ) -> Self {
        Self {
            ocr,
            normalizer,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// 배치 실행
    ///
    /// `progress`는 이미지마다 입력 순서로 한 번씩 호출된다.
    pub async fn run<F>(
        &self,
        images: &[BatchImage],
        membership: &BatchMembership,
        mut progress: F,
    ) -> BatchRun
    where
        F: FnMut(&BatchProgress),
    {
        let started_at = Utc::now();
        let total = images.len();
        info!(
            total,
            concurrency = self.max_concurrency,
            provider = self.ocr.provider_name(),
            "배치 추출 시작"
        );

        let mut results = stream::iter(images)
            .map(|image| self.extract_one(image, membership))
            .buffered(self.max_concurrency);

        let mut outcomes = Vec::with_capacity(total);
        let mut candidates = Vec::new();
        while let Some((outcome, extracted)) = results.next().await {
            candidates.extend(extracted);
            progress(&BatchProgress {
                completed: outcomes.len() + 1,
                total,
                image_id: outcome.image_id.clone(),
            });
            outcomes.push(outcome);
        }

        let report = BatchReport {
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            total,
            candidates = candidates.len(),
            failed = report.failed_count(),
            discarded = report.discarded_count(),
            elapsed_ms = report.elapsed().num_milliseconds(),
            "배치 추출 완료"
        );
        BatchRun { report, candidates }
    }

    async fn extract_one(
        &self,
        image: &BatchImage,
        membership: &BatchMembership,
    ) -> (ImageOutcome, Vec<Candidate>) {
        let image_id = image.id.as_str();
        // 시작 전에 빠진 이미지는 호출하지 않음
        if !membership.contains(image_id) {
            debug!(image_id, "배치에서 빠진 이미지, 건너뜀");
            return (ImageOutcome::bare(image_id, ImageStatus::Discarded), Vec::new());
        }

        let result = self.ocr.recognize_structured(&image.bytes, &image.format).await;

        // 호출 중 빠졌으면 결과 폐기
        if !membership.contains(image_id) {
            debug!(image_id, "OCR 완료 전 배치에서 제거됨, 결과 폐기");
            return (ImageOutcome::bare(image_id, ImageStatus::Discarded), Vec::new());
        }

        match result {
            Ok(parsed) => {
                let candidates = self.normalizer.normalize(image_id, &parsed);
                debug!(image_id, count = candidates.len(), "이미지 후보 추출");
                let outcome = ImageOutcome {
                    image_id: image_id.to_string(),
                    status: ImageStatus::Extracted {
                        candidates: candidates.len(),
                        fallback: parsed.is_fallback(),
                    },
                    page_number: parsed.page_number(),
                    book_title: parsed.book_title().map(String::from),
                };
                (outcome, candidates)
            }
            Err(e) => {
                warn!(image_id, error = %e, "이미지 OCR 실패, 후보 없이 계속");
                (ImageOutcome::bare(image_id, failed_status(&e)), Vec::new())
            }
        }
    }
}

fn failed_status(error: &CoreError) -> ImageStatus {
    ImageStatus::Failed {
        error: error.to_string(),
        recoverable: error.is_recoverable(),
    }
}
