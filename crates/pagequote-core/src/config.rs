//! 파이프라인 설정 구조체.
//!
//! 문장 분리 임계값, 문단/밑줄 중복 처리 정책, 드래그 선택 최소 크기,
//! 배치 동시성, 외부 OCR API 엔드포인트 등 런타임 설정을 정의한다.
//! `ConfigManager`를 통해 JSON 파일에서 로드되고 CLI 인자로 덮어쓴다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 문장 분리 설정
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    /// 구조화 결과 정규화 설정
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// 드래그 선택/영역 재인식 설정
    #[serde(default)]
    pub selection: SelectionConfig,
    /// 배치 처리 설정
    #[serde(default)]
    pub batch: BatchConfig,
    /// 외부 OCR API 설정
    #[serde(default)]
    pub ocr_api: Option<ExternalApiEndpoint>,
}

// ============================================================
// 문장 분리 설정
// ============================================================

/// 문장 분리 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// 이보다 짧은 문장은 OCR 잡음(쪽 번호, 낱글자)으로 보고 버린다
    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_sentence_chars: default_min_sentence_chars(),
        }
    }
}

fn default_min_sentence_chars() -> usize {
    5
}

// ============================================================
// 정규화 설정
// ============================================================

/// 문단이 밑줄 문장과 겹칠 때의 처리 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// 겹치는 문단 전체를 건너뜀
    SkipParagraph,
    /// 겹치는 부분만 제거하고 남은 텍스트가 충분히 길면 유지
    #[default]
    StripRemainder,
}

/// 후보 단위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// 문단 단위 그대로
    #[default]
    Paragraph,
    /// 문단을 문장 단위로 분리
    Sentence,
}

/// 구조화 OCR 결과 정규화 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// 문단/밑줄 중복 처리 정책
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
    /// 후보 단위
    #[serde(default)]
    pub granularity: Granularity,
    /// `StripRemainder`에서 남은 텍스트를 유지할 최소 길이 (문자 수)
    #[serde(default = "default_min_remainder_chars")]
    pub min_remainder_chars: usize,
    /// 밑줄 없는 문단 후보를 기본 선택할지
    #[serde(default)]
    pub preselect_paragraphs: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            overlap_policy: OverlapPolicy::default(),
            granularity: Granularity::default(),
            min_remainder_chars: default_min_remainder_chars(),
            preselect_paragraphs: false,
        }
    }
}

fn default_min_remainder_chars() -> usize {
    10
}

// ============================================================
// 선택 설정
// ============================================================

/// 드래그 선택 / 영역 재인식 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// 크롭 요청 최소 크기 (화면 px, 두 축 모두 적용)
    #[serde(default = "default_min_selection_px")]
    pub min_selection_px: f64,
    /// 페이지 이미지 표시 너비 (높이는 비율로 파생)
    #[serde(default = "default_display_width")]
    pub display_width: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_selection_px: default_min_selection_px(),
            display_width: default_display_width(),
        }
    }
}

fn default_min_selection_px() -> f64 {
    20.0
}

fn default_display_width() -> f64 {
    360.0
}

// ============================================================
// 배치 설정
// ============================================================

/// 배치 OCR 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// 동시 OCR 호출 수 (1이면 순차 처리)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_max_concurrency() -> usize {
    1
}

// ============================================================
// AI API 제공자
// ============================================================

/// AI API 제공자 타입: 요청/응답 형식과 인증 헤더 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderType {
    /// Anthropic Claude API: `x-api-key` 헤더 + `/v1/messages` 형식
    Anthropic,
    /// OpenAI 호환 API: `Authorization: Bearer` 헤더 + `/v1/chat/completions` 형식
    OpenAi,
    /// 기타 제공자: Bearer 토큰, 범용 응답 파싱
    #[default]
    Generic,
}

/// 외부 AI API 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalApiEndpoint {
    /// API URL (예: "https://api.example.com/v1/messages")
    pub endpoint: String,
    /// API 키 (로컬 config.json에 직접 저장)
    #[serde(default)]
    pub api_key: String,
    /// 모델 이름
    pub model: Option<String>,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
    /// AI 제공자 타입
    #[serde(default)]
    pub provider_type: AiProviderType,
}

impl ExternalApiEndpoint {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_api_timeout_secs() -> u64 {
    60
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 설정값 유효성 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.segmenter.min_sentence_chars == 0 {
            return Err(invalid("segmenter.min_sentence_chars", "1 이상이어야 함"));
        }
        if self.selection.min_selection_px <= 0.0 {
            return Err(invalid("selection.min_selection_px", "양수여야 함"));
        }
        if self.selection.display_width <= 0.0 {
            return Err(invalid("selection.display_width", "양수여야 함"));
        }
        if self.batch.max_concurrency == 0 {
            return Err(invalid("batch.max_concurrency", "1 이상이어야 함"));
        }
        if let Some(api) = &self.ocr_api {
            if api.endpoint.trim().is_empty() {
                return Err(invalid("ocr_api.endpoint", "비어 있음"));
            }
            if api.timeout_secs == 0 {
                return Err(invalid("ocr_api.timeout_secs", "1 이상이어야 함"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> CoreError {
    CoreError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}
