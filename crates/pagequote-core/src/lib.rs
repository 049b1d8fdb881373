//! # pagequote-core
//!
//! PageQuote 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 도메인 데이터 구조체 (좌표계 태그가 붙은 사각형, 텍스트 줄, 후보 문장)
//! - [`ports`]: Hexagonal Architecture 포트 인터페이스 (async_trait)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 파이프라인 설정 구조체
//! - [`config_manager`]: 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;

#[cfg(test)]
mod tests {
    use crate::models::candidate::Candidate;

    #[test]
    fn candidate_serde_roundtrip() {
        let candidate = Candidate::underlined("img_001", "인생은 짧다");

        let json = serde_json::to_string(&candidate).unwrap();
        let deserialized: Candidate = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.id(), candidate.id());
        assert_eq!(deserialized.content, "인생은 짧다");
        assert!(deserialized.is_underlined());
        assert!(deserialized.selected);
    }

    #[test]
    fn config_defaults() {
        let config = crate::config::AppConfig::default_config();
        assert_eq!(config.segmenter.min_sentence_chars, 5);
        assert_eq!(config.extraction.min_remainder_chars, 10);
        assert!((config.selection.min_selection_px - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.batch.max_concurrency, 1);
        assert!(config.ocr_api.is_none());
    }
}
