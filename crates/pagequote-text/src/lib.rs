//! # pagequote-text
//!
//! OCR 인식 텍스트를 저장 가능한 인용 후보로 바꾸는 순수 텍스트 처리 크레이트.
//! 모든 함수는 부작용이 없고, 빈 입력이나 깨진 입력에도 패닉/에러 없이 빈 결과를 돌려준다.
//!
//! - [`segmenter`]: 자유 형식 텍스트 → 문장 목록
//! - [`response`]: OCR 서비스 응답 텍스트 → `ParsedExtraction`
//! - [`normalizer`]: 문단 + 밑줄 문장 → 정렬/중복 제거된 후보 목록

pub mod normalizer;
pub mod response;
pub mod segmenter;

pub use normalizer::ExtractionNormalizer;
pub use response::parse_structured_response;
pub use segmenter::{clean_sentence, process_ocr_text, segment, SentenceSegmenter};
