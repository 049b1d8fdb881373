//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! OCR 서비스, 이미지 크롭, 인용 저장소는 모두 외부 협력자이며
//! 어댑터 crate가 이 trait들을 구현하고 `pagequote-app`에서 `Arc<dyn T>`로 와이어링한다.
//!
//! 모든 async trait은 `async_trait` 매크로를 사용하여 object safety를 보장한다.

pub mod image_cropper;
pub mod ocr_provider;
pub mod quote_sink;
