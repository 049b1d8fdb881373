//! PageQuote 도메인 모델.
//!
//! OCR 협력자와 주고받는 데이터, 화면/이미지 좌표계, 인용 후보 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod candidate;
pub mod extraction;
pub mod geometry;
pub mod text_line;
