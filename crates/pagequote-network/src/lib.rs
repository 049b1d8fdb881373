//! # pagequote-network
//!
//! 외부 AI 비전 API 네트워크 어댑터.
//! 페이지 이미지를 base64로 실어 보내고, 응답을 구조화 결과/텍스트 줄/평문으로 해석한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use pagequote_network::ai_ocr_client::RemoteOcrProvider;
//!
//! let provider = RemoteOcrProvider::new(&endpoint_config)?;
//! let parsed = provider.recognize_structured(&bytes, "jpeg").await?;
//! ```

pub mod ai_ocr_client;
