//! # pagequote-session
//!
//! 캡처 흐름 한 번의 상태를 소유한다.
//! 전역 저장소 없이 `CaptureSession`이 후보 집합과 선택 세션을 생성자 주입으로 들고 있다가
//! 저장 또는 초기화 시 함께 폐기한다.
//!
//! - [`candidate_set`]: 후보 토글/편집/삭제, 이미지별 그룹
//! - [`batch`]: 이미지 배치 OCR, 진행 콜백, 배치 소속 확인, 배치 보고서
//! - [`capture`]: 배치 + 후보 집합 + 수동 선택을 묶는 세션

pub mod batch;
pub mod candidate_set;
pub mod capture;

pub use batch::{BatchExtractor, BatchImage, BatchMembership, BatchProgress, BatchReport};
pub use candidate_set::{CandidateGroup, CandidateSet};
pub use capture::CaptureSession;
