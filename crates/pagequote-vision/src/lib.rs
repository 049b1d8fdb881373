//! # pagequote-vision
//!
//! 사진 찍은 페이지 위에서의 수동 영역 선택을 담당한다.
//!
//! - [`selection`]: 텍스트 줄 화면 배율, 드래그 → AABB 교차 선택, 선택 세션 상태 머신
//! - [`region`]: 선택 사각형 → 크롭 → 재인식 → 새 후보
//! - [`crop`]: `image` crate 기반 `ImageCropper` 구현

pub mod crop;
pub mod region;
pub mod selection;
