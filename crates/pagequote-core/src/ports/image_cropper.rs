//! 이미지 크롭 포트.
//!
//! 수동 영역 재인식 전에 원본 이미지에서 크롭 영역만 잘라낸다.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::geometry::CropRegion;

/// 이미지 크롭: 재인식 입력 준비 전용
///
/// 구현체: `ImageCrateCropper` (`image` crate 기반)
#[async_trait]
pub trait ImageCropper: Send + Sync {
    /// 원본 이미지 바이트에서 `region`(픽셀 좌표)을 잘라 새 이미지 바이트로 반환
    ///
    /// 반환 형식은 [`ImageCropper::output_format`]을 따른다.
    async fn crop(
        &self,
        image: &[u8],
        image_format: &str,
        region: &CropRegion,
    ) -> Result<Vec<u8>, CoreError>;

    /// 크롭 결과 이미지 형식 (예: "png")
    fn output_format(&self) -> &str;
}
