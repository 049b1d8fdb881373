//! `image` crate 기반 크롭 어댑터.
//!
//! 디코딩/인코딩은 CPU 바운드라 `spawn_blocking`에서 수행한다.

use std::io::Cursor;

use async_trait::async_trait;
use image::{GenericImageView, ImageFormat, ImageReader};
use tracing::debug;

use pagequote_core::error::CoreError;
use pagequote_core::models::geometry::{CropRegion, ImageSize};
use pagequote_core::ports::image_cropper::ImageCropper;

/// PNG로 출력하는 크롭 어댑터
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateCropper;

impl ImageCrateCropper {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageCropper for ImageCrateCropper {
    async fn crop(
        &self,
        image: &[u8],
        _image_format: &str,
        region: &CropRegion,
    ) -> Result<Vec<u8>, CoreError> {
        let data = image.to_vec();
        let region = *region;
        tokio::task::spawn_blocking(move || crop_image_bytes(&data, &region))
            .await
            .map_err(|e| CoreError::Internal(format!("크롭 작업 조인 실패: {e}")))?
    }

    fn output_format(&self) -> &str {
        "png"
    }
}

/// 이미지 바이트에서 영역을 잘라 PNG 바이트로 반환 (동기)
///
/// 영역은 실제 이미지 경계로 한 번 더 잘린다. 남는 영역이 없으면 `EmptyCropResult`.
pub fn crop_image_bytes(image: &[u8], region: &CropRegion) -> Result<Vec<u8>, CoreError> {
    let img = image::load_from_memory(image)
        .map_err(|e| CoreError::Image(format!("이미지 디코딩 실패: {e}")))?;
    let (img_w, img_h) = img.dimensions();

    let x = region.x.min(img_w);
    let y = region.y.min(img_h);
    let w = region.width.min(img_w - x);
    let h = region.height.min(img_h - y);
    if w == 0 || h == 0 {
        return Err(CoreError::EmptyCropResult);
    }

    debug!("크롭: 원본 {img_w}x{img_h} → {w}x{h} at ({x}, {y})");
    let cropped = img.crop_imm(x, y, w, h);

    let mut output = Cursor::new(Vec::new());
    cropped
        .write_to(&mut output, ImageFormat::Png)
        .map_err(|e| CoreError::Image(format!("이미지 인코딩 실패: {e}")))?;
    Ok(output.into_inner())
}

/// 헤더만 읽어 이미지 크기 확인
pub fn image_size(image: &[u8]) -> Result<ImageSize, CoreError> {
    let (width, height) = ImageReader::new(Cursor::new(image))
        .with_guessed_format()
        .map_err(|e| CoreError::Image(format!("이미지 형식 판별 실패: {e}")))?
        .into_dimensions()
        .map_err(|e| CoreError::Image(format!("이미지 크기 읽기 실패: {e}")))?;
    Ok(ImageSize::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn reads_image_size() {
        let size = image_size(&png(40, 30)).unwrap();
        assert_eq!(size, ImageSize::new(40, 30));
    }

    #[test]
    fn invalid_bytes_are_image_error() {
        assert!(matches!(image_size(b"not an image"), Err(CoreError::Image(_))));
        let region = CropRegion {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
        };
        assert!(matches!(
            crop_image_bytes(b"not an image", &region),
            Err(CoreError::Image(_))
        ));
    }

    #[test]
    fn crops_to_region_size() {
        let region = CropRegion {
            x: 10,
            y: 5,
            width: 20,
            height: 15,
        };
        let cropped = crop_image_bytes(&png(40, 30), &region).unwrap();
        let img = image::load_from_memory(&cropped).unwrap();
        assert_eq!(img.dimensions(), (20, 15));
        // 좌상단 픽셀은 원본 (10, 5)
        let pixel = img.to_rgba8().get_pixel(0, 0).0;
        assert_eq!(pixel, [10, 5, 128, 255]);
    }

    #[test]
    fn region_beyond_image_is_clamped() {
        let region = CropRegion {
            x: 30,
            y: 20,
            width: 100,
            height: 100,
        };
        let cropped = crop_image_bytes(&png(40, 30), &region).unwrap();
        let img = image::load_from_memory(&cropped).unwrap();
        assert_eq!(img.dimensions(), (10, 10));
    }

    #[test]
    fn region_outside_image_is_empty() {
        let region = CropRegion {
            x: 50,
            y: 0,
            width: 10,
            height: 10,
        };
        assert!(matches!(
            crop_image_bytes(&png(40, 30), &region),
            Err(CoreError::EmptyCropResult)
        ));
    }

    #[tokio::test]
    async fn async_crop_outputs_png() {
        let cropper = ImageCrateCropper::new();
        let region = CropRegion {
            x: 0,
            y: 0,
            width: 8,
            height: 8,
        };
        let bytes = cropper.crop(&png(16, 16), "png", &region).await.unwrap();
        assert_eq!(image_size(&bytes).unwrap(), ImageSize::new(8, 8));
        assert_eq!(cropper.output_format(), "png");
    }
}
