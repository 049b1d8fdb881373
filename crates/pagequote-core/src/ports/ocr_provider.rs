//! OCR 제공자 포트.
//!
//! 외부 OCR/비전 서비스를 추상화한다. 모든 호출은 네트워크, 할당량,
//! 파싱 문제로 실패할 수 있으며 호출 단위로 복구 가능한 실패로 취급된다.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::extraction::ParsedExtraction;
use crate::models::text_line::RecognizedTextLine;

/// OCR 제공자: 구조화 추출, 줄 단위 인식, 영역 재인식
///
/// 구현체: `RemoteOcrProvider` (Anthropic / OpenAI 호환 / 범용 엔드포인트)
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// 페이지 이미지 → 문단 + 밑줄 문장 (+ 책 제목, 페이지 번호)
    ///
    /// - `image`: 이미지 바이트
    /// - `image_format`: 이미지 형식 ("png", "jpeg" 등)
    async fn recognize_structured(
        &self,
        image: &[u8],
        image_format: &str,
    ) -> Result<ParsedExtraction, CoreError>;

    /// 페이지 이미지 → 바운딩 박스가 있는 텍스트 줄 목록
    async fn recognize_lines(
        &self,
        image: &[u8],
        image_format: &str,
    ) -> Result<Vec<RecognizedTextLine>, CoreError>;

    /// 크롭된 영역 이미지 → 평문 텍스트
    ///
    /// 기본 구현은 줄 인식 결과를 개행으로 이어 붙인다.
    async fn recognize_text(&self, image: &[u8], image_format: &str) -> Result<String, CoreError> {
        let lines = self.recognize_lines(image, image_format).await?;
        Ok(lines
            .into_iter()
            .map(|l| l.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// 제공자 이름 (예: "remote-anthropic", "remote-generic")
    fn provider_name(&self) -> &str;
}
