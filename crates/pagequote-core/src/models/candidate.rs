//! 인용 후보 문장 모델.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geometry::PixelRect;

/// 저장 여부를 사용자가 고르는 인용 후보
///
/// `id`는 생성 이벤트마다 새로 발급되며, 같은 텍스트를 다시 추출해도 재사용되지 않는다.
/// `is_underlined`는 출처 정보로서 생성 후 바뀌지 않는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    id: String,
    /// 사용자가 편집 가능한 본문
    pub content: String,
    image_id: String,
    /// 저장 대상 선택 여부
    pub selected: bool,
    is_underlined: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_box: Option<PixelRect>,
}

impl Candidate {
    fn create(
        image_id: impl Into<String>,
        content: impl Into<String>,
        selected: bool,
        is_underlined: bool,
        source_box: Option<PixelRect>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            image_id: image_id.into(),
            selected,
            is_underlined,
            source_box,
        }
    }

    /// 밑줄/강조 문장 후보 (기본 선택됨)
    pub fn underlined(image_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::create(image_id, content, true, true, None)
    }

    /// 일반 본문 후보
    pub fn paragraph(
        image_id: impl Into<String>,
        content: impl Into<String>,
        selected: bool,
    ) -> Self {
        Self::create(image_id, content, selected, false, None)
    }

    /// 수동 영역 선택 → 재인식으로 생긴 후보 (기본 선택됨)
    pub fn manual(
        image_id: impl Into<String>,
        content: impl Into<String>,
        source_box: PixelRect,
    ) -> Self {
        Self::create(image_id, content, true, false, Some(source_box))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn is_underlined(&self) -> bool {
        self.is_underlined
    }

    pub fn source_box(&self) -> Option<&PixelRect> {
        self.source_box.as_ref()
    }

    /// 저장 대상인지 (선택됨 + 공백 아닌 본문)
    pub fn is_savable(&self) -> bool {
        self.selected && !self.content.trim().is_empty()
    }
}

/// 저장소 협력자에게 넘기는 인용 형태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteDraft {
    pub content: String,
    pub image_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}
