//! 인용 저장소 포트.
//!
//! 캡처 흐름의 최종 산출물(선택된 후보)을 받는 저장 협력자.
//! 코어는 `QuoteDraft` 형태 외의 저장 스키마를 알지 못한다.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::candidate::QuoteDraft;

/// 인용 저장소
///
/// 구현체: `JsonFileQuoteSink` (pagequote 바이너리)
#[async_trait]
pub trait QuoteSink: Send + Sync {
    /// 인용 목록 저장 → 저장된 개수 반환
    async fn save(&self, quotes: &[QuoteDraft]) -> Result<usize, CoreError>;
}
