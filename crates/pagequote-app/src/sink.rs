//! JSON 파일 인용 저장소.
//!
//! 저장 파일은 인용 레코드의 JSON 배열이다. 저장할 때마다 기존 배열 뒤에 덧붙인다.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use pagequote_core::error::CoreError;
use pagequote_core::models::candidate::QuoteDraft;
use pagequote_core::ports::quote_sink::QuoteSink;

/// 파일에 기록되는 인용 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuote {
    pub id: String,
    pub content: String,
    pub image_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub saved_at: DateTime<Utc>,
}

impl SavedQuote {
    fn from_draft(draft: &QuoteDraft, saved_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: draft.content.clone(),
            image_id: draft.image_id.clone(),
            page_number: draft.page_number,
            saved_at,
        }
    }
}

/// JSON 배열 파일에 인용을 덧붙이는 저장소
#[derive(Debug, Clone)]
pub struct JsonFileQuoteSink {
    path: PathBuf,
}

impl JsonFileQuoteSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 저장된 레코드 전체 (파일이 없으면 빈 목록)
    pub async fn load(&self) -> Result<Vec<SavedQuote>, CoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl QuoteSink for JsonFileQuoteSink {
    async fn save(&self, quotes: &[QuoteDraft]) -> Result<usize, CoreError> {
        let mut records = self.load().await?;
        let saved_at = Utc::now();
        records.extend(quotes.iter().map(|q| SavedQuote::from_draft(q, saved_at)));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(&self.path, content).await?;

        debug!(total = records.len(), "인용 파일 갱신");
        info!(count = quotes.len(), path = %self.path.display(), "인용 저장");
        Ok(quotes.len())
    }
}
