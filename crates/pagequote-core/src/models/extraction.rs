//! 구조화 OCR 결과 모델.

use serde::{Deserialize, Serialize};

/// 문단과 밑줄 문장으로 미리 나뉜 OCR 응답
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredOcrResult {
    /// 인식된 문단 목록
    #[serde(default)]
    pub paragraphs: Vec<String>,
    /// 밑줄/형광펜으로 강조된 문장 목록
    #[serde(default)]
    pub underlined_sentences: Vec<String>,
    /// 책 제목 (인식된 경우)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    /// 페이지 번호 (인식된 경우)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

/// 구조화 응답 해석 결과
///
/// 응답 필드 존재를 믿지 않고 파싱 성공/실패를 태그로 구분한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedExtraction {
    /// 구조화 JSON 파싱 성공
    Parsed(StructuredOcrResult),
    /// 파싱 실패: 원문 전체를 하나의 문단으로 취급
    Fallback {
        /// 서비스가 돌려준 원문
        raw_text: String,
    },
}

impl ParsedExtraction {
    pub fn page_number(&self) -> Option<u32> {
        match self {
            ParsedExtraction::Parsed(result) => result.page_number,
            ParsedExtraction::Fallback { .. } => None,
        }
    }

    pub fn book_title(&self) -> Option<&str> {
        match self {
            ParsedExtraction::Parsed(result) => result.book_title.as_deref(),
            ParsedExtraction::Fallback { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ParsedExtraction::Fallback { .. })
    }
}
