//! 구조화 OCR 응답 파서.
//!
//! 비전 모델은 JSON을 마크다운 코드 블록이나 설명 문장으로 감싸 돌려주는 일이 잦다.
//! 코드 블록/주변 텍스트를 벗겨 낸 뒤 각 필드의 배열 여부를 따로 검증하고,
//! JSON 자체가 깨졌으면 원문 전체를 `Fallback`으로 넘긴다.

use serde_json::{Map, Value};
use tracing::debug;

use pagequote_core::models::extraction::{ParsedExtraction, StructuredOcrResult};

const PARAGRAPH_KEYS: &[&str] = &["paragraphs"];
const UNDERLINE_KEYS: &[&str] = &["underlinedSentences", "underlined_sentences", "underlines"];
const TITLE_KEYS: &[&str] = &["bookTitle", "book_title"];
const PAGE_KEYS: &[&str] = &["pageNumber", "page_number", "page"];

/// OCR 서비스 응답 텍스트 → 태그된 해석 결과
pub fn parse_structured_response(raw: &str) -> ParsedExtraction {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return ParsedExtraction::Parsed(StructuredOcrResult::default());
    }

    let candidate = extract_json_object(body).unwrap_or(body);
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => ParsedExtraction::Parsed(from_object(&map)),
        Ok(other) => {
            debug!(kind = json_kind(&other), "구조화 응답이 객체가 아님, 원문 폴백");
            ParsedExtraction::Fallback {
                raw_text: body.to_string(),
            }
        }
        Err(e) => {
            debug!(error = %e, "구조화 응답 JSON 파싱 실패, 원문 폴백");
            ParsedExtraction::Fallback {
                raw_text: body.to_string(),
            }
        }
    }
}

fn from_object(map: &Map<String, Value>) -> StructuredOcrResult {
    StructuredOcrResult {
        paragraphs: string_array(map, PARAGRAPH_KEYS),
        underlined_sentences: string_array(map, UNDERLINE_KEYS),
        book_title: first_value(map, TITLE_KEYS)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from),
        page_number: first_value(map, PAGE_KEYS).and_then(page_number),
    }
}

fn first_value<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k)).filter(|v| !v.is_null())
}

/// 배열이 아니면 빈 목록. 배열 안의 문자열이 아닌 항목은 버린다.
fn string_array(map: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match first_value(map, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(other) => {
            debug!(keys = ?keys, kind = json_kind(other), "배열 아닌 필드 무시");
            Vec::new()
        }
        None => Vec::new(),
    }
}

fn page_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 마크다운 코드 블록으로 감싸져 있으면 안쪽만 반환
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // 언어 태그 줄 건너뛰기
    let inner = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    let inner = inner.trim_end();
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
