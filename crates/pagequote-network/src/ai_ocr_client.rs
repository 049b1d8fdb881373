//! 외부 AI 비전 OCR 클라이언트.
//!
//! 외부 AI Vision API (Claude Vision, OpenAI 호환 등)를 호출하여
//! 책 페이지 사진에서 문단/밑줄 문장, 바운딩 박스가 있는 줄, 평문을 추출한다.
//! 응답 상태 코드는 `RateLimit`(429) / `ServiceUnavailable`(그 외)로,
//! 전송 실패는 `Network`로, 해석 불가 응답은 `MalformedResponse`로 매핑한다.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use pagequote_core::config::{AiProviderType, ExternalApiEndpoint};
use pagequote_core::error::CoreError;
use pagequote_core::models::extraction::ParsedExtraction;
use pagequote_core::models::geometry::PixelRect;
use pagequote_core::models::text_line::RecognizedTextLine;
use pagequote_core::ports::ocr_provider::OcrProvider;
use pagequote_text::parse_structured_response;

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// 429 응답에 Retry-After 헤더가 없을 때 대기 시간
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// 오류 응답 본문 로그/메시지 길이 제한
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

const STRUCTURED_PROMPT: &str = "이 이미지는 책의 한 페이지입니다. 본문을 문단 단위로 나누고, \
밑줄이나 형광펜으로 강조된 문장을 따로 모아 주세요. \
반드시 다음 JSON 형식으로만 답하세요: \
{\"paragraphs\": [\"...\"], \"underlinedSentences\": [\"...\"], \"bookTitle\": null, \"pageNumber\": null}";

const LINES_PROMPT: &str = "이미지에 보이는 텍스트를 줄 단위로 인식하고 각 줄의 픽셀 바운딩 박스를 알려 주세요. \
반드시 다음 JSON 형식으로만 답하세요: \
{\"lines\": [{\"text\": \"...\", \"x\": 0, \"y\": 0, \"width\": 0, \"height\": 0, \"confidence\": 1.0}]}";

const TEXT_PROMPT: &str =
    "이미지에 보이는 텍스트를 읽기 순서대로 그대로 옮겨 적어 주세요. 설명 없이 텍스트만 출력하세요.";

/// 요청 종류별 프롬프트/토큰 한도
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OcrTask {
    Structured,
    Lines,
    Text,
}

impl OcrTask {
    fn prompt(self) -> &'static str {
        match self {
            OcrTask::Structured => STRUCTURED_PROMPT,
            OcrTask::Lines => LINES_PROMPT,
            OcrTask::Text => TEXT_PROMPT,
        }
    }

    fn max_tokens(self) -> u32 {
        match self {
            OcrTask::Structured | OcrTask::Lines => 4096,
            OcrTask::Text => 2048,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            OcrTask::Structured => "structured",
            OcrTask::Lines => "lines",
            OcrTask::Text => "text",
        }
    }
}

// ============================================================
// RemoteOcrProvider: 외부 AI OCR API 클라이언트
// ============================================================

/// 외부 AI OCR API 클라이언트
///
/// 지원 API:
/// - Claude Vision (Anthropic): `POST /v1/messages` + image content block
/// - OpenAI 호환: `POST /v1/chat/completions` + `image_url` data URL
/// - 범용 엔드포인트: `{ "prompt", "image" }` 요청, `text` 필드 또는 JSON 본문 응답
#[derive(Debug)]
pub struct RemoteOcrProvider {
    http_client: reqwest::Client,
    endpoint: String,
    /// API 키 (메모리에만 유지)
    api_key: String,
    model: String,
    provider_type: AiProviderType,
    name: String,
}

impl RemoteOcrProvider {
    /// 새 RemoteOcrProvider 생성
    ///
    /// API 키가 비어 있으면 `Config` 에러.
    pub fn new(config: &ExternalApiEndpoint) -> Result<Self, CoreError> {
        if config.api_key.trim().is_empty() {
            return Err(CoreError::Config(
                "AI OCR API 키 미설정. 설정 파일의 ocr_api.api_key를 입력하세요.".into(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        let model = config.model.clone().unwrap_or_else(|| {
            match config.provider_type {
                AiProviderType::Anthropic => DEFAULT_ANTHROPIC_MODEL,
                AiProviderType::OpenAi | AiProviderType::Generic => DEFAULT_OPENAI_MODEL,
            }
            .to_string()
        });
        let name = match config.provider_type {
            AiProviderType::Anthropic => "remote-anthropic",
            AiProviderType::OpenAi => "remote-openai",
            AiProviderType::Generic => "remote-generic",
        }
        .to_string();

        debug!(
            endpoint = %config.endpoint,
            model = %model,
            timeout = config.timeout_secs,
            "RemoteOcrProvider 초기화"
        );

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model,
            provider_type: config.provider_type,
            name,
        })
    }

    /// 이미지 + 프롬프트 전송 → 모델 응답 텍스트
    async fn call(&self, image: &[u8], image_format: &str, task: OcrTask) -> Result<String, CoreError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let request_body = self.build_request(&encoded, media_type(image_format), task);

        debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            task = task.as_str(),
            image_size = image.len(),
            "외부 OCR API 호출"
        );

        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request_body);

        if self.provider_type == AiProviderType::Anthropic {
            builder = builder
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION);
        } else {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("OCR API 호출 실패: {}", e)))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::Network(format!("OCR API 응답 읽기 실패: {}", e)))?;

        if !status.is_success() {
            warn!(status = %status, task = task.as_str(), "OCR API 오류 응답");
            return Err(map_error_status(status.as_u16(), retry_after, &body));
        }

        let text = extract_assistant_text(self.provider_type, &body)?;
        debug!(task = task.as_str(), chars = text.chars().count(), "OCR 응답 수신");
        Ok(text)
    }

    fn build_request(&self, encoded: &str, media_type: &str, task: OcrTask) -> Value {
        match self.provider_type {
            AiProviderType::Anthropic => serde_json::json!({
                "model": self.model,
                "max_tokens": task.max_tokens(),
                "messages": [{
                    "role": "user",
                    "content": [
                        {
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": media_type,
                                "data": encoded
                            }
                        },
                        {
                            "type": "text",
                            "text": task.prompt()
                        }
                    ]
                }]
            }),
            AiProviderType::OpenAi => serde_json::json!({
                "model": self.model,
                "max_tokens": task.max_tokens(),
                "messages": [{
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": task.prompt()
                        },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:{};base64,{}", media_type, encoded)
                            }
                        }
                    ]
                }]
            }),
            AiProviderType::Generic => serde_json::json!({
                "model": self.model,
                "prompt": task.prompt(),
                "image": {
                    "media_type": media_type,
                    "data": encoded
                }
            }),
        }
    }
}

#[async_trait]
impl OcrProvider for RemoteOcrProvider {
    async fn recognize_structured(
        &self,
        image: &[u8],
        image_format: &str,
    ) -> Result<ParsedExtraction, CoreError> {
        let text = self.call(image, image_format, OcrTask::Structured).await?;
        let parsed = parse_structured_response(&text);
        if parsed.is_fallback() {
            warn!(provider = %self.name, "구조화 응답 해석 실패, 원문을 문단 하나로 사용");
        }
        Ok(parsed)
    }

    async fn recognize_lines(
        &self,
        image: &[u8],
        image_format: &str,
    ) -> Result<Vec<RecognizedTextLine>, CoreError> {
        let text = self.call(image, image_format, OcrTask::Lines).await?;
        let lines = parse_lines(&text)?;
        debug!(count = lines.len(), "텍스트 줄 인식 결과 수신");
        Ok(lines)
    }

    async fn recognize_text(&self, image: &[u8], image_format: &str) -> Result<String, CoreError> {
        let text = self.call(image, image_format, OcrTask::Text).await?;
        Ok(text.trim().to_string())
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}

fn media_type(image_format: &str) -> &'static str {
    match image_format.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpeg" | "jpg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/png",
    }
}

/// 실패 상태 코드 → 에러 (429만 `RateLimit`, 나머지는 `ServiceUnavailable`)
fn map_error_status(status: u16, retry_after: Option<u64>, body: &str) -> CoreError {
    match status {
        429 => CoreError::RateLimit {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        _ => CoreError::ServiceUnavailable(format!(
            "OCR API 오류 ({}): {}",
            status,
            body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect::<String>()
        )),
    }
}

/// 제공자별 응답 봉투에서 모델 출력 텍스트 추출
///
/// 범용 제공자는 평문 본문도 모델 출력으로 받는다.
fn extract_assistant_text(provider_type: AiProviderType, body: &str) -> Result<String, CoreError> {
    let response = serde_json::from_str::<Value>(body);

    match provider_type {
        // content[].text 블록 이어 붙이기
        AiProviderType::Anthropic => {
            let response = response.map_err(malformed_envelope)?;
            let blocks = response
                .get("content")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    CoreError::MalformedResponse("Claude 응답에 content 배열이 없음".to_string())
                })?;
            Ok(blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        // choices[0].message.content
        AiProviderType::OpenAi => response
            .map_err(malformed_envelope)?
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                CoreError::MalformedResponse("OpenAI 응답에서 텍스트를 찾을 수 없음".to_string())
            }),
        // `text` 필드가 있으면 그 값, 없으면 본문 자체 (JSON이 아니어도)
        AiProviderType::Generic => Ok(response
            .ok()
            .as_ref()
            .and_then(|r| r.get("text"))
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| body.trim().to_string())),
    }
}

fn malformed_envelope(e: serde_json::Error) -> CoreError {
    CoreError::MalformedResponse(format!("응답 JSON 파싱 실패: {}", e))
}

/// 줄 인식 응답 항목
#[derive(Debug, Deserialize)]
struct WireLine {
    #[serde(default)]
    id: Option<String>,
    text: String,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    #[serde(default)]
    confidence: Option<f64>,
}

/// 줄 인식 응답 → 텍스트 줄 목록
///
/// `{"lines": [...]}`, `{"results": [...]}`, 최상위 배열을 모두 받는다.
/// 필수 필드가 빠진 항목과 빈 텍스트 항목은 건너뛴다.
fn parse_lines(text: &str) -> Result<Vec<RecognizedTextLine>, CoreError> {
    let json = json_slice(text).ok_or_else(|| {
        CoreError::MalformedResponse(format!(
            "줄 인식 응답에 JSON 없음: {}",
            text.chars().take(ERROR_BODY_PREVIEW_CHARS).collect::<String>()
        ))
    })?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| CoreError::MalformedResponse(format!("줄 인식 응답 파싱 실패: {}", e)))?;

    let items = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("lines")
            .or_else(|| map.get("results"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    let mut lines = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let wire: WireLine = match serde_json::from_value(item.clone()) {
            Ok(wire) => wire,
            Err(e) => {
                debug!(index = idx, error = %e, "형식이 맞지 않는 줄 항목 무시");
                continue;
            }
        };
        let text = wire.text.trim();
        if text.is_empty() || wire.width < 0.0 || wire.height < 0.0 {
            continue;
        }
        let mut line = RecognizedTextLine::new(
            wire.id.unwrap_or_else(|| format!("line-{}", idx)),
            text,
            PixelRect::new(wire.x, wire.y, wire.width, wire.height),
        );
        if let Some(confidence) = wire.confidence {
            line.confidence = confidence.clamp(0.0, 1.0);
        }
        lines.push(line);
    }
    Ok(lines)
}

/// 응답 텍스트에서 JSON 객체/배열 부분만 잘라냄
fn json_slice(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (start < end).then(|| &text[start..=end])
}

// ============================================================
// 테스트
// ============================================================
