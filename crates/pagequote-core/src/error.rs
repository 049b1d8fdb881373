//! PageQuote 핵심 에러 타입.
//!
//! 순수 함수(문장 분리, 정규화)는 에러를 반환하지 않는다.
//! 외부 협력자(OCR 호출, 이미지 크롭, 저장소) I/O만 복구 가능한 에러로 실패한다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패: {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Image", "Candidate")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// Rate Limit 초과 (429)
    #[error("요청 한도 초과, {retry_after_secs}초 후 재시도")]
    RateLimit {
        /// 재시도 대기 시간 (초)
        retry_after_secs: u64,
    },

    /// OCR 서비스 호출 실패
    #[error("OCR 서비스 불가: {0}")]
    ServiceUnavailable(String),

    /// 구조화 응답 파싱 실패
    #[error("OCR 응답 형식 오류: {0}")]
    MalformedResponse(String),

    /// 선택 영역이 최소 크기 미만 (협력자 호출 전 거부)
    #[error("선택 영역이 너무 작음: {width:.0}x{height:.0} (최소 {min:.0}px)")]
    SelectionTooSmall {
        /// 선택 너비 (화면 좌표)
        width: f64,
        /// 선택 높이 (화면 좌표)
        height: f64,
        /// 축별 최소 길이
        min: f64,
    },

    /// 선택 영역 재인식 결과 없음
    #[error("선택한 영역에서 텍스트를 찾지 못했습니다")]
    EmptyCropResult,

    /// 이미지 디코딩/인코딩 실패
    #[error("이미지 처리 에러: {0}")]
    Image(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 세션을 유지한 채 사용자에게 알리고 계속 진행할 수 있는 에러인지 여부
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CoreError::Config(_) | CoreError::Internal(_))
    }
}
