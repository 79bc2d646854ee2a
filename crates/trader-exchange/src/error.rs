//! 거래소 접근 계층 에러 타입.

use thiserror::Error;

/// 거래소 REST / OAuth 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 설정 누락 (예: 클라이언트 ID 없음) - 재시도하지 않음
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 네트워크/연결 에러 - 백오프 후 재시도
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 2xx가 아닌 HTTP 응답
    #[error("HTTP error {status}: {status_text}")]
    HttpStatus { status: u16, status_text: String },

    /// 재시도 횟수 소진
    #[error("Failed to fetch {url} after {retries} retries")]
    RetriesExhausted { url: String, retries: u32 },

    /// OAuth state 불일치 - 토큰 폐기
    #[error("Security error: {0}")]
    Security(String),

    /// 보호된 엔드포인트가 토큰을 거부함
    #[error("Token validation failed: {0}")]
    Validation(String),

    /// 인가 서버가 리다이렉트로 에러를 반환함
    #[error("Authorization denied: {error} ({description})")]
    AuthorizationDenied { error: String, description: String },

    /// 응답 형태가 예상과 다름
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// 로컬 세션 저장소 에러
    #[error("Storage error: {0}")]
    Storage(String),

    /// 로그인 필요
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 유효하지 않은 수량
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// 유효하지 않은 가격
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// 잔고 부족
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
}

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::NetworkError(_) => true,
            ExchangeError::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// 인증 경로 에러인지 확인 (사용자에게 표시하고 세션 상태를 바꾸는 에러).
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ExchangeError::Configuration(_)
                | ExchangeError::Security(_)
                | ExchangeError::Validation(_)
                | ExchangeError::AuthorizationDenied { .. }
                | ExchangeError::Unauthorized(_)
        )
    }

    /// 재시도하면 안 되는 치명적 에러인지 확인.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExchangeError::Configuration(_)
                | ExchangeError::Security(_)
                | ExchangeError::Validation(_)
                | ExchangeError::Unauthorized(_)
                | ExchangeError::InsufficientBalance(_)
                | ExchangeError::InvalidQuantity(_)
                | ExchangeError::InvalidPrice(_)
        )
    }

    /// HTTP 상태 코드를 반환합니다 (HTTP 에러인 경우).
    pub fn status(&self) -> Option<u16> {
        match self {
            ExchangeError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 재시도 대상 상태 코드인지 확인 (429 또는 5xx).
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ExchangeError::MalformedData(err.to_string())
        } else {
            ExchangeError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::MalformedData(err.to_string())
    }
}

impl From<std::io::Error> for ExchangeError {
    fn from(err: std::io::Error) -> Self {
        ExchangeError::Storage(err.to_string())
    }
}
