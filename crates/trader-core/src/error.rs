//! 대시보드 공통 에러 타입.
//!
//! 이 모듈은 설정 로드와 도메인 값 파싱에서 사용하는 에러 타입을 정의합니다.
//! 네트워크/인증 경로의 에러는 `trader-exchange`의 `ExchangeError`가 담당합니다.

use thiserror::Error;

/// 핵심 도메인 에러.
#[derive(Debug, Error)]
pub enum TraderError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 데이터 에러
    #[error("데이터 에러: {0}")]
    Data(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type TraderResult<T> = Result<T, TraderError>;

impl TraderError {
    /// 시작 단계에서 프로세스를 중단해야 하는 에러인지 확인합니다.
    pub fn is_critical(&self) -> bool {
        matches!(self, TraderError::Config(_))
    }
}

impl From<serde_json::Error> for TraderError {
    fn from(err: serde_json::Error) -> Self {
        TraderError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for TraderError {
    fn from(err: config::ConfigError) -> Self {
        TraderError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_critical() {
        let config_err = TraderError::Config("missing redirect uri".to_string());
        assert!(config_err.is_critical());

        let input_err = TraderError::InvalidInput("granularity 7".to_string());
        assert!(!input_err.is_critical());
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let converted: TraderError = err.into();
        assert!(matches!(converted, TraderError::Serialization(_)));
    }
}
