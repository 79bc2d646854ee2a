//! 설정 관리.
//!
//! 기본값 → 설정 파일(선택) → 환경 변수 순으로 덮어써서 `AppConfig`를 만듭니다.
//! 시작 시 한 번 [`AppConfig::validate`]로 검증한 뒤 각 컴포넌트 생성자에 전달합니다.

use crate::error::{TraderError, TraderResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 클라이언트 ID 환경 변수.
pub const CLIENT_ID_ENV: &str = "COINBASE_CLIENT_ID";

/// 리다이렉트 URI 환경 변수.
pub const REDIRECT_URI_ENV: &str = "COINBASE_REDIRECT_URI";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 거래소 REST 설정
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// OAuth 설정
    #[serde(default)]
    pub oauth: OAuthConfig,
    /// 재시도 정책
    #[serde(default)]
    pub retry: RetryPolicyConfig,
    /// 폴링 설정
    #[serde(default)]
    pub polling: PollingConfig,
    /// 세션 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 거래소 공개 REST API 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// REST API 기본 URL
    pub rest_base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "https://api.exchange.coinbase.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ExchangeConfig {
    /// 요청 타임아웃을 Duration으로 반환합니다.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// OAuth implicit grant 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// 인가 엔드포인트
    pub authorize_url: String,
    /// 인증 API 기본 URL (토큰 검증, 잔고 조회)
    pub api_base_url: String,
    /// API 버전 헤더 값
    pub api_version: String,
    /// 클라이언트 ID (없으면 로그인 비활성화)
    #[serde(default)]
    pub client_id: Option<String>,
    /// 리다이렉트 URI
    pub redirect_uri: String,
    /// 요청 스코프
    pub scopes: Vec<String>,
    /// `account` 파라미터 (예: "all")
    #[serde(default)]
    pub account: Option<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorize_url: "https://www.coinbase.com/oauth/authorize".to_string(),
            api_base_url: "https://api.coinbase.com/v2".to_string(),
            api_version: "2023-01-01".to_string(),
            client_id: None,
            redirect_uri: "http://localhost:3000".to_string(),
            scopes: vec![
                "wallet:accounts:read".to_string(),
                "wallet:transactions:read".to_string(),
            ],
            account: None,
        }
    }
}

impl OAuthConfig {
    /// 로그인 가능 여부 (클라이언트 ID 설정 여부).
    pub fn login_enabled(&self) -> bool {
        self.client_id
            .as_deref()
            .map(|id| !id.trim().is_empty())
            .unwrap_or(false)
    }

    /// 스코프를 공백으로 이어 붙인 문자열을 반환합니다.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// 재시도 정책 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    /// 최대 시도 횟수
    pub max_retries: u32,
    /// 기본 백오프 (밀리초), n번째 재시도는 `backoff * n`
    pub backoff_ms: u64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 1000,
        }
    }
}

/// 폴링 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// 폴링 주기 (초)
    pub interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl PollingConfig {
    /// 폴링 주기를 Duration으로 반환합니다.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// 세션 저장소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 토큰과 state nonce를 저장하는 파일
    pub session_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_file: PathBuf::from(".trader/session.json"),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일(선택)과 환경 변수에서 설정을 로드합니다.
    ///
    /// `TRADER__OAUTH__CLIENT_ID`처럼 `TRADER` 접두사와 `__` 구분자로 덮어쓸 수 있고,
    /// `COINBASE_CLIENT_ID` / `COINBASE_REDIRECT_URI`도 인식합니다.
    pub fn load(path: Option<&Path>) -> TraderResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("TRADER")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("oauth.scopes"),
            )
            .build()?;

        let mut app: AppConfig = config.try_deserialize()?;
        app.apply_env_overrides();
        Ok(app)
    }

    /// 기본 경로(`config/default.toml`)가 있으면 사용하여 설정을 로드합니다.
    pub fn load_default() -> TraderResult<Self> {
        let path = Path::new("config/default.toml");
        if path.exists() {
            Self::load(Some(path))
        } else {
            Self::load(None)
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = std::env::var(CLIENT_ID_ENV) {
            if !client_id.trim().is_empty() {
                self.oauth.client_id = Some(client_id);
            }
        }
        if let Ok(redirect_uri) = std::env::var(REDIRECT_URI_ENV) {
            if !redirect_uri.trim().is_empty() {
                self.oauth.redirect_uri = redirect_uri;
            }
        }
    }

    /// 설정을 검증합니다.
    ///
    /// 클라이언트 ID 누락은 에러가 아닙니다 (로그인만 비활성화됩니다).
    pub fn validate(&self) -> TraderResult<()> {
        for (name, value) in [
            ("exchange.rest_base_url", &self.exchange.rest_base_url),
            ("oauth.authorize_url", &self.oauth.authorize_url),
            ("oauth.api_base_url", &self.oauth.api_base_url),
            ("oauth.redirect_uri", &self.oauth.redirect_uri),
        ] {
            url::Url::parse(value)
                .map_err(|e| TraderError::Config(format!("{} is not a valid URL ({}): {}", name, e, value)))?;
        }

        if self.oauth.scopes.is_empty() {
            return Err(TraderError::Config("oauth.scopes must not be empty".to_string()));
        }
        if self.polling.interval_secs == 0 {
            return Err(TraderError::Config("polling.interval_secs must be positive".to_string()));
        }
        if self.retry.backoff_ms == 0 {
            return Err(TraderError::Config("retry.backoff_ms must be positive".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.backoff_ms, 1000);
        assert_eq!(config.polling.interval(), Duration::from_secs(5));
        assert_eq!(config.oauth.scope_string(), "wallet:accounts:read wallet:transactions:read");
        assert!(!config.oauth.login_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_login_enabled() {
        let mut oauth = OAuthConfig::default();
        oauth.client_id = Some("   ".to_string());
        assert!(!oauth.login_enabled());

        oauth.client_id = Some("abc".to_string());
        assert!(oauth.login_enabled());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.oauth.redirect_uri = "not a url".to_string();
        assert!(matches!(config.validate(), Err(TraderError::Config(_))));

        let mut config = AppConfig::default();
        config.polling.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.oauth.scopes.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[oauth]\nclient_id = \"abc\"\nredirect_uri = \"http://x/\"\nscopes = [\"read\"]\n\
                 authorize_url = \"https://example.com/oauth/authorize\"\n\
                 api_base_url = \"https://example.com/v2\"\napi_version = \"2023-01-01\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.oauth.client_id.as_deref(), Some("abc"));
        assert_eq!(config.oauth.scopes, vec!["read".to_string()]);
        assert_eq!(config.exchange.rest_base_url, "https://api.exchange.coinbase.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        // 섹션 일부만 지정해도 나머지 필드는 기본값
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[oauth]\nclient_id = \"abc\"\n\n[retry]\nmax_retries = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.oauth.client_id.as_deref(), Some("abc"));
        assert_eq!(config.oauth.authorize_url, OAuthConfig::default().authorize_url);
        assert_eq!(config.oauth.scopes, OAuthConfig::default().scopes);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.backoff_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let path = std::env::temp_dir().join(format!("trader-partial-{}.toml", std::process::id()));
        std::fs::write(&path, "[oauth]\nclient_id = \"abc\"\n").unwrap();

        let loaded = AppConfig::load(Some(&path));
        std::fs::remove_file(&path).ok();

        let config = loaded.unwrap();
        assert!(config.oauth.login_enabled());
        assert_eq!(config.oauth.api_version, "2023-01-01");
        assert_eq!(config.polling.interval_secs, 5);
    }
}
