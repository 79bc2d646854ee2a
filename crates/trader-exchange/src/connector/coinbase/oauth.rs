//! Coinbase OAuth 2.0 implicit grant 세션 관리.
//!
//! 처리 기능:
//! - 인가 URL 생성 및 state nonce 저장
//! - 리다이렉트 fragment 처리 (state 검증 → 토큰 검증 → 저장)
//! - 저장된 토큰으로 세션 재개 (GET {api}/user)
//! - 로그아웃 (로컬 토큰 삭제만)
//! - 계좌 잔고 조회 (GET {api}/accounts)
//!
//! state nonce는 일회용입니다. 리다이렉트 처리 결과와 무관하게 처리 시작 시점에 삭제됩니다.

use crate::error::ExchangeError;
use crate::retry::{RequestOptions, ResilientFetcher, RetryConfig};
use crate::store::{SessionStore, ACCESS_TOKEN_KEY, OAUTH_STATE_KEY};
use crate::traits::ExchangeResult;
use reqwest::header::{HeaderName, HeaderValue};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use trader_core::{AppConfig, Balances, Money, OAuthConfig};
use url::Url;

/// API 버전 헤더.
const CB_VERSION: &str = "cb-version";

/// 세션 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 로그아웃
    LoggedOut,
    /// 인가 페이지로 이동함 (state nonce 저장됨)
    AwaitingRedirect,
    /// 토큰 검증 중
    Validating,
    /// 검증된 토큰 보유
    LoggedIn,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::LoggedOut => "logged out",
            SessionState::AwaitingRedirect => "awaiting redirect",
            SessionState::Validating => "validating",
            SessionState::LoggedIn => "logged in",
        };
        write!(f, "{}", s)
    }
}

/// 로그인 시작 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    /// 사용자가 열어야 하는 인가 URL
    pub url: String,
    /// 저장된 state nonce
    pub state: String,
}

/// 리다이렉트 fragment 파라미터.
pub struct RedirectParams {
    pub access_token: Option<SecretString>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub state: Option<String>,
}

impl fmt::Debug for RedirectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectParams")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("error", &self.error)
            .field("error_description", &self.error_description)
            .field("state", &self.state)
            .finish()
    }
}

impl RedirectParams {
    /// URL(또는 `#...` fragment)에서 파라미터를 추출합니다.
    ///
    /// fragment가 없거나 `access_token`과 `error`가 모두 없으면 `None`입니다.
    pub fn from_url(url: &str) -> ExchangeResult<Option<Self>> {
        let fragment = match url.strip_prefix('#') {
            Some(fragment) => fragment.to_string(),
            None => {
                let parsed = Url::parse(url)
                    .map_err(|e| ExchangeError::MalformedData(format!("invalid redirect URL: {}", e)))?;
                match parsed.fragment() {
                    Some(fragment) => fragment.to_string(),
                    None => return Ok(None),
                }
            }
        };

        let mut params = Self {
            access_token: None,
            error: None,
            error_description: None,
            state: None,
        };

        for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
            match key.as_ref() {
                "access_token" if !value.is_empty() => {
                    params.access_token = Some(SecretString::new(value.into_owned().into()))
                }
                "error" => params.error = Some(value.into_owned()),
                "error_description" => params.error_description = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                _ => {}
            }
        }

        if params.access_token.is_none() && params.error.is_none() {
            return Ok(None);
        }
        Ok(Some(params))
    }
}

/// URL에서 fragment를 제거합니다 (로그/표시용).
pub fn strip_fragment(url: &str) -> String {
    match url.split_once('#') {
        Some((base, _)) => base.to_string(),
        None => url.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    #[serde(default)]
    data: Vec<AccountEntry>,
}

#[derive(Debug, Deserialize)]
struct AccountEntry {
    balance: AccountBalance,
}

#[derive(Debug, Deserialize)]
struct AccountBalance {
    amount: Decimal,
    currency: String,
}

/// Coinbase OAuth 세션 관리자.
///
/// 토큰은 검증 요청이 성공한 뒤에만 저장되고 `LoggedIn`으로 간주됩니다.
pub struct OAuthSession {
    config: OAuthConfig,
    fetcher: ResilientFetcher,
    store: Arc<dyn SessionStore>,
    state: Arc<RwLock<SessionState>>,
    token: Arc<RwLock<Option<SecretString>>>,
}

impl OAuthSession {
    /// 새로운 세션 관리자 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(
        config: OAuthConfig,
        timeout: Duration,
        retry: RetryConfig,
        store: Arc<dyn SessionStore>,
    ) -> ExchangeResult<Self> {
        Ok(Self {
            config,
            fetcher: ResilientFetcher::new(timeout, retry)?,
            store,
            state: Arc::new(RwLock::new(SessionState::LoggedOut)),
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// 애플리케이션 설정에서 생성합니다.
    pub fn from_config(config: &AppConfig, store: Arc<dyn SessionStore>) -> ExchangeResult<Self> {
        Self::new(
            config.oauth.clone(),
            config.exchange.timeout(),
            RetryConfig::from(&config.retry),
            store,
        )
    }

    /// 현재 세션 상태.
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state().await == SessionState::LoggedIn
    }

    async fn set_state(&self, next: SessionState) {
        let mut guard = self.state.write().await;
        if *guard != next {
            debug!(from = %*guard, to = %next, "Session state changed");
        }
        *guard = next;
    }

    /// 로그인을 시작합니다.
    ///
    /// 새 state nonce를 저장하고 인가 URL을 반환합니다. 클라이언트 ID가 없으면
    /// 아무것도 저장하지 않고 `Configuration` 에러를 반환합니다.
    pub async fn initiate_login(&self) -> ExchangeResult<LoginRequest> {
        let client_id = match self.config.client_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => {
                error!("Coinbase client ID is not configured");
                return Err(ExchangeError::Configuration(
                    "Coinbase client ID is not configured".to_string(),
                ));
            }
        };

        let mut url = Url::parse(&self.config.authorize_url).map_err(|e| {
            ExchangeError::Configuration(format!("invalid authorize URL {}: {}", self.config.authorize_url, e))
        })?;

        let state = uuid::Uuid::new_v4().to_string();

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "token")
                .append_pair("client_id", client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri)
                .append_pair("scope", &self.config.scope_string())
                .append_pair("state", &state);
            if let Some(account) = self.config.account.as_deref() {
                query.append_pair("account", account);
            }
        }
        // form 인코딩의 '+'는 공백이므로 %20으로 바꿈 (리터럴 '+'는 이미 %2B)
        let query = url.query().map(|q| q.replace('+', "%20"));
        url.set_query(query.as_deref());

        self.store.set(OAUTH_STATE_KEY, &state)?;
        self.set_state(SessionState::AwaitingRedirect).await;

        info!(authorize_url = %self.config.authorize_url, "OAuth login initiated");

        Ok(LoginRequest {
            url: url.into(),
            state,
        })
    }

    /// 페이지 로드 시 호출합니다.
    ///
    /// URL에 토큰이나 에러가 담긴 fragment가 있으면 리다이렉트를 처리하고,
    /// 없으면 저장된 토큰으로 세션을 재개합니다.
    pub async fn on_page_load(&self, url: &str) -> ExchangeResult<SessionState> {
        match RedirectParams::from_url(url)? {
            Some(params) => self.process_redirect(url, params).await,
            None => self.resume_session().await,
        }
    }

    /// 인가 서버 리다이렉트를 처리합니다.
    ///
    /// - 에러 파라미터: `AuthorizationDenied`
    /// - state 불일치: `Security`, 토큰은 저장하지 않음
    /// - 토큰 검증 실패: 검증 에러, 토큰은 저장하지 않음
    /// - 성공: 토큰 저장 후 `LoggedIn`
    pub async fn handle_redirect(&self, url: &str) -> ExchangeResult<SessionState> {
        let params = RedirectParams::from_url(url)?;

        // 파라미터가 없어도 nonce는 소모
        let Some(params) = params else {
            self.store.remove(OAUTH_STATE_KEY)?;
            self.set_state(SessionState::LoggedOut).await;
            return Err(ExchangeError::MalformedData(
                "redirect carries neither access_token nor error".to_string(),
            ));
        };

        self.process_redirect(url, params).await
    }

    async fn process_redirect(&self, url: &str, params: RedirectParams) -> ExchangeResult<SessionState> {
        // 조회가 실패해도 nonce 삭제는 먼저 시도
        let expected_state = self.store.get(OAUTH_STATE_KEY);
        let removed = self.store.remove(OAUTH_STATE_KEY);
        let expected_state = match expected_state.and_then(|state| removed.map(|()| state)) {
            Ok(state) => state,
            Err(e) => {
                self.set_state(SessionState::LoggedOut).await;
                return Err(e);
            }
        };

        info!(url = %strip_fragment(url), "Handling OAuth redirect");

        if let Some(error) = params.error {
            let description = params.error_description.unwrap_or_default();
            error!(error = %error, "Authorization denied: {}", description);
            self.set_state(SessionState::LoggedOut).await;
            return Err(ExchangeError::AuthorizationDenied { error, description });
        }

        let Some(token) = params.access_token else {
            self.set_state(SessionState::LoggedOut).await;
            return Err(ExchangeError::MalformedData(
                "redirect carries no access_token".to_string(),
            ));
        };

        let state_matches = matches!(
            (expected_state.as_deref(), params.state.as_deref()),
            (Some(expected), Some(received)) if expected == received
        );
        if !state_matches {
            error!("OAuth state mismatch, discarding token");
            self.set_state(SessionState::LoggedOut).await;
            return Err(ExchangeError::Security(
                "OAuth state mismatch, possible CSRF attack".to_string(),
            ));
        }

        self.set_state(SessionState::Validating).await;

        match self.validate_token(&token).await {
            Ok(()) => {
                self.store.set(ACCESS_TOKEN_KEY, token.expose_secret())?;
                *self.token.write().await = Some(token);
                self.set_state(SessionState::LoggedIn).await;
                info!("Successfully connected to Coinbase");
                Ok(SessionState::LoggedIn)
            }
            Err(e) => {
                error!("Token validation failed: {}", e);
                self.set_state(SessionState::LoggedOut).await;
                Err(e)
            }
        }
    }

    /// 보호된 엔드포인트로 토큰을 검증합니다.
    ///
    /// 응답이 2xx가 아니면 저장된 토큰을 삭제하고 `Validation` 에러를 반환합니다.
    /// 네트워크 에러는 토큰 판정 없이 그대로 전파됩니다.
    pub async fn validate_token(&self, token: &SecretString) -> ExchangeResult<()> {
        let url = self.api_url("/user");

        // 헤더로 만들 수 없는 토큰도 거부된 토큰과 같이 처리
        let options = match self.auth_options(token) {
            Ok(options) => options,
            Err(ExchangeError::Validation(reason)) => return self.reject_token(reason).await,
            Err(e) => return Err(e),
        };

        match self.fetcher.fetch(&url, &options).await {
            Ok(_) => {
                debug!("Access token accepted");
                Ok(())
            }
            Err(ExchangeError::HttpStatus { status, status_text }) => {
                warn!(status, "Access token rejected");
                self.reject_token(format!("{} {}", status, status_text)).await
            }
            Err(e) => Err(e),
        }
    }

    async fn reject_token(&self, reason: String) -> ExchangeResult<()> {
        warn!("Removing stored access token: {}", reason);
        *self.token.write().await = None;
        self.store.remove(ACCESS_TOKEN_KEY)?;
        Err(ExchangeError::Validation(reason))
    }

    /// 저장된 토큰으로 세션을 재개합니다.
    ///
    /// 토큰이 없으면 `LoggedOut`, 검증되면 `LoggedIn`입니다.
    /// 토큰이 거부되면 삭제 후 `Validation` 에러를 반환합니다.
    /// 네트워크 에러 시에는 토큰을 유지한 채 `LoggedOut`으로 두고 에러를 반환합니다.
    pub async fn resume_session(&self) -> ExchangeResult<SessionState> {
        let Some(stored) = self.store.get(ACCESS_TOKEN_KEY)? else {
            self.set_state(SessionState::LoggedOut).await;
            return Ok(SessionState::LoggedOut);
        };

        let token = SecretString::new(stored.into());
        self.set_state(SessionState::Validating).await;

        match self.validate_token(&token).await {
            Ok(()) => {
                *self.token.write().await = Some(token);
                self.set_state(SessionState::LoggedIn).await;
                info!("Resumed Coinbase session");
                Ok(SessionState::LoggedIn)
            }
            Err(e) => {
                warn!("Could not resume session: {}", e);
                self.set_state(SessionState::LoggedOut).await;
                Err(e)
            }
        }
    }

    /// 로그아웃합니다. 네트워크 호출 없이 저장된 토큰을 삭제합니다.
    ///
    /// 저장소 에러가 나도 메모리 상태는 `LoggedOut`이 됩니다.
    pub async fn logout(&self) -> ExchangeResult<()> {
        *self.token.write().await = None;
        self.set_state(SessionState::LoggedOut).await;
        let result = self.store.remove(ACCESS_TOKEN_KEY);
        info!("Logged out");
        result
    }

    /// 계좌 잔고를 조회합니다. `LoggedIn` 상태여야 합니다.
    ///
    /// 토큰이 거부되면 세션을 종료합니다.
    pub async fn get_balances(&self) -> ExchangeResult<Balances> {
        let options = {
            let guard = self.token.read().await;
            match (self.state().await, guard.as_ref()) {
                (SessionState::LoggedIn, Some(token)) => self.auth_options(token)?,
                _ => return Err(ExchangeError::Unauthorized("login required".to_string())),
            }
        };

        let url = self.api_url("/accounts");
        let resp: AccountsResponse = match self.fetcher.fetch_json(&url, &options).await {
            Ok(resp) => resp,
            Err(ExchangeError::HttpStatus { status: 401, status_text }) => {
                warn!("Access token rejected while fetching balances");
                self.store.remove(ACCESS_TOKEN_KEY)?;
                *self.token.write().await = None;
                self.set_state(SessionState::LoggedOut).await;
                return Err(ExchangeError::Validation(format!("401 {}", status_text)));
            }
            Err(e) => return Err(e),
        };

        Ok(Balances::new(
            resp.data
                .into_iter()
                .map(|a| Money::new(a.balance.amount, a.balance.currency))
                .collect(),
        ))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn auth_options(&self, token: &SecretString) -> ExchangeResult<RequestOptions> {
        let version = HeaderValue::from_str(&self.config.api_version).map_err(|_| {
            ExchangeError::Configuration(format!("invalid API version: {}", self.config.api_version))
        })?;

        RequestOptions::get()
            .header(HeaderName::from_static(CB_VERSION), version)
            .bearer(token.expose_secret())
    }
}
