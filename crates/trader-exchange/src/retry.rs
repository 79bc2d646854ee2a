//! 재시도/백오프가 포함된 HTTP 요청.
//!
//! 규칙:
//! - 2xx: 즉시 반환
//! - 429 / 5xx: 남은 시도가 있으면 `Retry-After`(초) 또는 선형 백오프 후 재시도
//! - 그 외 상태 코드: 즉시 `HttpStatus` 에러
//! - 네트워크 에러: 선형 백오프로 재시도, 마지막 시도에서는 에러 전파
//!
//! `max_retries`는 총 시도 횟수입니다. n번째 재시도 전 대기 시간은 `backoff * n`입니다.

use crate::error::{is_retryable_status, ExchangeError};
use crate::traits::ExchangeResult;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Method, Response};
use std::time::Duration;
use tracing::{debug, warn};
use trader_core::RetryPolicyConfig;

/// 재시도 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// 총 시도 횟수
    pub max_retries: u32,
    /// 기본 백오프
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self { max_retries, backoff }
    }

    /// 지정한 시도 인덱스(0부터) 실패 후의 선형 백오프.
    pub fn linear_delay(&self, attempt_index: u32) -> Duration {
        self.backoff.saturating_mul(attempt_index.saturating_add(1))
    }

    /// 재시도 대상 응답 후의 대기 시간.
    ///
    /// `Retry-After`가 정수 초로 파싱되면 그 값을, 아니면 선형 백오프를 사용합니다.
    pub fn delay_for(&self, attempt_index: u32, retry_after: Option<&HeaderValue>) -> Duration {
        retry_after
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.linear_delay(attempt_index))
    }
}

impl From<&RetryPolicyConfig> for RetryConfig {
    fn from(config: &RetryPolicyConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// 요청 옵션 (메서드 + 헤더).
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
        }
    }
}

impl RequestOptions {
    /// GET 요청 옵션.
    pub fn get() -> Self {
        Self::default()
    }

    /// 헤더를 추가합니다.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Bearer 인증 헤더를 추가합니다. 값은 민감 정보로 표시되어 Debug 출력에서 가려집니다.
    pub fn bearer(self, token: &str) -> ExchangeResult<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ExchangeError::Validation("access token contains invalid characters".to_string()))?;
        value.set_sensitive(true);
        Ok(self.header(AUTHORIZATION, value))
    }
}

/// 재시도 정책에 따라 요청을 수행하고 첫 번째 성공 응답을 반환합니다.
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    options: &RequestOptions,
    config: &RetryConfig,
) -> ExchangeResult<Response> {
    for attempt in 0..config.max_retries {
        let is_last = attempt + 1 >= config.max_retries;

        debug!(url, attempt = attempt + 1, "{} {}", options.method, url);

        let result = client
            .request(options.method.clone(), url)
            .headers(options.headers.clone())
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                if is_retryable_status(status.as_u16()) && !is_last {
                    let delay = config.delay_for(attempt, response.headers().get(RETRY_AFTER));
                    warn!(
                        url,
                        attempt = attempt + 1,
                        status = status.as_u16(),
                        delay_ms = delay.as_millis() as u64,
                        "Retryable HTTP status, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                return Err(ExchangeError::HttpStatus {
                    status: status.as_u16(),
                    status_text: status.canonical_reason().unwrap_or_default().to_string(),
                });
            }
            Err(e) => {
                if is_last {
                    return Err(ExchangeError::NetworkError(e.to_string()));
                }

                let delay = config.linear_delay(attempt);
                warn!(
                    url,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Request failed: {}, backing off",
                    e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(ExchangeError::RetriesExhausted {
        url: url.to_string(),
        retries: config.max_retries,
    })
}

/// 클라이언트와 재시도 정책을 묶은 요청기.
#[derive(Debug, Clone)]
pub struct ResilientFetcher {
    client: Client,
    config: RetryConfig,
}

impl ResilientFetcher {
    /// 타임아웃을 지정하여 생성합니다.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(timeout: Duration, config: RetryConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::NetworkError(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self { client, config })
    }

    /// 기존 클라이언트로 생성합니다.
    pub fn with_client(client: Client, config: RetryConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// 요청을 수행합니다.
    pub async fn fetch(&self, url: &str, options: &RequestOptions) -> ExchangeResult<Response> {
        fetch_with_retry(&self.client, url, options, &self.config).await
    }

    /// 요청 후 본문을 JSON으로 파싱합니다.
    ///
    /// 본문이 예상 형태가 아니면 `MalformedData`를 반환합니다.
    pub async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> ExchangeResult<T> {
        let response = self.fetch(url, options).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            debug!(url, "Failed to parse response: {} - Body: {}", e, body);
            ExchangeError::MalformedData(format!("{}: {}", url, e))
        })
    }
}
