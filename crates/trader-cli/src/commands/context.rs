//! 명령 실행 컨텍스트.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use trader_core::AppConfig;
use trader_exchange::{CoinbaseClient, FileStore, OAuthSession, SessionState, SessionStore};

/// 설정과 공유 컴포넌트 묶음.
pub struct AppContext {
    pub config: AppConfig,
    pub client: Arc<CoinbaseClient>,
    pub session: OAuthSession,
}

impl AppContext {
    /// 설정 파일(선택)과 환경 변수로 컨텍스트를 만듭니다.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => AppConfig::load(Some(path))
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => AppConfig::load_default().context("Failed to load config")?,
        };
        config.validate().context("Invalid configuration")?;
        Self::from_config(config)
    }

    pub fn from_config(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn SessionStore> = Arc::new(FileStore::new(config.storage.session_file.clone()));
        Self::with_store(config, store)
    }

    /// 세션 저장소를 지정해 생성합니다.
    pub fn with_store(config: AppConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let client = CoinbaseClient::from_config(&config).context("Failed to create market data client")?;
        let session = OAuthSession::from_config(&config, store).context("Failed to create OAuth session")?;

        Ok(Self {
            config,
            client: Arc::new(client),
            session,
        })
    }

    /// 저장된 토큰으로 세션을 복구합니다.
    ///
    /// 복구 실패는 로그만 남기고 로그아웃 상태로 계속합니다.
    pub async fn resume(&self) -> SessionState {
        match self.session.resume_session().await {
            Ok(state) => {
                debug!(state = %state, "Session resumed");
                state
            }
            Err(e) => {
                warn!(error = %e, "Stored session could not be restored");
                self.session.state().await
            }
        }
    }
}
