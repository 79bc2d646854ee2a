//! 로그인, 리다이렉트 처리, 세션 상태, 로그아웃, 잔고 명령.

use super::context::AppContext;
use super::output::{format_balances, render, OutputFormat};
use anyhow::{bail, Context, Result};
use tracing::info;
use trader_exchange::{ExchangeError, SessionState};

/// 인가 URL을 생성하고 안내 문구를 반환합니다.
pub async fn login(ctx: &AppContext) -> Result<String> {
    if !ctx.config.oauth.login_enabled() {
        bail!(
            "Coinbase client ID is not configured. Set COINBASE_CLIENT_ID or oauth.client_id in the config file"
        );
    }

    let request = ctx.session.initiate_login().await.context("Failed to start login")?;
    info!("Login URL generated");

    Ok(format!(
        "Open this URL in a browser and approve access:\n\n  {}\n\n\
         Then pass the full redirect URL to:\n\n  trader callback '<redirect url>'",
        request.url
    ))
}

/// 브라우저가 돌아온 리다이렉트 URL을 처리합니다.
pub async fn callback(ctx: &AppContext, url: &str) -> Result<String> {
    match ctx.session.on_page_load(url).await {
        Ok(SessionState::LoggedIn) => Ok("Login Successful: connected to Coinbase".to_string()),
        Ok(state) => Ok(format!("Session state: {}", state)),
        Err(ExchangeError::AuthorizationDenied { error, description }) => {
            bail!("Authorization denied ({}): {}", error, description)
        }
        Err(e @ ExchangeError::Security(_)) => {
            Err(anyhow::Error::new(e).context("Redirect rejected, please log in again"))
        }
        Err(e) => Err(anyhow::Error::new(e).context("Login failed")),
    }
}

/// 저장된 세션을 확인합니다.
pub async fn status(ctx: &AppContext) -> Result<String> {
    let state = ctx.resume().await;
    let login = if ctx.config.oauth.login_enabled() {
        "enabled"
    } else {
        "disabled (no client ID)"
    };
    Ok(format!("Session: {}\nLogin:   {}", state, login))
}

pub async fn logout(ctx: &AppContext) -> Result<String> {
    ctx.session.logout().await.context("Failed to clear stored session")?;
    Ok("Logged out".to_string())
}

/// 계좌 잔고를 조회합니다. 저장된 토큰이 유효해야 합니다.
pub async fn balances(ctx: &AppContext, format: OutputFormat) -> Result<String> {
    if ctx.resume().await != SessionState::LoggedIn {
        bail!("Not logged in. Run `trader login` first");
    }

    let balances = ctx.session.get_balances().await.context("Failed to fetch balances")?;
    render(format, &balances, format_balances)
}
