//! Coinbase 커넥터.
//!
//! - [`CoinbaseClient`]: 공개 시장 데이터 REST API
//! - [`OAuthSession`]: implicit grant 로그인과 인증 API

mod client;
mod oauth;

pub use client::{parse_candles, CoinbaseClient};
pub use oauth::{strip_fragment, LoginRequest, OAuthSession, RedirectParams, SessionState};
