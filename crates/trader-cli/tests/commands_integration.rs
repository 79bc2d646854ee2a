//! CLI 명령을 mock 서버에 대해 실행합니다.

use std::sync::Arc;
use trader_cli::commands::order::{place_order, OrderConfig};
use trader_cli::commands::{auth, market, AppContext, OutputFormat};
use trader_core::{AppConfig, OrderType, Side, Symbol};
use trader_exchange::{MemoryStore, SessionStore, ACCESS_TOKEN_KEY, OAUTH_STATE_KEY};

const TICKER_BODY: &str = r#"{"price": "50000.00", "bid": "49995.00", "ask": "50005.00", "volume": "1200.5"}"#;
const STATS_BODY: &str =
    r#"{"open": "40000.00", "high": "51000.00", "low": "39000.00", "last": "50000.00", "volume": "1200.5"}"#;

fn context(server: &mockito::ServerGuard) -> (AppContext, Arc<MemoryStore>) {
    let mut config = AppConfig::default();
    config.exchange.rest_base_url = server.url();
    config.oauth.api_base_url = server.url();
    config.oauth.client_id = Some("abc".to_string());
    config.retry.max_retries = 1;
    config.retry.backoff_ms = 10;

    let store = Arc::new(MemoryStore::new());
    let ctx = AppContext::with_store(config, store.clone()).unwrap();
    (ctx, store)
}

#[tokio::test]
async fn test_summary_command() {
    let mut server = mockito::Server::new_async().await;
    let _ticker = server
        .mock("GET", "/products/BTC-USD/ticker")
        .with_status(200)
        .with_body(TICKER_BODY)
        .create_async()
        .await;
    let _stats = server
        .mock("GET", "/products/BTC-USD/stats")
        .with_status(200)
        .with_body(STATS_BODY)
        .create_async()
        .await;

    let (ctx, _) = context(&server);
    let text = market::summary(&ctx, "BTC/USDT", OutputFormat::Table).await.unwrap();

    assert!(text.starts_with("BTC-USD"));
    assert!(text.contains("+25%"));

    let json = market::summary(&ctx, "BTC/USDT", OutputFormat::Json).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["symbol"], "BTC-USD");
}

#[tokio::test]
async fn test_ticker_failure_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _ticker = server
        .mock("GET", "/products/NOPE-USD/ticker")
        .with_status(404)
        .create_async()
        .await;

    let (ctx, _) = context(&server);
    let err = market::ticker(&ctx, "NOPE-USD", OutputFormat::Table).await.unwrap_err();
    assert!(format!("{:#}", err).contains("404"));
}

#[tokio::test]
async fn test_login_and_callback() {
    let mut server = mockito::Server::new_async().await;
    let _user = server
        .mock("GET", "/user")
        .match_header("authorization", "Bearer tok123")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let (ctx, store) = context(&server);
    let text = auth::login(&ctx).await.unwrap();
    assert!(text.contains("client_id=abc"));

    let state = store.get(OAUTH_STATE_KEY).unwrap().unwrap();
    let redirect = format!("http://localhost:3000/#access_token=tok123&state={}", state);
    let text = auth::callback(&ctx, &redirect).await.unwrap();

    assert!(text.starts_with("Login Successful"));
    assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("tok123"));

    auth::logout(&ctx).await.unwrap();
    assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_login_disabled_without_client_id() {
    let server = mockito::Server::new_async().await;
    let mut config = AppConfig::default();
    config.oauth.api_base_url = server.url();
    let ctx = AppContext::with_store(config, Arc::new(MemoryStore::new())).unwrap();

    assert!(auth::login(&ctx).await.is_err());
}

#[tokio::test]
async fn test_callback_with_denied_authorization() {
    let server = mockito::Server::new_async().await;
    let (ctx, store) = context(&server);
    store.set(OAUTH_STATE_KEY, "S1").unwrap();

    let err = auth::callback(&ctx, "http://localhost:3000/#error=access_denied&error_description=nope&state=S1")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("access_denied"));
}

#[tokio::test]
async fn test_order_requires_login() {
    let mut server = mockito::Server::new_async().await;
    let _ticker = server
        .mock("GET", "/products/BTC-USD/ticker")
        .with_status(200)
        .with_body(TICKER_BODY)
        .create_async()
        .await;

    let (ctx, _) = context(&server);
    let config = OrderConfig {
        pair: Symbol::new("BTC", "USDT"),
        side: Side::Buy,
        order_type: OrderType::Market,
        amount: "0.01".parse().unwrap(),
        price: None,
    };

    let err = place_order(&ctx, &config).await.unwrap_err();
    assert!(err.to_string().contains("connect your Coinbase account"));
}

#[tokio::test]
async fn test_order_with_balances() {
    let mut server = mockito::Server::new_async().await;
    let _ticker = server
        .mock("GET", "/products/BTC-USD/ticker")
        .with_status(200)
        .with_body(TICKER_BODY)
        .create_async()
        .await;
    let _user = server.mock("GET", "/user").with_status(200).with_body("{}").create_async().await;
    let _accounts = server
        .mock("GET", "/accounts")
        .with_status(200)
        .with_body(
            r#"{"data": [
                {"id": "a1", "currency": {"code": "BTC"}, "balance": {"amount": "0.10", "currency": "BTC"}},
                {"id": "a2", "currency": {"code": "USDT"}, "balance": {"amount": "100.00", "currency": "USDT"}}
            ]}"#,
        )
        .create_async()
        .await;

    let (ctx, store) = context(&server);
    store.set(ACCESS_TOKEN_KEY, "tok123").unwrap();

    let sell = OrderConfig {
        pair: Symbol::new("BTC", "USDT"),
        side: Side::Sell,
        order_type: OrderType::Market,
        amount: "0.05".parse().unwrap(),
        price: None,
    };
    let order = place_order(&ctx, &sell).await.unwrap();
    assert_eq!(order.to_string(), "SELL 0.05 BTC at market price");

    // 0.01 * 50000 = 500 > 100 USDT
    let buy = OrderConfig { side: Side::Buy, amount: "0.01".parse().unwrap(), ..sell };
    let err = place_order(&ctx, &buy).await.unwrap_err();
    assert!(err.to_string().contains("You don't have enough USDT"));
}
