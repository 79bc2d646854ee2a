//! Integration tests for the Coinbase market data client and market polling.

use mockito::Matcher;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use trader_core::{ChartRange, Granularity, PriceBoard};
use trader_exchange::{
    CandleQuery, CoinbaseClient, ExchangeError, MarketDataProvider, MarketPollJob, Poller,
    RetryConfig, WatchlistPollJob, DEFAULT_BOOK_LEVEL,
};

fn client(server: &mockito::ServerGuard) -> CoinbaseClient {
    CoinbaseClient::with_base_url(&server.url(), RetryConfig::new(2, Duration::from_millis(10))).unwrap()
}

const TICKER_BODY: &str = r#"{
    "trade_id": 86326522,
    "price": "50500.00",
    "size": "0.01",
    "time": "2024-01-01T00:00:00.000000Z",
    "bid": "50495.00",
    "ask": "50505.00",
    "volume": "1200.5"
}"#;

const STATS_BODY: &str = r#"{
    "open": "50000.00",
    "high": "51000.00",
    "low": "49000.00",
    "last": "50500.00",
    "volume": "1200.5",
    "volume_30day": "35000.1"
}"#;

#[tokio::test]
async fn test_get_candles_not_found_returns_empty() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/products/BTC-USD/candles")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"message":"NotFound"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client(&server);
    let candles = client.get_candles("BTC-USD", &CandleQuery::default()).await;
    assert!(candles.is_empty());
    mock.assert_async().await;

    let err = client
        .try_get_candles("BTC-USD", &CandleQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_get_candles_oldest_first_with_default_window() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/products/BTC-USD/candles")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("granularity".into(), "3600".into()),
            Matcher::Regex("start=".into()),
            Matcher::Regex("end=".into()),
        ]))
        .with_status(200)
        .with_body(
            "[[1700007200, 99, 110, 100, 105, 12.5],
              [1700003600, 95, 101, 96, 100, 8],
              [1700000000, 90, 97, 91, 96, 3.25]]",
        )
        .create_async()
        .await;

    // 화면 형식 입력도 거래소 형식으로 변환
    let candles = client(&server)
        .get_candles("BTC/USDT", &CandleQuery::new(Granularity::H1))
        .await;

    assert_eq!(candles.len(), 3);
    assert!(candles.windows(2).all(|w| w[0].open_time <= w[1].open_time));
    assert_eq!(candles[0].open_time.timestamp(), 1700000000);
    assert_eq!(candles[2].close, dec!(105));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_candles_for_chart_range() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/products/ETH-USD/candles")
        .match_query(Matcher::UrlEncoded("granularity".into(), "900".into()))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let query = CandleQuery::for_range(ChartRange::FourHours, chrono::Utc::now());
    let candles = client(&server).try_get_candles("ETH-USD", &query).await.unwrap();

    assert!(candles.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_candles_malformed_payload() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/products/BTC-USD/candles")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"unexpected": true}"#)
        .create_async()
        .await;

    let client = client(&server);
    assert!(client.get_candles("BTC-USD", &CandleQuery::default()).await.is_empty());
    assert!(matches!(
        client.try_get_candles("BTC-USD", &CandleQuery::default()).await,
        Err(ExchangeError::MalformedData(_))
    ));
}

#[tokio::test]
async fn test_get_ticker_translates_symbol() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/products/BTC-USD/ticker")
        .with_status(200)
        .with_body(TICKER_BODY)
        .create_async()
        .await;

    let ticker = client(&server).get_ticker("BTC/USDT").await.unwrap();

    assert_eq!(ticker.symbol, "BTC-USD");
    assert_eq!(ticker.price, dec!(50500));
    assert_eq!(ticker.bid, dec!(50495));
    assert_eq!(ticker.ask, dec!(50505));
    assert_eq!(ticker.spread(), dec!(10));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_ticker_failure_is_none() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/products/BTC-USD/ticker")
        .with_status(500)
        .expect(2)
        .create_async()
        .await;

    assert!(client(&server).get_ticker("BTC-USD").await.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_ticker_missing_field_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/products/BTC-USD/ticker")
        .with_status(200)
        .with_body(r#"{"price": "1.0"}"#)
        .create_async()
        .await;

    assert!(matches!(
        client(&server).try_get_ticker("BTC-USD").await,
        Err(ExchangeError::MalformedData(_))
    ));
}

#[tokio::test]
async fn test_get_stats() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/products/ETH-USD/stats")
        .with_status(200)
        .with_body(STATS_BODY)
        .create_async()
        .await;

    let client = client(&server);
    let stats = client.get_stats("ETH/USDT").await.unwrap();
    assert_eq!(stats.open, dec!(50000));
    assert_eq!(stats.volume_30day, Some(dec!(35000.1)));

    assert!(client.get_stats("SOL-USD").await.is_none());
}

#[tokio::test]
async fn test_get_products() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/products")
        .with_status(200)
        .with_body(
            r#"[
                {"id": "BTC-USD", "display_name": "BTC/USD", "base_currency": "BTC", "quote_currency": "USD", "status": "online"},
                {"id": "ETH-EUR", "base_currency": "ETH", "quote_currency": "EUR", "status": "delisted"}
            ]"#,
        )
        .create_async()
        .await;

    let products = client(&server).get_products().await;
    assert_eq!(products.len(), 2);
    assert!(products[0].is_online());
    assert_eq!(products[1].display_name, "ETH/EUR");
    assert!(!products[1].is_online());
}

#[tokio::test]
async fn test_get_products_failure_is_empty() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server.mock("GET", "/products").with_status(403).create_async().await;

    assert!(client(&server).get_products().await.is_empty());
}

#[tokio::test]
async fn test_get_order_book() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/products/BTC-USD/book")
        .match_query(Matcher::UrlEncoded("level".into(), "2".into()))
        .with_status(200)
        .with_body(
            r#"{
                "sequence": 3,
                "bids": [["50495.00", "1.5", 2], ["50490.00", "0.3", 1]],
                "asks": [["50505.00", "0.7", 4]]
            }"#,
        )
        .create_async()
        .await;

    let book = client(&server).get_order_book("BTC/USDT", DEFAULT_BOOK_LEVEL).await;

    assert_eq!(book.sequence, Some(3));
    assert_eq!(book.bids.len(), 2);
    assert_eq!(book.best_bid(), Some(dec!(50495)));
    assert_eq!(book.spread(), Some(dec!(10)));
    assert_eq!(book.asks[0].num_orders, Some(4));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_order_book_failure_is_empty() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/products/BTC-USD/book")
        .match_query(Matcher::Any)
        .with_status(404)
        .create_async()
        .await;

    let book = client(&server).get_order_book("BTC-USD", 2).await;
    assert!(book.is_empty());
}

#[tokio::test]
async fn test_market_poll_tick_publishes_snapshot() {
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

    let (job, rx) = MarketPollJob::new(Arc::new(client(&server)), "BTC/USDT");
    let poller = Poller::new(job, Duration::from_secs(5));
    assert!(rx.borrow().is_none());

    poller.tick().await;

    let snapshot = rx.borrow().clone().unwrap();
    assert_eq!(snapshot.symbol, "BTC-USD");
    let summary = snapshot.summary.unwrap();
    assert_eq!(summary.change_24h_percent, dec!(1));
    assert_eq!(summary.high_24h, dec!(51000));
}

#[tokio::test]
async fn test_market_poll_tick_survives_failures() {
    let mut server = mockito::Server::new_async().await;
    let _ticker = server
        .mock("GET", "/products/BTC-USD/ticker")
        .with_status(200)
        .with_body(TICKER_BODY)
        .create_async()
        .await;
    let _stats = server
        .mock("GET", "/products/BTC-USD/stats")
        .with_status(404)
        .create_async()
        .await;

    let (job, rx) = MarketPollJob::new(Arc::new(client(&server)), "BTC-USD");
    Poller::new(job, Duration::from_secs(5)).tick().await;

    let snapshot = rx.borrow().clone().unwrap();
    assert!(snapshot.ticker.is_some());
    assert!(snapshot.stats.is_none());
    assert!(snapshot.summary.is_none());
}

#[tokio::test]
async fn test_watchlist_poll_tracks_change() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("GET", "/products/BTC-USD/ticker")
        .with_status(200)
        .with_body(r#"{"price": "100.00", "bid": "99", "ask": "101"}"#)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/products/BTC-USD/ticker")
        .with_status(200)
        .with_body(r#"{"price": "110.00", "bid": "109", "ask": "111"}"#)
        .expect(1)
        .create_async()
        .await;

    let board = PriceBoard::new([("BTC/USDT", "Bitcoin")]);
    let (job, rx) = WatchlistPollJob::new(Arc::new(client(&server)), board);
    let poller = Poller::new(job, Duration::from_secs(5));

    poller.tick().await;
    assert_eq!(rx.borrow()[0].price, dec!(100));
    assert_eq!(rx.borrow()[0].change, dec!(0));

    poller.tick().await;
    assert_eq!(rx.borrow()[0].price, dec!(110));
    assert_eq!(rx.borrow()[0].change, dec!(10));

    first.assert_async().await;
    second.assert_async().await;
}
