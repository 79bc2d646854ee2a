//! Coinbase Exchange 공개 REST API 클라이언트.
//!
//! 엔드포인트:
//! - `GET /products`
//! - `GET /products/{id}/ticker`
//! - `GET /products/{id}/stats`
//! - `GET /products/{id}/candles?granularity=&start=&end=`
//! - `GET /products/{id}/book?level=`
//!
//! 모든 요청은 [`fetch_with_retry`](crate::retry::fetch_with_retry)를 한 번씩 거칩니다.

use crate::error::ExchangeError;
use crate::retry::{RequestOptions, ResilientFetcher, RetryConfig};
use crate::traits::{CandleQuery, ExchangeResult, MarketDataProvider};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn, Instrument};
use trader_core::{
    market_span, to_exchange_symbol, AppConfig, Candle, ExchangeConfig, OrderBook, OrderBookLevel,
    Product, Stats, Ticker,
};
use url::Url;

// ============================================================================
// 응답 스키마
// ============================================================================

#[derive(Debug, Deserialize)]
struct CoinbaseProduct {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    base_currency: String,
    quote_currency: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct CoinbaseTicker {
    price: Decimal,
    #[serde(default)]
    size: Decimal,
    bid: Decimal,
    ask: Decimal,
    #[serde(default)]
    volume: Decimal,
    #[serde(default)]
    time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseStats {
    open: Decimal,
    high: Decimal,
    low: Decimal,
    last: Decimal,
    volume: Decimal,
    #[serde(default)]
    volume_30day: Option<Decimal>,
}

/// `[time, low, high, open, close, volume]`, 최신순.
#[derive(Debug, Deserialize)]
struct CoinbaseCandle(
    i64, // 0: 시작 시각 (epoch 초)
    f64, // 1: 저가
    f64, // 2: 고가
    f64, // 3: 시가
    f64, // 4: 종가
    f64, // 5: 거래량
);

/// 레벨 1/2는 세 번째 원소가 주문 수, 레벨 3은 주문 ID입니다.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BookEntryExtra {
    NumOrders(u32),
    OrderId(String),
}

#[derive(Debug, Deserialize)]
struct CoinbaseBookEntry(Decimal, Decimal, BookEntryExtra);

#[derive(Debug, Deserialize)]
struct CoinbaseOrderBook {
    #[serde(default)]
    sequence: Option<u64>,
    #[serde(default)]
    bids: Vec<CoinbaseBookEntry>,
    #[serde(default)]
    asks: Vec<CoinbaseBookEntry>,
}

// ============================================================================
// 변환
// ============================================================================

fn to_decimal(value: f64, field: &str) -> ExchangeResult<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| ExchangeError::MalformedData(format!("candle {} is not a finite number: {}", field, value)))
}

impl CoinbaseCandle {
    fn into_candle(self) -> ExchangeResult<Candle> {
        let open_time = DateTime::from_timestamp(self.0, 0)
            .ok_or_else(|| ExchangeError::MalformedData(format!("candle timestamp out of range: {}", self.0)))?;

        Ok(Candle {
            open_time,
            low: to_decimal(self.1, "low")?,
            high: to_decimal(self.2, "high")?,
            open: to_decimal(self.3, "open")?,
            close: to_decimal(self.4, "close")?,
            volume: to_decimal(self.5, "volume")?,
        })
    }
}

impl From<CoinbaseBookEntry> for OrderBookLevel {
    fn from(entry: CoinbaseBookEntry) -> Self {
        let (num_orders, order_id) = match entry.2 {
            BookEntryExtra::NumOrders(n) => (Some(n), None),
            BookEntryExtra::OrderId(id) => (None, Some(id)),
        };
        OrderBookLevel {
            price: entry.0,
            size: entry.1,
            num_orders,
            order_id,
        }
    }
}

/// 최신순 원시 캔들 배열을 시간 오름차순 캔들로 변환합니다.
///
/// 배열이 아니면 `MalformedData`, 빈 배열이면 빈 결과입니다.
/// 거래소가 정렬을 지키지 않아도 결과는 시작 시각 기준 오름차순입니다.
pub fn parse_candles(payload: serde_json::Value) -> ExchangeResult<Vec<Candle>> {
    if !payload.is_array() {
        return Err(ExchangeError::MalformedData(format!(
            "expected candle array, got {}",
            json_kind(&payload)
        )));
    }

    let raw: Vec<CoinbaseCandle> = serde_json::from_value(payload)?;
    let mut candles = raw
        .into_iter()
        .rev()
        .map(CoinbaseCandle::into_candle)
        .collect::<ExchangeResult<Vec<_>>>()?;

    candles.sort_by_key(|c| c.open_time);
    Ok(candles)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn iso8601(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// 클라이언트
// ============================================================================

/// Coinbase Exchange 공개 시장 데이터 클라이언트.
#[derive(Debug, Clone)]
pub struct CoinbaseClient {
    base_url: String,
    fetcher: ResilientFetcher,
}

impl CoinbaseClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: &ExchangeConfig, retry: RetryConfig) -> ExchangeResult<Self> {
        Ok(Self {
            base_url: config.rest_base_url.trim_end_matches('/').to_string(),
            fetcher: ResilientFetcher::new(config.timeout(), retry)?,
        })
    }

    /// 애플리케이션 설정에서 생성합니다.
    pub fn from_config(config: &AppConfig) -> ExchangeResult<Self> {
        Self::new(&config.exchange, RetryConfig::from(&config.retry))
    }

    /// 기본 URL만 바꿔 생성합니다 (테스트용 목 서버 등).
    pub fn with_base_url(base_url: &str, retry: RetryConfig) -> ExchangeResult<Self> {
        let config = ExchangeConfig {
            rest_base_url: base_url.to_string(),
            ..Default::default()
        };
        Self::new(&config, retry)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> ExchangeResult<String> {
        let raw = format!("{}{}", self.base_url, path);
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };

        url.map(String::from)
            .map_err(|e| ExchangeError::Configuration(format!("invalid request URL {}: {}", raw, e)))
    }

    /// 공개 API 요청 (인증 불필요).
    async fn public_get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> ExchangeResult<T> {
        let url = self.endpoint(path, params)?;
        debug!("GET {}", url);
        self.fetcher.fetch_json(&url, &RequestOptions::get()).await
    }
}

#[async_trait]
impl MarketDataProvider for CoinbaseClient {
    fn name(&self) -> &str {
        "coinbase"
    }

    async fn try_get_products(&self) -> ExchangeResult<Vec<Product>> {
        let resp: Vec<CoinbaseProduct> = self.public_get("/products", &[]).await?;

        Ok(resp
            .into_iter()
            .map(|p| Product {
                display_name: p
                    .display_name
                    .unwrap_or_else(|| format!("{}/{}", p.base_currency, p.quote_currency)),
                id: p.id,
                base_currency: p.base_currency,
                quote_currency: p.quote_currency,
                status: p.status,
            })
            .collect())
    }

    async fn try_get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        let product_id = to_exchange_symbol(symbol);
        let resp: CoinbaseTicker = self
            .public_get(&format!("/products/{}/ticker", product_id), &[])
            .instrument(market_span!("get_ticker", product_id))
            .await?;

        Ok(Ticker {
            symbol: product_id,
            price: resp.price,
            size: resp.size,
            bid: resp.bid,
            ask: resp.ask,
            volume: resp.volume,
            time: resp.time.unwrap_or_else(Utc::now),
        })
    }

    async fn try_get_stats(&self, symbol: &str) -> ExchangeResult<Stats> {
        let product_id = to_exchange_symbol(symbol);

        let resp: CoinbaseStats = self
            .public_get(&format!("/products/{}/stats", product_id), &[])
            .await?;

        Ok(Stats {
            symbol: product_id,
            open: resp.open,
            high: resp.high,
            low: resp.low,
            last: resp.last,
            volume: resp.volume,
            volume_30day: resp.volume_30day,
        })
    }

    async fn try_get_candles(&self, symbol: &str, query: &CandleQuery) -> ExchangeResult<Vec<Candle>> {
        let product_id = to_exchange_symbol(symbol);

        let mut params = vec![("granularity", query.granularity.as_secs().to_string())];
        let (start, end) = query.resolve_window(Utc::now());
        if let Some(start) = start {
            params.push(("start", iso8601(start)));
        }
        if let Some(end) = end {
            params.push(("end", iso8601(end)));
        }

        let payload: serde_json::Value = self
            .public_get(&format!("/products/{}/candles", product_id), &params)
            .instrument(market_span!("get_candles", product_id, query.granularity))
            .await?;

        let candles = parse_candles(payload)?;
        if candles.is_empty() {
            warn!(symbol = %product_id, "No candle data available");
        }
        Ok(candles)
    }

    async fn try_get_order_book(&self, symbol: &str, level: u8) -> ExchangeResult<OrderBook> {
        let product_id = to_exchange_symbol(symbol);
        let level = level.clamp(1, 3);

        let resp: CoinbaseOrderBook = self
            .public_get(
                &format!("/products/{}/book", product_id),
                &[("level", level.to_string())],
            )
            .await?;

        Ok(OrderBook {
            sequence: resp.sequence,
            bids: resp.bids.into_iter().map(OrderBookLevel::from).collect(),
            asks: resp.asks.into_iter().map(OrderBookLevel::from).collect(),
        })
    }
}
