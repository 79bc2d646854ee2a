//! 시장 데이터 제공자 trait 정의.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::warn;
use trader_core::{Candle, ChartRange, Granularity, OrderBook, Product, Stats, Ticker};

use crate::ExchangeError;

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 기본 호가창 레벨.
pub const DEFAULT_BOOK_LEVEL: u8 = 2;

/// 캔들 조회 조건.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleQuery {
    /// 캔들 간격
    pub granularity: Granularity,
    /// 시작 시각
    pub start: Option<DateTime<Utc>>,
    /// 종료 시각
    pub end: Option<DateTime<Utc>>,
}

impl Default for CandleQuery {
    fn default() -> Self {
        Self {
            granularity: Granularity::H1,
            start: None,
            end: None,
        }
    }
}

impl CandleQuery {
    /// 간격만 지정한 조회 조건 (최근 24시간).
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            ..Default::default()
        }
    }

    /// 시작/종료 시각을 지정합니다.
    pub fn with_window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// 차트 범위에 해당하는 조회 조건.
    pub fn for_range(range: ChartRange, now: DateTime<Utc>) -> Self {
        let (start, end) = range.window(now);
        Self {
            granularity: range.granularity(),
            start: Some(start),
            end: Some(end),
        }
    }

    /// 실제 요청에 사용할 시작/종료 시각.
    ///
    /// 둘 다 없으면 `now`로 끝나는 최근 24시간을 사용합니다.
    pub fn resolve_window(&self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match (self.start, self.end) {
            (None, None) => (Some(now - Duration::hours(24)), Some(now)),
            window => window,
        }
    }
}

/// 거래소 공개 시장 데이터 인터페이스.
///
/// `try_*` 메서드는 실패를 타입으로 돌려주고, `get_*` 메서드는 실패를 로그로 남긴 뒤
/// 빈 값(또는 `None`)으로 바꿔 폴링 루프가 계속 돌 수 있게 합니다.
/// 심볼은 화면 형식(`BTC/USDT`)과 거래소 형식(`BTC-USD`) 모두 받습니다.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 제공자 이름 반환.
    fn name(&self) -> &str;

    // === 시장 데이터 ===

    /// 거래 가능한 상품 목록 조회.
    async fn try_get_products(&self) -> ExchangeResult<Vec<Product>>;

    /// 시세 조회.
    async fn try_get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker>;

    /// 24시간 통계 조회.
    async fn try_get_stats(&self, symbol: &str) -> ExchangeResult<Stats>;

    /// 캔들 조회. 결과는 시간 오름차순입니다.
    async fn try_get_candles(&self, symbol: &str, query: &CandleQuery) -> ExchangeResult<Vec<Candle>>;

    /// 호가창 조회.
    async fn try_get_order_book(&self, symbol: &str, level: u8) -> ExchangeResult<OrderBook>;

    // === 실패를 빈 값으로 바꾸는 조회 ===

    async fn get_products(&self) -> Vec<Product> {
        self.try_get_products().await.unwrap_or_else(|e| {
            warn!(provider = self.name(), "Error fetching products: {}", e);
            Vec::new()
        })
    }

    async fn get_ticker(&self, symbol: &str) -> Option<Ticker> {
        self.try_get_ticker(symbol)
            .await
            .map_err(|e| warn!(provider = self.name(), symbol, "Error fetching ticker: {}", e))
            .ok()
    }

    async fn get_stats(&self, symbol: &str) -> Option<Stats> {
        self.try_get_stats(symbol)
            .await
            .map_err(|e| warn!(provider = self.name(), symbol, "Error fetching stats: {}", e))
            .ok()
    }

    async fn get_candles(&self, symbol: &str, query: &CandleQuery) -> Vec<Candle> {
        self.try_get_candles(symbol, query).await.unwrap_or_else(|e| {
            warn!(provider = self.name(), symbol, "Failed to fetch candles: {}", e);
            Vec::new()
        })
    }

    async fn get_order_book(&self, symbol: &str, level: u8) -> OrderBook {
        self.try_get_order_book(symbol, level).await.unwrap_or_else(|e| {
            warn!(provider = self.name(), symbol, "Error fetching order book: {}", e);
            OrderBook::empty()
        })
    }
}
