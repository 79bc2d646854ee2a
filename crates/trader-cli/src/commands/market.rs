//! 시장 데이터 조회 명령.

use super::context::AppContext;
use super::output::{
    format_candles, format_order_book, format_products, format_stats, format_summary,
    format_ticker, render, OutputFormat,
};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;
use trader_core::{ChartRange, Granularity, MarketSummary};
use trader_exchange::{CandleQuery, MarketDataProvider};

/// 캔들 조회 설정.
#[derive(Debug, Clone, Default)]
pub struct CandlesConfig {
    /// 차트 범위 (지정하면 간격/기간보다 우선)
    pub range: Option<ChartRange>,
    pub granularity: Option<Granularity>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl CandlesConfig {
    /// 조회 쿼리로 변환합니다.
    pub fn to_query(&self, now: DateTime<Utc>) -> CandleQuery {
        match self.range {
            Some(range) => CandleQuery::for_range(range, now),
            None => CandleQuery::new(self.granularity.unwrap_or_default())
                .with_window(self.start, self.end),
        }
    }
}

/// RFC 3339 또는 YYYY-MM-DD (자정 UTC) 형식의 시각을 파싱합니다.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid time: {}. Use RFC 3339 or YYYY-MM-DD", s))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow!("Invalid date: {}", s))
}

/// 상품 목록.
pub async fn products(ctx: &AppContext, online_only: bool, format: OutputFormat) -> Result<String> {
    let mut products = ctx
        .client
        .try_get_products()
        .await
        .context("Failed to fetch products")?;
    if online_only {
        products.retain(|p| p.is_online());
    }
    products.sort_by(|a, b| a.id.cmp(&b.id));

    info!(count = products.len(), "Products fetched");
    render(format, &products[..], format_products)
}

pub async fn ticker(ctx: &AppContext, pair: &str, format: OutputFormat) -> Result<String> {
    let ticker = ctx
        .client
        .try_get_ticker(pair)
        .await
        .with_context(|| format!("Failed to fetch ticker for {}", pair))?;
    render(format, &ticker, format_ticker)
}

pub async fn stats(ctx: &AppContext, pair: &str, format: OutputFormat) -> Result<String> {
    let stats = ctx
        .client
        .try_get_stats(pair)
        .await
        .with_context(|| format!("Failed to fetch 24h stats for {}", pair))?;
    render(format, &stats, format_stats)
}

/// 시세와 24시간 통계를 동시에 조회해 요약합니다.
pub async fn summary(ctx: &AppContext, pair: &str, format: OutputFormat) -> Result<String> {
    let (ticker, stats) = tokio::join!(ctx.client.try_get_ticker(pair), ctx.client.try_get_stats(pair));
    let ticker = ticker.with_context(|| format!("Failed to fetch ticker for {}", pair))?;
    let stats = stats.with_context(|| format!("Failed to fetch 24h stats for {}", pair))?;

    let summary = MarketSummary::from_parts(&ticker, &stats);
    render(format, &summary, format_summary)
}

pub async fn candles(
    ctx: &AppContext,
    pair: &str,
    config: &CandlesConfig,
    format: OutputFormat,
) -> Result<String> {
    let query = config.to_query(Utc::now());
    let candles = ctx
        .client
        .try_get_candles(pair, &query)
        .await
        .with_context(|| format!("Failed to fetch candles for {}", pair))?;

    info!(pair, granularity = %query.granularity, count = candles.len(), "Candles fetched");
    render(format, &candles[..], format_candles)
}

/// 호가창. `depth`는 한쪽에 표시할 호가 수입니다.
pub async fn book(
    ctx: &AppContext,
    pair: &str,
    level: u8,
    depth: usize,
    format: OutputFormat,
) -> Result<String> {
    let book = ctx
        .client
        .try_get_order_book(pair, level)
        .await
        .with_context(|| format!("Failed to fetch order book for {}", pair))?;
    render(format, &book, |b| format_order_book(b, depth))
}
