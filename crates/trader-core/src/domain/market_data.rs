//! 시장 데이터 타입 및 구조체.
//!
//! 이 모듈은 시장 데이터 관련 타입을 정의합니다:
//! - `Product` - 거래 가능한 상품
//! - `Ticker` - 최근 체결/호가 스냅샷
//! - `Stats` - 24시간 통계 스냅샷
//! - `Candle` - OHLCV 캔들
//! - `OrderBook` - 호가창
//! - `MarketSummary` - 시세와 통계로부터 계산한 화면용 요약
//!
//! 모든 스냅샷은 불변 값이며 폴링마다 통째로 교체됩니다.

use crate::types::{DecimalExt, Percentage, Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 거래 가능한 상품.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// 상품 ID (예: BTC-USD)
    pub id: String,
    /// 표시 이름 (예: BTC/USD)
    pub display_name: String,
    /// 기준 통화
    pub base_currency: String,
    /// 호가 통화
    pub quote_currency: String,
    /// 상품 상태 (예: online)
    pub status: String,
}

impl Product {
    /// 거래 가능한 상태인지 확인합니다.
    pub fn is_online(&self) -> bool {
        self.status.eq_ignore_ascii_case("online")
    }
}

/// 최근 체결 및 최우선 호가 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// 상품 ID (예: BTC-USD)
    pub symbol: String,
    /// 최근 체결가
    pub price: Price,
    /// 최근 체결 수량
    pub size: Quantity,
    /// 최우선 매수 호가
    pub bid: Price,
    /// 최우선 매도 호가
    pub ask: Price,
    /// 24시간 거래량
    pub volume: Quantity,
    /// 스냅샷 시각
    pub time: DateTime<Utc>,
}

impl Ticker {
    /// 매수/매도 스프레드를 반환합니다.
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// 중간 가격을 반환합니다.
    pub fn mid_price(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

/// 24시간 통계 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// 상품 ID
    pub symbol: String,
    /// 24시간 시가
    pub open: Price,
    /// 24시간 고가
    pub high: Price,
    /// 24시간 저가
    pub low: Price,
    /// 최근가
    pub last: Price,
    /// 24시간 거래량
    pub volume: Quantity,
    /// 30일 거래량
    pub volume_30day: Option<Quantity>,
}

/// 고정 간격 OHLCV 캔들.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시작 시각
    pub open_time: DateTime<Utc>,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량
    pub volume: Quantity,
}

/// 호가창 가격 레벨.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    /// 가격
    pub price: Price,
    /// 수량
    pub size: Quantity,
    /// 집계 주문 수 (레벨 1/2)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_orders: Option<u32>,
    /// 개별 주문 ID (레벨 3)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

/// 호가창 데이터.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    /// 시퀀스 번호
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    /// 매수 호가 - 가격 내림차순
    pub bids: Vec<OrderBookLevel>,
    /// 매도 호가 - 가격 오름차순
    pub asks: Vec<OrderBookLevel>,
}

impl OrderBook {
    /// 빈 호가창을 반환합니다.
    pub fn empty() -> Self {
        Self::default()
    }

    /// 매수/매도 호가가 모두 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// 최우선 매수 호가를 반환합니다.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    /// 최우선 매도 호가를 반환합니다.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// 스프레드를 반환합니다.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

/// 시세와 24시간 통계로 계산한 시장 요약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    /// 상품 ID
    pub symbol: String,
    /// 현재가
    pub price: Price,
    /// 24시간 고가
    pub high_24h: Price,
    /// 24시간 저가
    pub low_24h: Price,
    /// 24시간 변동률(%)
    pub change_24h_percent: Percentage,
    /// 24시간 거래량
    pub volume_24h: Quantity,
    /// 매수/매도 스프레드
    pub spread: Decimal,
}

impl MarketSummary {
    /// 시세와 통계 스냅샷으로부터 요약을 계산합니다.
    ///
    /// 변동률은 `(현재가 - 24시간 시가) / 24시간 시가 * 100`이며
    /// 시가가 0이면 0입니다.
    pub fn from_parts(ticker: &Ticker, stats: &Stats) -> Self {
        Self {
            symbol: ticker.symbol.clone(),
            price: ticker.price,
            high_24h: stats.high,
            low_24h: stats.low,
            change_24h_percent: ticker.price.percent_change_from(stats.open),
            volume_24h: ticker.volume,
            spread: ticker.spread(),
        }
    }

    /// 24시간 기준 상승 중인지 확인합니다.
    pub fn is_up(&self) -> bool {
        self.change_24h_percent >= Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_ticker() -> Ticker {
        Ticker {
            symbol: "BTC-USD".to_string(),
            price: dec!(50500),
            size: dec!(0.01),
            bid: dec!(50495),
            ask: dec!(50505),
            volume: dec!(1200),
            time: Utc::now(),
        }
    }

    fn sample_stats() -> Stats {
        Stats {
            symbol: "BTC-USD".to_string(),
            open: dec!(50000),
            high: dec!(51000),
            low: dec!(49000),
            last: dec!(50500),
            volume: dec!(1200),
            volume_30day: None,
        }
    }

    #[test]
    fn test_ticker_spread() {
        let ticker = sample_ticker();
        assert_eq!(ticker.spread(), dec!(10));
        assert_eq!(ticker.mid_price(), dec!(50500));
    }

    #[test]
    fn test_market_summary() {
        let summary = MarketSummary::from_parts(&sample_ticker(), &sample_stats());

        assert_eq!(summary.price, dec!(50500));
        assert_eq!(summary.high_24h, dec!(51000));
        assert_eq!(summary.low_24h, dec!(49000));
        assert_eq!(summary.change_24h_percent, dec!(1));
        assert_eq!(summary.spread, dec!(10));
        assert!(summary.is_up());
    }

    #[test]
    fn test_market_summary_zero_open() {
        let mut stats = sample_stats();
        stats.open = Decimal::ZERO;

        let summary = MarketSummary::from_parts(&sample_ticker(), &stats);
        assert_eq!(summary.change_24h_percent, Decimal::ZERO);
    }

    #[test]
    fn test_order_book() {
        let ob = OrderBook {
            sequence: Some(1),
            bids: vec![
                OrderBookLevel { price: dec!(2000), size: dec!(10), num_orders: Some(3), order_id: None },
                OrderBookLevel { price: dec!(1999), size: dec!(20), num_orders: Some(1), order_id: None },
            ],
            asks: vec![OrderBookLevel { price: dec!(2001), size: dec!(15), num_orders: Some(2), order_id: None }],
        };

        assert_eq!(ob.best_bid(), Some(dec!(2000)));
        assert_eq!(ob.best_ask(), Some(dec!(2001)));
        assert_eq!(ob.spread(), Some(dec!(1)));
        assert!(!ob.is_empty());
        assert!(OrderBook::empty().is_empty());
        assert_eq!(OrderBook::empty().spread(), None);
    }
}
