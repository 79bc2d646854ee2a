//! 코인 목록과 가격 보드.
//!
//! 기본 관심 종목과 폴링 간 가격 변동률을 추적합니다.

use crate::types::{DecimalExt, Percentage, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// 기본 코인 목록 (화면 페어, 이름).
pub const DEFAULT_WATCHLIST: [(&str, &str); 10] = [
    ("BTC/USDT", "Bitcoin"),
    ("ETH/USDT", "Ethereum"),
    ("SOL/USDT", "Solana"),
    ("ADA/USDT", "Cardano"),
    ("DOT/USDT", "Polkadot"),
    ("XRP/USDT", "Ripple"),
    ("DOGE/USDT", "Dogecoin"),
    ("LINK/USDT", "Chainlink"),
    ("UNI/USDT", "Uniswap"),
    ("AVAX/USDT", "Avalanche"),
];

/// 기본 즐겨찾기.
pub const DEFAULT_FAVORITES: [&str; 2] = ["BTC/USDT", "ETH/USDT"];

/// 가격 보드의 한 행.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinQuote {
    /// 화면 페어 (예: BTC/USDT)
    pub pair: String,
    /// 코인 이름
    pub name: String,
    /// 마지막 가격 (아직 조회 전이면 0)
    pub price: Price,
    /// 직전 폴링 대비 변동률(%)
    pub change: Percentage,
    /// 즐겨찾기 여부
    pub is_favorite: bool,
}

impl CoinQuote {
    /// 페어 또는 이름에 검색어가 포함되는지 확인합니다 (대소문자 무시).
    pub fn matches(&self, term: &str) -> bool {
        self.matches_lowercase(&term.to_lowercase())
    }

    fn matches_lowercase(&self, term: &str) -> bool {
        self.pair.to_lowercase().contains(term) || self.name.to_lowercase().contains(term)
    }
}

/// 폴링 결과를 누적하는 가격 보드.
#[derive(Debug, Clone)]
pub struct PriceBoard {
    rows: Vec<CoinQuote>,
    index: HashMap<String, usize>,
    favorites: HashSet<String>,
}

impl PriceBoard {
    /// 코인 목록으로 보드를 생성합니다.
    pub fn new<'a>(coins: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut rows = Vec::new();
        let mut index = HashMap::new();
        for (pair, name) in coins {
            index.insert(pair.to_string(), rows.len());
            rows.push(CoinQuote {
                pair: pair.to_string(),
                name: name.to_string(),
                price: Decimal::ZERO,
                change: Decimal::ZERO,
                is_favorite: false,
            });
        }

        Self {
            rows,
            index,
            favorites: HashSet::new(),
        }
    }

    /// 기본 코인 목록과 즐겨찾기로 보드를 생성합니다.
    pub fn with_defaults() -> Self {
        let mut board = Self::new(DEFAULT_WATCHLIST);
        for pair in DEFAULT_FAVORITES {
            board.toggle_favorite(pair);
        }
        board
    }

    /// 가격을 갱신합니다.
    ///
    /// `price`가 `None`이면 (시세 조회 실패) 이전 가격을 유지하고 변동률은 0이 됩니다.
    /// 첫 관측이거나 이전 가격이 0이면 변동률은 0입니다.
    pub fn update(&mut self, pair: &str, price: Option<Price>) {
        let Some(&i) = self.index.get(pair) else {
            return;
        };
        let row = &mut self.rows[i];
        let previous = row.price;
        let current = price.unwrap_or(previous);

        row.change = current.percent_change_from(previous).round_half_up(2);
        row.price = current;
    }

    /// 즐겨찾기를 토글합니다.
    pub fn toggle_favorite(&mut self, pair: &str) {
        if !self.favorites.remove(pair) {
            self.favorites.insert(pair.to_string());
        }
        if let Some(&i) = self.index.get(pair) {
            self.rows[i].is_favorite = self.favorites.contains(pair);
        }
    }

    /// 즐겨찾기에 추가합니다. 이미 즐겨찾기면 그대로 둡니다.
    pub fn add_favorite(&mut self, pair: &str) {
        self.favorites.insert(pair.to_string());
        if let Some(&i) = self.index.get(pair) {
            self.rows[i].is_favorite = true;
        }
    }

    /// 모든 행을 반환합니다.
    pub fn rows(&self) -> &[CoinQuote] {
        &self.rows
    }

    /// 즐겨찾기 행만 반환합니다.
    pub fn favorites(&self) -> impl Iterator<Item = &CoinQuote> {
        self.rows.iter().filter(|r| r.is_favorite)
    }

    /// 페어 또는 이름으로 검색합니다 (대소문자 무시).
    pub fn search<'a>(&'a self, term: &str) -> impl Iterator<Item = &'a CoinQuote> {
        let term = term.to_lowercase();
        self.rows.iter().filter(move |r| r.matches_lowercase(&term))
    }

    /// 보드에 등록된 페어 목록을 반환합니다.
    pub fn pairs(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.pair.clone()).collect()
    }
}
