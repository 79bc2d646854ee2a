//! 계좌 잔고.

use crate::types::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 인증된 사용자의 통화별 잔고 목록.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    /// 통화별 잔고
    pub accounts: Vec<Money>,
}

impl Balances {
    /// 잔고 목록으로 생성합니다.
    pub fn new(accounts: Vec<Money>) -> Self {
        Self { accounts }
    }

    /// 통화의 잔고를 반환합니다. 계좌가 없으면 0입니다.
    pub fn balance_of(&self, currency: &str) -> Decimal {
        self.accounts
            .iter()
            .find(|m| m.currency.eq_ignore_ascii_case(currency))
            .map(|m| m.amount)
            .unwrap_or(Decimal::ZERO)
    }

    /// 잔고가 0보다 큰 계좌만 반환합니다.
    pub fn non_zero(&self) -> impl Iterator<Item = &Money> {
        self.accounts.iter().filter(|m| !m.amount.is_zero())
    }
}
