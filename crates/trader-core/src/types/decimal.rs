//! 가격/수량 계산을 위한 Decimal 유틸리티.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 가격 타입.
pub type Price = Decimal;

/// 수량 타입.
pub type Quantity = Decimal;

/// 퍼센트 타입 (5.25 = 5.25%).
pub type Percentage = Decimal;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 양수인지 확인합니다.
    fn is_positive(&self) -> bool;

    /// 지정된 소수점 자릿수로 반올림합니다 (0.5는 0에서 먼 쪽으로).
    fn round_half_up(&self, dp: u32) -> Decimal;

    /// `base` 대비 변동률(%)을 반환합니다. `base`가 0이면 0을 반환합니다.
    fn percent_change_from(&self, base: Decimal) -> Percentage;
}

impl DecimalExt for Decimal {
    fn is_positive(&self) -> bool {
        *self > Decimal::ZERO
    }

    fn round_half_up(&self, dp: u32) -> Decimal {
        self.round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
    }

    fn percent_change_from(&self, base: Decimal) -> Percentage {
        if base.is_zero() {
            return Decimal::ZERO;
        }
        (*self - base) / base * Decimal::ONE_HUNDRED
    }
}

/// 통화가 포함된 금액.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// 금액
    pub amount: Decimal,
    /// 통화
    pub currency: String,
}

impl Money {
    /// 새 금액을 생성합니다.
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into().to_uppercase(),
        }
    }

    /// 0 금액을 생성합니다.
    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_change() {
        assert_eq!(dec!(110).percent_change_from(dec!(100)), dec!(10));
        assert_eq!(dec!(90).percent_change_from(dec!(100)), dec!(-10));
        assert_eq!(dec!(90).percent_change_from(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(dec!(1.005).round_half_up(2), dec!(1.01));
        assert_eq!(dec!(-1.005).round_half_up(2), dec!(-1.01));
    }

    #[test]
    fn test_money() {
        let m = Money::new(dec!(1000.50), "usdt");
        assert_eq!(m.to_string(), "1000.50 USDT");
        assert!(Money::zero("BTC").amount.is_zero());
    }
}
