//! 심볼 정의 및 거래소 형식 변환.
//!
//! 화면에서는 `BTC/USDT`처럼 `/`로 구분된 페어를 사용하고,
//! 거래소 REST API는 `BTC-USD`처럼 `-`로 구분된 상품 ID를 사용합니다.
//! 거래소에는 USDT 마켓이 없으므로 호가 자산 `USDT`는 `USD`로 매핑됩니다.

use crate::error::TraderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 화면 페어 구분자.
pub const UI_SEPARATOR: char = '/';

/// 거래소 상품 ID 구분자.
pub const EXCHANGE_SEPARATOR: char = '-';

/// 화면 페어를 거래소 상품 ID로 변환합니다.
///
/// 구분자를 `-`로 바꾸고 호가 자산이 `USDT`이면 `USD`로 바꿉니다.
/// 이미 거래소 형식인 값은 그대로 반환되므로 여러 번 적용해도 결과가 같습니다.
///
/// ```
/// use trader_core::to_exchange_symbol;
///
/// assert_eq!(to_exchange_symbol("BTC/USDT"), "BTC-USD");
/// assert_eq!(to_exchange_symbol("BTC-USD"), "BTC-USD");
/// assert_eq!(to_exchange_symbol("ETH/EUR"), "ETH-EUR");
/// ```
pub fn to_exchange_symbol(pair: &str) -> String {
    let normalized = pair.replace(UI_SEPARATOR, "-");
    match normalized.rsplit_once(EXCHANGE_SEPARATOR) {
        Some((base, "USDT")) => format!("{}-USD", base),
        _ => normalized,
    }
}

/// 거래 가능한 페어를 나타내는 심볼.
///
/// 기준 자산과 호가 자산은 화면에 표시되는 그대로 보관합니다 (예: BTC/USDT).
/// 거래소 호출 시에는 [`Symbol::exchange_id`]를 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// 기준 자산 (예: BTC)
    pub base: String,
    /// 호가 자산 (예: USDT)
    pub quote: String,
}

impl Symbol {
    /// 새 심볼을 생성합니다.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
        }
    }

    /// "BASE/QUOTE" 또는 "BASE-QUOTE" 형식 문자열에서 심볼을 파싱합니다.
    pub fn from_string(s: &str) -> Option<Self> {
        let (base, quote) = s
            .split_once(UI_SEPARATOR)
            .or_else(|| s.split_once(EXCHANGE_SEPARATOR))?;

        if base.is_empty() || quote.is_empty() || quote.contains(UI_SEPARATOR) {
            return None;
        }

        Some(Self::new(base.trim(), quote.trim()))
    }

    /// 화면 표시용 "BASE/QUOTE" 문자열을 반환합니다.
    pub fn to_standard_string(&self) -> String {
        format!("{}{}{}", self.base, UI_SEPARATOR, self.quote)
    }

    /// 거래소 상품 ID를 반환합니다 (예: BTC/USDT → BTC-USD).
    pub fn exchange_id(&self) -> String {
        to_exchange_symbol(&self.to_standard_string())
    }
}

impl FromStr for Symbol {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
            .ok_or_else(|| TraderError::InvalidInput(format!("invalid trading pair: {}", s)))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
