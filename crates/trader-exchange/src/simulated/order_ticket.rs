//! 모의 주문 티켓.
//!
//! 거래소에 주문을 보내지 않고 로그인 여부, 수량, 가격, 잔고만 검증합니다.

use crate::error::ExchangeError;
use crate::traits::ExchangeResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use tracing::info;
use trader_core::{Balances, OrderType, Price, Quantity, Side, Symbol};

/// 주문 입력.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTicket {
    /// 화면 페어 (예: BTC/USDT)
    pub pair: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    /// 기준 자산 수량
    pub amount: Quantity,
    /// 지정가 (지정가 주문만)
    pub limit_price: Option<Price>,
}

/// 검증에 필요한 시점 정보.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderContext {
    /// 로그인 여부
    pub authenticated: bool,
    /// 최근 시세 (시장가 주문 금액 계산용)
    pub current_price: Price,
    /// 기준 자산 잔고
    pub base_balance: Decimal,
    /// 호가 자산 잔고
    pub quote_balance: Decimal,
}

impl OrderContext {
    /// 계좌 잔고에서 페어의 기준/호가 자산 잔고를 꺼내 생성합니다.
    pub fn from_balances(pair: &Symbol, balances: &Balances, current_price: Price) -> Self {
        Self {
            authenticated: true,
            current_price,
            base_balance: balances.balance_of(&pair.base),
            quote_balance: balances.balance_of(&pair.quote),
        }
    }

    /// 로그인하지 않은 상태의 컨텍스트.
    pub fn anonymous(current_price: Price) -> Self {
        Self {
            current_price,
            ..Default::default()
        }
    }
}

/// 접수된 모의 주문.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedOrder {
    pub id: String,
    pub pair: String,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Quantity,
    pub price: Option<Price>,
    /// 주문 금액 (호가 자산)
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for SimulatedOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.pair.split('/').next().unwrap_or(&self.pair);
        match self.price {
            Some(price) => write!(f, "{} {} {} at ${}", self.side, self.amount, base, price),
            None => write!(f, "{} {} {} at market price", self.side, self.amount, base),
        }
    }
}

impl OrderTicket {
    /// 시장가 주문.
    pub fn market(pair: Symbol, side: Side, amount: Quantity) -> Self {
        Self {
            pair,
            side,
            order_type: OrderType::Market,
            amount,
            limit_price: None,
        }
    }

    /// 지정가 주문.
    pub fn limit(pair: Symbol, side: Side, amount: Quantity, price: Price) -> Self {
        Self {
            pair,
            side,
            order_type: OrderType::Limit,
            amount,
            limit_price: Some(price),
        }
    }

    /// 주문 금액 (수량 × 시장가 또는 지정가).
    pub fn total(&self, current_price: Price) -> Decimal {
        let price = match self.order_type {
            OrderType::Market => current_price,
            OrderType::Limit => self.limit_price.unwrap_or(Decimal::ZERO),
        };
        self.amount * price
    }

    /// 주문을 검증합니다.
    ///
    /// 검사 순서: 로그인 → 수량 → 지정가 → 매수 시 호가 자산 잔고 → 매도 시 기준 자산 잔고.
    pub fn validate(&self, ctx: &OrderContext) -> ExchangeResult<()> {
        if !ctx.authenticated {
            return Err(ExchangeError::Unauthorized("login required".into()));
        }

        if self.amount <= Decimal::ZERO {
            return Err(ExchangeError::InvalidQuantity("Please enter a valid amount".into()));
        }

        if self.order_type == OrderType::Limit
            && self.limit_price.map_or(true, |p| p <= Decimal::ZERO)
        {
            return Err(ExchangeError::InvalidPrice("Please enter a valid price".into()));
        }

        match self.side {
            Side::Buy if self.total(ctx.current_price) > ctx.quote_balance => {
                Err(ExchangeError::InsufficientBalance(format!(
                    "You don't have enough {}",
                    self.pair.quote
                )))
            }
            Side::Sell if self.amount > ctx.base_balance => Err(ExchangeError::InsufficientBalance(
                format!("You don't have enough {}", self.pair.base),
            )),
            _ => Ok(()),
        }
    }

    /// 검증 후 모의 주문을 생성합니다.
    pub fn submit(&self, ctx: &OrderContext) -> ExchangeResult<SimulatedOrder> {
        self.validate(ctx)?;

        let order = SimulatedOrder {
            id: uuid::Uuid::new_v4().to_string(),
            pair: self.pair.to_standard_string(),
            side: self.side,
            order_type: self.order_type,
            amount: self.amount,
            price: match self.order_type {
                OrderType::Market => None,
                OrderType::Limit => self.limit_price,
            },
            total: self.total(ctx.current_price),
            created_at: Utc::now(),
        };

        info!(order_id = %order.id, pair = %order.pair, "Order placed successfully: {}", order);
        Ok(order)
    }
}
