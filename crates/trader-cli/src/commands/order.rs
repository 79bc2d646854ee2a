//! 모의 주문 명령.

use super::context::AppContext;
use super::output::{to_json, OutputFormat};
use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use tracing::warn;
use trader_core::{OrderType, Side, Symbol};
use trader_exchange::{
    ExchangeError, MarketDataProvider, OrderContext, OrderTicket, SessionState, SimulatedOrder,
};

/// 주문 입력.
#[derive(Debug, Clone)]
pub struct OrderConfig {
    pub pair: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Decimal,
    /// 지정가 (지정가 주문만)
    pub price: Option<Decimal>,
}

impl OrderConfig {
    /// 주문 티켓을 만듭니다. 지정가 주문에 가격이 없으면 검증 단계에서 거부됩니다.
    pub fn ticket(&self) -> OrderTicket {
        match self.order_type {
            OrderType::Market => OrderTicket::market(self.pair.clone(), self.side, self.amount),
            OrderType::Limit => OrderTicket {
                limit_price: self.price,
                ..OrderTicket::limit(self.pair.clone(), self.side, self.amount, Decimal::ZERO)
            },
        }
    }
}

/// 주문을 검증하고 모의 체결 결과를 반환합니다.
///
/// 시장가 계산에 현재 시세가 필요하므로 시세 조회 실패 시 주문하지 않습니다.
pub async fn place_order(ctx: &AppContext, config: &OrderConfig) -> Result<SimulatedOrder> {
    let ticker = ctx
        .client
        .try_get_ticker(&config.pair.exchange_id())
        .await
        .with_context(|| format!("Failed to fetch current price for {}", config.pair))?;

    let order_ctx = if ctx.resume().await == SessionState::LoggedIn {
        let balances = ctx.session.get_balances().await.context("Failed to fetch balances")?;
        OrderContext::from_balances(&config.pair, &balances, ticker.price)
    } else {
        OrderContext::anonymous(ticker.price)
    };

    match config.ticket().submit(&order_ctx) {
        Ok(order) => Ok(order),
        Err(ExchangeError::Unauthorized(_)) => {
            bail!("Please connect your Coinbase account first (`trader login`)")
        }
        Err(e) => {
            warn!(error = %e, "Order rejected");
            Err(e.into())
        }
    }
}

pub fn format_order(order: &SimulatedOrder, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(order),
        OutputFormat::Table => Ok(format!(
            "Order placed successfully: {}\n  ID:    {}\n  Total: {}",
            order, order.id, order.total
        )),
    }
}
