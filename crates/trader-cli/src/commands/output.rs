//! 출력 형식과 표 렌더링.

use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write;
use trader_core::{Balances, Candle, CoinQuote, MarketSummary, OrderBook, Product, Stats, Ticker};

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(anyhow::anyhow!("Invalid format: {}. Use: table, json", s)),
        }
    }
}

/// JSON 문자열로 직렬화합니다.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// 형식에 맞춰 출력 문자열을 만듭니다.
pub fn render<T, F>(format: OutputFormat, value: &T, table: F) -> Result<String>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Table => Ok(table(value)),
        OutputFormat::Json => to_json(value),
    }
}

/// 부호가 붙은 변동률 (예: +1.25%).
pub fn signed_percent(value: Decimal) -> String {
    let rounded = value.round_dp(2).normalize();
    if rounded >= Decimal::ZERO {
        format!("+{}%", rounded)
    } else {
        format!("{}%", rounded)
    }
}

pub fn format_products(products: &[Product]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<14} {:<14} {:<6} {:<6} {}", "ID", "NAME", "BASE", "QUOTE", "STATUS");
    let _ = writeln!(out, "{}", "-".repeat(52));
    for p in products {
        let _ = writeln!(
            out,
            "{:<14} {:<14} {:<6} {:<6} {}",
            p.id, p.display_name, p.base_currency, p.quote_currency, p.status
        );
    }
    let _ = write!(out, "\nTotal: {} products", products.len());
    out
}

pub fn format_ticker(ticker: &Ticker) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", ticker.symbol);
    let _ = writeln!(out, "  Price:  {}", ticker.price);
    let _ = writeln!(out, "  Bid:    {}", ticker.bid);
    let _ = writeln!(out, "  Ask:    {}", ticker.ask);
    let _ = writeln!(out, "  Spread: {}", ticker.spread());
    let _ = write!(out, "  Volume: {}", ticker.volume);
    out
}

pub fn format_stats(stats: &Stats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} (24h)", stats.symbol);
    let _ = writeln!(out, "  Open:   {}", stats.open);
    let _ = writeln!(out, "  High:   {}", stats.high);
    let _ = writeln!(out, "  Low:    {}", stats.low);
    let _ = writeln!(out, "  Last:   {}", stats.last);
    let _ = write!(out, "  Volume: {}", stats.volume);
    if let Some(v30) = stats.volume_30day {
        let _ = write!(out, "\n  Volume (30d): {}", v30);
    }
    out
}

pub fn format_summary(summary: &MarketSummary) -> String {
    let arrow = if summary.is_up() { "▲" } else { "▼" };
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  {}  {} {}",
        summary.symbol,
        summary.price,
        arrow,
        signed_percent(summary.change_24h_percent)
    );
    let _ = writeln!(out, "  24h High:   {}", summary.high_24h);
    let _ = writeln!(out, "  24h Low:    {}", summary.low_24h);
    let _ = writeln!(out, "  24h Volume: {}", summary.volume_24h);
    let _ = write!(out, "  Spread:     {}", summary.spread);
    out
}

pub fn format_candles(candles: &[Candle]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:>12} {:>12} {:>12} {:>12} {:>14}",
        "TIME (UTC)", "OPEN", "HIGH", "LOW", "CLOSE", "VOLUME"
    );
    for c in candles {
        let _ = writeln!(
            out,
            "{:<20} {:>12} {:>12} {:>12} {:>12} {:>14}",
            c.open_time.format("%Y-%m-%d %H:%M"),
            c.open,
            c.high,
            c.low,
            c.close,
            c.volume
        );
    }
    let _ = write!(out, "\n{} candles", candles.len());
    out
}

/// 호가창을 위아래로 나눠 출력합니다. 매도 호가는 높은 가격이 위.
pub fn format_order_book(book: &OrderBook, depth: usize) -> String {
    let mut out = String::new();
    let asks: Vec<_> = book.asks.iter().take(depth).collect();
    for level in asks.iter().rev() {
        let _ = writeln!(out, "  ASK {:>14} {:>14}", level.price, level.size);
    }
    match book.spread() {
        Some(spread) => {
            let _ = writeln!(out, "  --- spread {} ---", spread);
        }
        None => {
            let _ = writeln!(out, "  ---");
        }
    }
    for level in book.bids.iter().take(depth) {
        let _ = writeln!(out, "  BID {:>14} {:>14}", level.price, level.size);
    }
    out.trim_end().to_string()
}

pub fn format_balances(balances: &Balances) -> String {
    let mut out = String::new();
    let mut any = false;
    for money in balances.non_zero() {
        any = true;
        let _ = writeln!(out, "  {:<8} {}", money.currency, money.amount);
    }
    if !any {
        out.push_str("  (no balances)");
    }
    out.trim_end().to_string()
}

pub fn format_board(rows: &[CoinQuote]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "   {:<11} {:<12} {:>14} {:>10}", "PAIR", "NAME", "PRICE", "CHANGE");
    for row in rows {
        let star = if row.is_favorite { "*" } else { " " };
        let _ = writeln!(
            out,
            " {} {:<11} {:<12} {:>14} {:>10}",
            star,
            row.pair,
            row.name,
            row.price,
            signed_percent(row.change)
        );
    }
    out.trim_end().to_string()
}
