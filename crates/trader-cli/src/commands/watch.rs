//! 가격 보드와 단일 페어 시세를 주기적으로 갱신해 출력합니다.

use super::context::AppContext;
use super::output::{format_board, format_summary};
use anyhow::Result;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use trader_core::{CoinQuote, PriceBoard, Symbol};
use trader_exchange::{MarketPollJob, MarketSnapshot, Poller, WatchlistPollJob};

/// 보드 감시 설정.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// 감시할 페어 (비어 있으면 기본 목록)
    pub pairs: Vec<String>,
    /// 즐겨찾기로 표시할 페어
    pub favorites: Vec<String>,
    /// 페어/이름 검색어
    pub search: Option<String>,
    /// 즐겨찾기만 출력
    pub favorites_only: bool,
    pub interval: Duration,
    /// 출력 횟수 제한 (없으면 Ctrl+C까지)
    pub max_updates: Option<usize>,
}

/// 설정으로 가격 보드를 만듭니다.
pub fn build_board(config: &WatchConfig) -> PriceBoard {
    let mut board = if config.pairs.is_empty() {
        PriceBoard::with_defaults()
    } else {
        // 이름은 기준 자산 코드로 대체
        let coins: Vec<(String, String)> = config
            .pairs
            .iter()
            .map(|pair| {
                let name = Symbol::from_string(pair)
                    .map(|s| s.base)
                    .unwrap_or_else(|| pair.clone());
                (pair.clone(), name)
            })
            .collect();
        PriceBoard::new(coins.iter().map(|(p, n)| (p.as_str(), n.as_str())))
    };

    for pair in &config.favorites {
        board.add_favorite(pair);
    }
    board
}

/// 출력할 행을 고릅니다.
pub fn visible_rows(rows: &[CoinQuote], config: &WatchConfig) -> Vec<CoinQuote> {
    rows.iter()
        .filter(|r| !config.favorites_only || r.is_favorite)
        .filter(|r| config.search.as_deref().map_or(true, |term| r.matches(term)))
        .cloned()
        .collect()
}

/// 가격 보드를 갱신하며 출력합니다.
pub async fn watch_board(ctx: &AppContext, config: WatchConfig) -> Result<()> {
    let (job, rx) = WatchlistPollJob::new(ctx.client.clone(), build_board(&config));
    let poller = Poller::new(job, config.interval);

    info!(interval_secs = config.interval.as_secs(), "Watching price board");
    let handle = poller.start();

    run_until_done(rx, config.max_updates, |rows| {
        println!("{}\n", format_board(&visible_rows(rows, &config)));
    })
    .await;

    handle.shutdown().await;
    Ok(())
}

/// 한 페어의 시장 요약을 갱신하며 출력합니다.
pub async fn watch_pair(ctx: &AppContext, pair: &str, interval: Duration, max_updates: Option<usize>) -> Result<()> {
    let (job, rx) = MarketPollJob::new(ctx.client.clone(), pair);
    let poller = Poller::new(job, interval);
    let handle = poller.start();

    run_until_done(rx, max_updates, |snapshot: &Option<MarketSnapshot>| match snapshot {
        Some(MarketSnapshot {
            summary: Some(summary),
            ..
        }) => println!("{}\n", format_summary(summary)),
        Some(snapshot) => warn!(symbol = %snapshot.symbol, "Market data unavailable"),
        None => {}
    })
    .await;

    handle.shutdown().await;
    Ok(())
}

/// 값이 바뀔 때마다 `on_update`를 호출합니다.
///
/// Ctrl+C, 송신자 종료, 또는 `max_updates`회 출력 후 반환합니다.
async fn run_until_done<T, F>(mut rx: watch::Receiver<T>, max_updates: Option<usize>, mut on_update: F)
where
    F: FnMut(&T),
{
    let mut updates = 0usize;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                on_update(&*rx.borrow_and_update());
                updates += 1;
                if max_updates.is_some_and(|max| updates >= max) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> WatchConfig {
        WatchConfig {
            pairs: Vec::new(),
            favorites: Vec::new(),
            search: None,
            favorites_only: false,
            interval: Duration::from_secs(5),
            max_updates: None,
        }
    }

    #[test]
    fn test_default_board() {
        let board = build_board(&config());
        assert_eq!(board.rows().len(), 10);
        assert_eq!(board.favorites().count(), 2);
    }

    #[test]
    fn test_custom_pairs_and_favorites() {
        let mut config = config();
        config.pairs = vec!["BTC/USDT".to_string(), "ETH/USD".to_string()];
        config.favorites = vec!["ETH/USD".to_string()];

        let board = build_board(&config);
        assert_eq!(board.pairs(), vec!["BTC/USDT", "ETH/USD"]);
        assert_eq!(board.rows()[0].name, "BTC");
        assert!(board.rows()[1].is_favorite);
    }

    #[test]
    fn test_favorite_option_keeps_default_favorites() {
        let mut config = config();
        config.favorites = vec!["BTC/USDT".to_string(), "SOL/USDT".to_string()];

        let board = build_board(&config);
        let btc = board.rows().iter().find(|r| r.pair == "BTC/USDT").unwrap();
        assert!(btc.is_favorite);
        assert_eq!(board.favorites().count(), 3);
    }

    #[test]
    fn test_visible_rows_filters() {
        let mut config = config();
        let mut board = build_board(&config);
        board.update("SOL/USDT", Some(dec!(150)));

        config.search = Some("sol".to_string());
        let rows = visible_rows(board.rows(), &config);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, dec!(150));

        config.search = None;
        config.favorites_only = true;
        let rows = visible_rows(board.rows(), &config);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.is_favorite));
    }

    #[tokio::test]
    async fn test_run_until_done_stops_after_limit() {
        let (tx, rx) = watch::channel(0u32);
        tx.send_replace(7);

        let mut seen = Vec::new();
        run_until_done(rx, Some(1), |v| seen.push(*v)).await;

        assert_eq!(seen, vec![7]);
    }

    #[tokio::test]
    async fn test_run_until_done_stops_when_sender_dropped() {
        let (tx, rx) = watch::channel(0u32);
        tx.send_replace(3);
        drop(tx);

        let mut seen = Vec::new();
        run_until_done(rx, None, |v| seen.push(*v)).await;

        // 마지막 값은 받은 뒤 종료
        assert_eq!(seen, vec![3]);
    }
}
