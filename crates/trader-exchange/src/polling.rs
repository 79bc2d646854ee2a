//! 주기적 시장 데이터 폴링.
//!
//! [`Poller`]는 [`PollJob`]을 고정 주기로 실행하는 취소 가능한 작업입니다.
//! 각 tick은 이전 tick이 끝난 뒤에 시작하므로 겹치지 않고, 밀린 tick은 건너뜁니다.
//! 테스트는 [`Poller::tick`]으로 한 번씩 직접 구동합니다.

use crate::traits::MarketDataProvider;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use trader_core::{to_exchange_symbol, CoinQuote, MarketSummary, PriceBoard, Stats, Ticker};

/// 폴링 한 회차에 수행할 작업.
#[async_trait]
pub trait PollJob: Send + Sync + 'static {
    /// 로그용 이름.
    fn name(&self) -> &str;

    /// 한 회차 실행. 실패는 작업 내부에서 처리합니다.
    async fn run(&self);
}

/// 고정 주기 폴러.
pub struct Poller<J: PollJob> {
    job: Arc<J>,
    interval: Duration,
}

impl<J: PollJob> Poller<J> {
    pub fn new(job: J, interval: Duration) -> Self {
        Self {
            job: Arc::new(job),
            interval,
        }
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    /// 한 회차를 즉시 실행합니다.
    pub async fn tick(&self) {
        self.job.run().await;
    }

    /// 백그라운드 폴링을 시작합니다.
    ///
    /// 첫 회차는 즉시 실행됩니다. 반환된 핸들을 `stop`하거나 drop하면 중지됩니다.
    pub fn start(&self) -> PollHandle {
        let cancel = CancellationToken::new();
        let job = Arc::clone(&self.job);
        let period = self.interval;
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            info!(job = job.name(), period_ms = period.as_millis() as u64, "Polling started");

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            _ = job.run() => {}
                        }
                    }
                }
            }

            info!(job = job.name(), "Polling stopped");
        });

        PollHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// 실행 중인 폴링 핸들.
pub struct PollHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// 폴링을 중지합니다. 진행 중인 회차도 취소됩니다.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 중지 후 작업이 끝날 때까지 기다립니다.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ============================================================================
// 시세 폴링
// ============================================================================

/// 한 페어의 시세/통계 스냅샷.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    /// 거래소 상품 ID
    pub symbol: String,
    pub ticker: Option<Ticker>,
    pub stats: Option<Stats>,
    /// 시세와 통계가 모두 있을 때만 계산
    pub summary: Option<MarketSummary>,
    pub fetched_at: DateTime<Utc>,
}

/// 시세와 통계를 동시에 조회해 watch 채널로 발행하는 작업.
pub struct MarketPollJob<P: MarketDataProvider> {
    provider: Arc<P>,
    symbol: String,
    tx: watch::Sender<Option<MarketSnapshot>>,
}

impl<P: MarketDataProvider + 'static> MarketPollJob<P> {
    /// 작업과 스냅샷 수신자를 생성합니다.
    pub fn new(provider: Arc<P>, pair: &str) -> (Self, watch::Receiver<Option<MarketSnapshot>>) {
        let (tx, rx) = watch::channel(None);
        let job = Self {
            provider,
            symbol: to_exchange_symbol(pair),
            tx,
        };
        (job, rx)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

#[async_trait]
impl<P: MarketDataProvider + 'static> PollJob for MarketPollJob<P> {
    fn name(&self) -> &str {
        "market"
    }

    async fn run(&self) {
        let (ticker, stats) = tokio::join!(
            self.provider.get_ticker(&self.symbol),
            self.provider.get_stats(&self.symbol)
        );

        let summary = match (&ticker, &stats) {
            (Some(t), Some(s)) => Some(MarketSummary::from_parts(t, s)),
            _ => None,
        };

        debug!(symbol = %self.symbol, has_summary = summary.is_some(), "Market snapshot fetched");

        self.tx.send_replace(Some(MarketSnapshot {
            symbol: self.symbol.clone(),
            ticker,
            stats,
            summary,
            fetched_at: Utc::now(),
        }));
    }
}

/// 가격 보드의 모든 페어 시세를 동시에 조회하는 작업.
pub struct WatchlistPollJob<P: MarketDataProvider> {
    provider: Arc<P>,
    board: Mutex<PriceBoard>,
    tx: watch::Sender<Vec<CoinQuote>>,
}

impl<P: MarketDataProvider + 'static> WatchlistPollJob<P> {
    /// 작업과 보드 행 수신자를 생성합니다.
    pub fn new(provider: Arc<P>, board: PriceBoard) -> (Self, watch::Receiver<Vec<CoinQuote>>) {
        let (tx, rx) = watch::channel(board.rows().to_vec());
        let job = Self {
            provider,
            board: Mutex::new(board),
            tx,
        };
        (job, rx)
    }

    /// 현재 보드 행.
    pub async fn rows(&self) -> Vec<CoinQuote> {
        self.board.lock().await.rows().to_vec()
    }
}

#[async_trait]
impl<P: MarketDataProvider + 'static> PollJob for WatchlistPollJob<P> {
    fn name(&self) -> &str {
        "watchlist"
    }

    async fn run(&self) {
        let pairs = self.board.lock().await.pairs();

        let prices = join_all(pairs.iter().map(|pair| async move {
            let ticker = self.provider.get_ticker(&to_exchange_symbol(pair)).await;
            (pair, ticker.map(|t| t.price))
        }))
        .await;

        let mut board = self.board.lock().await;
        for (pair, price) in prices {
            board.update(pair, price);
        }
        self.tx.send_replace(board.rows().to_vec());
    }
}
