//! 트레이딩 대시보드 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # Coinbase 로그인 (브라우저에서 승인 후 리다이렉트 URL 전달)
//! trader login
//! trader callback 'http://localhost:3000/#access_token=...&state=...'
//!
//! # 시세와 24시간 요약
//! trader ticker BTC/USDT
//! trader summary ETH/USDT
//!
//! # 최근 4시간 15분봉
//! trader candles BTC/USDT --range 4h
//!
//! # 가격 보드 (5초 주기)
//! trader watch --favorite SOL/USDT
//!
//! # 모의 지정가 매수
//! trader order BTC/USDT --side buy --type limit --amount 0.01 --price 48000
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use trader_cli::commands::market::{parse_time, CandlesConfig};
use trader_cli::commands::order::{format_order, place_order, OrderConfig};
use trader_cli::commands::watch::{watch_board, watch_pair, WatchConfig};
use trader_cli::commands::{auth, market, AppContext, OutputFormat};
use trader_core::{init_logging, ChartRange, Granularity, LogConfig, OrderType, Side, Symbol};
use trader_exchange::DEFAULT_BOOK_LEVEL;

#[derive(Parser)]
#[command(name = "trader")]
#[command(about = "Trading dashboard CLI - Coinbase 시세 조회와 OAuth 로그인", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로 (기본: config/default.toml, 없으면 환경 변수만)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 출력 형식 (table, json)
    #[arg(short, long, global = true, default_value = "table")]
    format: String,

    /// 로그 레벨 (설정 파일 값 덮어쓰기)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Coinbase 로그인 URL 생성
    Login,

    /// 인가 서버 리다이렉트 URL 처리
    Callback {
        /// 브라우저 주소창의 전체 URL (fragment 포함)
        url: String,
    },

    /// 세션 상태 확인
    Status,

    /// 저장된 토큰 삭제
    Logout,

    /// 계좌 잔고 조회 (로그인 필요)
    Balances,

    /// 거래 상품 목록
    Products {
        /// 거래 가능한 상품만
        #[arg(long)]
        online: bool,
    },

    /// 현재 시세
    Ticker {
        /// 거래 페어 (예: BTC/USDT, BTC-USD)
        pair: String,
    },

    /// 24시간 통계
    Stats {
        /// 거래 페어
        pair: String,
    },

    /// 시세 + 24시간 통계 요약
    Summary {
        /// 거래 페어
        pair: String,
    },

    /// 캔들 조회
    Candles {
        /// 거래 페어
        pair: String,

        /// 차트 범위 (1h, 4h, 1d). 지정하면 간격/기간 무시
        #[arg(short, long)]
        range: Option<String>,

        /// 캔들 간격 (1m, 5m, 15m, 1h, 6h, 1d 또는 초)
        #[arg(short, long)]
        granularity: Option<String>,

        /// 시작 시각 (RFC 3339 또는 YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// 종료 시각 (RFC 3339 또는 YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// 호가창
    Book {
        /// 거래 페어
        pair: String,

        /// 집계 레벨 (1~3)
        #[arg(short, long, default_value_t = DEFAULT_BOOK_LEVEL)]
        level: u8,

        /// 한쪽에 표시할 호가 수
        #[arg(short, long, default_value = "10")]
        depth: usize,
    },

    /// 가격 보드 또는 단일 페어 실시간 감시
    Watch {
        /// 감시할 페어 (비어 있으면 기본 목록)
        pairs: Vec<String>,

        /// 폴링 주기 (초, 기본: 설정 파일 값)
        #[arg(short, long)]
        interval: Option<u64>,

        /// 즐겨찾기 추가 (여러 번 지정 가능)
        #[arg(long = "favorite")]
        favorites: Vec<String>,

        /// 즐겨찾기만 표시
        #[arg(long)]
        favorites_only: bool,

        /// 페어/이름 검색
        #[arg(short, long)]
        search: Option<String>,

        /// 단일 페어 요약 모드
        #[arg(long)]
        detail: bool,

        /// 지정 횟수만큼 출력 후 종료
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// 모의 주문 (실제 주문은 전송하지 않음)
    Order {
        /// 거래 페어
        pair: String,

        /// 매수/매도 (buy, sell)
        #[arg(short, long)]
        side: String,

        /// 주문 유형 (market, limit)
        #[arg(short = 't', long = "type", default_value = "market")]
        order_type: String,

        /// 기준 자산 수량
        #[arg(short, long)]
        amount: Decimal,

        /// 지정가
        #[arg(short, long)]
        price: Option<Decimal>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let ctx = match AppContext::load(cli.config.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let mut log_config = LogConfig::from_settings(&ctx.config.logging);
    if let Some(level) = &cli.log_level {
        log_config.level = level.clone();
    }
    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli, &ctx).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, ctx: &AppContext) -> Result<()> {
    let format = OutputFormat::parse(&cli.format)?;

    let output = match cli.command {
        Commands::Login => auth::login(ctx).await?,
        Commands::Callback { url } => auth::callback(ctx, &url).await?,
        Commands::Status => auth::status(ctx).await?,
        Commands::Logout => auth::logout(ctx).await?,
        Commands::Balances => auth::balances(ctx, format).await?,
        Commands::Products { online } => market::products(ctx, online, format).await?,
        Commands::Ticker { pair } => market::ticker(ctx, &pair, format).await?,
        Commands::Stats { pair } => market::stats(ctx, &pair, format).await?,
        Commands::Summary { pair } => market::summary(ctx, &pair, format).await?,
        Commands::Candles {
            pair,
            range,
            granularity,
            start,
            end,
        } => {
            let config = CandlesConfig {
                range: range.as_deref().map(str::parse::<ChartRange>).transpose()?,
                granularity: granularity.as_deref().map(str::parse::<Granularity>).transpose()?,
                start: start.as_deref().map(parse_time).transpose()?,
                end: end.as_deref().map(parse_time).transpose()?,
            };
            market::candles(ctx, &pair, &config, format).await?
        }
        Commands::Book { pair, level, depth } => market::book(ctx, &pair, level, depth, format).await?,
        Commands::Watch {
            pairs,
            interval,
            favorites,
            favorites_only,
            search,
            detail,
            count,
        } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| ctx.config.polling.interval());
            if interval.is_zero() {
                anyhow::bail!("Polling interval must be positive");
            }

            if detail {
                let pair = pairs.first().context("--detail requires a pair")?;
                watch_pair(ctx, pair, interval, count).await?;
            } else {
                watch_board(
                    ctx,
                    WatchConfig {
                        pairs,
                        favorites,
                        search,
                        favorites_only,
                        interval,
                        max_updates: count,
                    },
                )
                .await?;
            }
            return Ok(());
        }
        Commands::Order {
            pair,
            side,
            order_type,
            amount,
            price,
        } => {
            let config = OrderConfig {
                pair: pair.parse::<Symbol>()?,
                side: side.parse::<Side>()?,
                order_type: order_type.parse::<OrderType>()?,
                amount,
                price,
            };
            let order = place_order(ctx, &config).await?;
            info!(order_id = %order.id, "Simulated order accepted");
            format_order(&order, format)?
        }
    };

    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candles_args() {
        let cli = Cli::try_parse_from(["trader", "candles", "BTC/USDT", "--range", "4h", "-f", "json"]).unwrap();
        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Candles { pair, range, .. } => {
                assert_eq!(pair, "BTC/USDT");
                assert_eq!(range.as_deref(), Some("4h"));
            }
            _ => panic!("expected candles"),
        }
    }

    #[test]
    fn test_parse_order_args() {
        let cli = Cli::try_parse_from([
            "trader", "order", "ETH/USDT", "--side", "sell", "--type", "limit", "--amount", "0.5", "--price",
            "3000",
        ])
        .unwrap();
        match cli.command {
            Commands::Order {
                side,
                order_type,
                amount,
                price,
                ..
            } => {
                assert_eq!(side, "sell");
                assert_eq!(order_type, "limit");
                assert_eq!(amount, Decimal::new(5, 1));
                assert_eq!(price, Some(Decimal::from(3000)));
            }
            _ => panic!("expected order"),
        }
    }

    #[test]
    fn test_parse_watch_args() {
        let cli = Cli::try_parse_from([
            "trader", "watch", "BTC/USDT", "SOL/USDT", "--favorite", "SOL/USDT", "-n", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Watch {
                pairs,
                favorites,
                count,
                detail,
                ..
            } => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(favorites, vec!["SOL/USDT".to_string()]);
                assert_eq!(count, Some(3));
                assert!(!detail);
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["trader", "status", "--config", "custom.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_callback_requires_url() {
        assert!(Cli::try_parse_from(["trader", "callback"]).is_err());
    }
}
