//! 거래소 접근 계층.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 재시도/백오프가 포함된 HTTP 요청 (`retry`)
//! - Coinbase 공개 시장 데이터 클라이언트
//! - Coinbase OAuth implicit grant 세션 관리
//! - 세션 키-값 저장소 (파일, 메모리)
//! - 취소 가능한 주기적 폴링
//! - 모의 주문 검증

pub mod connector;
pub mod error;
pub mod polling;
pub mod retry;
pub mod simulated;
pub mod store;
pub mod traits;

pub use connector::coinbase::{
    parse_candles, strip_fragment, CoinbaseClient, LoginRequest, OAuthSession, RedirectParams,
    SessionState,
};
pub use error::*;
pub use polling::{MarketPollJob, MarketSnapshot, PollHandle, PollJob, Poller, WatchlistPollJob};
pub use retry::{fetch_with_retry, RequestOptions, ResilientFetcher, RetryConfig};
pub use simulated::{OrderContext, OrderTicket, SimulatedOrder};
pub use store::{FileStore, MemoryStore, SessionStore, ACCESS_TOKEN_KEY, OAUTH_STATE_KEY};
pub use traits::*;
