//! 대시보드 도메인 모델.

mod account;
mod chart;
mod market_data;
mod order;
mod watchlist;

pub use account::*;
pub use chart::*;
pub use market_data::*;
pub use order::*;
pub use watchlist::*;
