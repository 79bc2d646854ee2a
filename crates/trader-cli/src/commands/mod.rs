//! CLI 명령 모듈.

pub mod auth;
pub mod context;
pub mod market;
pub mod order;
pub mod output;
pub mod watch;

pub use context::AppContext;
pub use output::OutputFormat;
