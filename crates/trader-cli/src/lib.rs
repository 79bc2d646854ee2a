//! 트레이딩 대시보드 CLI 라이브러리.

pub mod commands;

pub use commands::*;
