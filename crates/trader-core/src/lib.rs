//! # Trader Core
//!
//! 트레이딩 대시보드의 도메인 타입과 공통 인프라를 제공합니다:
//! - 심볼 및 거래소 형식 변환
//! - 시세, 통계, 캔들, 호가창, 상품 스냅샷
//! - 차트 범위, 코인 목록, 계좌 잔고
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
