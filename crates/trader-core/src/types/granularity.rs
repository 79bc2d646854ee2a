//! 캔들 그래뉼래리티 정의.
//!
//! 거래소 캔들 API가 허용하는 봉 간격(초)만 표현합니다.

use crate::error::TraderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 캔들 한 개가 나타내는 시간 폭.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// 1분봉
    M1,
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 1시간봉
    H1,
    /// 6시간봉
    H6,
    /// 일봉
    D1,
}

impl Granularity {
    /// 지원되는 모든 그래뉼래리티.
    pub const ALL: [Granularity; 6] = [
        Granularity::M1,
        Granularity::M5,
        Granularity::M15,
        Granularity::H1,
        Granularity::H6,
        Granularity::D1,
    ];

    /// 초 단위 값을 반환합니다.
    pub fn as_secs(&self) -> u32 {
        match self {
            Granularity::M1 => 60,
            Granularity::M5 => 300,
            Granularity::M15 => 900,
            Granularity::H1 => 3600,
            Granularity::H6 => 21600,
            Granularity::D1 => 86400,
        }
    }

    /// 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.as_secs()))
    }

    /// 초 단위 값에서 변환합니다.
    pub fn from_secs(secs: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_secs() == secs)
    }

    /// 짧은 표기 ("1m", "1h" 등)를 반환합니다.
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::M1 => "1m",
            Granularity::M5 => "5m",
            Granularity::M15 => "15m",
            Granularity::H1 => "1h",
            Granularity::H6 => "6h",
            Granularity::D1 => "1d",
        }
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::H1
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Granularity {
    type Err = TraderError;

    /// "1h" 같은 표기 또는 "3600" 같은 초 단위 값을 받습니다.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(secs) = s.parse::<u32>() {
            return Self::from_secs(secs)
                .ok_or_else(|| TraderError::InvalidInput(format!("unsupported granularity: {}s", secs)));
        }

        Self::ALL
            .into_iter()
            .find(|g| g.label() == s)
            .ok_or_else(|| TraderError::InvalidInput(format!("unsupported granularity: {}", s)))
    }
}
