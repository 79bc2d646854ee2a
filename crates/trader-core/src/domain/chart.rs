//! 차트 조회 범위.
//!
//! 차트 화면의 1h / 4h / 1d 토글을 캔들 그래뉼래리티와 조회 구간으로 변환합니다.
//! 구간은 마지막 정시에 끝나므로 진행 중인 캔들은 포함되지 않습니다.

use crate::error::TraderError;
use crate::types::Granularity;
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 차트 조회 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartRange {
    /// 최근 1시간 (5분봉)
    #[serde(rename = "1h")]
    OneHour,
    /// 최근 4시간 (15분봉)
    #[serde(rename = "4h")]
    FourHours,
    /// 최근 24시간 (1시간봉)
    #[serde(rename = "1d")]
    OneDay,
}

impl ChartRange {
    /// 범위에 대응하는 캔들 간격을 반환합니다.
    pub fn granularity(&self) -> Granularity {
        match self {
            ChartRange::OneHour => Granularity::M5,
            ChartRange::FourHours => Granularity::M15,
            ChartRange::OneDay => Granularity::H1,
        }
    }

    /// 범위 길이를 반환합니다.
    pub fn span(&self) -> Duration {
        match self {
            ChartRange::OneHour => Duration::hours(1),
            ChartRange::FourHours => Duration::hours(4),
            ChartRange::OneDay => Duration::hours(24),
        }
    }

    /// `now` 기준 조회 구간 `(start, end)`를 반환합니다.
    ///
    /// `end`는 `now`를 정시로 내림한 값입니다.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = now.duration_trunc(Duration::hours(1)).unwrap_or(now);
        (end - self.span(), end)
    }
}

impl Default for ChartRange {
    fn default() -> Self {
        ChartRange::OneDay
    }
}

impl FromStr for ChartRange {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(ChartRange::OneHour),
            "4h" => Ok(ChartRange::FourHours),
            "1d" => Ok(ChartRange::OneDay),
            _ => Err(TraderError::InvalidInput(format!("unknown chart range: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_granularity_mapping() {
        assert_eq!(ChartRange::OneHour.granularity().as_secs(), 300);
        assert_eq!(ChartRange::FourHours.granularity().as_secs(), 900);
        assert_eq!(ChartRange::OneDay.granularity().as_secs(), 3600);
    }

    #[test]
    fn test_window_ends_on_full_hour() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 14, 37, 12).unwrap();

        let (start, end) = ChartRange::FourHours.window(now);
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap());
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap());

        let (start, _) = ChartRange::OneDay.window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 9, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_parse() {
        assert_eq!("4h".parse::<ChartRange>().unwrap(), ChartRange::FourHours);
        assert!("1w".parse::<ChartRange>().is_err());
    }
}
