//! Kline interval definitions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kline bucket width as published by the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Interval {
    /// 1-second klines.
    #[serde(rename = "1s")]
    Second1,
    /// 1-minute klines.
    #[default]
    #[serde(rename = "1m")]
    Minute1,
    /// 3-minute klines.
    #[serde(rename = "3m")]
    Minute3,
    /// 5-minute klines.
    #[serde(rename = "5m")]
    Minute5,
    /// 15-minute klines.
    #[serde(rename = "15m")]
    Minute15,
    /// 30-minute klines.
    #[serde(rename = "30m")]
    Minute30,
    /// 1-hour klines.
    #[serde(rename = "1h")]
    Hour1,
    /// 2-hour klines.
    #[serde(rename = "2h")]
    Hour2,
    /// 4-hour klines.
    #[serde(rename = "4h")]
    Hour4,
    /// 6-hour klines.
    #[serde(rename = "6h")]
    Hour6,
    /// 8-hour klines.
    #[serde(rename = "8h")]
    Hour8,
    /// 12-hour klines.
    #[serde(rename = "12h")]
    Hour12,
    /// Daily klines.
    #[serde(rename = "1d")]
    Day1,
    /// 3-day klines.
    #[serde(rename = "3d")]
    Day3,
    /// Weekly klines.
    #[serde(rename = "1w")]
    Week1,
    /// Monthly klines.
    #[serde(rename = "1mo")]
    Month1,
}

impl Interval {
    /// Returns the nominal bucket width in seconds.
    ///
    /// Monthly buckets are reported as 30 days.
    #[must_use]
    pub const fn seconds(&self) -> u64 {
        match self {
            Self::Second1 => 1,
            Self::Minute1 => 60,
            Self::Minute3 => 180,
            Self::Minute5 => 300,
            Self::Minute15 => 900,
            Self::Minute30 => 1800,
            Self::Hour1 => 3600,
            Self::Hour2 => 7200,
            Self::Hour4 => 14_400,
            Self::Hour6 => 21_600,
            Self::Hour8 => 28_800,
            Self::Hour12 => 43_200,
            Self::Day1 => 86_400,
            Self::Day3 => 259_200,
            Self::Week1 => 604_800,
            Self::Month1 => 2_592_000,
        }
    }

    /// Returns the archive's path and filename component for this interval.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Second1 => "1s",
            Self::Minute1 => "1m",
            Self::Minute3 => "3m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour2 => "2h",
            Self::Hour4 => "4h",
            Self::Hour6 => "6h",
            Self::Hour8 => "8h",
            Self::Hour12 => "12h",
            Self::Day1 => "1d",
            Self::Day3 => "3d",
            Self::Week1 => "1w",
            Self::Month1 => "1mo",
        }
    }

    /// Returns all published intervals.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Second1,
            Self::Minute1,
            Self::Minute3,
            Self::Minute5,
            Self::Minute15,
            Self::Minute30,
            Self::Hour1,
            Self::Hour2,
            Self::Hour4,
            Self::Hour6,
            Self::Hour8,
            Self::Hour12,
            Self::Day1,
            Self::Day3,
            Self::Week1,
            Self::Month1,
        ]
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = IntervalParseError;

    // Case matters: "1m" is a minute, "1M"/"1mo" is a month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "1M" {
            return Ok(Self::Month1);
        }
        Self::all()
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| IntervalParseError(s.to_string()))
    }
}

/// Error returned when parsing an invalid interval string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalParseError(String);

impl std::fmt::Display for IntervalParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid interval '{}', expected one of: \
             1s, 1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 6h, 8h, 12h, 1d, 3d, 1w, 1mo",
            self.0
        )
    }
}

impl std::error::Error for IntervalParseError {}

impl From<IntervalParseError> for crate::VaultError {
    fn from(e: IntervalParseError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_seconds() {
        assert_eq!(Interval::Minute1.seconds(), 60);
        assert_eq!(Interval::Hour4.seconds(), 14_400);
        assert_eq!(Interval::Week1.seconds(), 604_800);
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!("1m".parse::<Interval>().unwrap(), Interval::Minute1);
        assert_eq!("1mo".parse::<Interval>().unwrap(), Interval::Month1);
        assert_eq!("1M".parse::<Interval>().unwrap(), Interval::Month1);
        assert_eq!("12h".parse::<Interval>().unwrap(), Interval::Hour12);
        assert!("m1".parse::<Interval>().is_err());
    }

    #[test]
    fn test_interval_round_trips_through_display() {
        for interval in Interval::all() {
            assert_eq!(interval.to_string().parse::<Interval>().unwrap(), *interval);
        }
    }
}
