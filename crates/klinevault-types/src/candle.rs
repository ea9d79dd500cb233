//! Candle (kline) row representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single kline row as stored in a shard CSV.
///
/// Column order follows the archive: open time, OHLC, base volume, close time,
/// quote volume, trade count, taker buy volumes and an unused trailing field.
/// Both time columns are epoch milliseconds once normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket open time.
    pub open_time: i64,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Base asset volume.
    pub volume: f64,
    /// Bucket close time.
    pub close_time: i64,
    /// Quote asset volume.
    pub quote_volume: f64,
    /// Number of trades.
    pub trades: u64,
    /// Taker buy base asset volume.
    pub taker_buy_base_volume: f64,
    /// Taker buy quote asset volume.
    pub taker_buy_quote_volume: f64,
    /// Unused by the archive; kept for column parity.
    pub ignore: f64,
}

impl Candle {
    /// Returns the open time as a UTC instant.
    #[must_use]
    pub fn open_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }

    /// Returns the close time as a UTC instant.
    #[must_use]
    pub fn close_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.close_time)
    }

    /// Rescales both time columns from `unit` to milliseconds.
    #[must_use]
    pub const fn normalized(mut self, unit: TimestampUnit) -> Self {
        self.open_time = unit.to_millis(self.open_time);
        self.close_time = unit.to_millis(self.close_time);
        self
    }
}

/// Epoch unit of a shard's time columns.
///
/// The archive has published seconds, milliseconds and (since 2025 for spot)
/// microseconds. Detection looks at the magnitude of the leading timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampUnit {
    /// Whole seconds.
    Seconds,
    /// Milliseconds.
    Millis,
    /// Microseconds.
    Micros,
}

impl TimestampUnit {
    /// Values below this are seconds (1e11 s is the year 5138).
    const SECONDS_LIMIT: i64 = 100_000_000_000;
    /// Values below this (and above the seconds limit) are milliseconds.
    const MILLIS_LIMIT: i64 = 100_000_000_000_000;

    /// Infers the unit from a representative timestamp.
    #[must_use]
    pub const fn detect(value: i64) -> Self {
        let magnitude = value.unsigned_abs();
        if magnitude < Self::SECONDS_LIMIT as u64 {
            Self::Seconds
        } else if magnitude < Self::MILLIS_LIMIT as u64 {
            Self::Millis
        } else {
            Self::Micros
        }
    }

    /// Converts a value in this unit to milliseconds.
    #[must_use]
    pub const fn to_millis(&self, value: i64) -> i64 {
        match self {
            Self::Seconds => value.saturating_mul(1000),
            Self::Millis => value,
            Self::Micros => value / 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open_time: i64, close_time: i64) -> Candle {
        Candle {
            open_time,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10.0,
            close_time,
            quote_volume: 15.0,
            trades: 3,
            taker_buy_base_volume: 4.0,
            taker_buy_quote_volume: 6.0,
            ignore: 0.0,
        }
    }

    #[test]
    fn test_detect_units() {
        // 2023-01-01T00:00:00Z in each unit.
        assert_eq!(TimestampUnit::detect(1_672_531_200), TimestampUnit::Seconds);
        assert_eq!(TimestampUnit::detect(1_672_531_200_000), TimestampUnit::Millis);
        assert_eq!(
            TimestampUnit::detect(1_672_531_200_000_000),
            TimestampUnit::Micros
        );
    }

    #[test]
    fn test_normalize_seconds_and_micros_agree_with_millis() {
        let millis = candle(1_672_531_200_000, 1_672_531_259_999);
        let from_secs = candle(1_672_531_200, 1_672_531_259).normalized(TimestampUnit::Seconds);
        let from_micros = candle(1_672_531_200_000_000, 1_672_531_259_999_999)
            .normalized(TimestampUnit::Micros);

        assert_eq!(from_secs.open_time, millis.open_time);
        assert_eq!(from_micros, millis);
        assert_eq!(millis.normalized(TimestampUnit::Millis), millis);
    }

    #[test]
    fn test_open_at() {
        let c = candle(1_672_531_200_000, 1_672_531_259_999);
        assert_eq!(c.open_at().unwrap().to_rfc3339(), "2023-01-01T00:00:00+00:00");
    }
}
