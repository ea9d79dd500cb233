//! Time windows for planning and indexing.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use crate::VaultError;

/// Optional `[start, end)` bounds over UTC instants.
///
/// `None` on either side means unbounded in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Creates a new window, validating that start <= end.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidArgument`] if both bounds are set and start > end.
    pub fn new(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, VaultError> {
        if let (Some(s), Some(e)) = (start, end)
            && s > e
        {
            return Err(VaultError::InvalidArgument(format!(
                "window start {s} is after end {e}"
            )));
        }
        Ok(Self { start, end })
    }

    /// A window with no bounds at all.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Inclusive start, if bounded.
    #[must_use]
    pub const fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Exclusive end, if bounded.
    #[must_use]
    pub const fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Inclusive start in epoch milliseconds.
    #[must_use]
    pub fn start_millis(&self) -> Option<i64> {
        self.start.map(|s| s.timestamp_millis())
    }

    /// Exclusive end in epoch milliseconds.
    #[must_use]
    pub fn end_millis(&self) -> Option<i64> {
        self.end.map(|e| e.timestamp_millis())
    }

    /// The last millisecond still inside the window, if the end is bounded.
    #[must_use]
    pub fn last_instant(&self) -> Option<DateTime<Utc>> {
        self.end.map(|e| e - TimeDelta::milliseconds(1))
    }

    /// Returns true if the epoch-millisecond timestamp lies inside the window.
    #[must_use]
    pub fn contains_millis(&self, ts: i64) -> bool {
        self.start_millis().is_none_or(|s| ts >= s) && self.end_millis().is_none_or(|e| ts < e)
    }

    /// Rejects windows reaching into the current (not yet archived) UTC day.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnsupportedWindow`] if either bound is at or after
    /// midnight of `now`'s day.
    pub fn ensure_archived(&self, now: DateTime<Utc>) -> Result<(), VaultError> {
        let cutoff = today_cutoff(now);
        for instant in [self.start, self.end].into_iter().flatten() {
            if instant >= cutoff {
                return Err(VaultError::UnsupportedWindow { instant, cutoff });
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.start, self.end) {
            (Some(s), Some(e)) => write!(f, "[{}, {})", s.to_rfc3339(), e.to_rfc3339()),
            (Some(s), None) => write!(f, "[{}, ..)", s.to_rfc3339()),
            (None, Some(e)) => write!(f, "[.., {})", e.to_rfc3339()),
            (None, None) => f.write_str("[.., ..)"),
        }
    }
}

/// Start of `now`'s UTC day.
#[must_use]
pub fn today_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc()
}

/// The UTC date before `now`'s day.
#[must_use]
pub fn yesterday(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive() - TimeDelta::days(1)
}
