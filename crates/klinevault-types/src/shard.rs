//! Shard identity: symbols, trade types, granularities and date keys.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Interval, VaultError};

/// An exchange symbol such as `BTCUSDT`, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Creates a symbol, rejecting empty or non-alphanumeric input.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidArgument`] for malformed symbols.
    pub fn new(raw: &str) -> Result<Self, VaultError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(VaultError::InvalidArgument(format!("invalid symbol '{raw}'")));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

/// Market segment the archive is partitioned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TradeType {
    /// Spot market.
    #[default]
    #[serde(rename = "spot")]
    Spot,
    /// USD-margined futures.
    #[serde(rename = "futures/um")]
    UsdMargined,
    /// Coin-margined futures.
    #[serde(rename = "futures/cm")]
    CoinMargined,
}

impl TradeType {
    /// Returns the archive path segment for this trade type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::UsdMargined => "futures/um",
            Self::CoinMargined => "futures/cm",
        }
    }
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spot" => Ok(Self::Spot),
            "um" | "futures/um" => Ok(Self::UsdMargined),
            "cm" | "futures/cm" => Ok(Self::CoinMargined),
            _ => Err(VaultError::InvalidArgument(format!(
                "invalid trade type '{s}', expected one of: spot, um, cm"
            ))),
        }
    }
}

/// Whether a shard covers a calendar month or a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One shard per calendar month.
    Monthly,
    /// One shard per day.
    Daily,
}

impl Granularity {
    /// Returns the archive path segment for this granularity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Daily => "daily",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" | "month" => Ok(Self::Monthly),
            "daily" | "day" => Ok(Self::Daily),
            _ => Err(VaultError::InvalidArgument(format!(
                "invalid granularity '{s}', expected monthly or daily"
            ))),
        }
    }
}

/// Kind of trading data held by the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataKind {
    /// Candlestick records.
    #[default]
    #[serde(rename = "klines")]
    Klines,
    /// Individual trades.
    #[serde(rename = "trades")]
    Trades,
    /// Aggregated trades.
    #[serde(rename = "aggTrades")]
    AggTrades,
}

impl DataKind {
    /// Returns the archive path segment for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Klines => "klines",
            Self::Trades => "trades",
            Self::AggTrades => "aggTrades",
        }
    }

    /// Fails for kinds other than klines.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotImplemented`] for trades and aggregated trades.
    pub fn ensure_supported(&self) -> Result<(), VaultError> {
        match self {
            Self::Klines => Ok(()),
            other => Err(VaultError::NotImplemented(other.as_str().to_string())),
        }
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "klines" => Ok(Self::Klines),
            "trades" => Ok(Self::Trades),
            "aggTrades" => Ok(Self::AggTrades),
            _ => Err(VaultError::InvalidArgument(format!(
                "invalid data kind '{s}', expected one of: klines, trades, aggTrades"
            ))),
        }
    }
}

/// Date component of a shard key: `YYYY-MM` or `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateKey {
    /// A calendar month.
    Month {
        /// Year.
        year: i32,
        /// Month, 1-based.
        month: u32,
    },
    /// A single day.
    Day(NaiveDate),
}

impl DateKey {
    /// Creates a month key.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidArgument`] if `month` is not in `1..=12`.
    pub fn month(year: i32, month: u32) -> Result<Self, VaultError> {
        if !(1..=12).contains(&month) {
            return Err(VaultError::InvalidArgument(format!(
                "invalid month {month} in {year}"
            )));
        }
        Ok(Self::Month { year, month })
    }

    /// Returns the month key containing `date`.
    #[must_use]
    pub fn month_of(date: NaiveDate) -> Self {
        Self::Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Returns the month preceding `date`'s month.
    #[must_use]
    pub fn previous_month(date: NaiveDate) -> Self {
        if date.month() == 1 {
            Self::Month {
                year: date.year() - 1,
                month: 12,
            }
        } else {
            Self::Month {
                year: date.year(),
                month: date.month() - 1,
            }
        }
    }

    /// The newest key the archive is expected to publish as of `today`:
    /// the previous month for monthly shards, yesterday for daily shards.
    #[must_use]
    pub fn boundary(granularity: Granularity, today: NaiveDate) -> Self {
        match granularity {
            Granularity::Monthly => Self::previous_month(today),
            Granularity::Daily => Self::Day(today - chrono::TimeDelta::days(1)),
        }
    }

    /// Parses a key of the given granularity.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidArgument`] if the string does not match.
    pub fn parse(s: &str, granularity: Granularity) -> Result<Self, VaultError> {
        let invalid = || {
            VaultError::InvalidArgument(format!("invalid {granularity} date key '{s}'"))
        };
        match granularity {
            Granularity::Monthly => {
                let (year, month) = s.split_once('-').ok_or_else(invalid)?;
                if year.len() != 4 || month.len() != 2 {
                    return Err(invalid());
                }
                let year = year.parse().map_err(|_| invalid())?;
                let month = month.parse().map_err(|_| invalid())?;
                Self::month(year, month).map_err(|_| invalid())
            }
            Granularity::Daily => {
                if s.len() != 10 {
                    return Err(invalid());
                }
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(Self::Day)
                    .map_err(|_| invalid())
            }
        }
    }

    /// Returns the granularity implied by this key.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        match self {
            Self::Month { .. } => Granularity::Monthly,
            Self::Day(_) => Granularity::Daily,
        }
    }

    /// Returns the year.
    #[must_use]
    pub fn year(&self) -> i32 {
        match self {
            Self::Month { year, .. } => *year,
            Self::Day(d) => d.year(),
        }
    }

    /// Returns the 1-based month.
    #[must_use]
    pub fn month_number(&self) -> u32 {
        match self {
            Self::Month { month, .. } => *month,
            Self::Day(d) => d.month(),
        }
    }

    /// Returns the first day covered by this key.
    #[must_use]
    pub fn first_day(&self) -> Option<NaiveDate> {
        match self {
            Self::Month { year, month } => NaiveDate::from_ymd_opt(*year, *month, 1),
            Self::Day(d) => Some(*d),
        }
    }

    fn sort_tuple(&self) -> (i32, u32, u32) {
        match self {
            Self::Month { year, month } => (*year, *month, 0),
            Self::Day(d) => (d.year(), d.month(), d.day()),
        }
    }
}

impl Ord for DateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_tuple().cmp(&other.sort_tuple())
    }
}

impl PartialOrd for DateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for DateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            Self::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for DateKey {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.len() {
            7 => Self::parse(s, Granularity::Monthly),
            _ => Self::parse(s, Granularity::Daily),
        }
    }
}

/// Identity of one remote archive shard and its local CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShardKey {
    /// Data kind.
    pub kind: DataKind,
    /// Market segment.
    pub trade: TradeType,
    /// Exchange symbol.
    pub symbol: Symbol,
    /// Kline interval.
    pub interval: Interval,
    /// Month or day covered.
    pub date: DateKey,
}

impl ShardKey {
    /// Creates a new shard key.
    #[must_use]
    pub const fn new(
        kind: DataKind,
        trade: TradeType,
        symbol: Symbol,
        interval: Interval,
        date: DateKey,
    ) -> Self {
        Self {
            kind,
            trade,
            symbol,
            interval,
            date,
        }
    }

    /// Returns the granularity implied by the date key.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        self.date.granularity()
    }

    /// `{SYMBOL}-{interval}-{date}`, shared by the archive and CSV names.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("{}-{}-{}", self.symbol, self.interval, self.date)
    }

    /// Name of the extracted CSV file.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.file_stem())
    }

    /// Name of the remote zip archive.
    #[must_use]
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.file_stem())
    }

    /// Directory holding this shard under `data_root`.
    ///
    /// Layout: `<root>/historical/bulk/<kind>/<trade>/<granularity>/<SYMBOL>/<interval>`.
    #[must_use]
    pub fn local_dir(&self, data_root: &Path) -> PathBuf {
        data_root
            .join("historical")
            .join("bulk")
            .join(self.kind.as_str())
            .join(self.trade.as_str())
            .join(self.granularity().as_str())
            .join(self.symbol.as_str())
            .join(self.interval.as_str())
    }

    /// Full path of the extracted CSV file under `data_root`.
    #[must_use]
    pub fn local_path(&self, data_root: &Path) -> PathBuf {
        self.local_dir(data_root).join(self.file_name())
    }

    /// Like [`Self::local_path`], creating the parent directories first.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn ensure_local_path(&self, data_root: &Path) -> std::io::Result<PathBuf> {
        let dir = self.local_dir(data_root);
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(self.file_name()))
    }
}

impl std::fmt::Display for ShardKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.trade,
            self.granularity(),
            self.kind,
            self.file_stem()
        )
    }
}
