//! Selects the shards covering a time window.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use klinevault_types::{
    DataKind, DateKey, Granularity, Interval, Result, ShardKey, Symbol, TimeWindow, TradeType,
    VaultConfig, yesterday,
};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::url::archive_url;
use crate::{ArchiveSource, ListingQuery, list_available_dates_at};

/// A shard selected for the window, not yet confirmed present locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDownload {
    /// Shard identity (symbol, date key, trade type, granularity, interval).
    pub key: ShardKey,
    /// Final CSV path under the data root.
    pub local_path: PathBuf,
    /// Remote archive URL.
    pub url: String,
}

impl PlannedDownload {
    fn new(key: ShardKey, config: &VaultConfig) -> Self {
        Self {
            local_path: key.local_path(config.data_root()),
            url: archive_url(&config.archive_base_url, &key),
            key,
        }
    }

    /// Returns the granularity of the planned shard.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        self.key.granularity()
    }

    /// Returns true if the final CSV already exists.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.local_path.exists()
    }
}

/// Parameters of one planning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    /// Exchange symbol.
    pub symbol: Symbol,
    /// `[start, end)` window.
    pub window: TimeWindow,
    /// Data kind; only klines are implemented.
    pub kind: DataKind,
    /// Market segment.
    pub trade: TradeType,
    /// Kline interval.
    pub interval: Interval,
    /// Drop shards whose CSV already exists locally.
    pub truncate: bool,
}

impl PlanRequest {
    /// Creates a request with the config's kind, trade type and interval.
    #[must_use]
    pub fn new(symbol: Symbol, window: TimeWindow, config: &VaultConfig) -> Self {
        Self {
            symbol,
            window,
            kind: config.kind,
            trade: config.trade,
            interval: config.interval,
            truncate: false,
        }
    }

    /// Sets truncate mode.
    #[must_use]
    pub const fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    fn listing(&self, granularity: Granularity) -> ListingQuery {
        ListingQuery {
            kind: self.kind,
            trade: self.trade,
            granularity,
            symbol: self.symbol.clone(),
            interval: self.interval,
        }
    }
}

/// Plans the shard downloads covering `request.window` as of now.
///
/// See [`plan_downloads_at`].
///
/// # Errors
///
/// See [`plan_downloads_at`].
pub async fn plan_downloads<S>(
    source: &S,
    config: &VaultConfig,
    request: &PlanRequest,
) -> Result<Vec<PlannedDownload>>
where
    S: ArchiveSource + ?Sized,
{
    plan_downloads_at(source, config, request, Utc::now()).await
}

/// Plans the shard downloads covering `request.window` as of `now`.
///
/// Monthly shards are taken from the published catalog: the contiguous run
/// whose months intersect the window (unbounded sides extend to the oldest or
/// newest month). When the window reaches into the current, unpublished month,
/// daily shards are added for its elapsed days, up to yesterday. The result is
/// ordered by date key.
///
/// # Errors
///
/// - [`VaultError::NotImplemented`](klinevault_types::VaultError::NotImplemented) for data kinds other than klines.
/// - [`VaultError::UnsupportedWindow`](klinevault_types::VaultError::UnsupportedWindow) if a bound lies in today.
/// - [`VaultError::IncompleteListing`](klinevault_types::VaultError::IncompleteListing) from the catalog walk.
pub async fn plan_downloads_at<S>(
    source: &S,
    config: &VaultConfig,
    request: &PlanRequest,
    now: DateTime<Utc>,
) -> Result<Vec<PlannedDownload>>
where
    S: ArchiveSource + ?Sized,
{
    request.kind.ensure_supported()?;
    let window = request.window;
    window.ensure_archived(now)?;

    if window.start().is_some() && window.start() == window.end() {
        return Ok(Vec::new());
    }

    let today = now.date_naive();
    let months = list_available_dates_at(
        source,
        config,
        &request.listing(Granularity::Monthly),
        today,
    )
    .await?;

    if months.is_empty() {
        info!(symbol = %request.symbol, "no archived months");
        return Ok(Vec::new());
    }

    let first_month = window.start().map(|s| DateKey::month_of(s.date_naive()));
    let last_month = window.last_instant().map(|e| DateKey::month_of(e.date_naive()));

    let mut dates: Vec<DateKey> = months
        .into_iter()
        .filter(|m| first_month.is_none_or(|f| *m >= f))
        .filter(|m| last_month.is_none_or(|l| *m <= l))
        .collect();
    dates.extend(trailing_days(&window, now));

    let mut plan: Vec<PlannedDownload> = dates
        .into_iter()
        .map(|date| PlannedDownload::new(request.listing(date.granularity()).shard(date), config))
        .collect();
    plan.sort_by(|a, b| a.key.date.cmp(&b.key.date));

    let planned = plan.len();
    if request.truncate {
        plan.retain(|p| !p.is_present());
    }

    debug!(
        symbol = %request.symbol,
        window = %window,
        planned,
        pending = plan.len(),
        "planned downloads"
    );
    Ok(plan)
}

/// Day keys of the current month covered by the window, through yesterday.
fn trailing_days(window: &TimeWindow, now: DateTime<Utc>) -> Vec<DateKey> {
    let today = now.date_naive();
    let Some(month_start) = NaiveDate::from_ymd_opt(today.year(), today.month(), 1) else {
        return Vec::new();
    };
    let yesterday = yesterday(now);
    if yesterday < month_start {
        return Vec::new();
    }

    let last_day = match window.last_instant() {
        None => yesterday,
        Some(last) if last.date_naive() >= month_start => last.date_naive().min(yesterday),
        Some(_) => return Vec::new(),
    };
    let first_day = match window.start() {
        Some(start) if start.date_naive() >= month_start => start.date_naive(),
        _ => month_start,
    };

    first_day
        .iter_days()
        .take_while(|d| *d <= last_day)
        .map(DateKey::Day)
        .collect()
}
