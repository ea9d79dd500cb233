//! Paginated walk over the remote bucket listing.

use chrono::{NaiveDate, Utc};
use klinevault_types::{
    DataKind, DateKey, Granularity, Interval, Result, ShardKey, Symbol, TradeType, VaultConfig,
    VaultError,
};
use tracing::{debug, warn};

use crate::ArchiveSource;
use crate::url::{CHECKSUM_SUFFIX, date_from_key, listing_prefix, listing_url};

/// Which listing to walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// Data kind.
    pub kind: DataKind,
    /// Market segment.
    pub trade: TradeType,
    /// Monthly or daily archives.
    pub granularity: Granularity,
    /// Exchange symbol.
    pub symbol: Symbol,
    /// Kline interval.
    pub interval: Interval,
}

impl ListingQuery {
    /// Creates a query using the config's kind, trade type and interval.
    #[must_use]
    pub fn new(symbol: Symbol, granularity: Granularity, config: &VaultConfig) -> Self {
        Self {
            kind: config.kind,
            trade: config.trade,
            granularity,
            symbol,
            interval: config.interval,
        }
    }

    /// Bucket prefix for this listing.
    #[must_use]
    pub fn prefix(&self) -> String {
        listing_prefix(
            self.kind,
            self.trade,
            self.granularity,
            &self.symbol,
            self.interval,
        )
    }

    /// Shard key for one of this listing's dates.
    #[must_use]
    pub fn shard(&self, date: DateKey) -> ShardKey {
        ShardKey::new(self.kind, self.trade, self.symbol.clone(), self.interval, date)
    }
}

/// Lists every published date key for `query`, oldest first.
///
/// See [`list_available_dates_at`].
///
/// # Errors
///
/// Returns [`VaultError::IncompleteListing`] if the walk does not end on the
/// expected boundary key, or any error raised by `source`.
pub async fn list_available_dates<S>(
    source: &S,
    config: &VaultConfig,
    query: &ListingQuery,
) -> Result<Vec<DateKey>>
where
    S: ArchiveSource + ?Sized,
{
    list_available_dates_at(source, config, query, Utc::now().date_naive()).await
}

/// Lists every published date key for `query` as of `today`, oldest first.
///
/// Pages are requested one at a time, each continuing after the last archive
/// key seen. Checksum objects are skipped. The walk stops when:
///
/// - a page holds exactly one key (the service echoing the last archive's
///   checksum), in which case the collected tail must be the boundary key;
/// - nothing has been collected (an empty archive yields an empty list);
/// - the newest collected key is the boundary: the previous month for monthly
///   listings, yesterday for daily ones.
///
/// A page that adds nothing is logged and the walk continues, up to
/// `config.max_stalled_pages` consecutive times.
///
/// # Errors
///
/// Returns [`VaultError::IncompleteListing`] if the walk does not end on the
/// boundary key, or any error raised by `source`.
pub async fn list_available_dates_at<S>(
    source: &S,
    config: &VaultConfig,
    query: &ListingQuery,
    today: NaiveDate,
) -> Result<Vec<DateKey>>
where
    S: ArchiveSource + ?Sized,
{
    query.kind.ensure_supported()?;

    let boundary = DateKey::boundary(query.granularity, today);
    let prefix = query.prefix();
    let decode = |key: &str| date_from_key(key, &query.symbol, query.interval, query.granularity);

    let mut dates: Vec<DateKey> = Vec::new();
    let mut marker: Option<String> = None;
    let mut stalled = 0usize;

    loop {
        let url = listing_url(&config.listing_base_url, &prefix, marker.as_deref());
        let body = source.fetch_listing(&url).await?;
        let keys = parse_listing_keys(&body);
        debug!(%prefix, page_keys = keys.len(), collected = dates.len(), "listing page");

        if let [only] = keys.as_slice() {
            if dates.is_empty()
                && let Some(date) = decode(*only)
            {
                dates.push(date);
            }
            break;
        }

        let before = dates.len();
        for key in keys {
            if key.ends_with(CHECKSUM_SUFFIX) {
                continue;
            }
            marker = Some(key.to_string());
            match decode(key) {
                Some(date) if dates.last().is_none_or(|last| date > *last) => dates.push(date),
                Some(_) => {}
                None => warn!(key, "skipping unrecognized listing key"),
            }
        }

        if dates.is_empty() {
            break;
        }
        if dates.last() == Some(&boundary) {
            break;
        }

        if dates.len() == before {
            stalled += 1;
            warn!(%prefix, stalled, "listing page yielded no new keys");
            if stalled >= config.max_stalled_pages {
                return Err(incomplete(&prefix, boundary, dates.last()));
            }
        } else {
            stalled = 0;
        }
    }

    match dates.last() {
        Some(last) if *last != boundary => Err(incomplete(&prefix, boundary, Some(last))),
        _ => {
            debug!(%prefix, count = dates.len(), "listing complete");
            Ok(dates)
        }
    }
}

fn incomplete(prefix: &str, expected: DateKey, found: Option<&DateKey>) -> VaultError {
    VaultError::IncompleteListing {
        prefix: prefix.to_string(),
        expected: expected.to_string(),
        found: found.map(ToString::to_string),
    }
}

/// Extracts the text of every `<Key>` element from a listing body.
pub(crate) fn parse_listing_keys(body: &str) -> Vec<&str> {
    const OPEN: &str = "<Key>";
    const CLOSE: &str = "</Key>";

    let mut keys = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        keys.push(after_open[..end].trim());
        rest = &after_open[end + CLOSE.len()..];
    }
    keys
}
