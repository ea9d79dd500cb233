//! Listing and archive URL construction.

use klinevault_types::{DataKind, DateKey, Granularity, Interval, ShardKey, Symbol, TradeType};

/// Suffix of the checksum objects published next to every archive.
pub const CHECKSUM_SUFFIX: &str = ".CHECKSUM";

/// Builds the bucket prefix under which a symbol's archives live.
///
/// Format: `data/{trade}/{granularity}/{kind}/{SYMBOL}/{interval}/`
#[must_use]
pub fn listing_prefix(
    kind: DataKind,
    trade: TradeType,
    granularity: Granularity,
    symbol: &Symbol,
    interval: Interval,
) -> String {
    format!("data/{trade}/{granularity}/{kind}/{symbol}/{interval}/")
}

/// Builds one page request of the bucket listing.
///
/// Pagination is driven by `start_after`, the last key seen so far.
///
/// # Example
///
/// ```
/// use klinevault_fetch::url::listing_url;
///
/// let url = listing_url("https://bucket.example", "data/spot/monthly/klines/BTCUSDT/1m/", None);
/// assert_eq!(
///     url,
///     "https://bucket.example/?list-type=2&prefix=data/spot/monthly/klines/BTCUSDT/1m/"
/// );
/// ```
#[must_use]
pub fn listing_url(base: &str, prefix: &str, start_after: Option<&str>) -> String {
    let mut url = format!(
        "{}/?list-type=2&prefix={prefix}",
        base.trim_end_matches('/')
    );
    if let Some(marker) = start_after {
        url.push_str("&start-after=");
        url.push_str(marker);
    }
    url
}

/// Builds the direct download URL of a shard's zip archive.
///
/// Format: `{base}/data/{trade}/{granularity}/{kind}/{SYMBOL}/{interval}/{SYMBOL}-{interval}-{date}.zip`
#[must_use]
pub fn archive_url(base: &str, key: &ShardKey) -> String {
    format!(
        "{}/{}{}",
        base.trim_end_matches('/'),
        listing_prefix(
            key.kind,
            key.trade,
            key.granularity(),
            &key.symbol,
            key.interval
        ),
        key.archive_name()
    )
}

/// Decodes the date key out of a listing key such as
/// `data/spot/monthly/klines/BTCUSDT/1m/BTCUSDT-1m-2023-01.zip`.
///
/// Checksum keys decode to the date of the archive they belong to.
#[must_use]
pub fn date_from_key(
    key: &str,
    symbol: &Symbol,
    interval: Interval,
    granularity: Granularity,
) -> Option<DateKey> {
    let file = key.rsplit('/').next()?;
    let rest = file
        .strip_prefix(symbol.as_str())?
        .strip_prefix('-')?
        .strip_prefix(interval.as_str())?
        .strip_prefix('-')?;
    let date = &rest[..rest.find('.')?];
    DateKey::parse(date, granularity).ok()
}
