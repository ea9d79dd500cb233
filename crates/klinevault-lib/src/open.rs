//! Download-then-index entry points.

use chrono::{DateTime, Utc};
use klinevault_dataset::HistoricDataset;
use klinevault_fetch::{ArchiveSource, Downloader, NoProgress};
use klinevault_types::{Result, Symbol, TimeWindow, VaultConfig, VaultError};
use tracing::info;

/// Ensures the shards covering `window` are local and opens them as a dataset.
///
/// # Errors
///
/// See [`open_range_at`].
pub async fn open_range<S>(
    source: &S,
    config: &VaultConfig,
    symbol: Symbol,
    window: TimeWindow,
) -> Result<HistoricDataset>
where
    S: ArchiveSource + ?Sized,
{
    open_range_at(source, config, symbol, window, Utc::now()).await
}

/// Opens every archived candle of `symbol`, from its first month through
/// yesterday.
///
/// # Errors
///
/// See [`open_range_at`].
pub async fn open_all<S>(
    source: &S,
    config: &VaultConfig,
    symbol: Symbol,
) -> Result<HistoricDataset>
where
    S: ArchiveSource + ?Sized,
{
    open_range(source, config, symbol, TimeWindow::unbounded()).await
}

/// Ensures the shards covering `window` are local as of `now`, then indexes
/// them.
///
/// Shards already on disk are not fetched again. Building the index reads
/// the first and last shards, which runs on the blocking thread pool.
///
/// # Errors
///
/// Returns planning and download errors (see
/// [`Downloader::ensure_shards_at`]) or
/// [`VaultError::ShardUnavailable`] if a shard cannot be indexed.
pub async fn open_range_at<S>(
    source: &S,
    config: &VaultConfig,
    symbol: Symbol,
    window: TimeWindow,
    now: DateTime<Utc>,
) -> Result<HistoricDataset>
where
    S: ArchiveSource + ?Sized,
{
    let downloader = Downloader::new(vec![symbol], window, config);
    let shards = downloader
        .ensure_shards_at(source, config, &NoProgress, now)
        .await?
        .pop()
        .map(|s| s.paths)
        .unwrap_or_default();

    info!(shards = shards.len(), %window, "opening dataset");
    tokio::task::spawn_blocking(move || HistoricDataset::open(shards, window))
        .await
        .map_err(VaultError::blocking_task)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use klinevault_types::{DateKey, Granularity, ShardKey};
    use std::fmt::Write as _;
    use std::path::Path;

    const PREFIX: &str = "data/spot/monthly/klines/ACMUSDT/1m/";

    /// Serves a fixed monthly listing; archive downloads always fail.
    struct ListingOnly;

    #[async_trait]
    impl ArchiveSource for ListingOnly {
        async fn fetch_listing(&self, url: &str) -> Result<String> {
            let mut body = String::from("<ListBucketResult>");
            if !url.contains("start-after") {
                for month in ["2023-01", "2023-02"] {
                    for suffix in [".zip", ".zip.CHECKSUM"] {
                        let key = format!("{PREFIX}ACMUSDT-1m-{month}{suffix}");
                        write!(body, "<Contents><Key>{key}</Key></Contents>").unwrap();
                    }
                }
            }
            body.push_str("</ListBucketResult>");
            Ok(body)
        }

        async fn fetch_archive(&self, url: &str, _dest: &Path) -> Result<()> {
            Err(VaultError::Http(format!("unexpected download of {url}")))
        }
    }

    fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, month, day, hour, 0, 0).unwrap()
    }

    fn write_local(
        config: &VaultConfig,
        date: &str,
        granularity: Granularity,
        opens: &[DateTime<Utc>],
    ) {
        let key = ShardKey::new(
            config.kind,
            config.trade,
            Symbol::new("ACMUSDT").unwrap(),
            config.interval,
            DateKey::parse(date, granularity).unwrap(),
        );
        let path = key.ensure_local_path(config.data_root()).unwrap();
        let mut body = String::new();
        for open in opens {
            let ms = open.timestamp_millis();
            writeln!(body, "{ms},1,2,0.5,1.5,10,{},15,3,4,6,0", ms + 59_999).unwrap();
        }
        std::fs::write(path, body).unwrap();
    }

    #[tokio::test]
    async fn test_open_range_over_local_shards() {
        let tmp = tempfile::tempdir().unwrap();
        let config = VaultConfig::default().with_data_root(tmp.path());

        let january = [at(1, 1, 0), at(1, 15, 0), at(1, 20, 0)];
        write_local(&config, "2023-01", Granularity::Monthly, &january);
        write_local(&config, "2023-02", Granularity::Monthly, &[at(2, 1, 0), at(2, 10, 0)]);
        for day in 1..=3 {
            write_local(&config, &format!("2023-03-0{day}"), Granularity::Daily, &[at(3, day, 0)]);
        }
        write_local(&config, "2023-03-04", Granularity::Daily, &[at(3, 4, 0), at(3, 4, 12)]);

        let window = TimeWindow::new(Some(at(1, 15, 0)), Some(at(3, 5, 0))).unwrap();
        let mut dataset = open_range_at(
            &ListingOnly,
            &config,
            Symbol::new("ACMUSDT").unwrap(),
            window,
            at(3, 15, 12),
        )
        .await
        .unwrap();

        assert_eq!(dataset.len(), 9);
        assert_eq!(dataset.get(0).unwrap().open_time, at(1, 15, 0).timestamp_millis());
        assert_eq!(dataset.get(-1).unwrap().open_time, at(3, 4, 12).timestamp_millis());
        assert!(dataset.iter().all(|c| window.contains_millis(c.unwrap().open_time)));
    }

    #[tokio::test]
    async fn test_open_range_rejects_today() {
        let tmp = tempfile::tempdir().unwrap();
        let config = VaultConfig::default().with_data_root(tmp.path());
        let window = TimeWindow::new(Some(at(1, 1, 0)), Some(at(3, 15, 6))).unwrap();

        let result = open_range_at(
            &ListingOnly,
            &config,
            Symbol::new("ACMUSDT").unwrap(),
            window,
            at(3, 15, 12),
        )
        .await;
        assert!(matches!(result, Err(VaultError::UnsupportedWindow { .. })));
    }

    #[tokio::test]
    async fn test_missing_shard_is_downloaded() {
        let tmp = tempfile::tempdir().unwrap();
        let config = VaultConfig::default().with_data_root(tmp.path());
        write_local(&config, "2023-01", Granularity::Monthly, &[at(1, 1, 0)]);

        let window = TimeWindow::new(Some(at(1, 1, 0)), Some(at(3, 1, 0))).unwrap();
        let result = open_range_at(
            &ListingOnly,
            &config,
            Symbol::new("ACMUSDT").unwrap(),
            window,
            at(3, 15, 12),
        )
        .await;
        assert!(matches!(result, Err(VaultError::BatchFailed { failed: 1, .. })));
    }
}
