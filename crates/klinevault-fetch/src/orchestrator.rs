//! Batched, idempotent shard downloads.

use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use klinevault_types::{
    DataKind, Interval, Result, ShardKey, Symbol, TimeWindow, TradeType, VaultConfig, VaultError,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::url::archive_url;
use crate::{ArchiveSource, PlanRequest, PlannedDownload, extract_single_csv, plan_downloads_at};

/// Receives per-symbol download progress.
///
/// Purely observational; implementations must not fail.
pub trait ProgressObserver: Send + Sync {
    /// Called once per symbol before its first batch, with the pending shard count.
    fn started(&self, _symbol: &Symbol, _total: usize) {}

    /// Called after each shard of `symbol` is in place.
    fn advanced(&self, _symbol: &Symbol) {}

    /// Called once all of `symbol`'s batches completed.
    fn finished(&self, _symbol: &Symbol) {}
}

/// Observer that ignores all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Local shards of one symbol after [`Downloader::ensure_shards`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolShards {
    /// Exchange symbol.
    pub symbol: Symbol,
    /// All shard paths covering the window, oldest first.
    pub paths: Vec<PathBuf>,
    /// Shards fetched during this run.
    pub downloaded: usize,
}

/// Downloads one shard unless its CSV is already present.
///
/// The archive is streamed to `<stem>.tmp.zip` next to the final path,
/// extracted on the blocking pool, and removed afterwards whether or not
/// extraction succeeded. The final CSV only appears once complete.
///
/// # Errors
///
/// Returns an error if the download or the extraction fails.
pub async fn fetch_shard<S>(source: &S, config: &VaultConfig, key: &ShardKey) -> Result<PathBuf>
where
    S: ArchiveSource + ?Sized,
{
    let dest = key.ensure_local_path(config.data_root())?;
    if dest.exists() {
        debug!(shard = %key, "already present");
        return Ok(dest);
    }

    let tmp = dest.with_file_name(format!("{}.tmp.zip", key.file_stem()));
    let url = archive_url(&config.archive_base_url, key);
    let result = download_and_extract(source, &url, &tmp, &dest).await;

    if let Err(e) = tokio::fs::remove_file(&tmp).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %tmp.display(), error = %e, "failed to remove temporary archive");
    }

    result.map(|bytes| {
        debug!(shard = %key, bytes, "shard extracted");
        dest
    })
}

async fn download_and_extract<S>(source: &S, url: &str, tmp: &Path, dest: &Path) -> Result<u64>
where
    S: ArchiveSource + ?Sized,
{
    source.fetch_archive(url, tmp).await?;

    let (tmp, dest) = (tmp.to_path_buf(), dest.to_path_buf());
    tokio::task::spawn_blocking(move || extract_single_csv(&tmp, &dest))
        .await
        .map_err(VaultError::blocking_task)?
        .map_err(|e| VaultError::Archive(e.to_string()))
}

/// Ensures the shards of several symbols exist locally.
///
/// Symbols are planned concurrently; each symbol's missing shards are then
/// fetched `batch_size` at a time.
#[derive(Debug, Clone)]
pub struct Downloader {
    symbols: Vec<Symbol>,
    window: TimeWindow,
    kind: DataKind,
    trade: TradeType,
    interval: Interval,
    batch_size: usize,
}

impl Downloader {
    /// Creates a downloader using the config's kind, trade type, interval and batch size.
    #[must_use]
    pub fn new(symbols: Vec<Symbol>, window: TimeWindow, config: &VaultConfig) -> Self {
        Self {
            symbols,
            window,
            kind: config.kind,
            trade: config.trade,
            interval: config.interval,
            batch_size: config.batch_size,
        }
    }

    /// Sets the data kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: DataKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the trade type.
    #[must_use]
    pub const fn with_trade(mut self, trade: TradeType) -> Self {
        self.trade = trade;
        self
    }

    /// Sets the interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the number of concurrent fetches per symbol.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Returns the configured symbols.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    fn request(&self, symbol: &Symbol, config: &VaultConfig) -> PlanRequest {
        PlanRequest {
            kind: self.kind,
            trade: self.trade,
            interval: self.interval,
            ..PlanRequest::new(symbol.clone(), self.window, config)
        }
    }

    /// Ensures every shard of every symbol exists locally, as of now.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_shards_at`].
    pub async fn ensure_shards<S>(
        &self,
        source: &S,
        config: &VaultConfig,
        observer: &dyn ProgressObserver,
    ) -> Result<Vec<SymbolShards>>
    where
        S: ArchiveSource + ?Sized,
    {
        self.ensure_shards_at(source, config, observer, Utc::now())
            .await
    }

    /// Ensures every shard of every symbol exists locally, as of `now`.
    ///
    /// All symbols are planned first; a planning failure for any symbol aborts
    /// the run before anything is downloaded. Within a batch every fetch runs to
    /// completion; failures then surface as [`VaultError::BatchFailed`] and the
    /// remaining batches are not started. Shards fetched earlier stay in place,
    /// so re-running resumes where the failure left off.
    ///
    /// # Errors
    ///
    /// Returns planning errors, or [`VaultError::BatchFailed`] for download failures.
    pub async fn ensure_shards_at<S>(
        &self,
        source: &S,
        config: &VaultConfig,
        observer: &dyn ProgressObserver,
        now: DateTime<Utc>,
    ) -> Result<Vec<SymbolShards>>
    where
        S: ArchiveSource + ?Sized,
    {
        if self.batch_size == 0 {
            return Err(VaultError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }

        let plans = try_join_all(self.symbols.iter().map(|symbol| {
            let request = self.request(symbol, config);
            async move { plan_downloads_at(source, config, &request, now).await }
        }))
        .await?;

        let mut results = Vec::with_capacity(plans.len());
        for (symbol, plan) in self.symbols.iter().zip(plans) {
            results.push(self.fetch_symbol(source, config, observer, symbol, plan).await?);
        }
        Ok(results)
    }

    async fn fetch_symbol<S>(
        &self,
        source: &S,
        config: &VaultConfig,
        observer: &dyn ProgressObserver,
        symbol: &Symbol,
        plan: Vec<PlannedDownload>,
    ) -> Result<SymbolShards>
    where
        S: ArchiveSource + ?Sized,
    {
        let paths: Vec<PathBuf> = plan.iter().map(|p| p.local_path.clone()).collect();
        let pending: Vec<&PlannedDownload> = plan.iter().filter(|p| !p.is_present()).collect();

        if pending.is_empty() {
            debug!(%symbol, shards = paths.len(), "all shards present");
            return Ok(SymbolShards {
                symbol: symbol.clone(),
                paths,
                downloaded: 0,
            });
        }

        observer.started(symbol, pending.len());
        info!(%symbol, pending = pending.len(), total = paths.len(), "downloading shards");

        for batch in pending.chunks(self.batch_size) {
            let outcomes = join_all(batch.iter().map(|planned| async move {
                let outcome = fetch_shard(source, config, &planned.key).await;
                if outcome.is_ok() {
                    observer.advanced(symbol);
                }
                (planned, outcome)
            }))
            .await;

            let mut failures: Vec<VaultError> = Vec::new();
            for (planned, outcome) in outcomes {
                if let Err(e) = outcome {
                    warn!(shard = %planned.key, error = %e, "shard download failed");
                    failures.push(e);
                }
            }

            if !failures.is_empty() {
                let failed = failures.len();
                return Err(VaultError::BatchFailed {
                    symbol: symbol.to_string(),
                    failed,
                    total: batch.len(),
                    first: Box::new(failures.swap_remove(0)),
                });
            }
        }

        observer.finished(symbol);
        Ok(SymbolShards {
            symbol: symbol.clone(),
            paths,
            downloaded: pending.len(),
        })
    }
}
