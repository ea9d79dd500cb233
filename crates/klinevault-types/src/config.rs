//! Explicit configuration with environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{DataKind, Interval, TradeType, VaultError};

/// Configuration shared by the planner, downloader and dataset constructors.
///
/// Every field has a documented default; [`VaultConfig::from_env`] overrides
/// them from the process environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Root of the local shard tree (`DATA_DIRECTORY`, default `data`).
    pub data_root: PathBuf,
    /// Default market segment (`DEFAULT_TRADE`, default `spot`).
    pub trade: TradeType,
    /// Default kline interval (`DEFAULT_INTERVAL`, default `1m`).
    pub interval: Interval,
    /// Default data kind (`DEFAULT_TRADE_DATATYPE`, default `klines`).
    pub kind: DataKind,
    /// Bucket listing endpoint (`LISTING_BASE_URL`).
    pub listing_base_url: String,
    /// Archive download endpoint (`ARCHIVE_BASE_URL`).
    pub archive_base_url: String,
    /// Concurrent shard fetches per symbol (`DOWNLOAD_BATCH_SIZE`, default 5).
    pub batch_size: usize,
    /// Consecutive listing pages without new keys tolerated before giving up.
    pub max_stalled_pages: usize,
}

impl VaultConfig {
    /// Default bucket listing endpoint.
    pub const DEFAULT_LISTING_BASE_URL: &str =
        "https://s3-ap-northeast-1.amazonaws.com/data.binance.vision";
    /// Default archive download endpoint.
    pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://data.binance.vision";

    /// Builds a configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidArgument`] if a variable holds an unparseable value.
    pub fn from_env() -> Result<Self, VaultError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidArgument`] if a variable holds an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, VaultError> {
        let mut config = Self::default();

        if let Some(root) = lookup("DATA_DIRECTORY") {
            config.data_root = PathBuf::from(root);
        }
        if let Some(trade) = lookup("DEFAULT_TRADE") {
            config.trade = trade.parse()?;
        }
        if let Some(interval) = lookup("DEFAULT_INTERVAL") {
            config.interval = interval.parse()?;
        }
        if let Some(kind) = lookup("DEFAULT_TRADE_DATATYPE") {
            config.kind = kind.parse()?;
        }
        if let Some(url) = lookup("LISTING_BASE_URL") {
            config.listing_base_url = url;
        }
        if let Some(url) = lookup("ARCHIVE_BASE_URL") {
            config.archive_base_url = url;
        }
        if let Some(size) = lookup("DOWNLOAD_BATCH_SIZE") {
            config.batch_size = size.parse().map_err(|_| {
                VaultError::InvalidArgument(format!("invalid DOWNLOAD_BATCH_SIZE '{size}'"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidArgument`] if the batch size is zero.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.batch_size == 0 {
            return Err(VaultError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the data root.
    #[must_use]
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets both remote endpoints, e.g. to point at a mirror.
    #[must_use]
    pub fn with_endpoints(
        mut self,
        listing: impl Into<String>,
        archive: impl Into<String>,
    ) -> Self {
        self.listing_base_url = listing.into();
        self.archive_base_url = archive.into();
        self
    }

    /// Returns the data root.
    #[must_use]
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            trade: TradeType::Spot,
            interval: Interval::Minute1,
            kind: DataKind::Klines,
            listing_base_url: Self::DEFAULT_LISTING_BASE_URL.to_string(),
            archive_base_url: Self::DEFAULT_ARCHIVE_BASE_URL.to_string(),
            batch_size: 5,
            max_stalled_pages: 3,
        }
    }
}
