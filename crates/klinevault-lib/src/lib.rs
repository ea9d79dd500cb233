//! Download, cache and index Binance historical kline archives.
//!
//! This is a facade crate that re-exports functionality from the klinevault
//! workspace crates and ties them together: [`open_range`] makes sure every
//! shard covering a window is on disk and returns a [`HistoricDataset`] over
//! exactly the candles in that window.
//!
//! # Quick Start
//!
//! ```ignore
//! use klinevault_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VaultConfig::from_env()?;
//!     let client = DownloadClient::with_defaults()?;
//!     let window = TimeWindow::new(
//!         Some("2023-01-01T00:00:00Z".parse()?),
//!         Some("2023-03-01T00:00:00Z".parse()?),
//!     )?;
//!
//!     let mut dataset = open_range(&client, &config, Symbol::new("ACMUSDT")?, window).await?;
//!     for candle in dataset.iter() {
//!         println!("{}", candle?.close);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use klinevault_types::*;

// Re-export the dataset
pub use klinevault_dataset::{
    Cursor, HistoricDataset, LogicalIndex, Rows, ShardLengthCache, count_rows, load_shard,
};

// Re-export fetch functionality
#[cfg(feature = "fetch")]
pub use klinevault_fetch::{
    ArchiveSource, ClientConfig, DownloadClient, DownloadError, Downloader, ExtractError,
    ListingQuery, NoProgress, PlanRequest, PlannedDownload, ProgressObserver, SymbolShards,
    extract_single_csv, fetch_shard, list_available_dates, list_available_dates_at,
    plan_downloads, plan_downloads_at,
};

#[cfg(feature = "fetch")]
mod open;

#[cfg(feature = "fetch")]
pub use open::{open_all, open_range, open_range_at};

/// Prelude module for convenient imports.
///
/// ```
/// use klinevault_lib::prelude::*;
/// ```
pub mod prelude {
    pub use klinevault_types::{
        Candle, DataKind, DateKey, Granularity, Interval, Result, ShardKey, Symbol, TimeWindow,
        TradeType, VaultConfig, VaultError,
    };

    pub use klinevault_dataset::{Cursor, HistoricDataset, LogicalIndex};

    #[cfg(feature = "fetch")]
    pub use klinevault_fetch::{
        ArchiveSource, DownloadClient, Downloader, ListingQuery, NoProgress, PlanRequest,
        PlannedDownload, ProgressObserver, SymbolShards, list_available_dates, plan_downloads,
    };

    #[cfg(feature = "fetch")]
    pub use crate::open::{open_all, open_range};
}
