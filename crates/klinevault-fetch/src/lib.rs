//! Archive discovery, range planning and shard downloads for klinevault.
//!
//! This crate provides the acquisition pipeline:
//!
//! - [`url`] - Listing and archive URL construction
//! - [`DownloadClient`] - HTTP client with connection pooling and retries
//! - [`list_available_dates`] - Paginated walk over the remote bucket listing
//! - [`plan_downloads`] - Selects the monthly and daily shards covering a window
//! - [`extract_single_csv`] - Unpacks a shard archive into its final CSV path
//! - [`Downloader`] - Batched, idempotent shard downloads for many symbols

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod catalog;
mod client;
mod extract;
mod orchestrator;
mod plan;
mod source;
pub mod url;

#[cfg(test)]
mod testing;

pub use catalog::{ListingQuery, list_available_dates, list_available_dates_at};
pub use client::{ClientConfig, DownloadClient, DownloadError};
pub use extract::{ExtractError, extract_single_csv};
pub use orchestrator::{Downloader, NoProgress, ProgressObserver, SymbolShards, fetch_shard};
pub use plan::{PlanRequest, PlannedDownload, plan_downloads, plan_downloads_at};
pub use source::ArchiveSource;
