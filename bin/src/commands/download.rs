//! Download command implementation.
//!
//! Ensures every shard covering the window exists under the data directory,
//! one progress bar per symbol.

use crate::WindowArgs;
use crate::display::{BarObserver, parse_window};
use anyhow::{Context, Result};
use klinevault_lib::prelude::*;

/// Download the shards of `symbols` covering the window.
pub(crate) async fn download(
    config: &VaultConfig,
    symbols: &[Symbol],
    window: &WindowArgs,
    quiet: bool,
) -> Result<()> {
    let window = parse_window(window)?;
    let client = DownloadClient::with_defaults().context("Failed to create HTTP client")?;
    let observer = BarObserver::new(quiet)?;

    let downloader = Downloader::new(symbols.to_vec(), window, config);
    let results = downloader
        .ensure_shards(&client, config, &observer)
        .await
        .context("Download failed")?;

    if !quiet {
        for result in &results {
            println!(
                "{}: {} shards ({} downloaded)",
                result.symbol,
                result.paths.len(),
                result.downloaded
            );
        }
        println!("Data directory: {}", config.data_root().display());
    }

    Ok(())
}
