//! Inspect command implementation.
//!
//! Builds a dataset over the window's shards and prints its length and the
//! rows at both ends.

use crate::WindowArgs;
use crate::display::{BarObserver, candle_header, format_candle, parse_window};
use anyhow::{Context, Result, bail};
use klinevault_lib::prelude::*;

/// Index the window and print a short summary.
pub(crate) async fn inspect(
    config: &VaultConfig,
    symbol: &Symbol,
    window: &WindowArgs,
    download: bool,
    head: usize,
    quiet: bool,
) -> Result<()> {
    let window = parse_window(window)?;
    let client = DownloadClient::with_defaults().context("Failed to create HTTP client")?;

    let paths = if download {
        let observer = BarObserver::new(quiet)?;
        Downloader::new(vec![symbol.clone()], window, config)
            .ensure_shards(&client, config, &observer)
            .await
            .context("Download failed")?
            .pop()
            .map(|s| s.paths)
            .unwrap_or_default()
    } else {
        let request = PlanRequest::new(symbol.clone(), window, config);
        let plan = plan_downloads(&client, config, &request)
            .await
            .with_context(|| format!("Failed to plan shards for {symbol}"))?;
        let missing = plan.iter().filter(|p| !p.is_present()).count();
        if missing > 0 {
            bail!("{missing} of {} shards are missing locally; rerun with --download", plan.len());
        }
        plan.into_iter().map(|p| p.local_path).collect()
    };

    let shard_count = paths.len();
    let mut dataset = tokio::task::spawn_blocking(move || HistoricDataset::open(paths, window))
        .await
        .context("Indexing task failed")?
        .context("Failed to index shards")?;

    println!("Symbol:  {symbol}");
    println!("Window:  {window}");
    println!("Shards:  {shard_count}");
    println!("Candles: {}", dataset.len());

    if dataset.is_empty() {
        return Ok(());
    }

    let len = dataset.len();
    let shown = head.min(len);
    let mut positions: Vec<usize> = (0..shown).collect();
    positions.extend((len - shown..len).filter(|p| *p >= shown));

    println!("\n{}", candle_header());
    for (i, position) in positions.iter().enumerate() {
        if i == shown && *position > shown {
            println!("{:>10}", "...");
        }
        let index = isize::try_from(*position).context("Row position overflow")?;
        let candle = dataset.get(index)?;
        println!("{}", format_candle(*position, &candle));
    }

    Ok(())
}
