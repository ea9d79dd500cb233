//! Dates command implementation.

use anyhow::{Context, Result};
use klinevault_lib::prelude::*;

/// Print every archived date key of one listing.
pub(crate) async fn list_dates(
    config: &VaultConfig,
    symbol: &Symbol,
    granularity: Granularity,
) -> Result<()> {
    let client = DownloadClient::with_defaults().context("Failed to create HTTP client")?;
    let query = ListingQuery::new(symbol.clone(), granularity, config);

    let dates = list_available_dates(&client, config, &query)
        .await
        .with_context(|| format!("Failed to list {}", query.prefix()))?;

    for date in &dates {
        println!("{date}");
    }

    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => {
            println!("\n{} {granularity} archives, {first} to {last}", dates.len());
        }
        _ => println!("No {granularity} archives for {symbol}"),
    }

    Ok(())
}
