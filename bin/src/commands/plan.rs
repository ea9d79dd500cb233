//! Plan command implementation.

use crate::WindowArgs;
use crate::display::parse_window;
use anyhow::{Context, Result};
use klinevault_lib::prelude::*;

/// Print the shards covering the window, marking those already present.
pub(crate) async fn show_plan(
    config: &VaultConfig,
    symbol: &Symbol,
    window: &WindowArgs,
    truncate: bool,
) -> Result<()> {
    let window = parse_window(window)?;
    let client = DownloadClient::with_defaults().context("Failed to create HTTP client")?;

    let request = PlanRequest::new(symbol.clone(), window, config).with_truncate(truncate);
    let plan = plan_downloads(&client, config, &request)
        .await
        .with_context(|| format!("Failed to plan downloads for {symbol}"))?;

    println!("{:<8} {:<12} {:<8} PATH", "STATUS", "DATE", "GRAN");
    println!("{}", "-".repeat(72));
    for planned in &plan {
        let status = if planned.is_present() { "local" } else { "missing" };
        println!(
            "{:<8} {:<12} {:<8} {}",
            status,
            planned.key.date,
            planned.granularity(),
            planned.local_path.display()
        );
    }

    let missing = plan.iter().filter(|p| !p.is_present()).count();
    println!("\n{} shards for {symbol} in {window}, {missing} missing", plan.len());

    Ok(())
}
