//! Display utilities and argument parsing for the klinevault CLI.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use klinevault_lib::prelude::*;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::WindowArgs;

/// Parses `YYYY-MM-DD` (midnight UTC) or an RFC 3339 instant.
pub(crate) fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid date: {s} (expected YYYY-MM-DD or RFC 3339)"))
}

/// Builds the `[start, end)` window from optional bounds.
pub(crate) fn parse_window(args: &WindowArgs) -> Result<TimeWindow> {
    let start = args.start.as_deref().map(parse_instant).transpose()?;
    let end = args.end.as_deref().map(parse_instant).transpose()?;
    Ok(TimeWindow::new(start, end)?)
}

/// Formats a candle as one aligned table row.
pub(crate) fn format_candle(position: usize, candle: &Candle) -> String {
    let open_at = candle.open_at().map_or_else(
        || candle.open_time.to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    format!(
        "{position:>10}  {open_at:<19}  {:>14.6} {:>14.6} {:>14.6} {:>14.6} {:>16.4}",
        candle.open, candle.high, candle.low, candle.close, candle.volume
    )
}

/// Header matching [`format_candle`].
pub(crate) fn candle_header() -> String {
    format!(
        "{:>10}  {:<19}  {:>14} {:>14} {:>14} {:>14} {:>16}",
        "ROW", "OPEN TIME (UTC)", "OPEN", "HIGH", "LOW", "CLOSE", "VOLUME"
    )
}

/// One progress bar per symbol, stacked in a [`MultiProgress`].
pub(crate) struct BarObserver {
    bars: MultiProgress,
    by_symbol: Mutex<HashMap<Symbol, ProgressBar>>,
    style: ProgressStyle,
}

impl BarObserver {
    pub(crate) fn new(quiet: bool) -> Result<Self> {
        let bars = MultiProgress::new();
        if quiet {
            bars.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        }
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} {prefix:>12} [{elapsed_precise}] \
                 [{bar:40.cyan/blue}] {pos}/{len} shards {msg}",
            )
            .context("Invalid progress template")?
            .progress_chars("=>-");
        Ok(Self {
            bars,
            by_symbol: Mutex::new(HashMap::new()),
            style,
        })
    }

    fn with_bar(&self, symbol: &Symbol, f: impl FnOnce(&ProgressBar)) {
        if let Ok(bars) = self.by_symbol.lock()
            && let Some(bar) = bars.get(symbol)
        {
            f(bar);
        }
    }
}

impl ProgressObserver for BarObserver {
    fn started(&self, symbol: &Symbol, total: usize) {
        let bar = self.bars.add(ProgressBar::new(total as u64));
        bar.set_style(self.style.clone());
        bar.set_prefix(symbol.to_string());
        if let Ok(mut bars) = self.by_symbol.lock() {
            bars.insert(symbol.clone(), bar);
        }
    }

    fn advanced(&self, symbol: &Symbol) {
        self.with_bar(symbol, |bar| bar.inc(1));
    }

    fn finished(&self, symbol: &Symbol) {
        self.with_bar(symbol, |bar| bar.finish_with_message("done"));
    }
}
