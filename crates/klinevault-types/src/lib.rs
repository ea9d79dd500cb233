//! Core types for the klinevault historical kline archive client.
//!
//! This crate provides the fundamental data structures used throughout klinevault:
//!
//! - [`ShardKey`] - Identity of one monthly or daily archive shard
//! - [`DateKey`] - The `YYYY-MM` / `YYYY-MM-DD` component of a shard key
//! - [`Interval`] - Kline bucket width published by the archive
//! - [`TimeWindow`] - Optional `[start, end)` bounds for planning and indexing
//! - [`Candle`] - A single kline row as stored in a shard file
//! - [`VaultConfig`] - Explicit configuration with environment overrides

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod candle;
mod config;
mod error;
mod interval;
mod shard;
mod window;

pub use candle::{Candle, TimestampUnit};
pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use interval::{Interval, IntervalParseError};
pub use shard::{DataKind, DateKey, Granularity, ShardKey, Symbol, TradeType};
pub use window::{TimeWindow, today_cutoff, yesterday};
