//! Virtual sequential dataset over local kline shards.
//!
//! A list of shard files, each an independently sized CSV table, is presented
//! as one contiguous, randomly addressable sequence of [`Candle`] rows clipped
//! to a [`TimeWindow`]:
//!
//! - [`LogicalIndex`] - Immutable offset table mapping global positions to shard rows
//! - [`Cursor`] - Per-reader state enabling O(1) sequential reads
//! - [`HistoricDataset`] - An index paired with its own cursor
//! - [`ShardLengthCache`] - Sidecar row counts avoiding full rescans
//!
//! [`Candle`]: klinevault_types::Candle
//! [`TimeWindow`]: klinevault_types::TimeWindow

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dataset;
mod index;
mod length_cache;
mod shard;

pub use dataset::{HistoricDataset, Rows};
pub use index::{Cursor, LogicalIndex};
pub use length_cache::ShardLengthCache;
pub use shard::{count_rows, load_shard};
