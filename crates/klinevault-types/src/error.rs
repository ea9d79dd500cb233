//! Error types for klinevault.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for klinevault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors that can occur while discovering, downloading or indexing shards.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Malformed symbol, interval, date key or window.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The window reaches into the still-accumulating current day.
    #[error("Window bound {instant} is not before {cutoff}; today's data is not archived yet")]
    UnsupportedWindow {
        /// The offending window bound.
        instant: DateTime<Utc>,
        /// Start of the current UTC day.
        cutoff: DateTime<Utc>,
    },

    /// Remote pagination did not end at the expected boundary key.
    #[error(
        "Incomplete listing for {prefix}: expected last key {expected}, found {}",
        found.as_deref().unwrap_or("nothing")
    )]
    IncompleteListing {
        /// The listing prefix that was walked.
        prefix: String,
        /// The boundary key the walk should have ended on.
        expected: String,
        /// The last key actually collected.
        found: Option<String>,
    },

    /// A local shard is missing or unreadable at materialization time.
    #[error("Shard unavailable at '{path}': {reason}")]
    ShardUnavailable {
        /// Path of the shard file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Logical index outside `[-length, length)`.
    #[error("Index {index} out of range for dataset of length {length}")]
    IndexOutOfRange {
        /// The requested index, before normalization.
        index: isize,
        /// The dataset length.
        length: usize,
    },

    /// Recognized but unsupported data kind.
    #[error("{0} retrieval not implemented")]
    NotImplemented(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Archive could not be unpacked.
    #[error("Archive error: {0}")]
    Archive(String),

    /// One or more shard downloads in a batch failed.
    #[error("{failed} of {total} shard downloads failed for {symbol}: {first}")]
    BatchFailed {
        /// Symbol whose batch failed.
        symbol: String,
        /// Number of failed fetches in the batch.
        failed: usize,
        /// Batch size.
        total: usize,
        /// The first failure observed.
        first: Box<VaultError>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaultError {
    /// Builds a [`VaultError::ShardUnavailable`] for `path`.
    pub fn shard_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ShardUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Wraps the failure of a blocking task (a panic or cancellation) as
    /// [`VaultError::Io`].
    pub fn blocking_task<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Io(std::io::Error::other(err))
    }
}
