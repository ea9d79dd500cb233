//! Readable dataset over a shared index.

use klinevault_types::{Candle, Result, TimeWindow};
use std::path::PathBuf;
use std::sync::Arc;

use crate::index::{Cursor, LogicalIndex};

/// A window of candles backed by shard files.
///
/// Each dataset owns one [`Cursor`], so reads take `&mut self`. Use
/// [`HistoricDataset::reader`] to get an independent reader over the same
/// index, e.g. one per thread.
#[derive(Debug)]
pub struct HistoricDataset {
    index: Arc<LogicalIndex>,
    cursor: Cursor,
}

impl HistoricDataset {
    /// Indexes `files` clipped to `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if a shard needed to build the index is unavailable.
    pub fn open(files: Vec<PathBuf>, window: TimeWindow) -> Result<Self> {
        Ok(Self::from_index(Arc::new(LogicalIndex::build(files, window)?)))
    }

    /// Wraps an existing index with a fresh cursor.
    #[must_use]
    pub fn from_index(index: Arc<LogicalIndex>) -> Self {
        Self {
            index,
            cursor: Cursor::new(),
        }
    }

    /// Returns an independent reader sharing this dataset's index.
    #[must_use]
    pub fn reader(&self) -> Self {
        Self::from_index(Arc::clone(&self.index))
    }

    /// The underlying index.
    #[must_use]
    pub fn index(&self) -> &Arc<LogicalIndex> {
        &self.index
    }

    /// Number of candles in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the window holds no candles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Reads the candle at `index`; negative values count from the end.
    ///
    /// # Errors
    ///
    /// See [`LogicalIndex::read_row`].
    pub fn get(&mut self, index: isize) -> Result<Candle> {
        self.index.read_row(&mut self.cursor, index)
    }

    /// Iterates every candle in order.
    pub fn iter(&mut self) -> Rows<'_> {
        Rows {
            dataset: self,
            next: 0,
        }
    }
}

/// In-order iterator over a [`HistoricDataset`].
///
/// Yields an error for a row whose shard cannot be read and continues with
/// the next row.
#[derive(Debug)]
pub struct Rows<'a> {
    dataset: &'a mut HistoricDataset,
    next: usize,
}

impl Iterator for Rows<'_> {
    type Item = Result<Candle>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.dataset.len() {
            return None;
        }
        let position = isize::try_from(self.next).ok()?;
        self.next += 1;
        Some(self.dataset.get(position))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.dataset.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> {}
