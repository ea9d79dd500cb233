//! Offset table over a window-clipped shard list.

use klinevault_types::{Candle, Result, TimeWindow, VaultError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::length_cache::ShardLengthCache;
use crate::shard::load_shard;

/// Maps global positions over a list of shards onto `(shard, row)` pairs.
///
/// Shards are given oldest first and must be contiguous in time, with the
/// window's start falling in the first shard and its end in the last. The
/// first shard is clipped to rows with `open_time >= start` and the last to
/// rows with `open_time < end`; every shard in between contributes all of
/// its rows.
///
/// The index is immutable once built and can be shared between readers,
/// each of which keeps its own [`Cursor`].
#[derive(Debug, Clone)]
pub struct LogicalIndex {
    /// Distinguishes indexes built separately, so a cursor carried from one
    /// index to another starts over instead of reusing stale shard state.
    id: u64,
    files: Vec<PathBuf>,
    /// `offsets[k]` is the global position of shard `k`'s first in-window
    /// row; the final entry is the total length.
    offsets: Vec<usize>,
    start_row: usize,
    end_row: usize,
    window: TimeWindow,
}

static NEXT_INDEX_ID: AtomicU64 = AtomicU64::new(0);

impl LogicalIndex {
    /// Builds the offset table for `files` clipped to `window`.
    ///
    /// Only the first and last shards are parsed; interior shard lengths come
    /// from their [`ShardLengthCache`] sidecars.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::ShardUnavailable`] if any shard is missing or
    /// unreadable.
    pub fn build(files: Vec<PathBuf>, window: TimeWindow) -> Result<Self> {
        let Some(last_path) = files.last() else {
            return Ok(Self {
                id: NEXT_INDEX_ID.fetch_add(1, Ordering::Relaxed),
                files,
                offsets: vec![0],
                start_row: 0,
                end_row: 0,
                window,
            });
        };

        let last = load_shard(last_path)?;
        let end_row = match window.end_millis() {
            Some(end) => last.iter().rposition(|c| c.open_time < end).map_or(0, |i| i + 1),
            None => last.len(),
        };

        let start_row = match window.start_millis() {
            Some(start) => {
                let first_of = |rows: &[Candle]| {
                    rows.iter().position(|c| c.open_time >= start).unwrap_or(rows.len())
                };
                if files.len() == 1 {
                    first_of(&last)
                } else {
                    first_of(&load_shard(&files[0])?)
                }
            }
            None => 0,
        };

        let n = files.len();
        let mut offsets = Vec::with_capacity(n + 1);
        offsets.push(0usize);
        for (k, path) in files[..n - 1].iter().enumerate() {
            let length = ShardLengthCache::resolve(path)?.length;
            let skipped = if k == 0 { start_row } else { 0 };
            offsets.push(offsets[k] + length.saturating_sub(skipped));
        }
        let skipped = if n == 1 { start_row } else { 0 };
        let length = offsets[n - 1] + end_row.saturating_sub(skipped);
        offsets.push(length);

        debug!(shards = n, start_row, end_row, length, %window, "built logical index");
        Ok(Self {
            id: NEXT_INDEX_ID.fetch_add(1, Ordering::Relaxed),
            files,
            offsets,
            start_row,
            end_row,
            window,
        })
    }

    /// Total number of in-window rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Returns `true` if no rows fall in the window.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shard files, oldest first.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Global position of each shard's first row, followed by the length.
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// First in-window row of the first shard.
    #[must_use]
    pub const fn start_row(&self) -> usize {
        self.start_row
    }

    /// One past the last in-window row of the last shard.
    #[must_use]
    pub const fn end_row(&self) -> usize {
        self.end_row
    }

    /// Window the index was built for.
    #[must_use]
    pub const fn window(&self) -> TimeWindow {
        self.window
    }

    /// Resolves a global position to `(shard, row within shard)`.
    ///
    /// Returns `None` if `position` is outside `0..len()`.
    #[must_use]
    pub fn locate(&self, position: usize) -> Option<(usize, usize)> {
        if position >= self.len() {
            return None;
        }
        let n = self.files.len();
        // Empty shards share their successor's offset; take the last match.
        let shard = self.offsets[..n].partition_point(|&o| o <= position) - 1;
        Some((shard, self.base_row(shard) + position - self.offsets[shard]))
    }

    /// Reads the row at `index`, counting from the end when negative.
    ///
    /// A read at the position right after the cursor's previous read is
    /// served from the cursor's materialized shard without searching the
    /// offset table. Crossing into the next shard loads it and drops the
    /// previous one. Any other read locates the shard by binary search.
    ///
    /// A cursor last used with a different index is reset first.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::IndexOutOfRange`] if `index` is outside
    /// `-len()..len()`, or [`VaultError::ShardUnavailable`] if the shard
    /// holding the row cannot be read.
    pub fn read_row(&self, cursor: &mut Cursor, index: isize) -> Result<Candle> {
        let position = self.normalize(index)?;
        if cursor.index_id != Some(self.id) {
            cursor.reset();
            cursor.index_id = Some(self.id);
        }

        let (shard, row) = match (&cursor.shard, cursor.last_position) {
            (Some(loaded), Some(last)) if position == last + 1 => {
                if position < self.offsets[loaded.position + 1] {
                    (loaded.position, cursor.relative_row + 1)
                } else {
                    let mut next = loaded.position + 1;
                    while self.offsets[next + 1] <= position {
                        next += 1;
                    }
                    (next, 0)
                }
            }
            _ => self
                .locate(position)
                .ok_or_else(|| self.out_of_range(index))?,
        };

        let rows = cursor.materialize(shard, &self.files[shard])?;
        let candle = rows.get(row).copied().ok_or_else(|| {
            VaultError::shard_unavailable(
                &self.files[shard],
                format!("expected row {row}, shard holds {} rows", rows.len()),
            )
        })?;

        cursor.last_position = Some(position);
        cursor.relative_row = row;
        Ok(candle)
    }

    fn base_row(&self, shard: usize) -> usize {
        if shard == 0 { self.start_row } else { 0 }
    }

    fn normalize(&self, index: isize) -> Result<usize> {
        let length = self.len();
        let position = if index < 0 {
            length.checked_sub(index.unsigned_abs())
        } else {
            Some(index.unsigned_abs())
        };
        position
            .filter(|&p| p < length)
            .ok_or_else(|| self.out_of_range(index))
    }

    fn out_of_range(&self, index: isize) -> VaultError {
        VaultError::IndexOutOfRange {
            index,
            length: self.len(),
        }
    }
}

#[derive(Debug)]
struct LoadedShard {
    position: usize,
    rows: Vec<Candle>,
}

/// Per-reader position over a [`LogicalIndex`].
///
/// Holds at most one materialized shard at a time.
#[derive(Debug, Default)]
pub struct Cursor {
    index_id: Option<u64>,
    last_position: Option<usize>,
    shard: Option<LoadedShard>,
    relative_row: usize,
}

impl Cursor {
    /// Creates a cursor with nothing materialized.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Global position of the most recent successful read.
    #[must_use]
    pub const fn last_position(&self) -> Option<usize> {
        self.last_position
    }

    /// Shard currently held in memory, if any.
    #[must_use]
    pub fn materialized_shard(&self) -> Option<usize> {
        self.shard.as_ref().map(|s| s.position)
    }

    /// Drops the materialized shard and forgets the last position.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn materialize(&mut self, position: usize, path: &Path) -> Result<&[Candle]> {
        // The previous shard is released before the next one is loaded.
        let loaded = match self.shard.take() {
            Some(current) if current.position == position => current,
            _ => {
                self.last_position = None;
                let rows = load_shard(path)?;
                debug!(path = %path.display(), rows = rows.len(), "materialized shard");
                LoadedShard { position, rows }
            }
        };
        Ok(self.shard.insert(loaded).rows.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{EPOCH, open_time, write_shard};
    use chrono::DateTime;
    use klinevault_types::TimestampUnit;
    use std::path::Path;

    fn millis(ms: i64) -> chrono::DateTime<chrono::Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn window(start: Option<i64>, end: Option<i64>) -> TimeWindow {
        TimeWindow::new(start.map(millis), end.map(millis)).unwrap()
    }

    /// Back-to-back shards of the given sizes.
    fn shards(dir: &Path, sizes: &[usize]) -> (Vec<PathBuf>, Vec<i64>) {
        let mut first_open = EPOCH;
        let mut files = Vec::new();
        let mut starts = Vec::new();
        for (k, &rows) in sizes.iter().enumerate() {
            let name = format!("X-1m-{k}.csv");
            files.push(write_shard(dir, &name, first_open, rows, TimestampUnit::Millis));
            starts.push(first_open);
            first_open = open_time(first_open, rows);
        }
        (files, starts)
    }

    #[test]
    fn test_clipped_three_shard_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, starts) = shards(tmp.path(), &[1000, 1000, 500]);
        let w = window(
            Some(open_time(starts[0], 400)),
            Some(open_time(starts[2], 200)),
        );

        let index = LogicalIndex::build(files, w).unwrap();
        assert_eq!(index.start_row(), 400);
        assert_eq!(index.end_row(), 200);
        assert_eq!(index.offsets(), &[0, 600, 1600, 1800]);
        assert_eq!(index.len(), 1800);

        let mut cursor = Cursor::new();
        assert_eq!(index.read_row(&mut cursor, 0).unwrap().open_time, open_time(starts[0], 400));
        assert_eq!(index.read_row(&mut cursor, 1799).unwrap().open_time, open_time(starts[2], 199));
        assert_eq!(index.read_row(&mut cursor, -1).unwrap().open_time, open_time(starts[2], 199));
        assert_eq!(index.read_row(&mut cursor, 600).unwrap().open_time, starts[1]);
        assert_eq!(index.locate(1600), Some((2, 0)));
    }

    #[test]
    fn test_unbounded_window_covers_every_row() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, starts) = shards(tmp.path(), &[10, 20, 5]);

        let index = LogicalIndex::build(files, TimeWindow::unbounded()).unwrap();
        assert_eq!(index.len(), 35);
        let mut cursor = Cursor::new();
        assert_eq!(index.read_row(&mut cursor, 0).unwrap().open_time, starts[0]);
        assert_eq!(index.read_row(&mut cursor, 34).unwrap().open_time, open_time(starts[2], 4));
    }

    #[test]
    fn test_sequential_reads_match_random_reads() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, starts) = shards(tmp.path(), &[30, 20, 25]);
        let w = window(Some(open_time(starts[0], 7)), Some(open_time(starts[2], 11)));
        let index = LogicalIndex::build(files, w).unwrap();
        assert_eq!(index.len(), 23 + 20 + 11);

        let mut sequential = Cursor::new();
        for i in 0..index.len() {
            let warm = index.read_row(&mut sequential, i as isize).unwrap();
            let cold = index.read_row(&mut Cursor::new(), i as isize).unwrap();
            assert_eq!(warm, cold, "row {i}");
            assert_eq!(warm.open_time, open_time(starts[0], 7 + i));
        }
        assert_eq!(sequential.materialized_shard(), Some(2));
    }

    #[test]
    fn test_jumps_and_backward_reads() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, starts) = shards(tmp.path(), &[10, 10, 10]);
        let index = LogicalIndex::build(files, TimeWindow::unbounded()).unwrap();

        let mut cursor = Cursor::new();
        for i in [25, 3, 4, 19, 20, 0, 29] {
            assert_eq!(
                index.read_row(&mut cursor, i).unwrap().open_time,
                open_time(starts[0], i as usize)
            );
            assert_eq!(cursor.last_position(), Some(i as usize));
        }
    }

    #[test]
    fn test_adjacent_windows_are_additive() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, starts) = shards(tmp.path(), &[1000, 1000, 500]);
        let a = open_time(starts[0], 100);
        let b = open_time(starts[1], 300);
        let c = open_time(starts[2], 450);

        let left = LogicalIndex::build(files[..2].to_vec(), window(Some(a), Some(b))).unwrap();
        let right = LogicalIndex::build(files[1..].to_vec(), window(Some(b), Some(c))).unwrap();
        let whole = LogicalIndex::build(files.clone(), window(Some(a), Some(c))).unwrap();

        assert_eq!(left.len(), 1200);
        assert_eq!(right.len(), 1150);
        assert_eq!(left.len() + right.len(), whole.len());

        let mut cursor = Cursor::new();
        assert_eq!(whole.read_row(&mut cursor, 1200).unwrap().open_time, b);
        assert_eq!(right.read_row(&mut Cursor::new(), 0).unwrap().open_time, b);
    }

    #[test]
    fn test_single_shard_window() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, starts) = shards(tmp.path(), &[100]);
        let w = window(Some(open_time(starts[0], 10)), Some(open_time(starts[0], 60)));

        let index = LogicalIndex::build(files, w).unwrap();
        assert_eq!(index.len(), 50);
        let mut cursor = Cursor::new();
        assert_eq!(index.read_row(&mut cursor, 0).unwrap().open_time, open_time(starts[0], 10));
        assert_eq!(index.read_row(&mut cursor, 49).unwrap().open_time, open_time(starts[0], 59));
    }

    #[test]
    fn test_window_between_rows_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, starts) = shards(tmp.path(), &[100]);
        let w = window(Some(open_time(starts[0], 10) + 1), Some(open_time(starts[0], 11)));

        let index = LogicalIndex::build(files, w).unwrap();
        assert!(index.is_empty());
        assert!(matches!(
            index.read_row(&mut Cursor::new(), 0),
            Err(VaultError::IndexOutOfRange { index: 0, length: 0 })
        ));
    }

    #[test]
    fn test_empty_file_list() {
        let index = LogicalIndex::build(Vec::new(), TimeWindow::unbounded()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.offsets(), &[0]);
        assert_eq!(index.locate(0), None);
    }

    #[test]
    fn test_out_of_range_indices() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, _) = shards(tmp.path(), &[5, 5]);
        let index = LogicalIndex::build(files, TimeWindow::unbounded()).unwrap();
        let mut cursor = Cursor::new();

        assert!(index.read_row(&mut cursor, -10).is_ok());
        for bad in [10, 11, -11, isize::MIN, isize::MAX] {
            assert!(
                matches!(
                    index.read_row(&mut cursor, bad),
                    Err(VaultError::IndexOutOfRange { length: 10, .. })
                ),
                "index {bad}"
            );
        }
    }

    #[test]
    fn test_empty_interior_shard() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, starts) = shards(tmp.path(), &[4, 0, 3]);
        let index = LogicalIndex::build(files, TimeWindow::unbounded()).unwrap();
        assert_eq!(index.offsets(), &[0, 4, 4, 7]);

        let mut sequential = Cursor::new();
        for i in 0..7 {
            let row = index.read_row(&mut sequential, i).unwrap();
            assert_eq!(row.open_time, open_time(starts[0], i as usize));
        }
        assert_eq!(index.locate(4), Some((2, 0)));
    }

    #[test]
    fn test_interior_lengths_come_from_sidecars() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, _) = shards(tmp.path(), &[3, 3, 3]);
        LogicalIndex::build(files.clone(), TimeWindow::unbounded()).unwrap();

        assert!(ShardLengthCache::sidecar_path(&files[0]).exists());
        assert!(ShardLengthCache::sidecar_path(&files[1]).exists());
        assert!(!ShardLengthCache::sidecar_path(&files[2]).exists());
    }

    #[test]
    fn test_missing_shard_on_read() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, _) = shards(tmp.path(), &[5, 5, 5]);
        let index = LogicalIndex::build(files.clone(), TimeWindow::unbounded()).unwrap();
        std::fs::remove_file(&files[1]).unwrap();

        let mut cursor = Cursor::new();
        assert!(index.read_row(&mut cursor, 2).is_ok());
        assert!(matches!(
            index.read_row(&mut cursor, 7),
            Err(VaultError::ShardUnavailable { .. })
        ));
    }

    #[test]
    fn test_cursor_moves_between_indexes() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, starts) = shards(tmp.path(), &[2, 2, 2, 2]);
        let many = LogicalIndex::build(files, TimeWindow::unbounded()).unwrap();
        let single_dir = tempfile::tempdir().unwrap();
        let (single_files, single_starts) = shards(single_dir.path(), &[10]);
        let single = LogicalIndex::build(single_files, TimeWindow::unbounded()).unwrap();

        let mut cursor = Cursor::new();
        assert_eq!(many.read_row(&mut cursor, 6).unwrap().open_time, open_time(starts[0], 6));
        assert_eq!(cursor.materialized_shard(), Some(3));

        let row = single.read_row(&mut cursor, 7).unwrap();
        assert_eq!(row.open_time, open_time(single_starts[0], 7));
        assert_eq!(cursor.materialized_shard(), Some(0));

        assert_eq!(many.read_row(&mut cursor, 1).unwrap().open_time, open_time(starts[0], 1));
    }

    #[test]
    fn test_cursor_moves_between_windows_over_one_shard() {
        let tmp = tempfile::tempdir().unwrap();
        let (files, starts) = shards(tmp.path(), &[100]);
        let wide = LogicalIndex::build(files.clone(), TimeWindow::unbounded()).unwrap();
        let narrow =
            LogicalIndex::build(files, window(Some(open_time(starts[0], 40)), None)).unwrap();

        let mut cursor = Cursor::new();
        assert_eq!(wide.read_row(&mut cursor, 5).unwrap().open_time, open_time(starts[0], 5));
        assert_eq!(narrow.read_row(&mut cursor, 6).unwrap().open_time, open_time(starts[0], 46));
    }

    #[test]
    fn test_missing_shard_on_build() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut files, _) = shards(tmp.path(), &[5, 5]);
        files.push(tmp.path().join("absent.csv"));
        assert!(matches!(
            LogicalIndex::build(files, TimeWindow::unbounded()),
            Err(VaultError::ShardUnavailable { .. })
        ));
    }
}
