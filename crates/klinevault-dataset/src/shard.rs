//! Reading shard CSV files.

use csv::{ByteRecord, Reader, ReaderBuilder, StringRecord};
use klinevault_types::{Candle, Result, TimestampUnit, VaultError};
use std::fs::File;
use std::path::Path;
use tracing::debug;

fn open(path: &Path) -> Result<Reader<File>> {
    ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| VaultError::shard_unavailable(path, e))
}

/// Some vintages of the archive carry a header line; data rows always start
/// with an integer timestamp.
fn is_header(first_field: &[u8]) -> bool {
    std::str::from_utf8(first_field)
        .ok()
        .is_none_or(|field| field.trim().parse::<i64>().is_err())
}

/// Loads every row of a shard, with time columns normalized to milliseconds.
///
/// The timestamp unit is detected once from the first row and applied to the
/// whole shard.
///
/// # Errors
///
/// Returns [`VaultError::ShardUnavailable`] if the file is missing or any row
/// fails to parse.
pub fn load_shard(path: &Path) -> Result<Vec<Candle>> {
    let mut reader = open(path)?;
    let mut record = StringRecord::new();
    let mut rows = Vec::new();
    let mut first = true;

    while reader
        .read_record(&mut record)
        .map_err(|e| VaultError::shard_unavailable(path, e))?
    {
        if first {
            first = false;
            if is_header(record.get(0).unwrap_or_default().as_bytes()) {
                continue;
            }
        }
        let candle: Candle = record
            .deserialize(None)
            .map_err(|e| VaultError::shard_unavailable(path, e))?;
        rows.push(candle);
    }

    if let Some(head) = rows.first() {
        let unit = TimestampUnit::detect(head.open_time);
        if unit != TimestampUnit::Millis {
            debug!(path = %path.display(), ?unit, "normalizing shard timestamps");
            for row in &mut rows {
                *row = row.normalized(unit);
            }
        }
    }
    Ok(rows)
}

/// Counts the data rows of a shard without deserializing them.
///
/// # Errors
///
/// Returns [`VaultError::ShardUnavailable`] if the file is missing or malformed.
pub fn count_rows(path: &Path) -> Result<usize> {
    let mut reader = open(path)?;
    let mut record = ByteRecord::new();
    let mut count = 0usize;
    let mut first = true;

    while reader
        .read_byte_record(&mut record)
        .map_err(|e| VaultError::shard_unavailable(path, e))?
    {
        if first {
            first = false;
            if is_header(record.get(0).unwrap_or_default()) {
                continue;
            }
        }
        count += 1;
    }
    Ok(count)
}
