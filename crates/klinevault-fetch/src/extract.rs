//! Unpacking shard archives.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::ZipArchive;

/// Errors that can occur while unpacking a shard archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The archive is not a readable zip.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The archive holds no CSV entry.
    #[error("No CSV entry in archive '{0}'")]
    NoCsvEntry(PathBuf),

    /// Reading or writing failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Extracts the archive's single CSV entry to `dest`.
///
/// The entry is written to `<dest>.part` first and renamed onto `dest` only
/// once fully written, so `dest` never holds a partial shard. Returns the
/// number of bytes extracted.
///
/// # Errors
///
/// Returns an error if the archive is unreadable, holds no CSV, or the write fails.
pub fn extract_single_csv(archive: &Path, dest: &Path) -> Result<u64, ExtractError> {
    let mut zip = ZipArchive::new(BufReader::new(File::open(archive)?))?;

    let index = (0..zip.len())
        .find(|&i| {
            zip.by_index(i)
                .is_ok_and(|entry| entry.is_file() && entry.name().ends_with(".csv"))
        })
        .ok_or_else(|| ExtractError::NoCsvEntry(archive.to_path_buf()))?;

    let part = part_path(dest);
    let result: Result<u64, ExtractError> = (|| {
        let mut entry = zip.by_index(index)?;
        let mut out = BufWriter::new(File::create(&part)?);
        let written = io::copy(&mut entry, &mut out)?;
        out.flush()?;
        out.into_inner().map_err(io::IntoInnerError::into_error)?.sync_all()?;
        fs::rename(&part, dest)?;
        Ok(written)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
