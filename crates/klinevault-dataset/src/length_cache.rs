//! Sidecar row counts for shard files.

use klinevault_types::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::shard::count_rows;

/// Persisted row count of one shard, stored next to it as
/// `.cache.<shard file name>` with the body `{"length": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardLengthCache {
    /// Number of data rows in the shard.
    pub length: usize,
}

impl ShardLengthCache {
    /// Sidecar path for `shard`.
    #[must_use]
    pub fn sidecar_path(shard: &Path) -> PathBuf {
        let mut name = std::ffi::OsString::from(".cache.");
        name.push(shard.file_name().unwrap_or_default());
        shard.with_file_name(name)
    }

    /// Returns the row count of `shard`, from its sidecar when that is
    /// present and not older than the shard, otherwise by scanning the shard
    /// and rewriting the sidecar.
    ///
    /// A sidecar that cannot be written is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::ShardUnavailable`] if the shard has to be scanned
    /// and cannot be read.
    ///
    /// [`VaultError::ShardUnavailable`]: klinevault_types::VaultError::ShardUnavailable
    pub fn resolve(shard: &Path) -> Result<Self> {
        let sidecar = Self::sidecar_path(shard);

        if is_fresh(shard, &sidecar) {
            match Self::load(&sidecar) {
                Ok(cached) => return Ok(cached),
                Err(e) => {
                    let path = sidecar.display();
                    warn!(%path, error = %e, "ignoring unreadable length sidecar");
                }
            }
        }

        let cache = Self {
            length: count_rows(shard)?,
        };
        debug!(path = %shard.display(), length = cache.length, "counted shard rows");
        if let Err(e) = cache.save(&sidecar) {
            warn!(path = %sidecar.display(), error = %e, "failed to write length sidecar");
        }
        Ok(cache)
    }

    /// Reads a sidecar file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(sidecar: &Path) -> Result<Self> {
        let content = fs::read_to_string(sidecar)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes this count to `sidecar`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, sidecar: &Path) -> Result<()> {
        fs::write(sidecar, serde_json::to_string(self)?)?;
        Ok(())
    }
}

/// A sidecar is fresh when it exists and the shard was not modified after it.
fn is_fresh(shard: &Path, sidecar: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified()).ok();
    match (modified(shard), modified(sidecar)) {
        (Some(shard), Some(sidecar)) => shard <= sidecar,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{EPOCH, write_shard};
    use klinevault_types::{TimestampUnit, VaultError};
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    fn backdate(path: &Path) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            ShardLengthCache::sidecar_path(Path::new("/d/BTCUSDT-1m-2023-01.csv")),
            Path::new("/d/.cache.BTCUSDT-1m-2023-01.csv")
        );
    }

    #[test]
    fn test_resolve_writes_sidecar() {
        let tmp = tempfile::tempdir().unwrap();
        let shard = write_shard(tmp.path(), "X-1m-2023-01.csv", EPOCH, 7, TimestampUnit::Millis);

        let cache = ShardLengthCache::resolve(&shard).unwrap();
        assert_eq!(cache.length, 7);

        let sidecar = ShardLengthCache::sidecar_path(&shard);
        let body: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&sidecar).unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "length": 7 }));
    }

    #[test]
    fn test_fresh_sidecar_is_trusted() {
        let tmp = tempfile::tempdir().unwrap();
        let shard = write_shard(tmp.path(), "X-1m-2023-01.csv", EPOCH, 7, TimestampUnit::Millis);
        backdate(&shard);
        ShardLengthCache { length: 42 }
            .save(&ShardLengthCache::sidecar_path(&shard))
            .unwrap();

        assert_eq!(ShardLengthCache::resolve(&shard).unwrap().length, 42);
    }

    #[test]
    fn test_stale_sidecar_is_rebuilt() {
        let tmp = tempfile::tempdir().unwrap();
        let shard = write_shard(tmp.path(), "X-1m-2023-01.csv", EPOCH, 7, TimestampUnit::Millis);
        let sidecar = ShardLengthCache::sidecar_path(&shard);
        ShardLengthCache { length: 42 }.save(&sidecar).unwrap();
        backdate(&sidecar);

        assert_eq!(ShardLengthCache::resolve(&shard).unwrap().length, 7);
        assert_eq!(ShardLengthCache::load(&sidecar).unwrap().length, 7);
    }

    #[test]
    fn test_corrupt_sidecar_is_rebuilt() {
        let tmp = tempfile::tempdir().unwrap();
        let shard = write_shard(tmp.path(), "X-1m-2023-01.csv", EPOCH, 3, TimestampUnit::Millis);
        backdate(&shard);
        fs::write(ShardLengthCache::sidecar_path(&shard), "not json").unwrap();

        assert_eq!(ShardLengthCache::resolve(&shard).unwrap().length, 3);
    }

    #[test]
    fn test_missing_shard() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            ShardLengthCache::resolve(&tmp.path().join("gone.csv")),
            Err(VaultError::ShardUnavailable { .. })
        ));
    }
}
