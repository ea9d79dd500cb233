//! Abstraction over the remote archive.

use async_trait::async_trait;
use klinevault_types::{Result, VaultError};
use std::path::Path;

use crate::DownloadClient;

/// The two remote operations the pipeline needs: a listing page and an archive.
///
/// [`DownloadClient`] is the production implementation; tests substitute an
/// in-memory archive.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Fetches one page of the bucket listing as raw XML.
    async fn fetch_listing(&self, url: &str) -> Result<String>;

    /// Downloads the archive at `url` into `dest`, replacing any existing file.
    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<()>;
}

#[async_trait]
impl ArchiveSource for DownloadClient {
    async fn fetch_listing(&self, url: &str) -> Result<String> {
        self.fetch_text(url)
            .await
            .map_err(|e| VaultError::Http(e.to_string()))
    }

    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<()> {
        self.download_to_file(url, dest)
            .await
            .map(|_| ())
            .map_err(|e| VaultError::Http(e.to_string()))
    }
}
