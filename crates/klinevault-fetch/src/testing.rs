//! In-memory archive used by the unit tests.

use async_trait::async_trait;
use klinevault_types::{Result, VaultError};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::ArchiveSource;
use crate::url::CHECKSUM_SUFFIX;

/// Emulates an S3-style bucket: keys are listed in lexicographic order,
/// strictly after `start-after`, `page_size` at a time.
#[derive(Debug)]
pub(crate) struct FakeArchive {
    keys: BTreeSet<String>,
    archives: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    page_size: usize,
    pub(crate) listing_requests: Mutex<Vec<String>>,
    pub(crate) archive_requests: Mutex<Vec<String>>,
}

impl FakeArchive {
    pub(crate) fn new(page_size: usize) -> Self {
        Self {
            keys: BTreeSet::new(),
            archives: HashMap::new(),
            failing: HashSet::new(),
            page_size,
            listing_requests: Mutex::new(Vec::new()),
            archive_requests: Mutex::new(Vec::new()),
        }
    }

    /// Publishes `{prefix}{stem}.zip` and its checksum sibling.
    pub(crate) fn publish(&mut self, prefix: &str, stem: &str) {
        let key = format!("{prefix}{stem}.zip");
        self.keys.insert(format!("{key}{CHECKSUM_SUFFIX}"));
        self.keys.insert(key);
    }

    /// Inserts a raw listing key, e.g. to simulate a stray object.
    pub(crate) fn insert_key(&mut self, key: &str) {
        self.keys.insert(key.to_string());
    }

    /// Serves `url` as a zip holding one CSV entry.
    pub(crate) fn serve_csv(&mut self, url: &str, entry_name: &str, csv: &str) {
        self.archives
            .insert(url.to_string(), zip_bytes(entry_name, csv));
    }

    /// Serves raw bytes at `url`.
    pub(crate) fn serve_bytes(&mut self, url: &str, bytes: Vec<u8>) {
        self.archives.insert(url.to_string(), bytes);
    }

    /// Makes every request for `url` fail.
    pub(crate) fn fail(&mut self, url: &str) {
        self.failing.insert(url.to_string());
    }

    pub(crate) fn archive_request_count(&self) -> usize {
        self.archive_requests.lock().unwrap().len()
    }

    fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
        let query = url.split_once('?')?.1;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
    }
}

#[async_trait]
impl ArchiveSource for FakeArchive {
    async fn fetch_listing(&self, url: &str) -> Result<String> {
        self.listing_requests.lock().unwrap().push(url.to_string());
        let prefix = Self::query_param(url, "prefix").unwrap_or_default();
        let after = Self::query_param(url, "start-after");

        let page: Vec<&String> = self
            .keys
            .iter()
            .filter(|k| k.starts_with(prefix))
            .filter(|k| after.is_none_or(|a| k.as_str() > a))
            .take(self.page_size)
            .collect();

        Ok(listing_xml(page.iter().map(|k| k.as_str())))
    }

    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<()> {
        self.archive_requests.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(VaultError::Http(format!("simulated failure for {url}")));
        }
        let bytes = self
            .archives
            .get(url)
            .ok_or_else(|| VaultError::Http(format!("Not found: {url}")))?;
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }
}

/// Renders keys the way the bucket listing does.
pub(crate) fn listing_xml<'a>(keys: impl IntoIterator<Item = &'a str>) -> String {
    let mut body = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ListBucketResult>",
    );
    for key in keys {
        body.push_str("<Contents><Key>");
        body.push_str(key);
        body.push_str("</Key><Size>1</Size></Contents>");
    }
    body.push_str("</ListBucketResult>");
    body
}

/// Builds a zip archive holding a single entry.
pub(crate) fn zip_bytes(entry_name: &str, contents: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file(entry_name, zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(contents.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}
