//! Persisted URL→URL link cache.
//!
//! A line-oriented, append-only text store of whitespace-separated
//! `sourceURL destinationURL` pairs, shared between runs (and potentially
//! between concurrent processes). There is no locking beyond an in-process
//! append mutex: concurrent writers may race and produce duplicate lines for
//! the same key, so readers always take the first match and tolerate the
//! rest. Malformed lines are skipped, not fatal.

pub mod error;

use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{instrument, trace};

/// Handle to the on-disk link cache. Cheap to share behind an `Arc`; every
/// lookup re-reads the file, which keeps concurrent external appends visible.
#[derive(Debug)]
pub struct LinkCache {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl LinkCache {
    /// The file does not need to exist yet; it is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find out if the object at this address is already rehosted.
    ///
    /// First match wins; lines without exactly two fields are skipped.
    #[instrument(skip(self), fields(cache = %self.path.display()))]
    pub async fn lookup(&self, source: &str) -> Result<Option<String>> {
        let contents = match fs::read_to_string(&self.path).await {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            other => other.map_err(ErrorKind::Io)?,
        };
        for line in contents.lines() {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next(), fields.next()) {
                (Some(src), Some(dst), None) => {
                    if src == source {
                        return Ok(Some(dst.to_string()));
                    }
                }
                _ => trace!(line, "skipping malformed cache line"),
            }
        }
        Ok(None)
    }

    /// Remember the destination URL for re-use. Identity mappings and
    /// already-known sources are not written.
    #[instrument(skip(self), fields(cache = %self.path.display()))]
    pub async fn record(&self, source: &str, destination: &str) -> Result<()> {
        if source == destination {
            return Ok(());
        }
        let _guard = self.append_lock.lock().await;
        if self.lookup(source).await?.is_some() {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(ErrorKind::Io)?;
        file.write_all(format!("{source}\t{destination}\n").as_bytes())
            .await
            .map_err(ErrorKind::Io)?;
        file.flush().await.map_err(ErrorKind::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cache_in(dir: &tempfile::TempDir) -> LinkCache {
        LinkCache::new(dir.path().join("linkcache.txt"))
    }

    #[tokio::test]
    async fn missing_file_is_empty_cache() {
        let dir = tempdir().unwrap();
        let cache = cache_in(&dir);
        assert_eq!(cache.lookup("http://a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn round_trip() {
        let dir = tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.record("http://a", "http://host/d/1").await.unwrap();
        assert_eq!(
            cache.lookup("http://a").await.unwrap().as_deref(),
            Some("http://host/d/1")
        );
        assert_eq!(cache.lookup("http://c").await.unwrap(), None);
    }

    #[tokio::test]
    async fn identity_is_not_written() {
        let dir = tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.record("http://a", "http://a").await.unwrap();
        assert!(!cache.path().exists());
    }

    #[tokio::test]
    async fn known_source_is_not_rewritten() {
        let dir = tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.record("http://a", "http://host/d/1").await.unwrap();
        cache.record("http://a", "http://host/d/2").await.unwrap();
        let contents = std::fs::read_to_string(cache.path()).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert_eq!(
            cache.lookup("http://a").await.unwrap().as_deref(),
            Some("http://host/d/1")
        );
    }

    #[tokio::test]
    async fn malformed_and_duplicate_lines_are_tolerated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("linkcache.txt");
        std::fs::write(
            &path,
            "garbage\nhttp://a http://host/d/1\nhttp://a http://host/d/9\nx y z\n",
        )
        .unwrap();
        let cache = LinkCache::new(&path);
        // First match wins over the duplicate.
        assert_eq!(
            cache.lookup("http://a").await.unwrap().as_deref(),
            Some("http://host/d/1")
        );
        assert_eq!(cache.lookup("garbage").await.unwrap(), None);
        assert_eq!(cache.lookup("x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn appends_preserve_existing_entries() {
        let dir = tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.record("http://a", "http://host/d/1").await.unwrap();
        cache.record("http://b", "http://host/d/2").await.unwrap();
        assert_eq!(
            cache.lookup("http://b").await.unwrap().as_deref(),
            Some("http://host/d/2")
        );
        assert_eq!(
            cache.lookup("http://a").await.unwrap().as_deref(),
            Some("http://host/d/1")
        );
    }
}
