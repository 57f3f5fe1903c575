//! The network capability consumed by the pipeline.
//!
//! The pipeline never talks HTTP itself; it is written against this trait so
//! the fetch/multipart-upload primitives stay out of the core (and so tests
//! run without a network).

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A fetched resource: raw bytes plus the server-reported MIME type.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Unified interface to the outside network.
///
/// Both operations are expected to enforce the given timeout themselves and
/// surface it as [`ErrorKind::Network`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Retrieve a resource. Used for direct-link recovery page scans and for
    /// the asset fetch itself.
    async fn fetch(&self, url: &str, referer: Option<&str>, timeout: Duration) -> Result<Fetched>;

    /// Submit bytes as a multipart upload to the hosting endpoint and return
    /// the raw response body. Success is detected by the *pipeline* matching
    /// the destination-URL shape in that body, not here.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        mime: &str,
        timeout: Duration,
    ) -> Result<String>;
}

pub type TransportHandle = Arc<dyn Transport>;

/// A transport with no network: every operation fails soft. With it the
/// pipeline still performs identity short-circuits and cache lookups, which
/// is exactly what an offline conversion wants.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

#[async_trait]
impl Transport for Offline {
    async fn fetch(&self, url: &str, _referer: Option<&str>, _timeout: Duration) -> Result<Fetched> {
        exn::bail!(ErrorKind::Network(format!("offline: not fetching {url}")))
    }

    async fn upload(
        &self,
        _bytes: Vec<u8>,
        filename: &str,
        _mime: &str,
        _timeout: Duration,
    ) -> Result<String> {
        exn::bail!(ErrorKind::Network(format!("offline: not uploading {filename}")))
    }
}

/// Canned-response transport for tests.
///
/// Fetches are served from a URL→response map; anything unknown fails with
/// a network error. Uploads either return the configured body or, when none
/// is configured, time out. Upload filenames are recorded so tests can
/// assert how many jobs actually reached the endpoint.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct MockTransport {
    pages: std::collections::HashMap<String, Fetched>,
    upload_response: Option<String>,
    uploads: tokio::sync::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "mock"))]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` with the given MIME type for `url`.
    pub fn with_page(mut self, url: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(
            url.into(),
            Fetched {
                bytes: bytes.into(),
                mime: mime.into(),
            },
        );
        self
    }

    /// Answer every upload with this response body.
    pub fn with_upload_response(mut self, body: impl Into<String>) -> Self {
        self.upload_response = Some(body.into());
        self
    }

    pub async fn upload_count(&self) -> usize {
        self.uploads.lock().await.len()
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &str, _referer: Option<&str>, _timeout: Duration) -> Result<Fetched> {
        match self.pages.get(url) {
            Some(fetched) => Ok(fetched.clone()),
            None => exn::bail!(ErrorKind::Network(format!("no canned response for {url}"))),
        }
    }

    async fn upload(
        &self,
        _bytes: Vec<u8>,
        filename: &str,
        _mime: &str,
        _timeout: Duration,
    ) -> Result<String> {
        self.uploads.lock().await.push(filename.to_string());
        match &self.upload_response {
            Some(body) => Ok(body.clone()),
            None => exn::bail!(ErrorKind::Network("upload timed out".to_string())),
        }
    }
}
