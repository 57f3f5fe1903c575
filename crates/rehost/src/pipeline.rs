//! The rehosting pipeline: resolve every tokenized URL to its final home.
//!
//! One job per unique source URL, fanned out over a bounded pool. Jobs never
//! fail the run: any problem is logged and the original URL stands in for the
//! destination, so a broken image host degrades a single link rather than the
//! whole conversion.

use crate::error::{ErrorKind, Result};
use crate::recover::recover_direct_link;
use crate::transport::TransportHandle;
use debb_cache::LinkCache;
use debb_engine::UrlTable;
use futures::{StreamExt, stream};
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Scrapes a human-readable diagnostic out of a hosting endpoint's HTML
/// error response.
static UPLOAD_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?si)class="[^"]*error[^"]*"[^>]*>\s*([^<]+)"#).unwrap()
});

/// Tunables for the rehosting pipeline.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RehostConfig {
    /// Where assets are uploaded to.
    pub upload_url: String,
    /// Pattern a rehosted URL matches. Doubles as the identity check: a
    /// source URL already matching it is left alone.
    pub download_url_pattern: String,
    /// Assets larger than this many bytes are not rehosted.
    pub max_size: u64,
    /// Per-operation network timeout, in seconds.
    pub timeout_secs: u64,
    /// How many jobs run concurrently.
    pub pool_size: usize,
    /// Sent with every request.
    pub user_agent: String,
    /// MIME types accepted as images. Empty means any `image/*`.
    pub accepted_image_types: Vec<String>,
}

impl Default for RehostConfig {
    fn default() -> Self {
        Self {
            upload_url: "http://file.kirovnet.ru/upload".to_string(),
            download_url_pattern: r"http://file\.kirovnet\.ru/d/\d+".to_string(),
            max_size: 50 * 1024 * 1024,
            timeout_secs: 60,
            pool_size: 10,
            user_agent: "Mozilla/5.0 Firefox/3.6.12".to_string(),
            accepted_image_types: Vec::new(),
        }
    }
}

impl RehostConfig {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The rehosting pipeline. Cheap to share: hold it in an `Arc` and call
/// [`Pipeline::resolve_all`] once per conversion.
pub struct Pipeline {
    transport: TransportHandle,
    cache: Arc<LinkCache>,
    config: RehostConfig,
    download_url: Regex,
}

impl Pipeline {
    pub fn new(
        transport: TransportHandle,
        cache: Arc<LinkCache>,
        config: RehostConfig,
    ) -> Result<Self> {
        let download_url = Regex::new(&config.download_url_pattern)
            .map_err(|err| ErrorKind::InvalidPattern(err.to_string()))?;
        Ok(Self {
            transport,
            cache,
            config,
            download_url,
        })
    }

    /// Resolve every pending entry in the table, at most `pool_size` at a
    /// time. Entries whose job is cancelled or never ran stay unresolved and
    /// degrade to their original URL on substitution.
    #[instrument(skip_all, fields(jobs = table.unresolved().len()))]
    pub async fn resolve_all(
        &self,
        table: &mut UrlTable,
        referer: Option<&str>,
        cancel: &CancellationToken,
    ) {
        let jobs = table.unresolved();
        let results: Vec<(String, Option<String>)> = stream::iter(jobs)
            .map(|(token, url)| async move {
                if cancel.is_cancelled() {
                    return (token, None);
                }
                tokio::select! {
                    _ = cancel.cancelled() => (token, None),
                    resolved = self.rehost_one(&url, true, referer) => (token, Some(resolved)),
                }
            })
            .buffer_unordered(self.config.pool_size.max(1))
            .collect()
            .await;
        for (token, resolved) in results {
            if let Some(destination) = resolved {
                table.resolve(&token, destination);
            }
        }
    }

    /// Rehost a single URL, returning the destination. Infallible: every
    /// failure mode logs and yields the original URL.
    #[instrument(skip(self, referer))]
    pub async fn rehost_one(&self, url: &str, expect_image: bool, referer: Option<&str>) -> String {
        if self.download_url.is_match(url) {
            return url.to_string();
        }
        match self.cache.lookup(url).await {
            Ok(Some(destination)) => return destination,
            Ok(None) => {}
            Err(err) => warn!(%url, error = %err, "cache lookup failed"),
        }

        let timeout = self.config.timeout();
        let source = if expect_image {
            recover_direct_link(url, self.transport.as_ref(), timeout).await
        } else {
            url.to_string()
        };

        let fetched = match self.transport.fetch(&source, referer, timeout).await {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(url = %source, error = %err, "fetch failed, keeping original URL");
                return url.to_string();
            }
        };
        if expect_image && !self.accepts_mime(&fetched.mime) {
            let rejected = ErrorKind::UnexpectedContentType {
                url: source.clone(),
                mime: fetched.mime.clone(),
            };
            warn!(error = %rejected, "keeping original URL");
            return url.to_string();
        }
        let size = fetched.bytes.len() as u64;
        if size > self.config.max_size {
            let rejected = ErrorKind::SizeLimitExceeded {
                url: source.clone(),
                size,
            };
            warn!(error = %rejected, "keeping original URL");
            return url.to_string();
        }

        let filename = filename_of(&source);
        let body = match self
            .transport
            .upload(fetched.bytes, &filename, &fetched.mime, timeout)
            .await
        {
            Ok(body) => body,
            Err(err) => {
                warn!(url = %source, error = %err, "upload failed, keeping original URL");
                return url.to_string();
            }
        };
        match self.download_url.find(&body) {
            Some(found) => {
                let destination = found.as_str().to_string();
                if let Err(err) = self.cache.record(url, &destination).await {
                    warn!(%url, error = %err, "could not persist cache entry");
                }
                info!(%url, %destination, "rehosted");
                destination
            }
            None => {
                let diagnostic = UPLOAD_ERROR_RE
                    .captures(&body)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_else(|| "no destination URL in response".to_string());
                let rejected = ErrorKind::UploadRejected(diagnostic);
                warn!(%url, error = %rejected, "keeping original URL");
                url.to_string()
            }
        }
    }

    fn accepts_mime(&self, mime: &str) -> bool {
        let mime = mime
            .split(';')
            .next()
            .unwrap_or(mime)
            .trim()
            .to_ascii_lowercase();
        if self.config.accepted_image_types.is_empty() {
            return mime.starts_with("image/");
        }
        self.config.accepted_image_types.iter().any(|accepted| accepted.eq_ignore_ascii_case(&mime))
    }
}

/// Last path segment of the URL, query and fragment stripped. The hosting
/// endpoint wants *some* filename; "file" covers bare hosts.
fn filename_of(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let path = path.trim_end_matches('/');
    if path.contains('/') {
        path.rsplit('/').next().unwrap_or("file").to_string()
    } else {
        "file".to_string()
    }
}
