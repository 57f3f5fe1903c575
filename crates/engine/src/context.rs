//! Per-site conversion context.
//!
//! The original tool kept the site roots and per-site behaviour tweaks in
//! globals; here they are an explicit value threaded through the engine and
//! the rehost pipeline, so documents from different sites can be converted
//! concurrently.

use std::collections::HashMap;

/// Site-specific behaviour fix-ups for known-broken forum templates.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct Quirks {
    /// Palette values to remap inside `[color=...]` parameters.
    pub color_remap: HashMap<String, String>,
    /// Treat every `<span>` as bold, regardless of attributes.
    pub bold_spans: bool,
    /// Attribute substrings whose presence collapses newlines in the tag's
    /// content to spaces.
    pub flatten_markers: Vec<String>,
}

impl Quirks {
    /// Built-in quirk profiles, selected by host name.
    pub fn for_host(host: &str) -> Self {
        let mut quirks = Self::default();
        if host.contains("hdclub") {
            quirks.color_remap.insert("#999966".to_string(), "#005000".to_string());
            quirks.color_remap.insert("#006699".to_string(), "#000000".to_string());
        }
        if host.contains("dvdtalk") {
            quirks.bold_spans = true;
            quirks.flatten_markers = vec![r#"class="z""#.to_string(), r#"width="190""#.to_string()];
        }
        quirks
    }
}

/// Base URLs and quirks for the document being converted.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct SiteContext {
    /// Scheme and host of the originating site, e.g. `http://example.org`.
    /// Used to absolutize root-relative links.
    pub site_root: String,
    /// Directory of the page being converted, used to absolutize other
    /// relative links, and sent as the referer for rehost fetches.
    pub target_root: String,
    pub quirks: Quirks,
}

impl SiteContext {
    pub fn new(site_root: impl Into<String>, target_root: impl Into<String>) -> Self {
        Self {
            site_root: site_root.into(),
            target_root: target_root.into(),
            quirks: Quirks::default(),
        }
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    /// Derive roots and quirks from the URL of the page being converted.
    ///
    /// Anything that doesn't look like an absolute URL (e.g. a local file
    /// path) yields an empty context: relative links then stay relative and
    /// are dropped by the URL-bearing rules.
    pub fn for_page(url: &str) -> Self {
        let Some((scheme, rest)) = url.split_once("://") else {
            return Self::default();
        };
        let (host, path) = match rest.split_once('/') {
            Some((host, path)) => (host, format!("/{path}")),
            None => (rest, "/".to_string()),
        };
        let site_root = format!("{scheme}://{host}");
        let dir_end = path.rfind('/').map(|i| i + 1).unwrap_or(1);
        let target_root = format!("{site_root}{}", &path[..dir_end]);
        Self {
            site_root,
            target_root,
            quirks: Quirks::for_host(host),
        }
    }

    /// Resolve a possibly-relative link against the document's roots.
    /// Root-relative paths go to the site root, everything else to the
    /// page directory. Links that already carry a scheme pass through.
    pub fn absolutize(&self, href: &str) -> String {
        if scheme(href).is_some() {
            return href.to_string();
        }
        if href.starts_with('/') {
            format!("{}{href}", self.site_root)
        } else {
            format!("{}{href}", self.target_root)
        }
    }
}

/// The URL scheme, if the string starts with a syntactically valid one.
pub(crate) fn scheme(url: &str) -> Option<&str> {
    let (candidate, _) = url.split_once(':')?;
    let mut chars = candidate.chars();
    if !chars.next()?.is_ascii_alphabetic() {
        return None;
    }
    chars
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        .then_some(candidate)
}
