//! URL tokenization: opaque, collision-resistant placeholders for URLs.
//!
//! A token is the SHA-1 hex digest of the absolute URL, so repeated
//! occurrences of the same URL within one document collapse onto one token
//! and, transitively, one rehost job. The table lives for a single document
//! conversion; the persisted layer is the link cache.

use std::collections::HashMap;

/// A URL awaiting (or done with) resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEntry {
    pub original: String,
    pub resolved: Option<String>,
}

/// Token → URL table for one document conversion. The tag rule engine owns
/// it while scanning; the rehost pipeline borrows it to fill in resolutions;
/// then [`apply`](UrlTable::apply) splices the results back into the text.
#[derive(Debug, Default)]
pub struct UrlTable {
    entries: HashMap<String, UrlEntry>,
}

impl UrlTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint (or re-use) the token for a URL.
    pub fn tokenize(&mut self, url: &str) -> String {
        let token = hash_url(url);
        self.entries.entry(token.clone()).or_insert_with(|| UrlEntry {
            original: url.to_string(),
            resolved: None,
        });
        token
    }

    /// Record the terminal outcome of a rehost job. Unknown tokens are
    /// ignored; jobs only ever write to tokens they were spawned for.
    pub fn resolve(&mut self, token: &str, url: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(token) {
            entry.resolved = Some(url.into());
        }
    }

    /// Tokens that still need a rehost job, paired with their source URLs.
    pub fn unresolved(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|(_, e)| e.resolved.is_none())
            .map(|(t, e)| (t.clone(), e.original.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UrlEntry)> {
        self.entries.iter().map(|(t, e)| (t.as_str(), e))
    }

    /// Replace every token occurrence with its resolved URL, or with the
    /// original URL where resolution failed or was cancelled. Tokens never
    /// overlap or nest, so order is irrelevant.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (token, entry) in &self.entries {
            out = out.replace(token.as_str(), entry.resolved.as_deref().unwrap_or(&entry.original));
        }
        out
    }
}

/// Deterministic 40-hex digest of a URL. Fixed-length hex cannot arise as
/// ordinary post text, so the token is safe to substitute back without
/// ambiguity.
pub fn hash_url(url: &str) -> String {
    sha1_smol::Sha1::from(url.as_bytes()).digest().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_deterministic_40_hex() {
        let a = hash_url("http://x/a.png");
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, hash_url("http://x/a.png"));
    }

    #[test]
    fn token_matches_the_sha1_test_vector() {
        // FIPS 180-1 appendix A.
        assert_eq!(hash_url("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn distinct_urls_distinct_tokens() {
        let urls = [
            "http://x/a.png",
            "http://x/b.png",
            "http://x/a.png?",
            "https://x/a.png",
            "http://y/a.png",
        ];
        let tokens: std::collections::HashSet<_> = urls.iter().map(|u| hash_url(u)).collect();
        assert_eq!(tokens.len(), urls.len());
    }

    #[test]
    fn same_url_collapses_onto_one_entry() {
        let mut table = UrlTable::new();
        let t1 = table.tokenize("http://x/a.png");
        let t2 = table.tokenize("http://x/a.png");
        assert_eq!(t1, t2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn apply_prefers_resolved_and_degrades_to_original() {
        let mut table = UrlTable::default();
        let ok = table.tokenize("http://x/a.png");
        let failed = table.tokenize("http://x/b.png");
        table.resolve(&ok, "http://host/d/1");
        let text = format!("[img]{ok}[/img] [img]{failed}[/img] [img]{ok}[/img]");
        assert_eq!(
            table.apply(&text),
            "[img]http://host/d/1[/img] [img]http://x/b.png[/img] [img]http://host/d/1[/img]"
        );
    }

    #[test]
    fn resolve_ignores_unknown_tokens() {
        let mut table = UrlTable::default();
        table.resolve("deadbeef", "http://host/d/2");
        assert!(table.is_empty());
    }
}
