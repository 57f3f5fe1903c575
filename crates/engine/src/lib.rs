//! Decompiles rendered forum-post HTML fragments back into BBCode.
//!
//! The input is assumed to be a flat run of tags as produced by specific
//! forum templates, not arbitrary well-formed HTML. Conversion is a
//! best-effort heuristic transducer: unknown markup is dropped, its text
//! content survives. Every external URL encountered on the way is replaced
//! by an opaque 40-hex token and collected into a [`UrlTable`], so a rehost
//! pipeline can resolve them concurrently and splice the results back in
//! with [`Conversion::finish`].

mod context;
mod dispatch;
mod engine;
pub mod entities;
pub mod posts;
mod reduce;
mod rules;
pub mod tokens;

pub use crate::context::{Quirks, SiteContext};
pub use crate::engine::convert;
pub use crate::tokens::{UrlEntry, UrlTable, hash_url};

/// The outcome of one document conversion: BBCode text with embedded URL
/// tokens, plus the table mapping each token to its source URL.
#[derive(Debug)]
pub struct Conversion {
    pub bbcode: String,
    pub urls: UrlTable,
}

impl Conversion {
    /// Substitute every token with its resolved URL (or, where resolution
    /// failed or never ran, the original URL), decode HTML entities and trim.
    ///
    /// Tokens are fixed-length hex digests that cannot arise as ordinary post
    /// text, so this is a flat, order-independent find/replace.
    pub fn finish(&self) -> String {
        entities::decode(&self.urls.apply(&self.bbcode)).trim().to_string()
    }
}
