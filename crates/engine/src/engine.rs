//! The fixpoint driver: pre-passes, two-pass tag substitution, cleanup.

use crate::Conversion;
use crate::context::SiteContext;
use crate::dispatch::resolve;
use crate::rules::{self, LEFTOVER_RE, NTAG_RE, PTAG_RE};
use crate::tokens::UrlTable;
use regex::Captures;
use tracing::{debug, instrument};

/// Convert one rendered HTML fragment into BBCode with embedded URL tokens.
///
/// Purely sequential and deterministic; the only suspension points of the
/// whole system live in the rehost pipeline that consumes the result.
#[instrument(skip(fragment, ctx), fields(len = fragment.len()))]
pub fn convert(fragment: &str, ctx: &SiteContext) -> Conversion {
    let mut urls = UrlTable::default();
    let mut text = cut_attachments(fragment);

    // Cut out categorically unwanted tags, closing tag included.
    for pattern in rules::SKIP_TAG_RES.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    for (pattern, replacement) in rules::LITERAL_RULES.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    // Close tags that should be closed, leave already closed as-is.
    for (normalize, stray_close) in rules::VOID_NORMALIZERS.iter() {
        text = normalize.replace_all(&text, "<$1/>").into_owned();
        text = stray_close.replace_all(&text, "").into_owned();
    }

    let mut replaced = 0usize;
    text = NTAG_RE
        .replace_all(&text, |caps: &Captures| {
            replaced += 1;
            resolve(&caps[1], &caps[2], "", ctx, &mut urls)
        })
        .into_owned();

    // Replacing an inner tag strips its angle brackets, which can expose a
    // previously-unmatchable outer tag: re-scan until a pass does nothing.
    // Every substitution removes at least one `<`, so this terminates.
    loop {
        let mut pass = 0usize;
        text = PTAG_RE
            .replace_all(&text, |caps: &Captures| {
                pass += 1;
                resolve(&caps[1], &caps[2], &caps[3], ctx, &mut urls)
            })
            .into_owned();
        debug!(substitutions = pass, "paired-tag pass");
        replaced += pass;
        if pass == 0 {
            break;
        }
    }

    // Strip out any HTML leftovers.
    text = LEFTOVER_RE.replace_all(&text, "").into_owned();
    debug!(tags = replaced, urls = urls.len(), "conversion done");
    Conversion { bbcode: text, urls }
}

/// Everything from the attachments block on is site chrome, not post body.
/// The marker usually lands mid-markup, so the trailing partial tag goes too.
fn cut_attachments(input: &str) -> String {
    match input.split_once("class=\"attach") {
        Some((head, _)) => match head.rfind('<') {
            Some(pos) => head[..pos].to_string(),
            None => head.to_string(),
        },
        None => input.to_string(),
    }
}
