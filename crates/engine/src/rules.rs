//! The ordered rule tables mapping site HTML onto the BBCode grammar.
//!
//! Order is significant everywhere in this module: the first matching rule
//! wins, so the tables act as priority lists, not sets. Patterns all carry
//! `(?si)` — the source templates are case-sloppy and attributes can span
//! lines.

use crate::reduce::Reducer;
use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Internal sentinels, spliced into rule templates and consumed by the
// dispatcher before any of them could reach the output.
pub(crate) const FLOAT_MARK: &str = "{#float#}";
pub(crate) const SPOILER_MARK: &str = "{#spoiler#}";
pub(crate) const SPOILER_HEAD_OPEN: &str = "{#sh#}";
pub(crate) const SPOILER_HEAD_CLOSE: &str = "{#/sh#}";

/// Tags whose whole content is categorically unwanted.
pub(crate) const SKIP_TAGS: &[&str] = &[
    "object", "param", "embed", "form", "script", "style", "head", "p", "noindex", "noscript",
];

/// Always-void tags, rewritten to one canonical self-closed spelling so the
/// scanner needs only one pattern for them.
pub(crate) const VOID_TAGS: &[&str] = &[
    "meta", "base", "basefont", "param", "frame", "link", "img", "br", "hr", "area", "input",
];

/// Tag names that may carry a URL parameter worth rehosting.
pub(crate) const URL_TAGS: &[&str] = &["a", "var", "img"];

/// BBCode open-tag templates for which nested self-identical pairs are
/// meaningless and must be collapsed.
const NO_NEST_TEMPLATES: &[&str] = &["[b]", "[i]", "[u]", "[color=_]", "[align=_]", "[size=_]"];

/// Attribute patterns marking elements to discard entirely (hidden blocks,
/// heading bars, fold/title chrome, attachment boxes).
pub(crate) static SKIP_ATTR: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        "display: ?none",
        "\"heading\"",
        "colhead",
        "sp-fold",
        "q-head",
        "c-head",
        "sp-title",
        "quote-title",
        "attach",
        "thx-container",
        "tor-fl-wrap",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?si){p}")).unwrap())
    .collect()
});

/// Literal substitution rules: simple one-to-one textual replacements
/// requiring no tag parsing, applied globally before the tag passes.
/// The typed-list rule precedes the untyped one so it can ever fire.
pub(crate) static LITERAL_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("\n", ""),
        ("\r", ""),
        ("<wbr>", ""),
        (r"<!(\s*--.*?--\s*)*>", ""),
        // line breaks, horizontal rulers
        (r#"<span class="post-br">.*?</span>"#, "\n\n"),
        (r#"<span class="post-hr">.*?</span>"#, "[hr]"),
        (r"<hr[^>]*>", "[hr]"),
        (r"<br[^>]*>", "\n"),
        ("<div></div>", "\n"),
        (r"<tr[^>]*>", ""),
        ("</tr>", "\n"),
        // lists
        (r#"<[ou]l type="([^"])">"#, "[list=$1]"),
        (r"<[ou]l[^>]*>", "[list]"),
        ("</[ou]l>", "[/list]"),
        (r"<li[^>]*>", "[*]"),
        ("</li>", ""),
    ]
    .iter()
    .map(|(p, r)| (Regex::new(&format!("(?si){p}")).unwrap(), *r))
    .collect()
});

/// Pre-pass deleters for [`SKIP_TAGS`]: greedy shortest-match up to the
/// same-named closing tag. The word boundary keeps `p` from swallowing
/// `<pre>` blocks.
pub(crate) static SKIP_TAG_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SKIP_TAGS
        .iter()
        .map(|t| Regex::new(&format!(r"(?si)\s*<{t}\b.*?</{t}>\s*")).unwrap())
        .collect()
});

/// Normalizers for [`VOID_TAGS`]: one regex canonicalizing the open tag to
/// the self-closed spelling, one deleting stray closing tags.
pub(crate) static VOID_NORMALIZERS: LazyLock<Vec<(Regex, Regex)>> = LazyLock::new(|| {
    VOID_TAGS
        .iter()
        .map(|t| {
            (
                Regex::new(&format!(r"(?si)<({t}\b[^>]*?)/?>")).unwrap(),
                Regex::new(&format!("(?i)</{t}>")).unwrap(),
            )
        })
        .collect()
});

// The two scanner patterns: self-closed tags, then paired tags whose content
// contains no nested `<`.
regex!(NTAG_RE, r"(?si)<(\w+)([^>]*)/>");
regex!(PTAG_RE, r"(?si)<(\w+)([^>]*)>([^<]*)</\w+>");
regex!(LEFTOVER_RE, r"<[^>]+>");
regex!(SPOILER_HEAD_RE, r"(?s)\{#sh#\}(.*?)\{#/sh#\}");
regex!(INNER_TAG_RE, r"\[[^\]]+\]");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applies {
    /// Pattern is searched for in the tag's attribute text.
    Attribute,
    /// Pattern is matched against the lowercased tag name itself.
    TagName,
}

/// One entry of the rule table: a match pattern plus a BBCode template pair.
/// `_` in a template stands for the rule's captured parameter.
pub(crate) struct Rule {
    pub pattern: Regex,
    pub applies: Applies,
    pub open: &'static str,
    pub close: &'static str,
    pub url_bearing: bool,
    /// The parameter fills the open template from group 1, but the URL comes
    /// from group 2 (the sided `postImg` rule).
    pub url_in_second_group: bool,
    /// Present iff the template pair is non-nesting.
    pub reducer: Option<Reducer>,
}

impl Rule {
    fn new(applies: Applies, pattern: &str, open: &'static str, close: &'static str) -> Self {
        let reducer = NO_NEST_TEMPLATES
            .contains(&open)
            .then(|| Reducer::for_templates(open, close));
        Self {
            pattern: Regex::new(&format!("(?si){pattern}")).unwrap(),
            applies,
            open,
            close,
            url_bearing: false,
            url_in_second_group: false,
            reducer,
        }
    }

    fn attr(pattern: &str, open: &'static str, close: &'static str) -> Self {
        Self::new(Applies::Attribute, pattern, open, close)
    }

    fn tag(pattern: &str, open: &'static str, close: &'static str) -> Self {
        Self::new(Applies::TagName, pattern, open, close)
    }

    fn url(mut self) -> Self {
        self.url_bearing = true;
        self
    }

    fn url_in_second_group(mut self) -> Self {
        self.url_in_second_group = true;
        self
    }
}

/// The ordered tag rule table. Attribute rules come first so that styled
/// formatting wins over the bare tag-name fallbacks at the end.
pub(crate) static TAG_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // simple text formatting
        Rule::attr("post-b", "[b]", "[/b]"),
        Rule::attr("post-i", "[i]", "[/i]"),
        Rule::attr("post-u", "[u]", "[/u]"),
        Rule::attr("font-weight: ?bold", "[b]", "[/b]"),
        Rule::attr("font-style: ?italic", "[i]", "[/i]"),
        Rule::attr("text-decoration: ?underline", "[u]", "[/u]"),
        Rule::attr(r#"color: ?([^;"]+)"#, "[color=_]", "[/color]"),
        Rule::attr(r"font-size: ?(\d+)", "[size=_]", "[/size]"),
        Rule::attr(r#"font-family: ?([^;"]+)"#, "[font=\"_\"]", "[/font]"),
        // URLs
        Rule::attr(r#"href=['"]([^'"]+)"#, "[url=_]", "[/url]").url(),
        // images
        Rule::attr(r#"src=['"]([^'"]+)"#, "[img]", "[/img]").url(),
        Rule::attr(r#"class="postImg" title="([^"]+)"#, "[img]", "[/img]").url(),
        Rule::attr(r#"class="postImg [^"]*?img-([^ "]*)[^>]*?title="([^"]+)"#, "[img=_]", "[/img]")
            .url()
            .url_in_second_group(),
        // align
        Rule::attr("float: ?(left|right)", FLOAT_MARK, ""),
        Rule::attr(r#"text-align: ?([^;"]+)"#, "[align=_]", "[/align]"),
        Rule::attr(r#" align="([^"]+)"#, "[align=_]", "[/align]"),
        // spoilers
        Rule::attr("spoiler-wrap", SPOILER_MARK, "[/spoiler]"),
        Rule::attr("sp-wrap", SPOILER_MARK, "[/spoiler]"),
        Rule::attr("(?:spoiler-head|sp-head)", SPOILER_HEAD_OPEN, SPOILER_HEAD_CLOSE),
        Rule::attr(r#"sp-body[^>]* title="([^"]+)"#, "{#sh#}_{#/sh#}", ""),
        // quotes; the titled variant must precede the bare one
        Rule::attr(r#"class="q" head="([^"]+)"#, "[quote=\"_\"]", "[/quote]"),
        Rule::attr(r#"class="q""#, "[quote]", "[/quote]"),
        Rule::attr(r#"class="quote""#, "[quote]", "[/quote]"),
        // code & pre
        Rule::attr("c-body", "[code]", "[/code]"),
        Rule::attr("post-pre", "[font=\"monospace\"]", "[/font]"),
        // bare tag names
        Rule::tag("^b$", "[b]", "[/b]"),
        Rule::tag("^i$", "[i]", "[/i]"),
        Rule::tag("^u$", "[u]", "[/u]"),
        Rule::tag("^textarea$", "[font=\"monospace\"]", "[/font]"),
        Rule::tag("^center$", "[align=center]", "[/align]"),
    ]
});
