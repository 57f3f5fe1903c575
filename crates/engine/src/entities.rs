//! Minimal HTML entity decoding.
//!
//! Covers numeric references and the named entities that actually show up in
//! forum posts. Anything unknown or malformed is left verbatim — losing an
//! `&rsaquo;` is better than failing a document.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&(#?)(x?)(\w+);").unwrap());

const NAMED: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", "\u{a0}"),
    ("copy", "\u{a9}"),
    ("reg", "\u{ae}"),
    ("deg", "\u{b0}"),
    ("plusmn", "\u{b1}"),
    ("middot", "\u{b7}"),
    ("laquo", "\u{ab}"),
    ("raquo", "\u{bb}"),
    ("times", "\u{d7}"),
    ("divide", "\u{f7}"),
    ("ndash", "\u{2013}"),
    ("mdash", "\u{2014}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("ldquo", "\u{201c}"),
    ("rdquo", "\u{201d}"),
    ("bull", "\u{2022}"),
    ("hellip", "\u{2026}"),
    ("trade", "\u{2122}"),
];

/// Decode `&name;`, `&#NNN;` and `&#xHH;` references.
pub fn decode(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            if &caps[1] == "#" {
                let digits = &caps[3];
                let value = if &caps[2] == "x" {
                    u32::from_str_radix(digits, 16)
                } else {
                    digits.parse::<u32>()
                };
                match value.ok().and_then(char::from_u32) {
                    Some(c) => c.to_string(),
                    None => caps[0].to_string(),
                }
            } else {
                // Group 2 eats a leading `x` even for named entities.
                let name = format!("{}{}", &caps[2], &caps[3]);
                match NAMED.iter().find(|(n, _)| *n == name) {
                    Some((_, replacement)) => (*replacement).to_string(),
                    None => caps[0].to_string(),
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a &amp; b", "a & b")]
    #[case("&lt;tag&gt;", "<tag>")]
    #[case("&#65;&#66;", "AB")]
    #[case("&#x41;", "A")]
    #[case("&#xe9;", "é")]
    #[case("x&#160;y", "x\u{a0}y")]
    #[case("&unknown;", "&unknown;")]
    #[case("&#xzz;", "&#xzz;")]
    #[case("&#1114112;", "&#1114112;")]
    #[case("no entities", "no entities")]
    fn decoding(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(decode(input), expected);
    }

    #[test]
    fn url_with_entities() {
        assert_eq!(
            decode("http://x/p?a=1&amp;b=2"),
            "http://x/p?a=1&b=2"
        );
    }
}
