//! The rule dispatcher: one HTML tag occurrence in, replacement text out.
//!
//! Never fails: a missing capture group degrades to an empty parameter, a
//! tag nothing matches degrades to its bare content. Lossy by design.

use crate::context::{SiteContext, scheme};
use crate::entities;
use crate::reduce;
use crate::rules::{
    self, Applies, FLOAT_MARK, INNER_TAG_RE, SPOILER_HEAD_RE, SPOILER_MARK, Rule,
};
use crate::tokens::UrlTable;

/// Compute the replacement for a single tag occurrence.
pub(crate) fn resolve(
    tag: &str,
    attr: &str,
    content: &str,
    ctx: &SiteContext,
    urls: &mut UrlTable,
) -> String {
    let tag = tag.to_ascii_lowercase();
    if rules::SKIP_TAGS.contains(&tag.as_str()) {
        return String::new();
    }
    for pattern in rules::SKIP_ATTR.iter() {
        if pattern.is_match(attr) {
            return String::new();
        }
    }

    let mut content = content.to_string();
    if ctx.quirks.flatten_markers.iter().any(|m| attr.contains(m.as_str())) {
        content = content.replace('\n', " ");
    }
    if ctx.quirks.bold_spans && tag == "span" {
        return format!("[b]{content}[/b]");
    }

    for rule in rules::TAG_RULES.iter() {
        let subject = match rule.applies {
            Applies::Attribute => attr,
            Applies::TagName => tag.as_str(),
        };
        let Some(caps) = rule.pattern.captures(subject) else {
            continue;
        };
        return apply_rule(rule, caps, &tag, content, ctx, urls);
    }

    // Unknown tag: the markup is dropped, its content survives.
    content
}

fn apply_rule(
    rule: &Rule,
    caps: regex::Captures<'_>,
    tag: &str,
    mut content: String,
    ctx: &SiteContext,
    urls: &mut UrlTable,
) -> String {
    let mut g = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
    if rule.close == "[/color]"
        && let Some(mapped) = ctx.quirks.color_remap.get(&g)
    {
        g = mapped.clone();
    }

    let mut open = rule.open.to_string();
    // A float style does not emit a tag of its own: it annotates an inner
    // image tag with a side parameter.
    if rule.open == FLOAT_MARK {
        content = content.replace("[img]", &format!("[img={g}]"));
        open = String::new();
    }
    // Comic Sans is banned; left-alignment is a no-op.
    if rule.close == "[/font]" && g == "'Comic Sans MS'" {
        return content;
    }
    if rule.close == "[/align]" && g == "left" {
        return content;
    }

    open = open.replace('_', &g);
    if rule.url_in_second_group {
        g = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
    }

    if rule.url_bearing && rules::URL_TAGS.contains(&tag) && !g.is_empty() {
        let absolute = ctx.absolutize(&g);
        match scheme(&absolute) {
            Some("http") | Some("https") => {
                let url = entities::decode(&absolute);
                let token = urls.tokenize(&url);
                if tag == "a" {
                    open = rule.open.replace('_', &token);
                }
                if tag == "var" || tag == "img" {
                    content = token;
                }
            }
            // Tags with weird URL schemes are omitted wholesale.
            _ => return content,
        }
    }

    if open == SPOILER_MARK {
        open = match SPOILER_HEAD_RE.captures(&content) {
            Some(head) => {
                let title = INNER_TAG_RE.replace_all(&head[1], "").into_owned();
                let marker = head[0].to_string();
                content = content.replace(&marker, "");
                format!("[spoiler=\"{title}\"]")
            }
            None => "[spoiler]".to_string(),
        };
    }

    // [pre] emulation: literal spaces survive later whitespace collapsing.
    if tag == "pre" {
        content = content.replace(' ', "&#160;");
    }

    match &rule.reducer {
        Some(reducer) => reduce::reduce(&content, &open, rule.close, reducer),
        None => format!("{open}{content}{}", rule.close),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Quirks;

    fn run(tag: &str, attr: &str, content: &str) -> (String, UrlTable) {
        let ctx = SiteContext::new("http://site", "http://site/t/");
        let mut urls = UrlTable::default();
        let out = resolve(tag, attr, content, &ctx, &mut urls);
        (out, urls)
    }

    #[test]
    fn styled_span_becomes_bold() {
        let (out, _) = run("span", r#" style="font-weight: bold""#, "hi");
        assert_eq!(out, "[b]hi[/b]");
    }

    #[test]
    fn skip_attribute_discards_content() {
        let (out, _) = run("div", r#" style="display: none""#, "secret");
        assert_eq!(out, "");
    }

    #[test]
    fn skip_tag_name_discards_content() {
        let (out, _) = run("script", "", "alert(1)");
        assert_eq!(out, "");
    }

    #[test]
    fn unknown_tag_keeps_content() {
        let (out, urls) = run("foo", r#" bar="baz""#, "text");
        assert_eq!(out, "text");
        assert!(urls.is_empty());
    }

    #[test]
    fn anchor_url_is_tokenized() {
        let (out, urls) = run("a", r#" href="http://x/page""#, "click");
        assert_eq!(urls.len(), 1);
        let (token, entry) = urls.iter().next().unwrap();
        assert_eq!(entry.original, "http://x/page");
        assert_eq!(out, format!("[url={token}]click[/url]"));
    }

    #[test]
    fn relative_href_is_absolutized() {
        let (_, urls) = run("a", r#" href="/dl.php?t=1""#, "get");
        let (_, entry) = urls.iter().next().unwrap();
        assert_eq!(entry.original, "http://site/dl.php?t=1");
    }

    #[test]
    fn entities_in_url_are_decoded_before_hashing() {
        let (_, urls) = run("a", r#" href="http://x/p?a=1&amp;b=2""#, "x");
        let (token, entry) = urls.iter().next().unwrap();
        assert_eq!(entry.original, "http://x/p?a=1&b=2");
        assert_eq!(token, crate::hash_url("http://x/p?a=1&b=2"));
    }

    #[test]
    fn weird_scheme_drops_the_tag() {
        let (out, urls) = run("a", r#" href="javascript:void(0)""#, "x");
        assert_eq!(out, "x");
        assert!(urls.is_empty());
    }

    #[test]
    fn img_content_becomes_token() {
        let (out, urls) = run("img", r#" src="http://x/a.png""#, "");
        let (token, _) = urls.iter().next().unwrap();
        assert_eq!(out, format!("[img]{token}[/img]"));
    }

    #[test]
    fn sided_post_img_takes_url_from_second_group() {
        let attr = r#" class="postImg img-right" title="http://x/p.jpg""#;
        let (out, urls) = run("var", attr, "");
        let (token, entry) = urls.iter().next().unwrap();
        assert_eq!(entry.original, "http://x/p.jpg");
        assert_eq!(out, format!("[img=right]{token}[/img]"));
    }

    #[test]
    fn float_annotates_inner_image() {
        let (out, _) = run("div", r#" style="float:right""#, "[img]abc[/img]");
        assert_eq!(out, "[img=right]abc[/img]");
    }

    #[test]
    fn comic_sans_is_banned() {
        let (out, _) = run("span", r#" style="font-family: 'Comic Sans MS'""#, "x");
        assert_eq!(out, "x");
    }

    #[test]
    fn align_left_is_dropped() {
        let (out, _) = run("div", r#" style="text-align: left""#, "x");
        assert_eq!(out, "x");
    }

    #[test]
    fn color_is_parameterized() {
        let (out, _) = run("span", r#" style="color: red""#, "x");
        assert_eq!(out, "[color=red]x[/color]");
    }

    #[test]
    fn color_remap_quirk() {
        let ctx = SiteContext::new("http://hdclub.org", "http://hdclub.org/")
            .with_quirks(Quirks::for_host("hdclub.org"));
        let mut urls = UrlTable::default();
        let out = resolve("span", r#" style="color: #999966""#, "x", &ctx, &mut urls);
        assert_eq!(out, "[color=#005000]x[/color]");
    }

    #[test]
    fn bold_span_quirk() {
        let ctx = SiteContext::default().with_quirks(Quirks::for_host("dvdtalk.ru"));
        let mut urls = UrlTable::default();
        let out = resolve("span", "", "x", &ctx, &mut urls);
        assert_eq!(out, "[b]x[/b]");
    }

    #[test]
    fn spoiler_with_head_markers() {
        let (out, _) = run(
            "div",
            r#" class="sp-wrap""#,
            "{#sh#}The [b]Title[/b]{#/sh#}hidden text",
        );
        assert_eq!(out, "[spoiler=\"The Title\"]hidden text[/spoiler]");
    }

    #[test]
    fn spoiler_without_head() {
        let (out, _) = run("div", r#" class="spoiler-wrap""#, "hidden");
        assert_eq!(out, "[spoiler]hidden[/spoiler]");
    }

    #[test]
    fn pre_escapes_spaces() {
        let (out, _) = run("pre", r#" class="post-pre""#, "a  b");
        assert_eq!(out, "[font=\"monospace\"]a&#160;&#160;b[/font]");
    }

    #[test]
    fn titled_quote_beats_bare_quote() {
        let (out, _) = run("div", r#" class="q" head="Author wrote""#, "said");
        assert_eq!(out, "[quote=\"Author wrote\"]said[/quote]");
    }

    #[test]
    fn nested_bold_is_reduced() {
        let (out, _) = run("b", "", "a[b]b[/b]c");
        assert_eq!(out, "[b]abc[/b]");
    }
}
