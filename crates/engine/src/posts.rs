//! Locating post bodies inside a full forum page.
//!
//! Each supported forum template gets one extraction pattern; the first
//! pattern that matches anywhere on the page wins. Pages from unknown
//! templates are parsed whole, which mostly means more junk for the engine
//! to drop.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static POST_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // rutracker-alike
        r#"class="post_?body"[^>]*>(.*?)(?:</div><!--/post_body|<!-- //bt)"#,
        // hdclub-alike
        r#">[0-9a-f]{40}</td></tr>(.*?)<a name="startcomments">"#,
        // hdclub
        r#"class="heading_b"[^>]*>(.*?)</table>"#,
        // epidemz
        r#"id="news-id-[^>]*>(.*?)</p>"#,
        r#"id='news-id-[^>]*>(.*?)<td class="j""#,
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?si){p}")).unwrap())
    .collect()
});

/// Extract up to `limit` consecutive post bodies from a page.
pub fn extract_posts(page: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    for pattern in POST_PATTERNS.iter() {
        let found: Vec<String> = pattern
            .captures_iter(page)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .take(limit)
            .collect();
        if !found.is_empty() {
            return found;
        }
    }
    warn!("no post-body pattern matched, parsing the whole page");
    vec![page.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUTRACKER: &str = concat!(
        r#"<html><div class="post_body" id="p-1">one</div><!--/post_body-->"#,
        r#"<div class="post_body" id="p-2">two</div><!--/post_body-->"#,
        "</html>",
    );

    #[test]
    fn rutracker_template() {
        assert_eq!(extract_posts(RUTRACKER, 5), vec!["one", "two"]);
    }

    #[test]
    fn count_caps_the_result() {
        assert_eq!(extract_posts(RUTRACKER, 1), vec!["one"]);
    }

    #[test]
    fn zero_limit_still_yields_one_post() {
        assert_eq!(extract_posts(RUTRACKER, 0), vec!["one"]);
    }

    #[test]
    fn epidemz_template() {
        let page = r#"<div id="news-id-7">body here</p>"#;
        assert_eq!(extract_posts(page, 1), vec!["body here"]);
    }

    #[test]
    fn unknown_template_falls_back_to_whole_page() {
        let page = "<p>whatever</p>";
        assert_eq!(extract_posts(page, 3), vec![page.to_string()]);
    }
}
