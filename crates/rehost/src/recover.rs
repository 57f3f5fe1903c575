//! Direct-link recovery: turning image "viewer" page URLs into raw asset
//! URLs, per-site.
//!
//! Two rule flavours. Page-scan rules cost one extra fetch: the viewer page
//! body is scanned with a site-specific pattern for the true asset URL.
//! Rewrite rules are terminal string surgery on the URL itself. Nothing here
//! ever fails: the worst case is the URL coming back unchanged.

use crate::transport::Transport;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;

use crate::error::ErrorKind;

struct PageRule {
    trigger: Regex,
    extract: Regex,
}

struct RewriteRule {
    pattern: Regex,
    replacement: &'static str,
}

static PAGE_RULES: LazyLock<Vec<PageRule>> = LazyLock::new(|| {
    [
        (r"phyrefile\.com/image/view", r#"id="main_content".*?href="([^"]+)"#),
        (r"bak\.lan/pictures/share", r#"<input.*?class="code_box".*?value="([^"]+)"#),
        (r"ipicture\.ru/Gallery/Viewfull/", r#"<input.*?type="text".*?value="([^"]+)"#),
        (r"img\.epidemz\.net/s/", r#"<input.*?type="text".*?value="([^"]+)"#),
        (r"10pix\.ru/view/", r#"src="([^"]+10pix\.ru/img[^"]+)"#),
        (r"imageshack\.us/i/", r#"rel="image_src" href="([^"]+)"#),
    ]
    .iter()
    .map(|(trigger, extract)| PageRule {
        trigger: Regex::new(trigger).unwrap(),
        extract: Regex::new(&format!("(?si){extract}")).unwrap(),
    })
    .collect()
});

static REWRITE_RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    [
        (r"radikal\.ru/\w/(.+)\.html?$", "$1"),
        (
            r"fastpic\.ru/view/([^/]+)/([^/]+)/([^/]+)/([^.]+?)(\w\w)\.([^.]+)\.html?$",
            "i$1.fastpic.ru/big/$2/$3/$5/${4}${5}.$6",
        ),
        (r"bitbest\.ru/view\.php\?.*?img=([^&]+).*", "bitbest.ru/files/$1"),
    ]
    .iter()
    .map(|(pattern, replacement)| RewriteRule {
        pattern: Regex::new(pattern).unwrap(),
        replacement,
    })
    .collect()
});

/// Apply URL-rewriting rules in an effort to get a direct link.
pub(crate) async fn recover_direct_link(
    url: &str,
    transport: &dyn Transport,
    timeout: Duration,
) -> String {
    for rule in PAGE_RULES.iter() {
        if !rule.trigger.is_match(url) {
            continue;
        }
        let page = match transport.fetch(url, None, timeout).await {
            Ok(page) => page,
            Err(err) => {
                warn!(%url, error = %err, "viewer page fetch failed");
                return url.to_string();
            }
        };
        let body = String::from_utf8_lossy(&page.bytes);
        return match rule.extract.captures(&body).and_then(|caps| caps.get(1)) {
            Some(found) => found.as_str().to_string(),
            None => {
                let drift = ErrorKind::LayoutDrift { host: host_of(url) };
                warn!(%url, error = %drift, "unable to parse viewer page");
                url.to_string()
            }
        };
    }
    for rule in REWRITE_RULES.iter() {
        let rewritten = rule.pattern.replace(url, rule.replacement);
        if rewritten != url {
            return rewritten.into_owned();
        }
    }
    url.to_string()
}

fn host_of(url: &str) -> String {
    url.split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or(url)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn rewrite_rule_is_terminal() {
        let transport = MockTransport::new();
        let url = "http://radikal.ru/F/s39.radikal.ru/i086/pic.jpg.html";
        let direct = recover_direct_link(url, &transport, TIMEOUT).await;
        assert_eq!(direct, "http://s39.radikal.ru/i086/pic.jpg");
    }

    #[tokio::test]
    async fn fastpic_view_url_is_rewritten() {
        let transport = MockTransport::new();
        let url = "http://fastpic.ru/view/39/2010/0506/abcdef12.jpg.html";
        let direct = recover_direct_link(url, &transport, TIMEOUT).await;
        assert_eq!(direct, "http://i39.fastpic.ru/big/2010/0506/12/abcdef12.jpg");
    }

    #[tokio::test]
    async fn page_scan_extracts_direct_link() {
        let url = "http://10pix.ru/view/abc.html";
        let transport = MockTransport::new().with_page(
            url,
            "text/html",
            r#"<html><img src="http://i.10pix.ru/img7/abc.jpg"></html>"#,
        );
        let direct = recover_direct_link(url, &transport, TIMEOUT).await;
        assert_eq!(direct, "http://i.10pix.ru/img7/abc.jpg");
    }

    #[tokio::test]
    async fn layout_drift_falls_back_to_original() {
        let url = "http://10pix.ru/view/abc.html";
        let transport = MockTransport::new().with_page(url, "text/html", "<html>redesigned</html>");
        let direct = recover_direct_link(url, &transport, TIMEOUT).await;
        assert_eq!(direct, url);
    }

    #[tokio::test]
    async fn fetch_failure_falls_back_to_original() {
        let url = "http://imageshack.us/i/thing/";
        let transport = MockTransport::new();
        let direct = recover_direct_link(url, &transport, TIMEOUT).await;
        assert_eq!(direct, url);
    }

    #[tokio::test]
    async fn unknown_host_passes_through() {
        let transport = MockTransport::new();
        let url = "http://example.org/a.png";
        let direct = recover_direct_link(url, &transport, TIMEOUT).await;
        assert_eq!(direct, url);
    }
}
