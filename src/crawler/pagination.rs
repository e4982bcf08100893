//! Next-page resolution
//!
//! Forums paginate in many ways, so the next page is found with three
//! rules tried in order over every anchor on the page.

use crate::crawler::document::{resolve_href, visible_text, Document};
use url::Url;

/// Which rule located the next page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationRule {
    /// Anchor text is exactly the next page number
    PageNumber,

    /// Href contains a known page-parameter form for the next page
    HrefPattern,

    /// Anchor text reads like a "next" button
    NextLabel,
}

/// Finds the URL of the page after `current_page`
///
/// # Arguments
///
/// * `document` - The page that was just fetched
/// * `current_url` - URL relative links are resolved against
/// * `current_page` - 1-based number of the page that was just fetched
///
/// # Returns
///
/// The next page URL, or None when the thread ends here
pub fn next_page(document: &Document, current_url: &Url, current_page: u32) -> Option<Url> {
    resolve_next_page(document, current_url, current_page).map(|(url, _)| url)
}

/// Like [`next_page`], also reporting which rule matched
pub fn resolve_next_page(
    document: &Document,
    current_url: &Url,
    current_page: u32,
) -> Option<(Url, NavigationRule)> {
    let target = current_page + 1;
    let target_text = target.to_string();
    let anchors = document.anchors();

    let by_number = anchors.iter().find_map(|(anchor, href)| {
        if visible_text(*anchor) == target_text {
            resolve_href(href, current_url)
        } else {
            None
        }
    });
    if let Some(url) = by_number {
        return Some((url, NavigationRule::PageNumber));
    }

    let patterns = [
        format!("page={}", target),
        format!("page{}", target),
        format!("page-{}", target),
        format!("p={}", target),
        format!("start={}", target),
    ];
    let by_pattern = anchors.iter().find_map(|(_, href)| {
        if patterns.iter().any(|pattern| href.contains(pattern.as_str())) {
            resolve_href(href, current_url)
        } else {
            None
        }
    });
    if let Some(url) = by_pattern {
        return Some((url, NavigationRule::HrefPattern));
    }

    anchors
        .iter()
        .find_map(|(anchor, href)| {
            if is_next_label(&visible_text(*anchor)) {
                resolve_href(href, current_url)
            } else {
                None
            }
        })
        .map(|url| (url, NavigationRule::NextLabel))
}

/// Returns true if anchor text looks like a "next page" control
///
/// Anything mentioning "last" or ">>" is rejected so jump-to-end links are
/// never followed.
fn is_next_label(text: &str) -> bool {
    let text = text.to_lowercase();
    if text.contains("last") || text.contains(">>") {
        return false;
    }
    text.contains("next") || text.contains('›') || text.contains('>')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread_url() -> Url {
        Url::parse("https://forum.example.com/thread-5").unwrap()
    }

    fn doc(body: &str) -> Document {
        Document::parse(&format!("<html><body>{}</body></html>", body), thread_url())
    }

    #[test]
    fn test_page_number_rule() {
        let doc = doc(r#"<a href="/thread-5/page-3">3</a> <a href="?page=2"> 2 </a>"#);
        let (url, rule) = resolve_next_page(&doc, &thread_url(), 1).unwrap();
        assert_eq!(rule, NavigationRule::PageNumber);
        assert_eq!(url.as_str(), "https://forum.example.com/thread-5?page=2");
    }

    #[test]
    fn test_page_number_must_match_exactly() {
        let doc = doc(r#"<a href="/thread-5?page=12">12</a>"#);
        assert!(next_page(&doc, &thread_url(), 1).is_none());
    }

    #[test]
    fn test_href_pattern_rule() {
        for href in [
            "showthread.php?t=5&page=3",
            "/thread-5/page3",
            "/thread-5/page-3",
            "index.php?topic=5&p=3",
            "viewtopic.php?t=5&start=3",
        ] {
            let doc = doc(&format!(r#"<a href="{}">more</a>"#, href));
            let (_, rule) = resolve_next_page(&doc, &thread_url(), 2)
                .unwrap_or_else(|| panic!("no match for {}", href));
            assert_eq!(rule, NavigationRule::HrefPattern);
        }
    }

    #[test]
    fn test_next_label_rule() {
        for label in ["Next", "next page", "›", "&gt;"] {
            let doc = doc(&format!(r#"<a href="/thread-5/x">{}</a>"#, label));
            let (url, rule) = resolve_next_page(&doc, &thread_url(), 1)
                .unwrap_or_else(|| panic!("no match for {}", label));
            assert_eq!(rule, NavigationRule::NextLabel);
            assert_eq!(url.as_str(), "https://forum.example.com/thread-5/x");
        }
    }

    #[test]
    fn test_last_links_never_followed() {
        let doc = doc(r#"<a href="/thread-5/page-9">Last »</a> <a href="/thread-5/page-9">Last ›</a>"#);
        assert!(next_page(&doc, &thread_url(), 1).is_none());
    }

    #[test]
    fn test_double_arrow_never_followed() {
        let doc = doc(r#"<a href="/thread-5/end">&gt;&gt;</a>"#);
        assert!(next_page(&doc, &thread_url(), 1).is_none());
    }

    #[test]
    fn test_rules_apply_in_order() {
        let doc = doc(
            r#"<a href="/next-button">Next</a>
               <a href="/thread-5?page=2">more</a>
               <a href="/by-number">2</a>"#,
        );
        let (url, rule) = resolve_next_page(&doc, &thread_url(), 1).unwrap();
        assert_eq!(rule, NavigationRule::PageNumber);
        assert_eq!(url.path(), "/by-number");
    }

    #[test]
    fn test_no_navigation() {
        let doc = doc(r#"<a href="/home">Home</a><p>Only one page.</p>"#);
        assert!(next_page(&doc, &thread_url(), 1).is_none());
    }

    #[test]
    fn test_same_inputs_same_answer() {
        let doc = doc(r#"<a href="?page=2">Next ›</a>"#);
        let first = next_page(&doc, &thread_url(), 1);
        let second = next_page(&doc, &thread_url(), 1);
        assert_eq!(first, second);
        assert!(first.is_some());
    }
}
