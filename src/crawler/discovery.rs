//! Thread discovery on the root index page

use crate::crawler::document::{resolve_href, visible_text, Document};
use crate::state::ThreadSeed;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Anchor texts this short are navigation glyphs, not thread titles
const MIN_TITLE_CHARS: usize = 3;

/// Hrefs jumping to the newest post instead of the thread start
const SHORTCUT_MARKERS: [&str; 2] = ["lastpost", "do=newest"];

fn deep_page_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"page[=\-][0-9]{2,}").expect("valid regex"))
}

/// Collects the threads linked from the root page
///
/// An anchor becomes a thread when its href contains `pattern`, its
/// resolved URL is not a deep pagination link or a newest-post shortcut,
/// and its text is longer than three characters. URLs are compared
/// without fragment; the first accepted anchor for a URL wins.
///
/// # Arguments
///
/// * `root` - The fetched root page
/// * `pattern` - Substring identifying thread links
///
/// # Returns
///
/// Unique seeds in document order
pub fn discover_threads(root: &Document, pattern: &str) -> Vec<ThreadSeed> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for (anchor, href) in root.anchors() {
        if !href.contains(pattern) {
            continue;
        }

        let Some(mut url) = resolve_href(href, root.url()) else {
            continue;
        };
        url.set_fragment(None);

        if is_excluded(url.as_str()) {
            tracing::trace!("Skipping navigation link {}", url);
            continue;
        }

        let title = visible_text(anchor);
        if title.chars().count() <= MIN_TITLE_CHARS {
            continue;
        }

        if seen.insert(url.to_string()) {
            seeds.push(ThreadSeed::new(title, url));
        }
    }

    seeds
}

fn is_excluded(url: &str) -> bool {
    deep_page_pattern().is_match(url) || SHORTCUT_MARKERS.iter().any(|marker| url.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn root(body: &str) -> Document {
        Document::parse(
            &format!("<html><body>{}</body></html>", body),
            Url::parse("https://forum.example.com/forum/synths").unwrap(),
        )
    }

    #[test]
    fn test_discovers_thread_links() {
        let doc = root(
            r#"<a href="/thread-1">Moog repair log</a>
               <a href="/thread-2">Best cheap polysynth?</a>
               <a href="/thread-3">Selling my TB-303</a>
               <a href="/thread-12/page-10">Deep page link</a>
               <a href="/member/4">Someone</a>"#,
        );
        let seeds = discover_threads(&doc, "thread-");

        assert_eq!(seeds.len(), 3);
        assert_eq!(seeds[0].title, "Moog repair log");
        assert_eq!(seeds[0].url.as_str(), "https://forum.example.com/thread-1");
        assert_eq!(seeds[2].url.as_str(), "https://forum.example.com/thread-3");
    }

    #[test]
    fn test_single_digit_page_links_allowed() {
        let doc = root(r#"<a href="/thread-4?page=2">Second page of thread four</a>"#);
        assert_eq!(discover_threads(&doc, "thread-").len(), 1);
    }

    #[test]
    fn test_shortcuts_excluded() {
        let doc = root(
            r#"<a href="/thread-1?goto=lastpost">Jump to last post</a>
               <a href="/showthread.php?t=1&do=newest">Newest reply</a>"#,
        );
        assert!(discover_threads(&doc, "thread").is_empty());
    }

    #[test]
    fn test_short_titles_excluded() {
        let doc = root(r#"<a href="/thread-1">»</a><a href="/thread-1">1 2</a><a href="/thread-2">Oscillator drift</a>"#);
        let seeds = discover_threads(&doc, "thread-");
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].title, "Oscillator drift");
    }

    #[test]
    fn test_fragments_deduplicated() {
        let doc = root(
            r##"<a href="/thread-1#post5">»»</a>
                <a href="/thread-1">Moog repair log</a>
                <a href="/thread-1#unread">Moog repair log (unread)</a>"##,
        );
        let seeds = discover_threads(&doc, "thread-");

        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].title, "Moog repair log");
        assert!(seeds[0].url.fragment().is_none());
    }

    #[test]
    fn test_relative_links_resolved_against_root() {
        let doc = root(r#"<a href="thread-9">Relative thread link</a>"#);
        let seeds = discover_threads(&doc, "thread-");
        assert_eq!(
            seeds[0].url.as_str(),
            "https://forum.example.com/forum/thread-9"
        );
    }
}
