//! Post extraction from thread pages
//!
//! Post blocks are located with a cascade of layout heuristics; the first
//! strategy that matches anything wins. Each block is serialized without
//! its noise elements, with an archive lookup link placed after every
//! outbound anchor.

use crate::crawler::document::{visible_text, Document};
use crate::output::escape_html;
use crate::state::PostRecord;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::OnceLock;
use url::Url;

/// Host of the snapshot service archive links point at
pub const ARCHIVE_HOST: &str = "web.archive.org";

const ARCHIVE_PREFIX: &str = "https://web.archive.org/web/*/";

/// Author used when no name element is found near a block
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Blocks whose markup is at most this many characters are dropped
pub const NOISE_THRESHOLD: usize = 20;

const POST_CLASSES: [&str; 5] = [
    "post",
    "message",
    "post_content",
    "entry-content",
    "comment-content",
];

/// Elements dropped from post markup together with their content
const NOISE_TAGS: [&str; 8] = [
    "script", "style", "form", "iframe", "noscript", "input", "button", "center",
];

const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Ancestors searched for an author name
const STRUCTURAL_TAGS: [&str; 4] = ["table", "div", "li", "article"];

const AUTHOR_MARKERS: [&str; 3] = ["user", "author", "name"];

fn message_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"post_message_\d+").expect("valid regex"))
}

fn legacy_cell_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"td_post_\d+").expect("valid regex"))
}

/// Forum layouts recognized as post containers, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStrategy {
    /// div/td/article carrying a well-known post class
    PostClass,

    /// div/td/article with a `post_message_<n>` id
    MessageId,

    /// Legacy table layouts: `td.alt1` with a `td_post_<n>` id
    LegacyCell,
}

impl BlockStrategy {
    pub const CASCADE: [BlockStrategy; 3] = [
        BlockStrategy::PostClass,
        BlockStrategy::MessageId,
        BlockStrategy::LegacyCell,
    ];

    /// Elements this strategy accepts, in document order
    pub fn candidates<'a>(&self, html: &'a Html) -> Vec<ElementRef<'a>> {
        match self {
            BlockStrategy::PostClass => select(html, "div, td, article")
                .into_iter()
                .filter(|el| el.value().classes().any(|c| POST_CLASSES.contains(&c)))
                .collect(),
            BlockStrategy::MessageId => select(html, "div[id], td[id], article[id]")
                .into_iter()
                .filter(|el| {
                    el.value()
                        .id()
                        .map_or(false, |id| message_id_pattern().is_match(id))
                })
                .collect(),
            BlockStrategy::LegacyCell => select(html, "td.alt1[id]")
                .into_iter()
                .filter(|el| {
                    el.value()
                        .id()
                        .map_or(false, |id| legacy_cell_pattern().is_match(id))
                })
                .collect(),
        }
    }
}

fn select<'a>(html: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(selector) => html.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Finds post blocks with the first strategy that matches anything
pub fn find_post_blocks(html: &Html) -> Option<(BlockStrategy, Vec<ElementRef<'_>>)> {
    BlockStrategy::CASCADE.iter().find_map(|strategy| {
        let blocks = strategy.candidates(html);
        (!blocks.is_empty()).then_some((*strategy, blocks))
    })
}

/// Extracts posts from a thread page
///
/// # Arguments
///
/// * `document` - The fetched page
/// * `page_number` - 1-based page number recorded on every post
///
/// # Returns
///
/// One record per retained block, in document order. Empty when no
/// strategy matches.
pub fn extract_posts(document: &Document, page_number: u32) -> Vec<PostRecord> {
    let Some((strategy, blocks)) = find_post_blocks(document.html()) else {
        return Vec::new();
    };

    tracing::trace!(
        "{:?} matched {} blocks on {}",
        strategy,
        blocks.len(),
        document.url()
    );

    blocks
        .into_iter()
        .filter_map(|block| {
            let content = render_block(block, document.url()).trim().to_string();
            if is_noise(&content) {
                return None;
            }

            Some(PostRecord {
                author: infer_author(block),
                content,
                page_number,
            })
        })
        .collect()
}

/// Returns true if serialized block markup is too short to be a post
pub fn is_noise(markup: &str) -> bool {
    markup.trim().chars().count() <= NOISE_THRESHOLD
}

/// Serializes a block without noise elements, adding archive links
pub fn render_block(block: ElementRef<'_>, base_url: &Url) -> String {
    let mut markup = String::new();
    write_element(block, base_url, &mut markup);
    markup
}

fn write_element(element: ElementRef<'_>, base_url: &Url, out: &mut String) {
    let name = element.value().name();
    if NOISE_TAGS.contains(&name) {
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&escape_html(value));
        out.push('"');
    }
    out.push('>');

    if VOID_TAGS.contains(&name) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape_html(text)),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, base_url, out);
                }
            }
            _ => {}
        }
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');

    if name == "a" {
        if let Some(target) = archive_target(element, base_url) {
            out.push_str("<a href=\"");
            out.push_str(&escape_html(&target));
            out.push_str("\" class=\"arclink\" target=\"_blank\"> (Archived)</a>");
        }
    }
}

/// Archive lookup URL for an anchor, if it should get one
fn archive_target(anchor: ElementRef<'_>, base_url: &Url) -> Option<String> {
    let href = anchor.value().attr("href")?.trim();

    if href.is_empty()
        || href.starts_with('#')
        || href.to_ascii_lowercase().starts_with("javascript")
        || href.contains(ARCHIVE_HOST)
        || followed_by_archive_link(anchor)
    {
        return None;
    }

    // Absolute targets are kept verbatim; only relative ones are resolved
    let absolute = match Url::parse(href) {
        Ok(_) => href.to_string(),
        Err(_) => base_url
            .join(href)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| href.to_string()),
    };

    Some(format!("{}{}", ARCHIVE_PREFIX, absolute))
}

/// Returns true if the next non-blank sibling already is an archive link
fn followed_by_archive_link(anchor: ElementRef<'_>) -> bool {
    for sibling in anchor.next_siblings() {
        match sibling.value() {
            Node::Text(text) if text.trim().is_empty() => continue,
            Node::Element(element) => {
                return element.name() == "a"
                    && element
                        .attr("href")
                        .map_or(false, |href| href.contains(ARCHIVE_HOST));
            }
            _ => return false,
        }
    }
    false
}

/// Looks for the author near a post block
///
/// Walks up to the nearest structural ancestor and returns the text of the
/// first `a`, `span`, `b` or `strong` below it whose class mentions a user
/// or author name.
pub fn infer_author(block: ElementRef<'_>) -> String {
    let container = block
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| STRUCTURAL_TAGS.contains(&el.value().name()));

    let Some(container) = container else {
        return UNKNOWN_AUTHOR.to_string();
    };
    let Ok(selector) = Selector::parse("a, span, b, strong") else {
        return UNKNOWN_AUTHOR.to_string();
    };

    container
        .select(&selector)
        .find(|el| {
            el.value().attr("class").map_or(false, |class| {
                let class = class.to_lowercase();
                AUTHOR_MARKERS.iter().any(|marker| class.contains(marker))
            })
        })
        .map(visible_text)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> Document {
        Document::parse(
            &format!("<html><body>{}</body></html>", body),
            Url::parse("https://forum.example.com/thread-7?page=2").unwrap(),
        )
    }

    fn count_archive_links(markup: &str) -> usize {
        markup.matches("class=\"arclink\"").count()
    }

    #[test]
    fn test_post_class_strategy() {
        let doc = page(
            r#"<div class="postbit"><span class="username">alice</span>
               <div class="post">The first real post on this page.</div></div>
               <div class="postbit"><span class="username">bob</span>
               <div class="post">A second post with some text.</div></div>"#,
        );
        let posts = extract_posts(&doc, 2);

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].author, "alice");
        assert_eq!(posts[1].author, "bob");
        assert!(posts[0].content.contains("The first real post"));
        assert!(posts.iter().all(|p| p.page_number == 2));
    }

    #[test]
    fn test_message_id_strategy() {
        let doc = page(
            r#"<div class="wrap"><div id="post_message_101">Message body number one here</div></div>"#,
        );
        let (strategy, blocks) = find_post_blocks(doc.html()).unwrap();
        assert_eq!(strategy, BlockStrategy::MessageId);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_legacy_cell_strategy_and_table_author() {
        let doc = page(
            r#"<table>
                 <tr><td><a class="bigusername" href="/member/9">Carol</a></td></tr>
                 <tr><td class="alt1" id="td_post_55">Old school table layout post.</td></tr>
               </table>"#,
        );
        let (strategy, _) = find_post_blocks(doc.html()).unwrap();
        assert_eq!(strategy, BlockStrategy::LegacyCell);

        let posts = extract_posts(&doc, 1);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author, "Carol");
    }

    #[test]
    fn test_first_matching_strategy_wins() {
        let doc = page(
            r#"<div class="message">Body found through the class name.</div>
               <div id="post_message_3">Body found through the id only.</div>"#,
        );
        let (strategy, blocks) = find_post_blocks(doc.html()).unwrap();
        assert_eq!(strategy, BlockStrategy::PostClass);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_no_blocks() {
        let doc = page("<p>Nothing that looks like a post.</p>");
        assert!(find_post_blocks(doc.html()).is_none());
        assert!(extract_posts(&doc, 1).is_empty());
    }

    #[test]
    fn test_unknown_author() {
        let doc = page(r#"<div class="post">Anonymous words without a name.</div>"#);
        let posts = extract_posts(&doc, 1);
        assert_eq!(posts[0].author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_noise_elements_removed() {
        let doc = page(
            r#"<div class="post">Visible text stays.<script>alert(1)</script>
               <style>.x{}</style><form><input name="q"><button>Go</button></form>
               <iframe src="/ad"></iframe><center>banner</center></div>"#,
        );
        let content = &extract_posts(&doc, 1)[0].content;

        assert!(content.contains("Visible text stays."));
        for noise in ["<script", "alert(1)", "<style", "<form", "<input", "<button", "<iframe", "banner"] {
            assert!(!content.contains(noise), "{} leaked into {}", noise, content);
        }
    }

    #[test]
    fn test_is_noise() {
        assert!(is_noise(""));
        assert!(is_noise("  <p>short</p>  "));
        assert!(is_noise("<td>twelve ch</td>"));
        assert!(!is_noise("<div class=\"post\"></div>"));
    }

    #[test]
    fn test_extracted_posts_are_never_noise() {
        let doc = page(
            r#"<div class="post"></div><div class="post">Long enough to count as a post.</div>"#,
        );
        let posts = extract_posts(&doc, 1);

        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| !is_noise(&p.content)));
    }

    #[test]
    fn test_archive_links_added() {
        let doc = page(
            r##"<div class="post">See <a href="/wiki/Synth">this</a>, <a href="#top">top</a>,
               <a href="javascript:void(0)">js</a> and
               <a href="https://web.archive.org/web/2020/https://x.example">old</a>.</div>"##,
        );
        let content = &extract_posts(&doc, 1)[0].content;

        assert_eq!(count_archive_links(content), 1);
        assert!(content.contains(
            "https://web.archive.org/web/*/https://forum.example.com/wiki/Synth"
        ));
        assert!(content.contains("> (Archived)</a>"));
    }

    #[test]
    fn test_absolute_archive_target_kept_verbatim() {
        let doc = page(
            r#"<div class="post">Manuals are on <a href="https://x.example">the maker site</a>
               and <a href="HTTPS://Synths.example/wiki/TB-303">the wiki</a>.</div>"#,
        );
        let content = &extract_posts(&doc, 1)[0].content;

        assert!(content.contains(r#"href="https://web.archive.org/web/*/https://x.example""#));
        assert!(!content.contains("https://x.example/\""));
        assert!(content.contains("https://web.archive.org/web/*/HTTPS://Synths.example/wiki/TB-303"));
    }

    #[test]
    fn test_archive_augmentation_is_idempotent() {
        let doc = page(
            r#"<div class="post"><a href="https://a.example/1">one</a> and
               <a href="/two">two</a> are both linked here.</div>"#,
        );
        let once = extract_posts(&doc, 1).remove(0).content;
        assert_eq!(count_archive_links(&once), 2);

        let again = page(&once);
        let twice = extract_posts(&again, 1).remove(0).content;
        assert_eq!(count_archive_links(&twice), count_archive_links(&once));
        assert_eq!(
            twice.matches(ARCHIVE_PREFIX).count(),
            once.matches(ARCHIVE_PREFIX).count()
        );
    }

    #[test]
    fn test_markup_is_escaped() {
        let doc = page(r#"<div class="post">Tom &amp; Jerry say 1 &lt; 2 in this post</div>"#);
        let content = &extract_posts(&doc, 1)[0].content;
        assert!(content.contains("Tom &amp; Jerry say 1 &lt; 2"));
    }
}
