//! HTML part file generation
//!
//! Renders one slice of a thread into a standalone page with a header
//! echoing where the slice starts, one block per post, and footer links
//! to the neighbouring parts.

use crate::output::naming::part_filename;
use crate::output::traits::{DocumentWriter, OutputError, OutputResult, PartDocument};
use std::path::PathBuf;

const STYLESHEET: &str = r#"<style>
body { font-family: 'Segoe UI', Tahoma, Verdana, sans-serif; max-width: 900px; margin: 0 auto; padding: 20px; background: #eef2f5; color: #333; }
.thread-header { background: #fff; padding: 25px; border-left: 6px solid #2980b9; margin-bottom: 25px; border-radius: 4px; }
.thread-title { margin: 0 0 10px 0; font-size: 1.8em; color: #2c3e50; }
.source-link { font-size: 0.9em; color: #666; background: #f8f9fa; padding: 10px; border: 1px solid #e9ecef; border-radius: 4px; display: inline-block; }
.source-link a { color: #2980b9; text-decoration: none; word-break: break-all; font-weight: bold; }
.post { background: #fff; padding: 20px; margin-bottom: 20px; border: 1px solid #ddd; border-radius: 4px; }
.meta { color: #888; font-size: 0.85em; margin-bottom: 15px; border-bottom: 1px solid #eee; padding-bottom: 8px; display: flex; justify-content: space-between; }
.author { font-weight: bold; color: #2980b9; font-size: 1.1em; }
.content { line-height: 1.6; font-size: 15px; overflow-wrap: break-word; }
.content img { max-width: 100%; height: auto; display: block; margin: 10px 0; }
.content blockquote { background: #f9f9f9; border-left: 4px solid #ccc; margin: 10px 0; padding: 10px; color: #555; }
.arclink { font-size: 0.75em; color: #d35400; text-decoration: none; margin-left: 4px; opacity: 0.8; }
.footer-nav { margin-top: 40px; padding: 20px; background: #fff; text-align: center; border-radius: 4px; }
.footer-nav a { display: inline-block; padding: 10px 25px; margin: 0 5px; background: #ecf0f1; text-decoration: none; color: #333; font-weight: bold; border-radius: 20px; }
.footer-nav a.next { background: #2980b9; color: #fff; }
</style>"#;

/// Writes part files as static HTML pages
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlWriter;

impl HtmlWriter {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentWriter for HtmlWriter {
    fn write_part(&self, part: &PartDocument<'_>) -> OutputResult<PathBuf> {
        if part.posts.is_empty() {
            return Err(OutputError::EmptyPart {
                name: part.display_name.to_string(),
                part: part.part,
            });
        }

        let path = part.output_dir.join(part.filename);
        let html = render_part(part);

        std::fs::write(&path, html).map_err(|source| OutputError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

/// Formats a part as a complete HTML document
pub fn render_part(part: &PartDocument<'_>) -> String {
    let name = escape_html(part.display_name);
    let start_url = escape_html(part.start_url);
    let mut html = String::new();

    html.push_str("<!DOCTYPE html><html><head><meta charset='utf-8'>");
    html.push_str(&format!(
        "<title>{} - Part {}</title>{}</head><body>",
        name, part.part, STYLESHEET
    ));

    // Header
    html.push_str("<div class=\"thread-header\">");
    html.push_str(&format!(
        "<h1 class=\"thread-title\">{} (Part {})</h1>",
        name, part.part
    ));
    html.push_str("<div class=\"source-link\">");
    html.push_str(&format!(
        "<strong>Start URL:</strong> <a href=\"{0}\" target=\"_blank\">{0}</a>",
        start_url
    ));
    html.push_str("</div></div>");

    // Posts
    for post in part.posts {
        html.push_str(&format!(
            "<div class=\"post\"><div class=\"meta\"><span class=\"author\">{}</span> \
             <span>Page {}</span></div><div class=\"content\">{}</div></div>",
            escape_html(&post.author),
            post.page_number,
            post.content
        ));
    }

    // Footer navigation
    html.push_str("<div class=\"footer-nav\">");
    if part.part > 1 {
        html.push_str(&format!(
            "<a href=\"{}\">&laquo; Previous</a>",
            escape_html(&part_filename(part.base_filename, part.part - 1))
        ));
    }
    html.push_str(&format!("<span>&nbsp; Part {} &nbsp;</span>", part.part));
    if part.has_next {
        html.push_str(&format!(
            "<a href=\"{}\" class=\"next\">Next Part &raquo;</a>",
            escape_html(&part_filename(part.base_filename, part.part + 1))
        ));
    }
    html.push_str("</div></body></html>");

    html
}

/// Escapes text for use in HTML content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PostRecord;
    use std::path::Path;

    fn posts() -> Vec<PostRecord> {
        vec![
            PostRecord {
                author: "alice".to_string(),
                content: "<div class=\"post\">First post body</div>".to_string(),
                page_number: 1,
            },
            PostRecord {
                author: "<bob>".to_string(),
                content: "<div class=\"post\">Second post body</div>".to_string(),
                page_number: 2,
            },
        ]
    }

    fn part<'a>(posts: &'a [PostRecord], dir: &'a Path, number: u32, has_next: bool) -> PartDocument<'a> {
        PartDocument {
            filename: "Synth_thread_p1.html",
            posts,
            output_dir: dir,
            start_url: "https://forum.example.com/thread-1?page=1&x=2",
            part: number,
            display_name: "Synth thread",
            base_filename: "Synth_thread.html",
            has_next,
        }
    }

    #[test]
    fn test_render_header_and_posts() {
        let posts = posts();
        let html = render_part(&part(&posts, Path::new("."), 1, false));

        assert!(html.contains("<title>Synth thread - Part 1</title>"));
        assert!(html.contains("Synth thread (Part 1)"));
        assert!(html.contains("https://forum.example.com/thread-1?page=1&amp;x=2"));
        assert!(html.contains("<span class=\"author\">alice</span>"));
        assert!(html.contains("&lt;bob&gt;"));
        assert!(html.contains("<span>Page 2</span>"));
        assert!(html.contains("First post body"));
    }

    #[test]
    fn test_first_part_navigation() {
        let posts = posts();
        let html = render_part(&part(&posts, Path::new("."), 1, true));

        assert!(!html.contains("Previous"));
        assert!(html.contains("href=\"Synth_thread_p2.html\" class=\"next\""));
    }

    #[test]
    fn test_middle_and_last_part_navigation() {
        let posts = posts();
        let middle = render_part(&part(&posts, Path::new("."), 3, true));
        assert!(middle.contains("href=\"Synth_thread_p2.html\">&laquo; Previous"));
        assert!(middle.contains("Synth_thread_p4.html"));

        let last = render_part(&part(&posts, Path::new("."), 3, false));
        assert!(last.contains("Synth_thread_p2.html"));
        assert!(!last.contains("Next Part"));
    }

    #[test]
    fn test_write_part_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let posts = posts();
        let path = HtmlWriter::new()
            .write_part(&part(&posts, dir.path(), 1, false))
            .unwrap();

        assert_eq!(path, dir.path().join("Synth_thread_p1.html"));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
        assert!(written.ends_with("</html>"));
    }

    #[test]
    fn test_write_part_refuses_empty() {
        let dir = tempfile::tempdir().unwrap();
        let result = HtmlWriter::new().write_part(&part(&[], dir.path(), 1, false));
        assert!(matches!(result, Err(OutputError::EmptyPart { .. })));
    }

    #[test]
    fn test_write_part_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let posts = posts();
        let result = HtmlWriter::new().write_part(&part(&posts, &missing, 1, false));
        assert!(matches!(result, Err(OutputError::Write { .. })));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
