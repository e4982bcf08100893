//! Parsed pages and the small HTML helpers shared by the extractor,
//! pagination resolver and thread discoverer

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A fetched page: parsed markup plus the URL it was served from
pub struct Document {
    url: Url,
    html: Html,
}

impl Document {
    /// Parses an HTML body served from `url`
    ///
    /// # Example
    ///
    /// ```
    /// use threadwalk::crawler::Document;
    /// use url::Url;
    ///
    /// let url = Url::parse("https://forum.example.com/thread-1").unwrap();
    /// let doc = Document::parse(r#"<a href="/thread-1/page-2">2</a>"#, url);
    /// assert_eq!(doc.anchors().len(), 1);
    /// ```
    pub fn parse(body: &str, url: Url) -> Self {
        Self {
            url,
            html: Html::parse_document(body),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// All `<a href>` elements in document order, paired with their href
    pub fn anchors(&self) -> Vec<(ElementRef<'_>, &str)> {
        let Ok(selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        self.html
            .select(&selector)
            .filter_map(|element| element.value().attr("href").map(|href| (element, href)))
            .collect()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").field("url", &self.url.as_str()).finish()
    }
}

/// Visible text of an element with every text piece trimmed and the
/// pieces joined without separator
pub fn visible_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Resolves a link href against a base URL
///
/// Returns None if the link should be ignored:
/// - empty hrefs
/// - javascript:, mailto:, tel: and data: links
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution
pub fn resolve_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url)
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
