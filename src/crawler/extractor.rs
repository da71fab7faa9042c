//! HTML extraction for fetched pages
//!
//! This module handles parsing HTML content to extract:
//! - The page title
//! - The visible text content (script/style stripped)
//! - Links to follow (from <a> tags)

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Visible text content, whitespace-collapsed
    pub text: Option<String>,

    /// All links found on the page (absolute URLs, document order,
    /// deduplicated)
    pub links: Vec<String>,
}

/// Parses HTML content and extracts the title, text, and links
///
/// Extraction never fails: malformed HTML parses into whatever the parser
/// can recover and missing pieces come back as `None`/empty.
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` targets, resolved against `base_url`
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that resolves to a non-HTTP(S) scheme
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Example
///
/// ```no_run
/// use saunter::crawler::extract_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let page = extract_page(html, &base_url);
/// assert_eq!(page.title, Some("Test".to_string()));
/// ```
pub fn extract_page(html: &str, base_url: &Url) -> ExtractedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let text = extract_text(&document);
    let links = extract_links(&document, base_url);

    ExtractedPage { title, text, links }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts the visible text content, with whitespace collapsed
///
/// Text inside `<script>` and `<style>` elements is code, not content, and
/// is dropped.
fn extract_text(document: &Html) -> Option<String> {
    let mut raw = String::new();

    for node in document.root_element().descendants() {
        if let Some(text) = node.value().as_text() {
            let in_code_element = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map_or(false, |el| matches!(el.name(), "script" | "style"))
            });
            if in_code_element {
                continue;
            }

            raw.push_str(text);
            raw.push(' ');
        }
    }

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Extracts all valid links from the HTML document
///
/// Links come back in document order with duplicates removed.
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    if seen.insert(absolute_url.clone()) {
                        links.push(absolute_url);
                    }
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    // Skip empty hrefs
    if href.is_empty() {
        return None;
    }

    // Skip special schemes
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    // Skip fragment-only links (same page anchors)
    if href.starts_with('#') {
        return None;
    }

    // Try to resolve the URL
    match base_url.join(href) {
        Ok(absolute_url) => {
            // Only accept HTTP and HTTPS URLs
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
