use crate::parsers::ParseResult;
use scraper::{Html, Selector};

/// Parses HTML content to extract visible text and anchor hrefs
pub fn parse(html: &str) -> ParseResult {
    let doc = Html::parse_document(html);

    // Extract text content
    let content_selector = Selector::parse("body").unwrap();
    let text = doc
        .select(&content_selector)
        .flat_map(|n| n.text())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    // Extract links
    let link_selector = Selector::parse("a").unwrap();
    let links = doc
        .select(&link_selector)
        .filter_map(|e| e.value().attr("href"))
        .map(|s| s.to_string())
        .collect::<Vec<String>>();

    ::log::debug!("HTML parser found {} links", links.len());

    ParseResult::new(text, links)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extracts_links_and_text() {
        let html = r#"<html><body>
            <p>Hello   world</p>
            <a href="/about">About</a>
            <a href="https://example.com/contact">Contact</a>
            <a>No href</a>
        </body></html>"#;
        let result = parse(html);
        assert_eq!(result.links, vec!["/about", "https://example.com/contact"]);
        assert!(result.content.contains("Hello world"));
    }

    #[test]
    fn test_parse_empty_document() {
        let result = parse("");
        assert!(result.links.is_empty());
    }
}
