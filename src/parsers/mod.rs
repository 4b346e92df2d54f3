pub mod html;

/// Result of parsing page markup
pub struct ParseResult {
    /// Extracted text content
    pub content: String,
    /// Anchor hrefs found in the document
    pub links: Vec<String>,
}

impl ParseResult {
    /// Creates a new parse result with the given content and links
    pub fn new(content: String, links: Vec<String>) -> Self {
        Self { content, links }
    }
}
