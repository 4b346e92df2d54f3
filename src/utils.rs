/// Convert a URL or state name to a sanitized filename
pub fn sanitize_filename(name: &str) -> String {
    let mut out = name.replace("http://", "").replace("https://", "");
    out = out.replace(['/', ':', '?', '&', '=', '#', '%', ' '], "_");

    // Limit filename length
    if out.len() > 100 {
        out.truncate(100);
    }
    out
}

/// Collapse an element label into something safe for a screenshot state tag.
pub fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut last_was_sep = false;
    for c in label.chars().take(30) {
        if c.is_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("https://example.com/a/b?q=1"),
            "example.com_a_b_q_1"
        );
        let long = "x".repeat(300);
        assert_eq!(sanitize_filename(&long).len(), 100);
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Open Modal!"), "Open_Modal");
        assert_eq!(slug("  →  "), "");
        assert_eq!(slug("Add to cart (2)"), "Add_to_cart_2");
    }
}
