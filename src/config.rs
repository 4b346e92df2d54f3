use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named browser viewport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
        }
    }
}

/// Look up a viewport preset by name. Unknown names fall back to desktop.
pub fn viewport_preset(name: &str) -> Viewport {
    match name {
        "mobile" => Viewport::new("mobile", 390, 844),
        "desktop" => Viewport::new("desktop", 1280, 720),
        other => {
            ::log::warn!("Unknown viewport '{}', using desktop", other);
            Viewport::new("desktop", 1280, 720)
        }
    }
}

/// Configuration for one scan. Immutable for the duration of the crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// URL to start crawling from
    pub url: String,

    /// Maximum BFS navigation depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of elements clicked on a single page
    #[serde(default = "default_max_clicks")]
    pub max_clicks_per_page: usize,

    /// Page navigation timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether to click discovered elements
    #[serde(default = "default_true")]
    pub enable_click: bool,

    /// Whether to auto-fill form fields
    #[serde(default = "default_true")]
    pub enable_input: bool,

    /// Whether to follow same-origin links breadth-first
    #[serde(default = "default_true")]
    pub enable_navigation: bool,

    /// Viewports to crawl, one isolated browser per entry
    #[serde(default = "default_viewports")]
    pub viewports: Vec<Viewport>,

    /// Theme tag recorded on screenshots
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Language tag recorded on screenshots
    #[serde(default = "default_language")]
    pub language: String,

    /// Directory for screenshots and the report artifact
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Explicit Chromium binary path (autodetected when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chromium_path: Option<String>,

    #[serde(default)]
    pub verbose: bool,
}

impl ScanConfig {
    /// Create a new configuration with default values
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_depth: default_max_depth(),
            max_clicks_per_page: default_max_clicks(),
            timeout_ms: default_timeout_ms(),
            enable_click: true,
            enable_input: true,
            enable_navigation: true,
            viewports: default_viewports(),
            theme: default_theme(),
            language: default_language(),
            output_dir: default_output_dir(),
            chromium_path: None,
            verbose: false,
        }
    }
}

fn default_max_depth() -> usize {
    3
}

fn default_max_clicks() -> usize {
    50
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_viewports() -> Vec<Viewport> {
    vec![viewport_preset("desktop")]
}

fn default_theme() -> String {
    "light".to_string()
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_output_dir() -> String {
    "./vet-page-reports".to_string()
}

/// Semantic selectors for clickable elements (discovery phase 1).
pub const CLICKABLE_SELECTORS: &str = "button, a[href], input[type=\"submit\"], \
     input[type=\"button\"], select, [role=\"button\"], [role=\"tab\"], \
     [role=\"menuitem\"], [role=\"option\"], [role=\"link\"], [onclick]";

/// Semantic selectors for fillable elements (discovery phase 1).
pub const INPUT_SELECTORS: &str = "input[type=\"text\"], input[type=\"email\"], \
     input[type=\"password\"], input[type=\"number\"], input[type=\"url\"], \
     input[type=\"tel\"], input[type=\"search\"], input:not([type]), textarea, select";

/// Test value for a given input type during the fill phase.
pub fn test_value(input_type: &str) -> &'static str {
    match input_type {
        "email" => "test@vet-page.dev",
        "password" => "TestPass123!",
        "number" => "42",
        "url" => "https://example.com",
        "tel" => "+1234567890",
        "search" => "vet-page test search",
        "textarea" => "This is a test input from the vet-page QA crawler.",
        _ => "vet-page test input",
    }
}

/// Detect a Chromium binary from common install locations.
/// `CHROMIUM_PATH` takes precedence when set.
pub fn detect_chromium_path() -> Option<String> {
    let env_path = std::env::var("CHROMIUM_PATH").ok();
    let candidates = [
        env_path.as_deref(),
        Some("/usr/bin/chromium-browser"),
        Some("/usr/bin/chromium"),
        Some("/usr/bin/google-chrome-stable"),
        Some("/usr/bin/google-chrome"),
    ];

    for candidate in candidates.into_iter().flatten() {
        if Path::new(candidate).exists() {
            return Some(candidate.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_presets() {
        let mobile = viewport_preset("mobile");
        assert_eq!(mobile.width, 390);
        assert_eq!(mobile.height, 844);

        // Unknown names degrade to desktop
        let fallback = viewport_preset("fridge");
        assert_eq!(fallback.name, "desktop");
        assert_eq!(fallback.width, 1280);
    }

    #[test]
    fn test_test_value_lookup() {
        assert_eq!(test_value("email"), "test@vet-page.dev");
        assert_eq!(test_value("tel"), "+1234567890");
        // Unknown types get the generic text value
        assert_eq!(test_value("color"), test_value("text"));
    }

    #[test]
    fn test_defaults() {
        let config = ScanConfig::new("https://example.com");
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_clicks_per_page, 50);
        assert!(config.enable_click && config.enable_input && config.enable_navigation);
        assert_eq!(config.viewports.len(), 1);
    }
}
