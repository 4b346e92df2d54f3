use crate::analyzer::Issue;
use crate::config::ScanConfig;
use serde::{Deserialize, Serialize};

/// Kind of action attempted against a page element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Click,
    Input,
    Navigate,
    PageLoad,
}

/// Outcome of one attempted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionOutcome {
    Success,
    Error,
    NoChange,
}

/// Immutable record of one attempted action. Append-only per page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionLog {
    pub timestamp: String,
    pub action: InteractionKind,
    pub target: String,
    pub selector: String,
    pub url: String,
    pub outcome: InteractionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
}

/// A captured full-page image plus the state it depicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screenshot {
    pub path: String,
    pub url: String,
    pub viewport: String,
    pub theme: String,
    pub language: String,
    pub state: String,
    pub timestamp: String,
}

/// Classification of a runtime page error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageErrorKind {
    Csp,
    Javascript,
    Network,
    Other,
}

/// A runtime error observed on the page (console, uncaught exception,
/// failing HTTP response or failed request).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageError {
    pub kind: PageErrorKind,
    pub message: String,
    pub url: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// What category of change a state diff detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateChangeKind {
    Url,
    Modal,
    Dom,
    Empty,
}

/// One detected difference between two page states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChange {
    pub kind: StateChangeKind,
    pub description: String,
    pub before_url: String,
    pub after_url: String,
}

/// Pixel rectangle of an element at discovery time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// An interactive element found in the live DOM. Ephemeral: recomputed on
/// every discovery pass, never carried across a navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredElement {
    /// Best-effort selector hint captured at discovery time
    pub selector: String,
    pub tag: String,
    /// `type` attribute, ARIA role, or tag name, whichever is most specific
    pub kind: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub is_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl DiscoveredElement {
    /// Human-readable label for logs and action attribution.
    pub fn label(&self) -> &str {
        if !self.text.is_empty() {
            &self.text
        } else if !self.kind.is_empty() {
            &self.kind
        } else {
            &self.tag
        }
    }

    /// Element id when the selector hint captured one, e.g. `button#save`.
    pub fn id(&self) -> Option<&str> {
        let (_, id) = self.selector.split_once('#')?;
        if !id.is_empty() && id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            Some(id)
        } else {
            None
        }
    }
}

/// Everything observed during one visit of one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCrawlResult {
    pub url: String,
    pub depth: usize,
    pub screenshots: Vec<Screenshot>,
    pub interactions: Vec<InteractionLog>,
    pub errors: Vec<PageError>,
    pub discovered_links: Vec<String>,
    pub elements_found: usize,
    pub elements_clicked: usize,
}

impl PageCrawlResult {
    /// A zero-content result for a page whose load failed, carrying one
    /// synthetic error so the failure is visible downstream.
    pub fn load_failure(url: &str, depth: usize, message: &str) -> Self {
        Self {
            url: url.to_string(),
            depth,
            screenshots: Vec::new(),
            interactions: Vec::new(),
            errors: vec![PageError {
                kind: PageErrorKind::Other,
                message: format!("Page load failed: {}", message),
                url: url.to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                trigger_action: None,
                stack_trace: None,
                status_code: None,
            }],
            discovered_links: Vec::new(),
            elements_found: 0,
            elements_clicked: 0,
        }
    }
}

/// Aggregate over all viewports and pages of one crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub pages: Vec<PageCrawlResult>,
    pub total_screenshots: usize,
    pub total_interactions: usize,
    pub total_errors: usize,
    pub duration_ms: u128,
}

impl CrawlResult {
    pub fn from_pages(pages: Vec<PageCrawlResult>, duration_ms: u128) -> Self {
        let total_screenshots = pages.iter().map(|p| p.screenshots.len()).sum();
        let total_interactions = pages.iter().map(|p| p.interactions.len()).sum();
        let total_errors = pages.iter().map(|p| p.errors.len()).sum();
        Self {
            pages,
            total_screenshots,
            total_interactions,
            total_errors,
            duration_ms,
        }
    }
}

/// Headline counters for the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub pages_scanned: usize,
    pub elements_clicked: usize,
    pub screenshots_taken: usize,
    pub issues_found: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub page_errors: usize,
}

/// Final artifact of one scan: crawl data plus any analyzer findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub url: String,
    pub scan_date: String,
    pub duration_ms: u128,
    pub config: ScanConfig,
    pub summary: ReportSummary,
    pub issues: Vec<Issue>,
    pub pages: Vec<PageCrawlResult>,
}

impl Report {
    pub fn new(config: &ScanConfig, crawl: CrawlResult, issues: Vec<Issue>) -> Self {
        use crate::analyzer::IssueSeverity;

        let clicked = crawl
            .pages
            .iter()
            .map(|p| p.elements_clicked)
            .sum::<usize>();
        let summary = ReportSummary {
            pages_scanned: crawl.pages.len(),
            elements_clicked: clicked,
            screenshots_taken: crawl.total_screenshots,
            issues_found: issues.len(),
            critical: issues
                .iter()
                .filter(|i| i.severity == IssueSeverity::Critical)
                .count(),
            warning: issues
                .iter()
                .filter(|i| i.severity == IssueSeverity::Warning)
                .count(),
            info: issues
                .iter()
                .filter(|i| i.severity == IssueSeverity::Info)
                .count(),
            page_errors: crawl.total_errors,
        };

        Self {
            url: config.url.clone(),
            scan_date: chrono::Utc::now().to_rfc3339(),
            duration_ms: crawl.duration_ms,
            config: config.clone(),
            summary,
            issues,
            pages: crawl.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_label_fallbacks() {
        let mut el = DiscoveredElement {
            selector: "button#save".to_string(),
            tag: "button".to_string(),
            kind: "button".to_string(),
            text: "Save".to_string(),
            href: None,
            is_visible: true,
            bounding_box: None,
        };
        assert_eq!(el.label(), "Save");

        el.text.clear();
        assert_eq!(el.label(), "button");
    }

    #[test]
    fn test_element_id_extraction() {
        let el = DiscoveredElement {
            selector: "button#save-btn".to_string(),
            tag: "button".to_string(),
            kind: "button".to_string(),
            text: String::new(),
            href: None,
            is_visible: true,
            bounding_box: None,
        };
        assert_eq!(el.id(), Some("save-btn"));

        let no_id = DiscoveredElement {
            selector: "div".to_string(),
            ..el.clone()
        };
        assert_eq!(no_id.id(), None);
    }

    #[test]
    fn test_load_failure_result() {
        let result = PageCrawlResult::load_failure("https://example.com/x", 1, "timeout");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, PageErrorKind::Other);
        assert!(result.errors[0].message.contains("timeout"));
        assert_eq!(result.elements_found, 0);
        assert!(result.screenshots.is_empty());
    }

    #[test]
    fn test_crawl_result_totals() {
        let ok = PageCrawlResult {
            url: "https://example.com".to_string(),
            depth: 0,
            screenshots: Vec::new(),
            interactions: Vec::new(),
            errors: Vec::new(),
            discovered_links: vec!["https://example.com/a".to_string()],
            elements_found: 3,
            elements_clicked: 2,
        };
        let failed = PageCrawlResult::load_failure("https://example.com/a", 1, "net::ERR_FAILED");
        let crawl = CrawlResult::from_pages(vec![ok, failed], 1200);
        assert_eq!(crawl.total_errors, 1);
        assert_eq!(crawl.pages.len(), 2);
        assert_eq!(crawl.duration_ms, 1200);
    }
}
