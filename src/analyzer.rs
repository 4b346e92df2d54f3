//! Boundary to the external vision-analysis collaborator.
//!
//! The engine never talks to a model itself; it hands screenshots and page
//! context to whatever implements [`VisionAnalyzer`] and stores the issues
//! that come back. Malformed model output must degrade to an empty issue
//! list, never to an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Critical,
    Warning,
    Info,
}

/// A finding reported by the analyzer for one screenshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub category: String,
    pub title: String,
    pub description: String,
    pub screenshot_path: String,
    pub location: String,
    pub fix_suggestion: String,
}

/// One screenshot plus everything the analyzer may want to know about it.
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    pub image: &'a [u8],
    pub mime_type: &'a str,
    /// Free-text page context (URL, visible text excerpt, state name)
    pub context: &'a str,
    /// Raw console-log lines captured on the page, newest last
    pub console_logs: &'a [String],
}

/// The vision-analysis service. Implementations talk to a model; the crawl
/// pipeline only sees the issue list. Failures are expected to surface as
/// an empty list, not an error.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest<'_>) -> Vec<Issue>;
}

/// Run the analyzer over every screenshot of a finished crawl. Unreadable
/// screenshot files are skipped with a warning; they never fail the scan.
pub async fn analyze_crawl(
    analyzer: &dyn VisionAnalyzer,
    crawl: &crate::results::CrawlResult,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    for page in &crawl.pages {
        let console_lines: Vec<String> = page.errors.iter().map(|e| e.message.clone()).collect();

        for shot in &page.screenshots {
            let image = match std::fs::read(&shot.path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    ::log::warn!("Cannot read screenshot {}: {}", shot.path, e);
                    continue;
                }
            };
            let context = format!(
                "Page: {} | viewport: {} | state: {}",
                shot.url, shot.viewport, shot.state
            );
            let request = AnalysisRequest {
                image: &image,
                mime_type: "image/png",
                context: &context,
                console_logs: &console_lines,
            };
            issues.extend(analyzer.analyze(request).await);
        }
    }

    issues
}

const VALID_CATEGORIES: [&str; 9] = [
    "layout",
    "text",
    "darkmode",
    "responsive",
    "i18n",
    "ux",
    "error",
    "interaction",
    "security",
];

#[derive(Deserialize)]
struct RawIssueList {
    #[serde(default)]
    issues: Vec<RawIssue>,
}

#[derive(Deserialize)]
struct RawIssue {
    #[serde(default)]
    severity: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    location: String,
    #[serde(default, alias = "fixSuggestion")]
    fix_suggestion: String,
}

/// Parse a model response into issues, tolerating markdown fences, missing
/// fields and unknown enum values. Anything unparseable yields no issues.
pub fn parse_issue_response(raw: &str, screenshot_path: &str) -> Vec<Issue> {
    let stripped = raw
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();
    if stripped.is_empty() {
        return Vec::new();
    }

    let parsed: RawIssueList = match serde_json::from_str(&stripped) {
        Ok(list) => list,
        Err(e) => {
            ::log::warn!("Analyzer output was not valid JSON, ignoring: {}", e);
            return Vec::new();
        }
    };

    parsed
        .issues
        .into_iter()
        .map(|raw| Issue {
            severity: validate_severity(&raw.severity),
            category: validate_category(&raw.category),
            title: if raw.title.is_empty() {
                "Untitled issue".to_string()
            } else {
                raw.title
            },
            description: raw.description,
            screenshot_path: screenshot_path.to_string(),
            location: if raw.location.is_empty() {
                "unknown".to_string()
            } else {
                raw.location
            },
            fix_suggestion: raw.fix_suggestion,
        })
        .collect()
}

fn validate_severity(s: &str) -> IssueSeverity {
    match s {
        "critical" => IssueSeverity::Critical,
        "warning" => IssueSeverity::Warning,
        _ => IssueSeverity::Info,
    }
}

fn validate_category(c: &str) -> String {
    if VALID_CATEGORIES.contains(&c) {
        c.to_string()
    } else {
        "ux".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_response() {
        let raw = r#"```json
        {"issues": [{"severity": "critical", "category": "layout",
            "title": "Overlapping nav", "description": "Nav overlaps hero",
            "location": "header", "fixSuggestion": "add z-index"}]}
        ```"#;
        let issues = parse_issue_response(raw, "/tmp/shot.png");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Critical);
        assert_eq!(issues[0].category, "layout");
        assert_eq!(issues[0].screenshot_path, "/tmp/shot.png");
        assert_eq!(issues[0].fix_suggestion, "add z-index");
    }

    #[test]
    fn test_malformed_output_degrades_to_empty() {
        assert!(parse_issue_response("not json at all", "p.png").is_empty());
        assert!(parse_issue_response("", "p.png").is_empty());
        assert!(parse_issue_response("{}", "p.png").is_empty());
    }

    struct StubAnalyzer;

    #[async_trait]
    impl VisionAnalyzer for StubAnalyzer {
        async fn analyze(&self, request: AnalysisRequest<'_>) -> Vec<Issue> {
            vec![Issue {
                severity: IssueSeverity::Warning,
                category: "layout".to_string(),
                title: request.context.to_string(),
                description: format!("{} console lines", request.console_logs.len()),
                screenshot_path: String::new(),
                location: "unknown".to_string(),
                fix_suggestion: String::new(),
            }]
        }
    }

    #[tokio::test]
    async fn test_analyze_crawl_visits_readable_screenshots() {
        use crate::results::{PageCrawlResult, PageError, PageErrorKind, Screenshot};

        let tmp = tempfile::tempdir().unwrap();
        let good_path = tmp.path().join("good.png");
        std::fs::write(&good_path, b"png bytes").unwrap();

        let shot = |path: &str| Screenshot {
            path: path.to_string(),
            url: "https://example.com".to_string(),
            viewport: "desktop".to_string(),
            theme: "light".to_string(),
            language: "auto".to_string(),
            state: "initial_root".to_string(),
            timestamp: String::new(),
        };

        let page = PageCrawlResult {
            url: "https://example.com".to_string(),
            depth: 0,
            screenshots: vec![
                shot(good_path.to_str().unwrap()),
                shot(tmp.path().join("missing.png").to_str().unwrap()),
            ],
            interactions: Vec::new(),
            errors: vec![PageError {
                kind: PageErrorKind::Javascript,
                message: "TypeError: boom".to_string(),
                url: "https://example.com".to_string(),
                timestamp: String::new(),
                trigger_action: None,
                stack_trace: None,
                status_code: None,
            }],
            discovered_links: Vec::new(),
            elements_found: 0,
            elements_clicked: 0,
        };
        let crawl = crate::results::CrawlResult::from_pages(vec![page], 10);

        let issues = analyze_crawl(&StubAnalyzer, &crawl).await;
        // The unreadable screenshot is skipped, not fatal
        assert_eq!(issues.len(), 1);
        assert!(issues[0].title.contains("https://example.com"));
        assert_eq!(issues[0].description, "1 console lines");
    }

    #[test]
    fn test_unknown_enums_fall_back() {
        let raw = r#"{"issues": [{"severity": "catastrophic", "category": "vibes",
            "title": "", "location": ""}]}"#;
        let issues = parse_issue_response(raw, "p.png");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Info);
        assert_eq!(issues[0].category, "ux");
        assert_eq!(issues[0].title, "Untitled issue");
        assert_eq!(issues[0].location, "unknown");
    }
}
