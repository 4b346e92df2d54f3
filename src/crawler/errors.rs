//! Runtime-error collection for one page visit.
//!
//! Subscribes to the four CDP event classes the engine cares about —
//! console messages, uncaught exceptions, HTTP responses and failed
//! requests — and keeps whatever survives classification and noise
//! filtering. Cleared once per page-visit boundary.

use crate::browser::current_url;
use crate::error::Result;
use crate::results::{PageError, PageErrorKind};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventRequestWillBeSent, EventResponseReceived,
};
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EventConsoleApiCalled, EventExceptionThrown,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Request URLs known to produce false-positive errors (fonts, telemetry
/// beacons, favicons). Matched case-insensitively as substrings.
const NOISE_URL_PATTERNS: &[&str] = &[
    "/cdn-cgi/rum",
    "/cdn-cgi/beacon",
    ".woff",
    ".woff2",
    ".ttf",
    ".eot",
    "favicon.ico",
    "google-analytics.com",
    "googletagmanager.com",
    "sentry.io/api",
];

/// Classify an error message by keyword, case-insensitively.
pub fn classify(message: &str) -> PageErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("content security policy") || lower.contains("csp") {
        return PageErrorKind::Csp;
    }
    if lower.contains("typeerror")
        || lower.contains("referenceerror")
        || lower.contains("syntaxerror")
        || lower.contains("rangeerror")
    {
        return PageErrorKind::Javascript;
    }
    if lower.contains("404")
        || lower.contains("500")
        || lower.contains("cors")
        || lower.contains("net::")
        || lower.contains("failed to fetch")
    {
        return PageErrorKind::Network;
    }
    PageErrorKind::Other
}

/// Whether a request URL is on the noise list and should be dropped.
pub fn is_noise_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    NOISE_URL_PATTERNS.iter().any(|p| lower.contains(p))
}

/// State shared with the listener tasks.
#[derive(Default)]
struct Shared {
    errors: Mutex<Vec<PageError>>,
    current_action: Mutex<String>,
    /// request id -> (url, method), fed by Network.requestWillBeSent so
    /// loadingFailed/responseReceived events can be attributed to a URL
    requests: Mutex<HashMap<String, (String, String)>>,
}

impl Shared {
    fn trigger_action(&self) -> Option<String> {
        let action = self.current_action.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone();
        if action.is_empty() { None } else { Some(action) }
    }

    fn push(&self, error: PageError) {
        self.errors.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(error);
    }

    fn record_console(&self, message: String, page_url: String) {
        let kind = classify(&message);
        ::log::error!("CONSOLE ERROR: {}", truncate(&message, 120));
        self.push(PageError {
            kind,
            message,
            url: page_url,
            timestamp: chrono::Utc::now().to_rfc3339(),
            trigger_action: self.trigger_action(),
            stack_trace: None,
            status_code: None,
        });
    }

    fn record_exception(&self, message: String, stack: Option<String>, page_url: String) {
        ::log::error!("JS CRASH: {}", truncate(&message, 120));
        self.push(PageError {
            kind: PageErrorKind::Javascript,
            message,
            url: page_url,
            timestamp: chrono::Utc::now().to_rfc3339(),
            trigger_action: self.trigger_action(),
            stack_trace: stack,
            status_code: None,
        });
    }

    fn record_response(&self, method: &str, request_url: &str, status: u16, page_url: String) {
        if status < 400 || is_noise_url(request_url) {
            return;
        }
        if status >= 500 {
            ::log::error!("HTTP {}: {}", status, request_url);
        } else {
            ::log::debug!("HTTP {}: {}", status, request_url);
        }
        self.push(PageError {
            kind: PageErrorKind::Network,
            message: format!("{} {} {}", method, request_url, status),
            url: page_url,
            timestamp: chrono::Utc::now().to_rfc3339(),
            trigger_action: self.trigger_action(),
            stack_trace: None,
            status_code: Some(status),
        });
    }

    fn record_request_failure(&self, request_url: &str, error_text: &str, page_url: String) {
        if is_noise_url(request_url) {
            return;
        }
        ::log::debug!("Request failed: {}", request_url);
        self.push(PageError {
            kind: PageErrorKind::Network,
            message: format!("Request failed: {} - {}", request_url, error_text),
            url: page_url,
            timestamp: chrono::Utc::now().to_rfc3339(),
            trigger_action: self.trigger_action(),
            stack_trace: None,
            status_code: None,
        });
    }
}

/// Collects runtime errors for the lifetime of one page visit.
pub struct ErrorCollector {
    shared: Arc<Shared>,
    tasks: Vec<JoinHandle<()>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            tasks: Vec::new(),
        }
    }

    /// Label attached to every error captured from now on, so each error
    /// can be attributed to the action that triggered it.
    pub fn set_current_action(&self, label: &str) {
        *self.shared.current_action.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = label.to_string();
    }

    /// Subscribe to the page's error streams. Call once per page, before
    /// navigation, so load-time errors are seen too.
    pub async fn attach(&mut self, page: &Page) -> Result<()> {
        // Console messages, error level only
        let mut console_events = page.event_listener::<EventConsoleApiCalled>().await?;
        let shared = Arc::clone(&self.shared);
        let console_page = page.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                if !matches!(&event.r#type, ConsoleApiCalledType::Error) {
                    continue;
                }
                let message = console_message_text(&event);
                let url = current_url(&console_page).await;
                shared.record_console(message, url);
            }
        }));

        // Uncaught script exceptions
        let mut exception_events = page.event_listener::<EventExceptionThrown>().await?;
        let shared = Arc::clone(&self.shared);
        let exception_page = page.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = exception_events.next().await {
                let details = &event.exception_details;
                let description = details
                    .exception
                    .as_ref()
                    .and_then(|e| e.description.clone());
                let message = description
                    .clone()
                    .unwrap_or_else(|| details.text.clone());
                let url = current_url(&exception_page).await;
                shared.record_exception(message, description, url);
            }
        }));

        // Request bookkeeping so failures can name their URL
        let mut request_events = page.event_listener::<EventRequestWillBeSent>().await?;
        let shared = Arc::clone(&self.shared);
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = request_events.next().await {
                shared.requests.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(
                    event.request_id.inner().clone(),
                    (event.request.url.clone(), event.request.method.clone()),
                );
            }
        }));

        // HTTP responses with failing status
        let mut response_events = page.event_listener::<EventResponseReceived>().await?;
        let shared = Arc::clone(&self.shared);
        let response_page = page.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = response_events.next().await {
                let status = event.response.status;
                if status < 400 {
                    continue;
                }
                let method = {
                    let requests = shared.requests.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                    requests
                        .get(event.request_id.inner())
                        .map(|(_, m)| m.clone())
                        .unwrap_or_else(|| "GET".to_string())
                };
                let url = current_url(&response_page).await;
                shared.record_response(&method, &event.response.url, status as u16, url);
            }
        }));

        // Requests that never completed
        let mut failure_events = page.event_listener::<EventLoadingFailed>().await?;
        let shared = Arc::clone(&self.shared);
        let failure_page = page.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = failure_events.next().await {
                let request_url = {
                    let requests = shared.requests.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                    requests
                        .get(event.request_id.inner())
                        .map(|(u, _)| u.clone())
                        .unwrap_or_default()
                };
                let url = current_url(&failure_page).await;
                shared.record_request_failure(&request_url, &event.error_text, url);
            }
        }));

        Ok(())
    }

    /// Stop listening. The spawned tasks also end on their own once the
    /// page's event streams close.
    pub fn detach(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Reset between page visits.
    pub fn clear(&self) {
        self.shared.errors.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clear();
        self.shared.requests.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clear();
    }

    /// Immutable copy of everything collected so far this visit.
    pub fn get_errors(&self) -> Vec<PageError> {
        self.shared.errors.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

impl Drop for ErrorCollector {
    fn drop(&mut self) {
        self.detach();
    }
}

impl Default for ErrorCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a console event's arguments into one message string.
fn console_message_text(event: &EventConsoleApiCalled) -> String {
    let parts: Vec<String> = event
        .args
        .iter()
        .map(|arg| {
            if let Some(value) = &arg.value {
                match value.as_str() {
                    Some(s) => s.to_string(),
                    None => value.to_string(),
                }
            } else {
                arg.description.clone().unwrap_or_default()
            }
        })
        .filter(|s| !s.is_empty())
        .collect();
    parts.join(" ")
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_keywords() {
        assert_eq!(
            classify("Uncaught TypeError: x is not a function"),
            PageErrorKind::Javascript
        );
        assert_eq!(classify("ReferenceError: y is not defined"), PageErrorKind::Javascript);
        assert_eq!(
            classify("Access blocked by CORS policy"),
            PageErrorKind::Network
        );
        assert_eq!(classify("net::ERR_CONNECTION_REFUSED"), PageErrorKind::Network);
        assert_eq!(
            classify("Refused to load script: Content Security Policy directive"),
            PageErrorKind::Csp
        );
        assert_eq!(classify("something completely different"), PageErrorKind::Other);
    }

    #[test]
    fn test_noise_url_patterns() {
        assert!(is_noise_url("https://example.com/fonts/inter.woff2"));
        assert!(is_noise_url("https://example.com/cdn-cgi/rum?req=1"));
        assert!(is_noise_url("https://example.com/favicon.ico"));
        assert!(is_noise_url("https://www.google-analytics.com/collect"));
        assert!(!is_noise_url("https://example.com/api/users"));
    }

    #[test]
    fn test_noisy_failing_response_is_dropped() {
        let shared = Shared::default();
        shared.record_response("GET", "https://example.com/font.woff2", 404, "page".into());
        shared.record_response("GET", "https://example.com/cdn-cgi/rum", 500, "page".into());
        assert!(shared.errors.lock().unwrap().is_empty());

        // A real failing response is kept, with its status code
        shared.record_response("POST", "https://example.com/api/save", 500, "page".into());
        let errors = shared.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].status_code, Some(500));
        assert_eq!(errors[0].kind, PageErrorKind::Network);
        assert!(errors[0].message.contains("POST"));
    }

    #[test]
    fn test_ok_responses_are_ignored() {
        let shared = Shared::default();
        shared.record_response("GET", "https://example.com/api", 200, "page".into());
        shared.record_response("GET", "https://example.com/api", 399, "page".into());
        assert!(shared.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_action_attribution() {
        let shared = Shared::default();
        *shared.current_action.lock().unwrap() = "click: Save".to_string();
        shared.record_console("TypeError: boom".into(), "page".into());
        let errors = shared.errors.lock().unwrap();
        assert_eq!(errors[0].trigger_action.as_deref(), Some("click: Save"));
        assert_eq!(errors[0].kind, PageErrorKind::Javascript);
    }

    #[test]
    fn test_collector_clear_resets() {
        let collector = ErrorCollector::new();
        collector
            .shared
            .record_request_failure("https://example.com/x", "net::ERR_FAILED", "page".into());
        assert_eq!(collector.get_errors().len(), 1);
        collector.clear();
        assert!(collector.get_errors().is_empty());
    }

    #[test]
    fn test_get_errors_returns_a_copy() {
        let collector = ErrorCollector::new();
        collector
            .shared
            .record_console("CORS failure".into(), "page".into());
        let mut copy = collector.get_errors();
        copy.clear();
        assert_eq!(collector.get_errors().len(), 1);
    }
}
