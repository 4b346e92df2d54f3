//! Page-state fingerprinting and change detection.
//!
//! A snapshot is four structural counters rendered as a compact descriptor
//! string. Diffing is purely quantitative: cheap, and blind by design to
//! changes that move none of the counters.

use crate::browser::{current_url, press_key};
use crate::results::{StateChange, StateChangeKind};
use chromiumoxide::page::Page;
use std::time::Duration;
use tokio::time::{sleep, timeout};

const STABLE_TIMEOUT_MS: u64 = 3_000;
const LOADER_TIMEOUT_MS: u64 = 5_000;
const LOADER_POLL_MS: u64 = 250;
const SETTLE_MS: u64 = 500;

const MODAL_SELECTORS: &str =
    r#"[role="dialog"], .modal, [aria-modal="true"], .overlay, .modal-overlay"#;

const LOADER_SELECTORS: &str =
    r#".loading, .spinner, [role="progressbar"], .skeleton, [aria-busy="true"]"#;

/// Counters + text render of the current DOM, e.g. `el:412|txt:1531|modal:0|inputs:3`.
const SNAPSHOT_JS: &str = r#"
(() => {
    const body = document.body;
    if (!body) return 'empty';
    const elementCount = document.querySelectorAll('*').length;
    const textLength = (body.innerText || '').trim().length;

    let visibleModals = 0;
    const modalCandidates = document.querySelectorAll(
        '[role="dialog"], .modal, [aria-modal="true"], .overlay, .modal-overlay'
    );
    modalCandidates.forEach((el) => {
        const s = window.getComputedStyle(el);
        if (s.display !== 'none' && s.visibility !== 'hidden' && s.opacity !== '0') {
            visibleModals++;
        }
    });

    const visibleInputs = document.querySelectorAll(
        'input:not([type="hidden"]), textarea, select'
    ).length;
    return 'el:' + elementCount + '|txt:' + textLength
        + '|modal:' + visibleModals + '|inputs:' + visibleInputs;
})()
"#;

const FORCE_HIDE_OVERLAYS_JS: &str = r#"
(() => {
    const overlays = document.querySelectorAll(
        '[role="dialog"], .modal, [aria-modal="true"], .overlay, .modal-overlay'
    );
    overlays.forEach((el) => { el.style.display = 'none'; });
    // Also hide any large high-z-index fixed/absolute element covering the viewport
    document.querySelectorAll('*').forEach((el) => {
        const s = window.getComputedStyle(el);
        if ((s.position === 'fixed' || s.position === 'absolute') &&
            s.zIndex !== 'auto' && parseInt(s.zIndex) > 50 &&
            el.offsetWidth > window.innerWidth * 0.5 &&
            el.offsetHeight > window.innerHeight * 0.5) {
            el.style.display = 'none';
        }
    });
})()
"#;

/// Fields decoded from a snapshot descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotParts {
    pub elements: u64,
    pub text_length: u64,
    pub modals: u64,
    pub inputs: u64,
}

/// Decode a descriptor produced by [`StateDetector::snapshot`]. Unknown or
/// sentinel descriptors (`empty`, `error`) decode to all zeroes.
pub fn parse_snapshot(snapshot: &str) -> SnapshotParts {
    let mut parts = SnapshotParts::default();
    if snapshot.is_empty() || snapshot == "empty" || snapshot == "error" {
        return parts;
    }

    for piece in snapshot.split('|') {
        let Some((key, value)) = piece.split_once(':') else {
            continue;
        };
        let number = value.parse::<u64>().unwrap_or(0);
        match key {
            "el" => parts.elements = number,
            "txt" => parts.text_length = number,
            "modal" => parts.modals = number,
            "inputs" => parts.inputs = number,
            _ => {}
        }
    }
    parts
}

/// Diff two snapshots into typed changes. Priority order: url, modal, dom,
/// empty. The kinds are not mutually exclusive.
pub fn diff_snapshots(
    before_url: &str,
    after_url: &str,
    before_snapshot: &str,
    after_snapshot: &str,
) -> Vec<StateChange> {
    let mut changes = Vec::new();

    if after_url != before_url {
        changes.push(StateChange {
            kind: StateChangeKind::Url,
            description: format!("URL changed: {} -> {}", before_url, after_url),
            before_url: before_url.to_string(),
            after_url: after_url.to_string(),
        });
    }

    let before = parse_snapshot(before_snapshot);
    let after = parse_snapshot(after_snapshot);

    if after.modals > before.modals {
        changes.push(StateChange {
            kind: StateChangeKind::Modal,
            description: format!("Modal/dialog appeared ({} detected)", after.modals),
            before_url: before_url.to_string(),
            after_url: after_url.to_string(),
        });
    }

    if after.elements != before.elements || after.text_length != before.text_length {
        changes.push(StateChange {
            kind: StateChangeKind::Dom,
            description: format!(
                "DOM changed: elements {}->{}, text {}->{}",
                before.elements, after.elements, before.text_length, after.text_length
            ),
            before_url: before_url.to_string(),
            after_url: after_url.to_string(),
        });
    }

    if after.text_length == 0 && after.elements < 10 {
        changes.push(StateChange {
            kind: StateChangeKind::Empty,
            description: "Page appears empty (no text content)".to_string(),
            before_url: before_url.to_string(),
            after_url: after_url.to_string(),
        });
    }

    changes
}

/// Stateless detector; all state lives in the snapshots it hands out.
pub struct StateDetector;

impl StateDetector {
    pub fn new() -> Self {
        Self
    }

    /// Take a structural fingerprint of the current DOM. Never fails:
    /// evaluation problems yield the `error` sentinel descriptor.
    pub async fn snapshot(&self, page: &Page) -> String {
        match page.evaluate(SNAPSHOT_JS).await {
            Ok(result) => result.into_value::<String>().unwrap_or_else(|_| "error".to_string()),
            Err(_) => "error".to_string(),
        }
    }

    /// Compare the live page against a baseline URL + snapshot.
    pub async fn detect_changes(
        &self,
        page: &Page,
        before_url: &str,
        before_snapshot: &str,
    ) -> Vec<StateChange> {
        let after_url = current_url(page).await;
        let after_snapshot = self.snapshot(page).await;
        let changes = diff_snapshots(before_url, &after_url, before_snapshot, &after_snapshot);
        for change in &changes {
            ::log::debug!("State change: {}", change.description);
        }
        changes
    }

    /// Wait for the page to settle after a navigation or interaction.
    /// Best-effort: every wait in here is bounded and a timeout only means
    /// we proceed without confirmation.
    pub async fn wait_for_stable(&self, page: &Page) {
        let _ = timeout(
            Duration::from_millis(STABLE_TIMEOUT_MS),
            page.wait_for_navigation(),
        )
        .await;

        // Give scripts a beat to finish rendering
        sleep(Duration::from_millis(SETTLE_MS)).await;

        if self.has_loading_indicator(page).await {
            ::log::debug!("Loading indicator detected, waiting");
            let give_up = tokio::time::Instant::now() + Duration::from_millis(LOADER_TIMEOUT_MS);
            while tokio::time::Instant::now() < give_up {
                sleep(Duration::from_millis(LOADER_POLL_MS)).await;
                if !self.has_loading_indicator(page).await {
                    break;
                }
            }
        }
    }

    async fn has_loading_indicator(&self, page: &Page) -> bool {
        let js = format!(
            "document.querySelectorAll({}).length > 0",
            js_string(LOADER_SELECTORS)
        );
        match page.evaluate(js).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn has_visible_modal(&self, page: &Page) -> bool {
        let js = format!(
            r#"(() => {{
                const candidates = document.querySelectorAll({});
                for (const el of candidates) {{
                    const s = window.getComputedStyle(el);
                    if (s.display !== 'none' && s.visibility !== 'hidden' && s.opacity !== '0') {{
                        return true;
                    }}
                }}
                return false;
            }})()"#,
            js_string(MODAL_SELECTORS)
        );
        match page.evaluate(js).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Try to get rid of a blocking modal/overlay: Escape first, then
    /// role-labelled close buttons, then known close-button selectors, and
    /// as a last resort force-hide everything that looks like an overlay.
    /// Returns whether the page ended up modal-free.
    pub async fn try_dismiss_modal(&self, page: &Page) -> bool {
        if press_key(page, "Escape").await.is_err() {
            return false;
        }
        sleep(Duration::from_millis(400)).await;

        if !self.has_visible_modal(page).await {
            return true;
        }

        // Close buttons by accessible label, most specific wording first
        for (name, exact) in [("Close", false), ("Cancel", false), ("Dismiss", false), ("X", true)]
        {
            if self.click_labelled_close_button(page, name, exact).await {
                sleep(Duration::from_millis(400)).await;
                ::log::debug!("Modal dismissed via '{}' button", name);
                return true;
            }
        }

        // Known close-button selectors
        let close_selectors = [
            r#"[role="dialog"] button[aria-label]"#,
            r#"[role="dialog"] button"#,
            r#"[aria-modal="true"] button"#,
            ".modal button.close",
            ".modal .close-button",
            ".modal-close",
            r#"[data-dismiss="modal"]"#,
        ];
        for selector in close_selectors {
            if self.click_if_visible(page, selector).await {
                sleep(Duration::from_millis(400)).await;
                ::log::debug!("Modal dismissed via close selector {}", selector);
                return true;
            }
        }

        // Last resort: hide overlay elements outright
        if page.evaluate(FORCE_HIDE_OVERLAYS_JS).await.is_ok() {
            sleep(Duration::from_millis(300)).await;
            ::log::debug!("Modal force-hidden via script");
            return true;
        }

        false
    }

    /// Mark the first visible button whose label matches `name`, then click
    /// it through the marker. Returns false when no such button exists.
    async fn click_labelled_close_button(&self, page: &Page, name: &str, exact: bool) -> bool {
        let js = format!(
            r#"((name, exact) => {{
                document.querySelectorAll('[data-vp-close]')
                    .forEach((el) => el.removeAttribute('data-vp-close'));
                const buttons = document.querySelectorAll('button, [role="button"]');
                for (const el of buttons) {{
                    const label = (el.getAttribute('aria-label') || el.textContent || '').trim();
                    const hit = exact
                        ? label === name
                        : label.toLowerCase().includes(name.toLowerCase());
                    if (!hit) continue;
                    const s = window.getComputedStyle(el);
                    const r = el.getBoundingClientRect();
                    if (s.display === 'none' || s.visibility === 'hidden' ||
                        s.opacity === '0' || r.width === 0 || r.height === 0) continue;
                    el.setAttribute('data-vp-close', '');
                    return true;
                }}
                return false;
            }})({}, {})"#,
            js_string(name),
            exact
        );

        let marked = match page.evaluate(js).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(_) => false,
        };
        if !marked {
            return false;
        }
        self.click_if_visible(page, "[data-vp-close]").await
    }

    /// Click the first match of `selector` if it is visible. Bounded; any
    /// failure is reported as "did not click".
    async fn click_if_visible(&self, page: &Page, selector: &str) -> bool {
        let Ok(element) = page.find_element(selector).await else {
            return false;
        };

        let visibility_js = format!(
            r#"((sel) => {{
                const el = document.querySelector(sel);
                if (!el) return false;
                const s = window.getComputedStyle(el);
                const r = el.getBoundingClientRect();
                return s.display !== 'none' && s.visibility !== 'hidden' &&
                    s.opacity !== '0' && r.width > 0 && r.height > 0;
            }})({})"#,
            js_string(selector)
        );
        let visible = match page.evaluate(visibility_js).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(_) => false,
        };
        if !visible {
            return false;
        }

        matches!(
            timeout(Duration::from_millis(2_000), element.click()).await,
            Ok(Ok(_))
        )
    }
}

impl Default for StateDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Quote a string as a JavaScript string literal.
pub(crate) fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}
