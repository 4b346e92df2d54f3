//! Interactive-element discovery and action execution.
//!
//! Discovery runs three passes over the live DOM (semantic selectors,
//! pointer-cursor containers, media inside interactive ancestors), then the
//! fill and click phases exercise what was found. Because the DOM may have
//! mutated between discovery and action, every action re-finds its element
//! through a five-strategy resolution waterfall. No element failure ever
//! aborts the page's interaction loop.

use crate::browser::{current_url, history_back};
use crate::config::{CLICKABLE_SELECTORS, INPUT_SELECTORS, ScanConfig, Viewport, test_value};
use crate::crawler::errors::ErrorCollector;
use crate::crawler::screenshot::Screenshotter;
use crate::crawler::state::{StateDetector, js_string};
use crate::results::{
    BoundingBox, DiscoveredElement, InteractionKind, InteractionLog, InteractionOutcome,
    StateChange, StateChangeKind,
};
use crate::utils::slug;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const MARKED: &str = "[data-vp-target]";

/// Clears any stale resolution marker; prefixed to every marking script.
const CLEAR_MARKERS: &str = "document.querySelectorAll('[data-vp-target]')\
    .forEach((el) => el.removeAttribute('data-vp-target'));";

/// Three-phase discovery of everything clickable or fillable, deduplicated
/// by `(tag, type, text, rounded top)` and sorted into human scan order.
const DISCOVER_JS: &str = r#"
((clickSel, inputSel, vpHeight) => {
    const results = [];
    const seen = new Set();
    const processed = new Set();

    const isElVisible = (el, rect) => {
        const style = window.getComputedStyle(el);
        return style.display !== 'none' &&
            style.visibility !== 'hidden' &&
            style.opacity !== '0' &&
            rect.width > 0 &&
            rect.height > 0 &&
            rect.top < vpHeight + 200;
    };

    const addElement = (el, selectorOverride) => {
        if (processed.has(el)) return;
        processed.add(el);

        const rect = el.getBoundingClientRect();
        const tag = el.tagName.toLowerCase();
        const type = el.getAttribute('type') || el.getAttribute('role') || tag;
        const text = ((el.textContent || '').trim() ||
            el.getAttribute('aria-label') ||
            el.getAttribute('placeholder') ||
            el.getAttribute('title') ||
            el.getAttribute('name') ||
            el.getAttribute('alt') ||
            '').slice(0, 80);
        const href = el.getAttribute('href') || null;
        const id = el.id ? '#' + el.id : '';

        const dedup = tag + '|' + type + '|' + text + '|' + Math.round(rect.top);
        if (seen.has(dedup)) return;
        seen.add(dedup);

        results.push({
            selector: selectorOverride || (id ? tag + id : tag),
            tag,
            type,
            text,
            href,
            isVisible: isElVisible(el, rect),
            boundingBox: rect.width > 0
                ? { x: rect.x, y: rect.y, width: rect.width, height: rect.height }
                : null,
        });
    };

    // Phase 1: semantic selector matches
    document.querySelectorAll(clickSel + ', ' + inputSel)
        .forEach((el) => addElement(el));

    // Phase 2: pointer-cursor containers (custom clickable divs, icons)
    const cursorTags = ['div', 'span', 'img', 'svg', 'li', 'label', 'figure', 'picture', 'i'];
    for (const candidateTag of cursorTags) {
        document.querySelectorAll(candidateTag).forEach((el) => {
            if (processed.has(el)) return;
            if (window.getComputedStyle(el).cursor !== 'pointer') return;

            const rect = el.getBoundingClientRect();
            // Skip tiny elements and huge container false-positives
            if (rect.width < 8 || rect.height < 8) return;
            if (rect.width > vpHeight * 2 && rect.height > vpHeight * 2) return;

            addElement(el, el.id ? candidateTag + '#' + el.id : candidateTag);
        });
    }

    // Phase 3: media nested in interactive ancestors not yet captured
    document.querySelectorAll('img, svg').forEach((el) => {
        if (processed.has(el)) return;
        const parent = el.closest('a, button, [role="button"], [onclick]');
        if (parent && !processed.has(parent)) addElement(parent);
    });

    // Human scan order: top-to-bottom, left-to-right within a 20px row
    results.sort((a, b) => {
        if (!a.boundingBox || !b.boundingBox) return 0;
        const dy = a.boundingBox.y - b.boundingBox.y;
        if (Math.abs(dy) > 20) return dy;
        return a.boundingBox.x - b.boundingBox.x;
    });

    return JSON.stringify(results);
})
"#;

#[derive(Deserialize)]
struct RawBox {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

#[derive(Deserialize)]
struct RawElement {
    selector: String,
    tag: String,
    #[serde(rename = "type")]
    kind: String,
    text: String,
    href: Option<String>,
    #[serde(rename = "isVisible")]
    is_visible: bool,
    #[serde(rename = "boundingBox")]
    bounding_box: Option<RawBox>,
}

/// The five resolution strategies, in waterfall order. Each one tries to
/// mark the live element; the first that succeeds wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Captured element id
    Id,
    /// Accessible role plus text, exact match falling back to partial
    RoleText,
    /// Tag filtered by text content (substring)
    TagText,
    /// Tag whose bounding box matches the recorded one within 15px
    BoundingBox,
    /// Tag whose live text content equals the recorded text
    ExactText,
}

const STRATEGIES: [Strategy; 5] = [
    Strategy::Id,
    Strategy::RoleText,
    Strategy::TagText,
    Strategy::BoundingBox,
    Strategy::ExactText,
];

pub struct Interactor<'a> {
    config: &'a ScanConfig,
    viewport_height: u32,
    base_host: String,
    state: &'a StateDetector,
    errors: &'a ErrorCollector,
    interactions: Vec<InteractionLog>,
}

impl<'a> Interactor<'a> {
    pub fn new(
        config: &'a ScanConfig,
        viewport: &Viewport,
        state: &'a StateDetector,
        errors: &'a ErrorCollector,
    ) -> Self {
        let base_host = Url::parse(&config.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .unwrap_or_default();
        Self {
            config,
            viewport_height: viewport.height,
            base_host,
            state,
            errors,
            interactions: Vec::new(),
        }
    }

    /// Discover all interactive elements on the current page.
    pub async fn discover_elements(
        &self,
        page: &Page,
    ) -> Result<Vec<DiscoveredElement>, crate::error::Error> {
        let js = format!(
            "({})({}, {}, {})",
            DISCOVER_JS,
            js_string(CLICKABLE_SELECTORS),
            js_string(INPUT_SELECTORS),
            self.viewport_height
        );
        let raw_json: String = page.evaluate(js).await?.into_value()?;
        let raw: Vec<RawElement> = serde_json::from_str(&raw_json)?;

        let elements: Vec<DiscoveredElement> = raw
            .into_iter()
            .map(|r| DiscoveredElement {
                selector: r.selector,
                tag: r.tag,
                kind: r.kind,
                text: r.text,
                href: r.href,
                is_visible: r.is_visible,
                bounding_box: r.bounding_box.map(|b| BoundingBox {
                    x: b.x,
                    y: b.y,
                    width: b.width,
                    height: b.height,
                }),
            })
            .collect();

        let visible = elements.iter().filter(|e| e.is_visible).count();
        ::log::info!(
            "Found {} interactive elements ({} visible)",
            elements.len(),
            visible
        );
        Ok(elements)
    }

    /// Run the full interaction pass: fill forms first, then click through
    /// the clickable elements up to the configured per-page click limit.
    pub async fn interact_with_page(
        &mut self,
        page: &Page,
        shots: &mut Screenshotter,
    ) -> Result<Vec<InteractionLog>, crate::error::Error> {
        self.interactions.clear();
        let elements = self.discover_elements(page).await?;
        let visible: Vec<DiscoveredElement> =
            elements.into_iter().filter(|e| e.is_visible).collect();

        let is_input_tag = |tag: &str| matches!(tag, "input" | "textarea" | "select");
        let (inputs, clickables): (Vec<_>, Vec<_>) =
            visible.into_iter().partition(|e| is_input_tag(&e.tag));

        if self.config.enable_input && !inputs.is_empty() {
            self.fill_forms(page, &inputs, shots).await;
        }

        if self.config.enable_click {
            let max_clicks = self.config.max_clicks_per_page.min(clickables.len());
            let mut clicks = 0;

            for element in &clickables {
                if clicks >= max_clicks {
                    ::log::debug!("Reached max clicks ({}), stopping", max_clicks);
                    break;
                }

                let current = current_url(page).await;
                if element.tag == "a" {
                    if let Some(href) = &element.href {
                        // External links are never clicked
                        if self.is_external_link(href, &current) {
                            ::log::debug!("Skipping external link: {}", element.label());
                            continue;
                        }
                        // Same-host navigation is the explorer's job, not ours
                        if self.is_navigation_link(href, &current) {
                            ::log::debug!("Skipping nav link: {}", element.label());
                            continue;
                        }
                    }
                }

                self.click_element(page, element, shots).await;
                clicks += 1;
            }
        }

        Ok(std::mem::take(&mut self.interactions))
    }

    /// Click one element and deal with whatever it caused. All failure
    /// modes end in a log entry, never in an error for the caller.
    async fn click_element(
        &mut self,
        page: &Page,
        element: &DiscoveredElement,
        shots: &mut Screenshotter,
    ) {
        let label = element.label().to_string();
        ::log::info!("Click: {}", label);
        self.errors.set_current_action(&format!("click: {}", label));

        let before_url = current_url(page).await;
        let before_snapshot = self.state.snapshot(page).await;

        let Some(handle) = self.resolve(page, element).await else {
            self.log_interaction(
                InteractionKind::Click,
                &label,
                &element.selector,
                &before_url,
                InteractionOutcome::NoChange,
                Some("Element not found"),
                None,
            );
            return;
        };

        // The element may have gone invisible since discovery
        if !self.marked_visible(page).await {
            ::log::debug!("Element '{}' no longer visible, skipping", label);
            self.log_interaction(
                InteractionKind::Click,
                &label,
                &element.selector,
                &before_url,
                InteractionOutcome::NoChange,
                Some("Not visible"),
                None,
            );
            return;
        }

        let _ = tokio::time::timeout(Duration::from_millis(2_000), handle.scroll_into_view()).await;

        let click_result = tokio::time::timeout(Duration::from_millis(5_000), handle.click()).await;
        let click_error = match click_result {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("click timed out".to_string()),
        };

        if let Some(message) = click_error {
            ::log::debug!("Click failed on '{}': {}", label, message);
            self.log_interaction(
                InteractionKind::Click,
                &label,
                &element.selector,
                &before_url,
                InteractionOutcome::Error,
                Some(&message),
                None,
            );
            // The click may still have navigated before failing
            if current_url(page).await != before_url {
                self.safe_go_back(page, &before_url).await;
            }
            return;
        }

        self.state.wait_for_stable(page).await;
        let changes = self
            .state
            .detect_changes(page, &before_url, &before_snapshot)
            .await;

        // Capture the aftermath either way; the image is the deliverable
        let state_name = format!("after_click_{}", slug(&label));
        let screenshot_path = match shots.capture(page, &state_name).await {
            Ok(shot) => Some(shot.path),
            Err(e) => {
                ::log::warn!("Screenshot failed after clicking '{}': {}", label, e);
                None
            }
        };

        if changes.is_empty() {
            // Legitimately inert click; still a success
            ::log::debug!("Click on '{}' - no state change observed", label);
            self.log_interaction(
                InteractionKind::Click,
                &label,
                &element.selector,
                &before_url,
                InteractionOutcome::Success,
                None,
                screenshot_path.as_deref(),
            );
        } else {
            let after_url = current_url(page).await;
            self.log_interaction(
                InteractionKind::Click,
                &label,
                &element.selector,
                &after_url,
                InteractionOutcome::Success,
                None,
                screenshot_path.as_deref(),
            );
            self.restore_state(page, &before_url, &changes).await;
        }
    }

    /// Fill every visible input with type-appropriate test data.
    async fn fill_forms(
        &mut self,
        page: &Page,
        inputs: &[DiscoveredElement],
        shots: &mut Screenshotter,
    ) {
        for input in inputs {
            let label = if input.text.is_empty() {
                input.kind.clone()
            } else {
                input.text.clone()
            };

            let Some(handle) = self.resolve(page, input).await else {
                continue;
            };
            if !self.marked_visible(page).await {
                continue;
            }

            if input.tag == "select" {
                self.fill_select(page, &label).await;
                continue;
            }

            let value = test_value(&input.kind);
            ::log::info!("Input: {}", label);
            self.errors.set_current_action(&format!("input: {}", label));

            let _ =
                tokio::time::timeout(Duration::from_millis(2_000), handle.scroll_into_view()).await;

            // Typing appends, so drop any existing value first
            let clear_js = "(() => { const el = document.querySelector('[data-vp-target]'); \
                 if (el) el.value = ''; })()";
            let _ = page.evaluate(clear_js).await;

            let filled = tokio::time::timeout(Duration::from_millis(3_000), async {
                handle.click().await?;
                handle.type_str(value).await
            })
            .await;

            match filled {
                Ok(Ok(_)) => {
                    let url = current_url(page).await;
                    self.log_interaction(
                        InteractionKind::Input,
                        &label,
                        &input.selector,
                        &url,
                        InteractionOutcome::Success,
                        None,
                        None,
                    );
                }
                Ok(Err(e)) => {
                    ::log::debug!("Input failed on '{}': {}", label, e);
                }
                Err(_) => {
                    ::log::debug!("Input timed out on '{}'", label);
                }
            }
        }

        // One shot of the filled-in form
        if inputs.iter().any(|i| i.tag != "select")
            && let Err(e) = shots.capture(page, "form_filled").await
        {
            ::log::warn!("Screenshot failed after form fill: {}", e);
        }
    }

    /// Choose the second non-disabled option; the first is usually a
    /// placeholder. Skips selects with fewer than two real options.
    async fn fill_select(&mut self, page: &Page, label: &str) {
        self.errors
            .set_current_action(&format!("input: {} (select)", label));

        let js = r#"
            (() => {
                const el = document.querySelector('[data-vp-target]');
                if (!el || el.tagName.toLowerCase() !== 'select') return false;
                const options = Array.from(el.options).filter((o) => !o.disabled);
                if (options.length < 2) return false;
                el.value = options[1].value;
                el.dispatchEvent(new Event('input', { bubbles: true }));
                el.dispatchEvent(new Event('change', { bubbles: true }));
                return true;
            })()
        "#;

        let selected = match page.evaluate(js).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(_) => false,
        };
        if selected {
            ::log::info!("Input: {} (select)", label);
            let url = current_url(page).await;
            self.log_interaction(
                InteractionKind::Input,
                &format!("{} (select)", label),
                "",
                &url,
                InteractionOutcome::Success,
                None,
                None,
            );
        }
    }

    /// Re-find the live element for a discovery record. Strategies run in
    /// order; the first that marks an element wins, and the marked element
    /// becomes the handle every subsequent step uses.
    async fn resolve(&self, page: &Page, element: &DiscoveredElement) -> Option<Element> {
        for strategy in STRATEGIES {
            let Some(js) = self.strategy_js(strategy, element) else {
                continue;
            };
            let marked = match page.evaluate(js).await {
                Ok(result) => result.into_value::<bool>().unwrap_or(false),
                Err(_) => false,
            };
            if !marked {
                continue;
            }
            if let Ok(handle) = page.find_element(MARKED).await {
                ::log::trace!("Resolved '{}' via {:?}", element.label(), strategy);
                return Some(handle);
            }
        }
        None
    }

    /// Marking script for one strategy, or None when the strategy does not
    /// apply to this element.
    fn strategy_js(&self, strategy: Strategy, element: &DiscoveredElement) -> Option<String> {
        let text = element.text.trim();
        match strategy {
            Strategy::Id => {
                let id = element.id()?;
                Some(format!(
                    r#"((id) => {{
                        {CLEAR_MARKERS}
                        const el = document.getElementById(id);
                        if (!el) return false;
                        el.setAttribute('data-vp-target', '');
                        return true;
                    }})({})"#,
                    js_string(id)
                ))
            }
            Strategy::RoleText => {
                if text.is_empty() || text.len() >= 60 {
                    return None;
                }
                let role = role_for(element)?;
                Some(format!(
                    r#"((role, text) => {{
                        {CLEAR_MARKERS}
                        const roleSelectors = {{
                            button: 'button, input[type="submit"], input[type="button"], [role="button"]',
                            link: 'a[href], [role="link"]',
                            tab: '[role="tab"]',
                            menuitem: '[role="menuitem"]',
                            option: 'option, [role="option"]',
                        }};
                        const selector = roleSelectors[role];
                        if (!selector) return false;
                        const visible = (el) => {{
                            const s = window.getComputedStyle(el);
                            const r = el.getBoundingClientRect();
                            return s.display !== 'none' && s.visibility !== 'hidden' &&
                                s.opacity !== '0' && r.width > 0 && r.height > 0;
                        }};
                        const name = (el) =>
                            (el.getAttribute('aria-label') || el.textContent || '').trim();
                        const candidates = Array.from(document.querySelectorAll(selector))
                            .filter(visible);
                        let hit = candidates.find((el) => name(el) === text);
                        if (!hit) {{
                            const lower = text.toLowerCase();
                            hit = candidates.find((el) =>
                                name(el).toLowerCase().includes(lower));
                        }}
                        if (!hit) return false;
                        hit.setAttribute('data-vp-target', '');
                        return true;
                    }})({}, {})"#,
                    js_string(role),
                    js_string(text)
                ))
            }
            Strategy::TagText => {
                if text.len() <= 1 || text.len() >= 60 {
                    return None;
                }
                Some(format!(
                    r#"((tag, text) => {{
                        {CLEAR_MARKERS}
                        const lower = text.toLowerCase();
                        for (const el of document.querySelectorAll(tag)) {{
                            if (!(el.textContent || '').toLowerCase().includes(lower)) continue;
                            el.setAttribute('data-vp-target', '');
                            return true;
                        }}
                        return false;
                    }})({}, {})"#,
                    js_string(&element.tag),
                    js_string(text)
                ))
            }
            Strategy::BoundingBox => {
                let bounding_box = element.bounding_box.as_ref()?;
                Some(format!(
                    r#"((tag, x, y) => {{
                        {CLEAR_MARKERS}
                        for (const el of document.querySelectorAll(tag)) {{
                            const s = window.getComputedStyle(el);
                            if (s.display === 'none' || s.visibility === 'hidden') continue;
                            const r = el.getBoundingClientRect();
                            if (Math.abs(r.x - x) < 15 && Math.abs(r.y - y) < 15) {{
                                el.setAttribute('data-vp-target', '');
                                return true;
                            }}
                        }}
                        return false;
                    }})({}, {}, {})"#,
                    js_string(&element.tag),
                    bounding_box.x,
                    bounding_box.y
                ))
            }
            Strategy::ExactText => {
                if text.is_empty() {
                    return None;
                }
                Some(format!(
                    r#"((tag, text) => {{
                        {CLEAR_MARKERS}
                        for (const el of document.querySelectorAll(tag)) {{
                            const s = window.getComputedStyle(el);
                            if (s.display === 'none' || s.visibility === 'hidden') continue;
                            if ((el.textContent || '').trim() !== text) continue;
                            el.setAttribute('data-vp-target', '');
                            return true;
                        }}
                        return false;
                    }})({}, {})"#,
                    js_string(&element.tag),
                    js_string(text)
                ))
            }
        }
    }

    /// Visibility of the currently marked element, bounded to one second.
    async fn marked_visible(&self, page: &Page) -> bool {
        let js = format!(
            r#"((sel) => {{
                const el = document.querySelector(sel);
                if (!el) return false;
                const s = window.getComputedStyle(el);
                const r = el.getBoundingClientRect();
                return s.display !== 'none' && s.visibility !== 'hidden' &&
                    s.opacity !== '0' && r.width > 0 && r.height > 0;
            }})({})"#,
            js_string(MARKED)
        );
        let checked = tokio::time::timeout(Duration::from_millis(1_000), page.evaluate(js)).await;
        match checked {
            Ok(Ok(result)) => result.into_value::<bool>().unwrap_or(false),
            _ => false,
        }
    }

    /// Undo whatever a click did: dismiss a fresh modal, and navigate back
    /// when the URL moved.
    async fn restore_state(&self, page: &Page, original_url: &str, changes: &[StateChange]) {
        let modal_appeared = changes.iter().any(|c| c.kind == StateChangeKind::Modal);
        let url_changed = changes.iter().any(|c| c.kind == StateChangeKind::Url);

        if modal_appeared && !self.state.try_dismiss_modal(page).await {
            ::log::debug!("Modal could not be confirmed dismissed");
        }

        if url_changed && current_url(page).await != original_url {
            self.safe_go_back(page, original_url).await;
        }
    }

    /// History back, verified; falls back to a direct navigation. Failure
    /// is logged, never propagated - the crawl resumes from wherever the
    /// page ended up.
    async fn safe_go_back(&self, page: &Page, target_url: &str) {
        if history_back(page).await.is_ok() {
            self.state.wait_for_stable(page).await;
            if current_url(page).await == target_url {
                return;
            }
        }

        let direct = tokio::time::timeout(
            Duration::from_millis(self.config.timeout_ms),
            page.goto(target_url),
        )
        .await;
        match direct {
            Ok(Ok(_)) => self.state.wait_for_stable(page).await,
            _ => ::log::warn!("Could not restore page to {}", target_url),
        }
    }

    /// A link leaving the target hostname entirely. Unparseable hrefs are
    /// treated as external and skipped.
    fn is_external_link(&self, href: &str, current_url: &str) -> bool {
        let Ok(base) = Url::parse(current_url) else {
            return true;
        };
        let Ok(resolved) = base.join(href) else {
            return true;
        };
        resolved
            .host_str()
            .is_none_or(|h| !h.eq_ignore_ascii_case(&self.base_host))
    }

    /// A same-host link to a different path: reserved for BFS navigation,
    /// not click exploration.
    fn is_navigation_link(&self, href: &str, current_url: &str) -> bool {
        let Ok(base) = Url::parse(current_url) else {
            return false;
        };
        let Ok(resolved) = base.join(href) else {
            return false;
        };
        resolved.host_str() == base.host_str() && resolved.path() != base.path()
    }

    #[allow(clippy::too_many_arguments)]
    fn log_interaction(
        &mut self,
        action: InteractionKind,
        target: &str,
        selector: &str,
        url: &str,
        outcome: InteractionOutcome,
        error: Option<&str>,
        screenshot_path: Option<&str>,
    ) {
        self.interactions.push(InteractionLog {
            timestamp: chrono::Utc::now().to_rfc3339(),
            action,
            target: target.to_string(),
            selector: selector.to_string(),
            url: url.to_string(),
            outcome,
            error: error.map(|e| e.to_string()),
            screenshot_path: screenshot_path.map(|p| p.to_string()),
        });
    }
}

/// Accessible role for the role+text resolution strategy, derived from the
/// discovered type first and the tag second.
fn role_for(element: &DiscoveredElement) -> Option<&'static str> {
    let derive = |value: &str| match value {
        "button" | "submit" => Some("button"),
        "a" | "link" => Some("link"),
        "tab" => Some("tab"),
        "menuitem" => Some("menuitem"),
        "option" => Some("option"),
        _ => None,
    };
    derive(&element.kind).or_else(|| derive(&element.tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::crawler::errors::ErrorCollector;
    use crate::crawler::state::StateDetector;

    fn element(tag: &str, kind: &str, text: &str) -> DiscoveredElement {
        DiscoveredElement {
            selector: tag.to_string(),
            tag: tag.to_string(),
            kind: kind.to_string(),
            text: text.to_string(),
            href: None,
            is_visible: true,
            bounding_box: Some(BoundingBox {
                x: 10.0,
                y: 20.0,
                width: 100.0,
                height: 30.0,
            }),
        }
    }

    fn with_interactor<T>(url: &str, f: impl FnOnce(Interactor<'_>) -> T) -> T {
        let config = ScanConfig::new(url);
        let viewport = crate::config::viewport_preset("desktop");
        let state = StateDetector::new();
        let errors = ErrorCollector::new();
        let interactor = Interactor::new(&config, &viewport, &state, &errors);
        f(interactor)
    }

    #[test]
    fn test_external_link_detection() {
        with_interactor("https://example.com", |it| {
            // Different hostname: external, never clicked
            assert!(it.is_external_link("https://other.com/x", "https://example.com/page"));
            // Same hostname: not external
            assert!(!it.is_external_link("/pricing", "https://example.com/page"));
            assert!(!it.is_external_link(
                "https://EXAMPLE.com/pricing",
                "https://example.com/page"
            ));
            // Unparseable treated as external
            assert!(it.is_external_link("https://", "https://example.com/page"));
        });
    }

    #[test]
    fn test_navigation_link_detection() {
        with_interactor("https://example.com", |it| {
            // Same host, different path: explorer territory
            assert!(it.is_navigation_link("/about", "https://example.com/home"));
            // Same path: a same-page effect, clickable
            assert!(!it.is_navigation_link("#section", "https://example.com/home"));
            assert!(!it.is_navigation_link("?tab=2", "https://example.com/home"));
            // Different host is external, not navigation
            assert!(!it.is_navigation_link("https://other.com/about", "https://example.com/home"));
        });
    }

    #[test]
    fn test_role_derivation() {
        assert_eq!(role_for(&element("button", "button", "Go")), Some("button"));
        assert_eq!(role_for(&element("input", "submit", "Send")), Some("button"));
        assert_eq!(role_for(&element("a", "a", "Home")), Some("link"));
        assert_eq!(role_for(&element("div", "tab", "Tab 1")), Some("tab"));
        assert_eq!(role_for(&element("div", "div", "Plain")), None);
    }

    #[test]
    fn test_strategy_applicability() {
        with_interactor("https://example.com", |it| {
            // No id captured: Id strategy does not apply
            let plain = element("button", "button", "Save");
            assert!(it.strategy_js(Strategy::Id, &plain).is_none());
            assert!(it.strategy_js(Strategy::RoleText, &plain).is_some());

            // With an id in the selector hint, Id applies
            let mut with_id = plain.clone();
            with_id.selector = "button#save".to_string();
            assert!(it.strategy_js(Strategy::Id, &with_id).is_some());

            // Long text disqualifies the text strategies
            let mut long_text = plain.clone();
            long_text.text = "x".repeat(80);
            assert!(it.strategy_js(Strategy::RoleText, &long_text).is_none());
            assert!(it.strategy_js(Strategy::TagText, &long_text).is_none());
            // ...but not the bounding-box one
            assert!(it.strategy_js(Strategy::BoundingBox, &long_text).is_some());

            // No bounding box: BoundingBox does not apply
            let mut no_box = plain.clone();
            no_box.bounding_box = None;
            assert!(it.strategy_js(Strategy::BoundingBox, &no_box).is_none());

            // Empty text: only Id/BoundingBox remain applicable
            let unnamed = element("div", "div", "");
            assert!(it.strategy_js(Strategy::RoleText, &unnamed).is_none());
            assert!(it.strategy_js(Strategy::TagText, &unnamed).is_none());
            assert!(it.strategy_js(Strategy::ExactText, &unnamed).is_none());
        });
    }

    #[test]
    fn test_strategy_js_quotes_text() {
        with_interactor("https://example.com", |it| {
            let tricky = element("button", "button", r#"Say "hi" <now>"#);
            let js = it.strategy_js(Strategy::ExactText, &tricky).unwrap();
            // The text must appear as a quoted JS literal, not raw
            assert!(js.contains(r#""Say \"hi\" <now>""#));
        });
    }

    #[test]
    fn test_discover_js_parses_into_elements() {
        // The contract between the discovery script and the Rust side
        let raw = r#"[
            {"selector": "button#save", "tag": "button", "type": "button",
             "text": "Save", "href": null, "isVisible": true,
             "boundingBox": {"x": 1.0, "y": 2.0, "width": 50.0, "height": 20.0}},
            {"selector": "a", "tag": "a", "type": "a", "text": "Home",
             "href": "/home", "isVisible": false, "boundingBox": null}
        ]"#;
        let parsed: Vec<RawElement> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].kind, "button");
        assert!(parsed[0].bounding_box.is_some());
        assert_eq!(parsed[1].href.as_deref(), Some("/home"));
        assert!(!parsed[1].is_visible);
    }
}
