//! The per-viewport crawl loop: pull a URL from the explorer, load it,
//! stabilize, screenshot, discover links, interact, repeat until the
//! frontier is empty. One page at a time, one viewport after another.

pub mod errors;
pub mod explorer;
pub mod interactor;
pub mod screenshot;
pub mod state;

use crate::artifacts::ArtifactStore;
use crate::browser::BrowserHandle;
use crate::config::ScanConfig;
use crate::error::Result;
use crate::parsers;
use crate::results::{CrawlResult, InteractionKind, PageCrawlResult};
use chromiumoxide::page::Page;
use errors::ErrorCollector;
use explorer::{Explorer, FrontierEntry};
use interactor::Interactor;
use screenshot::Screenshotter;
use state::StateDetector;
use std::time::Duration;
use url::Url;

/// Run the full crawl across every configured viewport.
pub async fn crawl(config: &ScanConfig, artifacts: &ArtifactStore) -> Result<CrawlResult> {
    let start = std::time::Instant::now();
    let mut pages = Vec::new();

    for viewport in &config.viewports {
        ::log::info!(
            "Viewport: {} ({}x{})",
            viewport.name,
            viewport.width,
            viewport.height
        );

        let browser = BrowserHandle::launch(config, viewport).await?;

        let mut explorer = Explorer::new(config)?;
        explorer.init(&config.url);

        let mut shots = Screenshotter::new(
            artifacts.clone(),
            &viewport.name,
            &config.theme,
            &config.language,
        );
        let detector = StateDetector::new();

        while let Some(entry) = explorer.next() {
            ::log::info!(
                "Visiting {} (depth {}/{})",
                entry.url,
                entry.depth,
                config.max_depth
            );
            let page_result = crawl_page(
                config,
                &browser,
                &detector,
                &mut explorer,
                &mut shots,
                &entry,
            )
            .await;
            pages.push(page_result);
        }

        browser.close().await;
    }

    let duration_ms = start.elapsed().as_millis();
    Ok(CrawlResult::from_pages(pages, duration_ms))
}

/// Visit one URL. Never fails: any error inside the visit collapses into a
/// zero-content result carrying a synthetic error, and the crawl moves on.
async fn crawl_page(
    config: &ScanConfig,
    browser: &BrowserHandle,
    detector: &StateDetector,
    explorer: &mut Explorer,
    shots: &mut Screenshotter,
    entry: &FrontierEntry,
) -> PageCrawlResult {
    let page = match browser.new_page().await {
        Ok(page) => page,
        Err(e) => {
            ::log::error!("Failed to open page for {}: {}", entry.url, e);
            return PageCrawlResult::load_failure(&entry.url, entry.depth, &e.to_string());
        }
    };

    let mut collector = ErrorCollector::new();
    let outcome = visit(
        config, browser, &page, detector, explorer, shots, &mut collector, entry,
    )
    .await;

    collector.detach();
    if let Err(e) = page.close().await {
        ::log::warn!("Failed to close page {}: {}", entry.url, e);
    }

    match outcome {
        Ok(result) => result,
        Err(e) => {
            let message = e.to_string();
            let brief: String = message.chars().take(100).collect();
            ::log::error!("Failed to crawl {}: {}", entry.url, brief);
            PageCrawlResult::load_failure(&entry.url, entry.depth, &message)
        }
    }
}

async fn visit(
    config: &ScanConfig,
    browser: &BrowserHandle,
    page: &Page,
    detector: &StateDetector,
    explorer: &mut Explorer,
    shots: &mut Screenshotter,
    collector: &mut ErrorCollector,
    entry: &FrontierEntry,
) -> Result<PageCrawlResult> {
    // Attach before navigating so load-time errors are captured too
    collector.clear();
    collector.attach(page).await?;
    collector.set_current_action("page_load");

    tokio::time::timeout(
        Duration::from_millis(config.timeout_ms),
        page.goto(entry.url.as_str()),
    )
    .await
    .map_err(|_| crate::error::Error::Navigation(format!("timed out loading {}", entry.url)))?
    .map_err(|e| crate::error::Error::Navigation(e.to_string()))?;

    detector.wait_for_stable(page).await;

    let shots_before = shots.screenshots().len();

    // Initial capture of the page as loaded
    let page_name = page_state_name(&entry.url);
    if let Err(e) = shots.capture(page, &format!("initial{}", page_name)).await {
        ::log::warn!("Initial screenshot failed for {}: {}", entry.url, e);
    }

    // Link discovery for the BFS frontier
    let html = page.content().await.unwrap_or_default();
    let parsed = parsers::html::parse(&html);
    ::log::debug!("Page text: {} chars", parsed.content.len());
    let discovered_links = explorer.discover_links(&entry.url, &parsed.links, entry.depth);

    // Exercise the page
    let mut interactor = Interactor::new(config, browser.viewport(), detector, collector);
    let interactions = interactor.interact_with_page(page, shots).await?;

    let screenshots = shots.screenshots()[shots_before..].to_vec();
    let elements_clicked = interactions
        .iter()
        .filter(|i| i.action == InteractionKind::Click)
        .count();

    Ok(PageCrawlResult {
        url: entry.url.clone(),
        depth: entry.depth,
        elements_found: interactions.len(),
        elements_clicked,
        screenshots,
        interactions,
        errors: collector.get_errors(),
        discovered_links,
    })
}

/// Path-derived tag for the initial screenshot of a page.
fn page_state_name(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();
    let name = path.replace('/', "_");
    if name.is_empty() || name == "_" {
        "_root".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_state_name() {
        assert_eq!(page_state_name("https://example.com/"), "_root");
        assert_eq!(page_state_name("https://example.com"), "_root");
        assert_eq!(page_state_name("https://example.com/a/b"), "_a_b");
        assert_eq!(page_state_name("not a url"), "_root");
    }
}
