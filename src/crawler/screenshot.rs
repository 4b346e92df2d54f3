//! Full-page screenshot capture, tagged with viewport/theme/language/state.

use crate::artifacts::ArtifactStore;
use crate::browser::current_url;
use crate::error::Result;
use crate::results::Screenshot;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};

pub struct Screenshotter {
    artifacts: ArtifactStore,
    viewport: String,
    theme: String,
    language: String,
    counter: usize,
    screenshots: Vec<Screenshot>,
}

impl Screenshotter {
    pub fn new(artifacts: ArtifactStore, viewport: &str, theme: &str, language: &str) -> Self {
        Self {
            artifacts,
            viewport: viewport.to_string(),
            theme: theme.to_string(),
            language: language.to_string(),
            counter: 0,
            screenshots: Vec::new(),
        }
    }

    /// Capture a full-page image and catalog it under the given state name.
    pub async fn capture(&mut self, page: &Page, state: &str) -> Result<Screenshot> {
        self.counter += 1;
        let name = format!("{}_{:03}_{}", self.viewport, self.counter, state);
        let path = self.artifacts.screenshot_path(&name);

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        let bytes = page.screenshot(params).await?;
        tokio::fs::write(&path, &bytes).await?;

        let screenshot = Screenshot {
            path: path.to_string_lossy().into_owned(),
            url: current_url(page).await,
            viewport: self.viewport.clone(),
            theme: self.theme.clone(),
            language: self.language.clone(),
            state: state.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        ::log::debug!("Captured {} ({} KB)", name, bytes.len() / 1024);
        self.screenshots.push(screenshot.clone());
        Ok(screenshot)
    }

    /// All screenshots captured so far for this viewport.
    pub fn screenshots(&self) -> &[Screenshot] {
        &self.screenshots
    }

    pub fn count(&self) -> usize {
        self.counter
    }
}
