//! Thin wrapper around the CDP browser. Owns the launch/handler plumbing so
//! the crawl loop only deals with pages.

use crate::config::{ScanConfig, Viewport, detect_chromium_path};
use crate::error::{Error, Result};
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::security::SetIgnoreCertificateErrorsParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

const USER_AGENT: &str = "vet-page/0.1.0 (autonomous QA crawler)";

/// One launched browser instance plus the task driving its CDP websocket.
pub struct BrowserHandle {
    inner: CdpBrowser,
    handler_task: JoinHandle<()>,
    viewport: Viewport,
}

impl BrowserHandle {
    /// Launch an isolated browser sized for one viewport.
    pub async fn launch(config: &ScanConfig, viewport: &Viewport) -> Result<Self> {
        let mut builder = CdpConfig::builder()
            .no_sandbox()
            .window_size(viewport.width, viewport.height);

        let executable = config.chromium_path.clone().or_else(detect_chromium_path);
        if let Some(path) = &executable {
            ::log::debug!("Using Chromium binary: {}", path);
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder.build().map_err(Error::BrowserLaunch)?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(|e| Error::BrowserLaunch(e.to_string()))?;

        // Drive the CDP websocket until the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        ::log::info!(
            "Browser launched for viewport {} ({}x{})",
            viewport.name,
            viewport.width,
            viewport.height
        );

        Ok(Self {
            inner: browser,
            handler_task,
            viewport: viewport.clone(),
        })
    }

    /// Open a fresh page with viewport emulation, the crawler user agent and
    /// TLS-error tolerance applied.
    pub async fn new_page(&self) -> Result<Page> {
        let page = self.inner.new_page("about:blank").await?;

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(self.viewport.width))
            .height(i64::from(self.viewport.height))
            .device_scale_factor(1.0)
            .mobile(self.viewport.name == "mobile")
            .build()
            .map_err(Error::Protocol)?;
        page.execute(metrics).await?;

        page.execute(SetUserAgentOverrideParams::new(USER_AGENT))
            .await?;
        page.execute(SetIgnoreCertificateErrorsParams::new(true))
            .await?;

        Ok(page)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub async fn close(mut self) {
        if let Err(e) = self.inner.close().await {
            ::log::warn!("Failed to close browser cleanly: {}", e);
        }
        self.handler_task.abort();
    }
}

/// Current URL of a page, empty when the target is already gone.
pub async fn current_url(page: &Page) -> String {
    match page.url().await {
        Ok(Some(url)) => url,
        _ => String::new(),
    }
}

/// Dispatch a key press (down + up) to the page via the CDP Input domain.
pub async fn press_key(page: &Page, key: &str) -> Result<()> {
    let key_down = DispatchKeyEventParams::builder()
        .r#type(DispatchKeyEventType::KeyDown)
        .key(key)
        .build()
        .map_err(Error::Protocol)?;
    page.execute(key_down).await?;

    let key_up = DispatchKeyEventParams::builder()
        .r#type(DispatchKeyEventType::KeyUp)
        .key(key)
        .build()
        .map_err(Error::Protocol)?;
    page.execute(key_up).await?;

    Ok(())
}

/// Ask the page to go back one history entry. Whether it landed anywhere
/// useful is for the caller to verify via `current_url`.
pub async fn history_back(page: &Page) -> Result<()> {
    page.evaluate("window.history.back()").await?;
    Ok(())
}
