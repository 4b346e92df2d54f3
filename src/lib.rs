#![allow(clippy::too_many_arguments)]

// Re-export modules
pub mod analyzer;
pub mod artifacts;
pub mod browser;
pub mod config;
pub mod crawler;
pub mod error;
pub mod parsers;
pub mod results;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{ScanConfig, Viewport};
pub use error::{Error, Result};
pub use results::{CrawlResult, PageCrawlResult, Report};

use analyzer::{VisionAnalyzer, analyze_crawl};
use artifacts::ArtifactStore;
use url::Url;

/// Builder for one scan of one target application.
///
/// Drives the whole pipeline: crawl every configured viewport, optionally
/// hand the screenshots to a vision analyzer, and write the report
/// artifact. Only configuration problems (and browser launch failure) can
/// make `run` fail; everything that happens on a page is contained there.
pub struct Scan {
    config: ScanConfig,
    analyzer: Option<Box<dyn VisionAnalyzer>>,
}

impl Scan {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            analyzer: None,
        }
    }

    /// Attach a vision-analysis service. Without one the scan still crawls
    /// and reports, just with an empty issue list.
    pub fn with_analyzer(mut self, analyzer: Box<dyn VisionAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Run the scan and return the final report.
    pub async fn run(self) -> Result<Report> {
        // The one fatal validation: an unparseable target is a config error
        Url::parse(&self.config.url).map_err(|source| Error::InvalidUrl {
            url: self.config.url.clone(),
            source,
        })?;

        ::log::info!("Target: {}", self.config.url);
        ::log::info!(
            "Settings: depth={}, click={}, input={}, nav={}",
            self.config.max_depth,
            self.config.enable_click,
            self.config.enable_input,
            self.config.enable_navigation
        );

        let artifacts = ArtifactStore::init(&self.config.output_dir, &self.config.url)?;

        let crawl_result = crawler::crawl(&self.config, &artifacts).await?;
        ::log::info!(
            "Crawl complete: {} pages, {} interactions, {} screenshots, {} errors",
            crawl_result.pages.len(),
            crawl_result.total_interactions,
            crawl_result.total_screenshots,
            crawl_result.total_errors
        );

        let issues = match &self.analyzer {
            Some(analyzer) => {
                ::log::info!("Analyzing {} screenshots", crawl_result.total_screenshots);
                analyze_crawl(analyzer.as_ref(), &crawl_result).await
            }
            None => Vec::new(),
        };

        let report = Report::new(&self.config, crawl_result, issues);
        artifacts.write_report(&report)?;
        Ok(report)
    }
}
