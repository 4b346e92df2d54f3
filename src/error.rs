use thiserror::Error;

/// Errors that can escape the pipeline. Anything that happens while
/// visiting a page is contained there and recorded as data instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The target URL (or another configured URL) could not be parsed.
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The browser process could not be launched or configured.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// A browser-level operation failed outside any page visit scope.
    #[error("browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    /// A CDP command could not be constructed.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A page load failed or timed out. Contained at the page-visit scope.
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
