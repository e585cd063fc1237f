use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

/// Fatal failures. Rate limiting is handled by the searcher and never shows up here.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("GitHub token is required (use --token or set GITHUB_TOKEN)")]
    MissingToken,

    #[error("invalid server URL '{0}'")]
    InvalidServer(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("failed to write results: {0}")]
    Render(#[from] std::io::Error),

    #[error("failed to open browser: {0}")]
    Browse(String),
}
