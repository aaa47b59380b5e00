use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubsiftError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Timed out loading {url}")]
    Timeout { url: String },

    #[error("Session cookie '{0}' not found; check the login credentials")]
    SessionCookieMissing(String),

    #[error("Giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SubsiftError {
    pub(crate) fn browser(context: &str, err: impl std::fmt::Display) -> Self {
        SubsiftError::Browser(format!("{}: {}", context, err))
    }

    pub(crate) fn navigation(url: &str, err: impl std::fmt::Display) -> Self {
        SubsiftError::Navigation {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SubsiftError>;
