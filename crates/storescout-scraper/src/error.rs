use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("region {region} is unavailable: {reason}")]
    RegionUnavailable { region: String, reason: String },

    #[error("unknown region \"{region}\"")]
    UnknownRegion { region: String },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid metadata for product {product_id}: {reason}")]
    Metadata { product_id: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Coarse classification used at the API boundary to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Timeout,
    RateLimited,
    Unavailable,
    Upstream,
}

impl ErrorKind {
    #[must_use]
    pub fn as_code(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Unavailable => "region_unavailable",
            ErrorKind::Upstream => "upstream_error",
        }
    }
}

impl ScraperError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScraperError::UnknownRegion { .. } | ScraperError::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }
            ScraperError::NotFound { .. } => ErrorKind::NotFound,
            ScraperError::Timeout { .. } => ErrorKind::Timeout,
            ScraperError::RateLimited { .. } => ErrorKind::RateLimited,
            ScraperError::RegionUnavailable { .. } | ScraperError::Http(_) => {
                ErrorKind::Unavailable
            }
            ScraperError::UnexpectedStatus { .. }
            | ScraperError::Deserialize { .. }
            | ScraperError::Metadata { .. } => ErrorKind::Upstream,
        }
    }

    /// Translates a transport failure into a domain-level condition for `region`.
    pub(crate) fn from_transport(err: reqwest::Error, url: &str, region: &str) -> Self {
        if err.is_timeout() {
            ScraperError::Timeout {
                url: url.to_owned(),
            }
        } else if err.is_connect() || err.is_request() {
            ScraperError::RegionUnavailable {
                region: region.to_owned(),
                reason: err.to_string(),
            }
        } else {
            ScraperError::Http(err)
        }
    }
}
