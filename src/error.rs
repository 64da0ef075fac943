//! Error types for catalog operations.

use thiserror::Error;

/// Errors that can occur while talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Request could not be sent or the body could not be read.
    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    /// Body was not JSON of the expected shape.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    /// A URL could not be parsed.
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// Failed to build the HTTP client.
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl CatalogError {
    pub(crate) fn invalid_url(url: &str, source: url::ParseError) -> Self {
        CatalogError::InvalidUrl {
            url: url.to_string(),
            source,
        }
    }

    /// Whether the error came from the server rather than the transport.
    pub fn is_status(&self) -> bool {
        matches!(self, CatalogError::Status { .. })
    }
}
