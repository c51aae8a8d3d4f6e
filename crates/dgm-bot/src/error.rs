//! Error types for the bot.

use thiserror::Error;

/// The catalog or the search index failed.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog error: {0}")]
    Store(#[from] dgm_core::Error),

    #[error("search index error: {0}")]
    Search(#[from] dgm_search::SearchError),
}

/// Convenience alias for catalog results.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Why a command produced no view.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The user can fix this: missing argument, nothing selected, and so
    /// on. Session state is left as it was.
    #[error("{0}")]
    Guidance(String),

    /// The backing stores failed mid-session.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl DispatchError {
    pub(crate) fn guidance(text: impl Into<String>) -> Self {
        Self::Guidance(text.into())
    }
}

/// Errors talking to the chat service.
#[derive(Debug, Error)]
pub enum TransportError {
    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The chat API answered with an error status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The chat API asked us to slow down.
    #[error("rate limited, retry after {retry_after:.1}s")]
    RateLimited { retry_after: f64 },

    /// A payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Console input or output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Returns `true` when the call may succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Decode(_) | Self::Io(_) => false,
        }
    }
}

/// Convenience alias for transport results.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
