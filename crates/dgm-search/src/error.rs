//! Search error types.

use thiserror::Error;

/// Errors raised by the search index or while hydrating results.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The index database failed.
    #[error("index error: {0}")]
    Index(#[from] rusqlite::Error),

    /// The catalog store failed while hydrating ranked ids.
    #[error("catalog error: {0}")]
    Catalog(#[from] dgm_core::Error),
}

/// Convenience alias for search results.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
