//! Error types for the scrape pipeline.

use thiserror::Error;

/// Why a single page could not be turned into a show.
///
/// Every variant is fatal for the page being extracted and for nothing
/// else: the loader logs it and moves on to the next page.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// An element every show page carries was not there.
    #[error("missing element: {0}")]
    MissingElement(&'static str),

    /// The date box did not hold a `day month year` date.
    #[error("invalid date {value:?}: {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A track length that is neither `--` nor `minutes:seconds`.
    #[error("invalid track length {0:?}")]
    InvalidTrackLength(String),

    /// A built-in CSS selector or pattern failed to compile.
    #[error("invalid selector {selector:?}: {message}")]
    Selector {
        selector: &'static str,
        message: String,
    },
}

/// Convenience alias for extraction results.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Errors while downloading show pages.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The site answered with a status we cannot use.
    #[error("HTTP {status} fetching show {id}")]
    Http { id: u32, status: u16 },

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The page cache could not be written.
    #[error("cache error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Returns `true` when the request may succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Io(_) => false,
        }
    }
}

/// Convenience alias for fetch results.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Errors that stop a whole batch load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The page directory could not be read.
    #[error("cannot read {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },

    /// The extractor could not be built.
    #[error("extractor setup failed: {0}")]
    Setup(#[from] ExtractError),

    /// An error propagated from the catalog.
    #[error("catalog error: {0}")]
    Catalog(#[from] dgm_core::Error),

    /// An error propagated from the search index.
    #[error("search index error: {0}")]
    Search(#[from] dgm_search::SearchError),
}

/// Convenience alias for load results.
pub type LoadResult<T> = std::result::Result<T, LoadError>;
