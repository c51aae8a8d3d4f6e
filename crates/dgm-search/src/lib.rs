//! Full-text show search for dgm-bot.
//!
//! Projects stored shows into typed search documents, keeps them in a
//! SQLite FTS5 index ranked by BM25, and hydrates ranked ids back into
//! shows from the catalog while preserving the index's order.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod document;
pub mod error;
pub mod fts;
pub mod index;
pub mod query;

pub use document::{SearchDocument, SearchField, SEARCH_FIELDS, SEARCH_SCHEMA_VERSION};
pub use error::{SearchError, SearchResult};
pub use fts::FtsIndex;
pub use index::{rebuild_index, RankedIds, SearchIndex};
pub use query::{QueryService, SearchHits, MAX_RESULTS};
