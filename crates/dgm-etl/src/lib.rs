//! Scrape pipeline for dgm-bot.
//!
//! Fetches show pages into a local cache, extracts them into catalog
//! records, and rebuilds the search index. The three steps are also
//! wired together as treadle stages.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod load;
pub mod pipeline;
pub mod resilience;
pub mod stages;
pub mod work_item;

pub use config::Config;
pub use error::{ExtractError, ExtractResult, FetchError, FetchResult, LoadError, LoadResult};
pub use extract::{extract, parse_track_length, Extraction, Extractor};
pub use fetch::{FetchOutcome, FetchReport, PageFetcher};
pub use load::{load_directory, LoadReport};
pub use pipeline::{build_pipeline, ScrapeRange};
pub use stages::{FetchStage, IndexStage, LoadStage};
pub use work_item::ScrapeJob;
