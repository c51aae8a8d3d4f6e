use treadle::Workflow;

use crate::config::Config;
use crate::fetch::PageFetcher;
use crate::stages::{FetchStage, IndexStage, LoadStage};

/// Which ids a scrape run fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeRange {
    pub from: u32,
    pub to: u32,

    /// Download pages again even when cached.
    pub force: bool,
}

impl ScrapeRange {
    /// The configured id range, keeping cached pages.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            from: config.first_id,
            to: config.last_id,
            force: false,
        }
    }
}

/// Build the fetch → load → index pipeline.
///
/// # Errors
/// Returns an error if the workflow cannot be built.
pub fn build_pipeline(config: &Config, range: ScrapeRange) -> treadle::Result<Workflow> {
    let fetcher = PageFetcher::new(config).map_err(|e| {
        treadle::TreadleError::InvalidWorkflow(format!("Failed to create page fetcher: {e}"))
    })?;

    let fetch_stage = FetchStage::new(fetcher, range.from, range.to, range.force);
    let load_stage = LoadStage::new(config.html_dir.clone(), config.database_path.clone());
    let index_stage = IndexStage::new(config.database_path.clone(), config.index_path.clone());

    Workflow::builder()
        .stage("fetch", fetch_stage)
        .stage("load", load_stage)
        .stage("index", index_stage)
        .dependency("load", "fetch")
        .dependency("index", "load")
        .build()
}
