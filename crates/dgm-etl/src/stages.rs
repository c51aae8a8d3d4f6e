//! The scrape pipeline as treadle stages.

use std::path::PathBuf;

use treadle::{Stage, StageContext, StageOutcome, TreadleError};

use dgm_core::schema::Database;
use dgm_search::{rebuild_index, FtsIndex};

use crate::fetch::PageFetcher;
use crate::load::load_directory;

fn stage_error(context: &str, e: impl std::fmt::Display) -> TreadleError {
    TreadleError::StageExecution(format!("{context}: {e}"))
}

/// The Fetch stage: download a range of show pages into the cache.
#[derive(Debug)]
pub struct FetchStage {
    fetcher: PageFetcher,
    from: u32,
    to: u32,
    force: bool,
}

impl FetchStage {
    #[must_use]
    pub fn new(fetcher: PageFetcher, from: u32, to: u32, force: bool) -> Self {
        Self {
            fetcher,
            from,
            to,
            force,
        }
    }
}

#[async_trait::async_trait]
impl Stage for FetchStage {
    fn name(&self) -> &str {
        "fetch"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        log::info!(
            "Fetching shows {}..={} into {}",
            self.from,
            self.to,
            self.fetcher.html_dir().display()
        );

        self.fetcher
            .fetch_range(self.from, self.to, self.force)
            .await
            .map_err(|e| stage_error("Fetch failed", e))?;

        Ok(StageOutcome::Complete)
    }
}

/// The Load stage: extract cached pages into the catalog.
#[derive(Debug)]
pub struct LoadStage {
    html_dir: PathBuf,
    db_path: PathBuf,
}

impl LoadStage {
    #[must_use]
    pub fn new(html_dir: PathBuf, db_path: PathBuf) -> Self {
        Self { html_dir, db_path }
    }
}

#[async_trait::async_trait]
impl Stage for LoadStage {
    fn name(&self) -> &str {
        "load"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        let db = Database::open(&self.db_path)
            .map_err(|e| stage_error("Failed to open database", e))?;

        load_directory(&db, &self.html_dir).map_err(|e| stage_error("Load failed", e))?;

        Ok(StageOutcome::Complete)
    }
}

/// The Index stage: rebuild the search index from the catalog.
#[derive(Debug)]
pub struct IndexStage {
    db_path: PathBuf,
    index_path: PathBuf,
}

impl IndexStage {
    #[must_use]
    pub fn new(db_path: PathBuf, index_path: PathBuf) -> Self {
        Self {
            db_path,
            index_path,
        }
    }
}

#[async_trait::async_trait]
impl Stage for IndexStage {
    fn name(&self) -> &str {
        "index"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        let db = Database::open(&self.db_path)
            .map_err(|e| stage_error("Failed to open database", e))?;
        let index = FtsIndex::open(&self.index_path)
            .map_err(|e| stage_error("Failed to open search index", e))?;

        rebuild_index(&db, &index).map_err(|e| stage_error("Indexing failed", e))?;

        Ok(StageOutcome::Complete)
    }
}
