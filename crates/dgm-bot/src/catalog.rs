use dgm_core::model::{DgmId, Member, Show, ShowId, Track};
use dgm_core::schema::Database;
use dgm_search::{FtsIndex, QueryService, SearchHits};

use crate::error::CatalogResult;

/// Read access to shows, as the dispatcher needs it.
pub trait Catalog {
    /// Ranked search over all shows.
    fn search(&self, text: &str) -> CatalogResult<SearchHits>;

    fn show_by_dgm_id(&self, dgm_id: DgmId) -> CatalogResult<Option<Show>>;

    /// Setlist in position order.
    fn tracks(&self, show: ShowId) -> CatalogResult<Vec<Track>>;

    fn members(&self, show: ShowId) -> CatalogResult<Vec<Member>>;
}

/// The SQLite catalog plus its full-text index.
#[derive(Debug)]
pub struct LocalCatalog {
    db: Database,
    index: FtsIndex,
}

impl LocalCatalog {
    pub fn new(db: Database, index: FtsIndex) -> Self {
        Self { db, index }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn index(&self) -> &FtsIndex {
        &self.index
    }
}

impl Catalog for LocalCatalog {
    fn search(&self, text: &str) -> CatalogResult<SearchHits> {
        Ok(QueryService::new(&self.index, &self.db).search(text)?)
    }

    fn show_by_dgm_id(&self, dgm_id: DgmId) -> CatalogResult<Option<Show>> {
        Ok(self.db.get_show_by_dgm_id(dgm_id)?)
    }

    fn tracks(&self, show: ShowId) -> CatalogResult<Vec<Track>> {
        Ok(self.db.tracks_for_show(show)?)
    }

    fn members(&self, show: ShowId) -> CatalogResult<Vec<Member>> {
        Ok(self.db.members_for_show(show)?)
    }
}
