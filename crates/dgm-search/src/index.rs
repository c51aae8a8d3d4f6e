use dgm_core::model::ShowId;
use dgm_core::schema::Database;

use crate::document::SearchDocument;
use crate::error::SearchResult;

/// One page of ranked matches plus the total match count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedIds {
    /// Show ids, most relevant first.
    pub ids: Vec<ShowId>,

    /// Number of matching documents, regardless of paging.
    pub total: usize,
}

/// A ranked, queryable projection of the catalog.
pub trait SearchIndex {
    /// Add a document, replacing any document with the same id.
    fn index(&self, doc: &SearchDocument) -> SearchResult<()>;

    /// Remove a document; a missing id is not an error.
    fn delete(&self, id: ShowId) -> SearchResult<()>;

    /// Remove every document.
    fn clear(&self) -> SearchResult<()>;

    /// Ranked ids for `text`, skipping `from` and returning at most `size`.
    fn query(&self, text: &str, from: usize, size: usize) -> SearchResult<RankedIds>;

    /// Add many documents.
    fn index_batch(&self, docs: &[SearchDocument]) -> SearchResult<()> {
        for doc in docs {
            self.index(doc)?;
        }
        Ok(())
    }
}

/// Drop everything in `index` and reindex every stored show.
///
/// Returns the number of indexed shows.
pub fn rebuild_index<I: SearchIndex + ?Sized>(db: &Database, index: &I) -> SearchResult<usize> {
    let docs: Vec<SearchDocument> = db
        .list_shows()?
        .iter()
        .map(SearchDocument::from_show)
        .collect();

    index.clear()?;
    index.index_batch(&docs)?;

    log::info!("Indexed {} shows", docs.len());
    Ok(docs.len())
}
