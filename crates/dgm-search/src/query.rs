use std::collections::HashMap;

use dgm_core::model::{Show, ShowId};
use dgm_core::schema::Database;

use crate::error::SearchResult;
use crate::index::SearchIndex;

/// How many ranked ids a search asks the index for.
pub const MAX_RESULTS: usize = 100;

/// Shows matching a query, most relevant first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    pub shows: Vec<Show>,

    /// Total matches reported by the index; can exceed `shows.len()`.
    pub total: usize,
}

impl SearchHits {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }
}

/// Ranks with the index, hydrates from the catalog.
#[derive(Debug)]
pub struct QueryService<'a, I: SearchIndex + ?Sized> {
    index: &'a I,
    db: &'a Database,
}

impl<'a, I: SearchIndex + ?Sized> QueryService<'a, I> {
    pub fn new(index: &'a I, db: &'a Database) -> Self {
        Self { index, db }
    }

    /// Every show matching `text` (up to [`MAX_RESULTS`]) in the index's
    /// relevance order.
    pub fn search(&self, text: &str) -> SearchResult<SearchHits> {
        let ranked = self.index.query(text, 0, MAX_RESULTS)?;
        log::debug!("Query {:?} matched {} documents", text, ranked.total);

        if ranked.total == 0 {
            return Ok(SearchHits::default());
        }

        let mut by_id: HashMap<ShowId, Show> = self
            .db
            .shows_by_ids(&ranked.ids)?
            .into_iter()
            .map(|show| (show.id, show))
            .collect();

        let shows: Vec<Show> = ranked
            .ids
            .iter()
            .filter_map(|id| {
                let show = by_id.remove(id);
                if show.is_none() {
                    log::warn!("Index returned show {} which is not in the catalog", id);
                }
                show
            })
            .collect();

        Ok(SearchHits {
            shows,
            total: ranked.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SearchDocument;
    use crate::index::RankedIds;
    use chrono::NaiveDate;
    use dgm_core::model::{DgmId, NewShow};
    use std::cell::RefCell;

    /// An index that always answers with a fixed ranking.
    #[derive(Debug, Default)]
    struct FixedIndex {
        ranked: Vec<ShowId>,
        total: usize,
        queries: RefCell<Vec<(String, usize, usize)>>,
    }

    impl SearchIndex for FixedIndex {
        fn index(&self, _doc: &SearchDocument) -> SearchResult<()> {
            Ok(())
        }

        fn delete(&self, _id: ShowId) -> SearchResult<()> {
            Ok(())
        }

        fn clear(&self) -> SearchResult<()> {
            Ok(())
        }

        fn query(&self, text: &str, from: usize, size: usize) -> SearchResult<RankedIds> {
            self.queries.borrow_mut().push((text.to_string(), from, size));
            Ok(RankedIds {
                ids: self.ranked.clone(),
                total: self.total,
            })
        }
    }

    /// Store shows with dgm ids 1..=n; store ids come out 1..=n too.
    fn catalog(n: u32) -> Database {
        let db = Database::open_in_memory().unwrap();
        for dgm_id in 1..=n {
            db.upsert_show(&NewShow::new(
                DgmId::new(dgm_id),
                format!("Venue {dgm_id}"),
                "Somewhere",
                NaiveDate::from_ymd_opt(1995, 6, 12).unwrap(),
                "12 Jun 1995",
            ))
            .unwrap();
        }
        db
    }

    #[test]
    fn test_search_preserves_index_order() {
        let db = catalog(10);
        let index = FixedIndex {
            ranked: vec![ShowId::from_raw(7), ShowId::from_raw(3), ShowId::from_raw(9)],
            total: 3,
            ..FixedIndex::default()
        };

        let hits = QueryService::new(&index, &db).search("anything").unwrap();
        let ids: Vec<i64> = hits.shows.iter().map(|s| s.id.as_i64()).collect();

        assert_eq!(ids, vec![7, 3, 9]);
        assert_eq!(hits.total, 3);
    }

    #[test]
    fn test_search_asks_for_first_hundred() {
        let db = catalog(1);
        let index = FixedIndex::default();

        QueryService::new(&index, &db).search("fripp").unwrap();

        assert_eq!(
            index.queries.borrow().as_slice(),
            &[("fripp".to_string(), 0, MAX_RESULTS)]
        );
    }

    #[test]
    fn test_zero_total_returns_empty() {
        let db = catalog(5);
        let index = FixedIndex::default();

        let hits = QueryService::new(&index, &db).search("nothing").unwrap();
        assert!(hits.is_empty());
        assert_eq!(hits.total, 0);
    }

    #[test]
    fn test_missing_rows_are_skipped() {
        let db = catalog(3);
        let index = FixedIndex {
            ranked: vec![ShowId::from_raw(2), ShowId::from_raw(42), ShowId::from_raw(1)],
            total: 3,
            ..FixedIndex::default()
        };

        let hits = QueryService::new(&index, &db).search("x").unwrap();
        let ids: Vec<i64> = hits.shows.iter().map(|s| s.id.as_i64()).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(hits.total, 3);
    }
}
