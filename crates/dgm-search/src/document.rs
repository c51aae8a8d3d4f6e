//! The searchable projection of a show.
//!
//! The index schema is this file: [`SEARCH_FIELDS`] lists the indexed
//! columns in order, and [`SEARCH_SCHEMA_VERSION`] must be bumped whenever
//! that list changes so existing indexes get rebuilt.

use serde::{Deserialize, Serialize};

use dgm_core::model::{Show, ShowId};

/// Version of the indexed field list.
pub const SEARCH_SCHEMA_VERSION: u32 = 1;

/// An indexed column and its BM25 weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchField {
    pub name: &'static str,
    pub weight: f64,
}

/// Indexed columns, in column order.
pub const SEARCH_FIELDS: &[SearchField] = &[
    SearchField {
        name: "venue",
        weight: 4.0,
    },
    SearchField {
        name: "location",
        weight: 3.0,
    },
    SearchField {
        name: "date_friendly",
        weight: 2.0,
    },
    SearchField {
        name: "description",
        weight: 1.0,
    },
];

/// A show as the index sees it, keyed by the show's store id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: ShowId,
    pub venue: String,
    pub location: String,
    pub date_friendly: String,
    pub description: String,
}

impl SearchDocument {
    #[must_use]
    pub fn from_show(show: &Show) -> Self {
        Self {
            id: show.id,
            venue: show.venue.clone(),
            location: show.location.clone(),
            date_friendly: show.date_friendly.clone(),
            description: show.description.clone().unwrap_or_default(),
        }
    }

    /// Field values in [`SEARCH_FIELDS`] order.
    #[must_use]
    pub fn values(&self) -> [&str; 4] {
        [
            self.venue.as_str(),
            self.location.as_str(),
            self.date_friendly.as_str(),
            self.description.as_str(),
        ]
    }
}
