use serde::{Deserialize, Serialize};

use crate::model::ids::{ShowId, TrackId};

/// One entry of a show's setlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub show_id: ShowId,

    /// 1-based position in page order; unique within the show.
    pub position: u32,

    /// Track number label exactly as the page printed it.
    pub number: String,
    pub name: String,

    /// `None` when the page marked the length as "--".
    pub length_secs: Option<u32>,
}

/// A setlist entry extracted from a page; position is its index in
/// [`NewShow::tracks`](crate::model::NewShow::tracks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrack {
    pub number: String,
    pub name: String,
    pub length_secs: Option<u32>,
}

impl NewTrack {
    #[must_use]
    pub fn new(number: impl Into<String>, name: impl Into<String>, length_secs: Option<u32>) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            length_secs,
        }
    }
}
