use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::ids::{DgmId, ShowId};
use crate::model::member::NewMember;
use crate::model::track::NewTrack;

/// A stored concert, as read back from the catalog.
///
/// Lineup and setlist are not held here; they are reverse lookups on the
/// store (`members_for_show`, `tracks_for_show`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub dgm_id: DgmId,
    pub venue: String,
    pub location: String,
    pub date: NaiveDate,

    /// The date exactly as the page displayed it, e.g. "12 Jun 1995".
    pub date_friendly: String,

    /// Number of rating icons on the page; `None` when there were none.
    pub quality_rating: Option<u8>,
    pub description: Option<String>,

    /// Audio source label, e.g. "Soundboard".
    pub source: Option<String>,

    /// Cover image URL.
    pub cover: Option<String>,
    pub has_download: bool,
}

impl Show {
    /// "Venue, Location", the heading used everywhere a show is listed.
    #[must_use]
    pub fn title(&self) -> String {
        format!("{}, {}", self.venue, self.location)
    }
}

/// A show extracted from a page, not yet written to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShow {
    pub dgm_id: DgmId,
    pub venue: String,
    pub location: String,
    pub date: NaiveDate,
    pub date_friendly: String,
    pub quality_rating: Option<u8>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub cover: Option<String>,
    pub has_download: bool,

    /// Lineup in page order, duplicates already collapsed.
    pub members: Vec<NewMember>,

    /// Setlist in page order.
    pub tracks: Vec<NewTrack>,
}

impl NewShow {
    #[must_use]
    pub fn new(
        dgm_id: DgmId,
        venue: impl Into<String>,
        location: impl Into<String>,
        date: NaiveDate,
        date_friendly: impl Into<String>,
    ) -> Self {
        Self {
            dgm_id,
            venue: venue.into(),
            location: location.into(),
            date,
            date_friendly: date_friendly.into(),
            quality_rating: None,
            description: None,
            source: None,
            cover: None,
            has_download: false,
            members: Vec::new(),
            tracks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_member(mut self, member: NewMember) -> Self {
        self.members.push(member);
        self
    }

    #[must_use]
    pub fn with_track(mut self, track: NewTrack) -> Self {
        self.tracks.push(track);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(1995, 6, 12).unwrap()
    }

    #[test]
    fn test_new_show_defaults() {
        let show = NewShow::new(DgmId::new(1), "Royal Albert Hall", "London", date(), "12 Jun 1995");
        assert_eq!(show.venue, "Royal Albert Hall");
        assert!(show.members.is_empty());
        assert!(show.tracks.is_empty());
        assert!(!show.has_download);
        assert!(show.quality_rating.is_none());
    }

    #[test]
    fn test_new_show_builder() {
        let show = NewShow::new(DgmId::new(1), "Venue", "Town", date(), "12 Jun 1995")
            .with_description("A fine night")
            .with_member(NewMember::new("Robert Fripp", ["Guitar"]))
            .with_track(NewTrack::new("1", "VROOOM", Some(300)));

        assert_eq!(show.description.as_deref(), Some("A fine night"));
        assert_eq!(show.members.len(), 1);
        assert_eq!(show.tracks[0].name, "VROOOM");
    }

    #[test]
    fn test_show_title() {
        let show = Show {
            id: ShowId::from_raw(1),
            dgm_id: DgmId::new(10),
            venue: "Venue".to_string(),
            location: "Town".to_string(),
            date: date(),
            date_friendly: "12 Jun 1995".to_string(),
            quality_rating: None,
            description: None,
            source: None,
            cover: None,
            has_download: false,
        };
        assert_eq!(show.title(), "Venue, Town");
    }
}
