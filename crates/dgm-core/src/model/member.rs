use serde::{Deserialize, Serialize};

use crate::model::ids::{InstrumentId, MemberId, ShowId};

/// An instrument name, unique across the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub name: String,
}

/// A performer in one show's lineup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub show_id: ShowId,
    pub name: String,

    /// Instruments played at this show, ordered by name.
    pub instruments: Vec<Instrument>,
}

impl Member {
    /// Instrument names joined for display, e.g. "Guitar, Mellotron".
    #[must_use]
    pub fn instrument_list(&self) -> String {
        self.instruments
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A lineup entry extracted from a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,

    /// Instrument names in page order, without duplicates.
    pub instruments: Vec<String>,
}

impl NewMember {
    /// Create a member; repeated instrument names are dropped.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, instruments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for instrument in instruments {
            let instrument = instrument.into();
            if !unique.contains(&instrument) {
                unique.push(instrument);
            }
        }
        Self {
            name: name.into(),
            instruments: unique,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_member_dedups_instruments() {
        let member = NewMember::new("Tony Levin", ["Bass", "Stick", "Bass"]);
        assert_eq!(member.instruments, vec!["Bass", "Stick"]);
    }

    #[test]
    fn test_instrument_list() {
        let member = Member {
            id: MemberId::from_raw(1),
            show_id: ShowId::from_raw(1),
            name: "Adrian Belew".to_string(),
            instruments: vec![
                Instrument {
                    id: InstrumentId::from_raw(1),
                    name: "Guitar".to_string(),
                },
                Instrument {
                    id: InstrumentId::from_raw(2),
                    name: "Vocals".to_string(),
                },
            ],
        };
        assert_eq!(member.instrument_list(), "Guitar, Vocals");
    }
}
