pub mod ids;
pub mod member;
pub mod show;
pub mod track;

pub use ids::{DgmId, InstrumentId, MemberId, ShowId, TrackId};
pub use member::{Instrument, Member, NewMember};
pub use show::{NewShow, Show};
pub use track::{NewTrack, Track};
