//! Turning commands into replies against a conversation's session.

use dgm_core::model::{DgmId, Show};

use crate::catalog::Catalog;
use crate::command::{self, Command};
use crate::error::DispatchError;
use crate::reply::Reply;
use crate::session::Session;
use crate::view;

/// Shown when the catalog fails mid-session.
pub const UNAVAILABLE_TEXT: &str = "The show catalog is unavailable right now, try again later";

type Dispatched = Result<Option<Reply>, DispatchError>;

/// Runs commands for one bot. Holds no per-conversation state; that lives in
/// the [`Session`] passed to [`Dispatcher::handle`].
#[derive(Debug)]
pub struct Dispatcher<C> {
    catalog: C,
    prefix: String,
    base_url: String,
}

impl<C: Catalog> Dispatcher<C> {
    pub fn new(catalog: C, prefix: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            catalog,
            prefix: prefix.into(),
            base_url: base_url.into(),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Handle one inbound message.
    ///
    /// Returns `None` when the message is not a command or the command has
    /// nothing to say. Errors become notices here; a failed command leaves
    /// the session as it was.
    pub fn handle(&self, session: &mut Session, text: &str) -> Option<Reply> {
        let command = command::parse(&self.prefix, text)?;
        log::debug!("Dispatching {:?}", command);

        match self.run(session, command) {
            Ok(reply) => reply,
            Err(DispatchError::Guidance(text)) => Some(Reply::guidance(text)),
            Err(DispatchError::Catalog(e)) => {
                log::error!("Catalog failure: {}", e);
                Some(Reply::unavailable(UNAVAILABLE_TEXT))
            }
        }
    }

    fn run(&self, session: &mut Session, command: Command) -> Dispatched {
        match command {
            Command::Id(arg) => self.by_id(session, &arg),
            Command::Search(query) => self.search(session, query),
            Command::Next => Ok(Self::next(session)),
            Command::Select(arg) => self.select(session, &arg),
            Command::Tracks => self.tracks(session),
            Command::Lineup => self.lineup(session),
            Command::Help => Ok(Some(Reply::View(view::help(&self.prefix)))),
        }
    }

    fn detail(&self, show: &Show) -> Option<Reply> {
        Some(Reply::View(view::show_detail(show, &self.base_url)))
    }

    fn by_id(&self, session: &mut Session, arg: &str) -> Dispatched {
        if arg.is_empty() {
            return Err(DispatchError::guidance("You have to enter an id"));
        }
        let dgm_id: DgmId = arg
            .parse()
            .map_err(|_| DispatchError::guidance(format!("'{arg}' is not a valid id")))?;

        let show = self
            .catalog
            .show_by_dgm_id(dgm_id)?
            .ok_or_else(|| DispatchError::guidance(format!("No show with id {dgm_id}")))?;

        let reply = self.detail(&show);
        session.select(show);
        Ok(reply)
    }

    fn search(&self, session: &mut Session, query: String) -> Dispatched {
        if query.is_empty() {
            return Err(DispatchError::guidance("You have to enter a search query"));
        }

        let hits = self.catalog.search(&query)?;
        log::info!("Search '{}' matched {} shows", query, hits.total);

        if hits.is_empty() {
            let reply = Reply::View(view::no_results(&query));
            session.set_results(query, Vec::new(), 0);
            return Ok(Some(reply));
        }

        let single = hits.shows.len() == 1;
        session.set_results(query, hits.shows, hits.total);
        if single {
            let show = session.select_result(0).cloned();
            return Ok(show.and_then(|show| self.detail(&show)));
        }
        Ok(Some(Reply::View(view::results_page(session))))
    }

    fn next(session: &mut Session) -> Option<Reply> {
        if !session.has_results() {
            return Some(Reply::guidance("You have to search for something first"));
        }
        session
            .next_page()
            .then(|| Reply::View(view::results_page(session)))
    }

    fn select(&self, session: &mut Session, arg: &str) -> Dispatched {
        if !session.has_results() {
            return Err(DispatchError::guidance("You have to search for something first"));
        }
        if arg.is_empty() {
            return Err(DispatchError::guidance("You have to enter a result number"));
        }

        let count = session.results().len();
        let index: usize = arg.parse().map_err(|_| {
            DispatchError::guidance(format!("'{arg}' is not a result number"))
        })?;
        let show = session.select_result(index).cloned().ok_or_else(|| {
            DispatchError::guidance(format!(
                "There is no result {index}, pick one from 0 to {}",
                count - 1
            ))
        })?;

        Ok(self.detail(&show))
    }

    fn selected(session: &Session) -> Result<&Show, DispatchError> {
        session
            .selected()
            .ok_or_else(|| DispatchError::guidance("You have to select a show first"))
    }

    fn tracks(&self, session: &Session) -> Dispatched {
        let show = Self::selected(session)?;
        let tracks = self.catalog.tracks(show.id)?;
        if tracks.is_empty() {
            return Err(DispatchError::guidance("No documented setlist for this show"));
        }
        Ok(Some(Reply::View(view::tracklist(show, &tracks))))
    }

    fn lineup(&self, session: &Session) -> Dispatched {
        let show = Self::selected(session)?;
        let members = self.catalog.members(show.id)?;
        if members.is_empty() {
            return Err(DispatchError::guidance("No documented lineup for this show"));
        }
        Ok(Some(Reply::View(view::lineup(show, &members))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CatalogError, CatalogResult};
    use crate::reply::NoticeKind;
    use chrono::NaiveDate;
    use dgm_core::model::{Member, ShowId, Track, TrackId};
    use dgm_search::SearchHits;
    use std::time::Instant;

    fn show(n: u32) -> Show {
        Show {
            id: ShowId::from_raw(i64::from(n)),
            dgm_id: DgmId::new(n),
            venue: format!("Venue {n}"),
            location: "London, England".to_string(),
            date: NaiveDate::from_ymd_opt(1995, 6, 12).unwrap(),
            date_friendly: "12 Jun 1995".to_string(),
            quality_rating: Some(2),
            description: None,
            source: None,
            cover: None,
            has_download: false,
        }
    }

    /// `count` shows matching everything; show 1 has a track.
    struct FakeCatalog {
        count: u32,
        broken: bool,
    }

    impl Catalog for FakeCatalog {
        fn search(&self, _text: &str) -> CatalogResult<SearchHits> {
            if self.broken {
                return Err(CatalogError::Store(dgm_core::Error::Io(std::io::Error::other("disk gone"))));
            }
            Ok(SearchHits {
                shows: (1..=self.count).map(show).collect(),
                total: self.count as usize,
            })
        }

        fn show_by_dgm_id(&self, dgm_id: DgmId) -> CatalogResult<Option<Show>> {
            Ok((dgm_id.get() <= self.count).then(|| show(dgm_id.get())))
        }

        fn tracks(&self, show: ShowId) -> CatalogResult<Vec<Track>> {
            Ok(if show.as_i64() == 1 {
                vec![Track {
                    id: TrackId::from_raw(1),
                    show_id: show,
                    position: 1,
                    number: "1".to_string(),
                    name: "Red".to_string(),
                    length_secs: Some(380),
                }]
            } else {
                Vec::new()
            })
        }

        fn members(&self, _show: ShowId) -> CatalogResult<Vec<Member>> {
            Ok(Vec::new())
        }
    }

    fn dispatcher(count: u32) -> Dispatcher<FakeCatalog> {
        Dispatcher::new(
            FakeCatalog {
                count,
                broken: false,
            },
            "$",
            "https://www.dgmlive.com/tour-dates/",
        )
    }

    fn guidance(reply: Option<Reply>) -> String {
        match reply {
            Some(Reply::Notice(notice)) if notice.kind == NoticeKind::Guidance => notice.text,
            other => panic!("expected guidance, got {other:?}"),
        }
    }

    fn title(reply: Option<Reply>) -> String {
        reply.and_then(|r| r.as_view().cloned()).unwrap().title
    }

    #[test]
    fn test_search_then_next() {
        let dispatcher = dispatcher(25);
        let mut session = Session::new(Instant::now());

        let reply = dispatcher.handle(&mut session, "$search london");
        assert_eq!(title(reply), "Shows matching 'london' (1/3)");

        assert_eq!(
            title(dispatcher.handle(&mut session, "$next")),
            "Shows matching 'london' (2/3)"
        );
        assert_eq!(
            title(dispatcher.handle(&mut session, "$next")),
            "Shows matching 'london' (3/3)"
        );
        assert!(dispatcher.handle(&mut session, "$next").is_none());
        assert_eq!(session.page(), 2);
    }

    #[test]
    fn test_single_result_selects_it() {
        let dispatcher = dispatcher(1);
        let mut session = Session::new(Instant::now());

        let reply = dispatcher.handle(&mut session, "$search venue");
        assert_eq!(title(reply), "Venue 1, London, England");
        assert_eq!(session.selected().map(|s| s.dgm_id), Some(DgmId::new(1)));
    }

    #[test]
    fn test_zero_results_is_a_view() {
        let dispatcher = dispatcher(0);
        let mut session = Session::new(Instant::now());

        let reply = dispatcher.handle(&mut session, "$search nowhere");
        assert_eq!(title(reply), "No shows matching 'nowhere'");
        assert!(!session.has_results());
    }

    #[test]
    fn test_commands_needing_state() {
        let dispatcher = dispatcher(3);
        let mut session = Session::new(Instant::now());

        assert_eq!(
            guidance(dispatcher.handle(&mut session, "$next")),
            "You have to search for something first"
        );
        assert_eq!(
            guidance(dispatcher.handle(&mut session, "$select 1")),
            "You have to search for something first"
        );
        assert_eq!(
            guidance(dispatcher.handle(&mut session, "$tracks")),
            "You have to select a show first"
        );
        assert_eq!(
            guidance(dispatcher.handle(&mut session, "$members")),
            "You have to select a show first"
        );
        assert_eq!(
            guidance(dispatcher.handle(&mut session, "$search")),
            "You have to enter a search query"
        );
    }

    #[test]
    fn test_select_out_of_range_keeps_state() {
        let dispatcher = dispatcher(3);
        let mut session = Session::new(Instant::now());
        dispatcher.handle(&mut session, "$search london");
        dispatcher.handle(&mut session, "$select 1");

        let text = guidance(dispatcher.handle(&mut session, "$select 5"));
        assert!(text.contains("no result 5"));
        guidance(dispatcher.handle(&mut session, "$select two"));
        guidance(dispatcher.handle(&mut session, "$select"));
        assert_eq!(session.selected().map(|s| s.dgm_id), Some(DgmId::new(2)));
    }

    #[test]
    fn test_tracks_and_empty_lineup() {
        let dispatcher = dispatcher(3);
        let mut session = Session::new(Instant::now());
        dispatcher.handle(&mut session, "$id 1");

        assert_eq!(
            title(dispatcher.handle(&mut session, "$tracks")),
            "Venue 1, London, England - Setlist"
        );
        assert_eq!(
            guidance(dispatcher.handle(&mut session, "$lineup")),
            "No documented lineup for this show"
        );

        dispatcher.handle(&mut session, "$id 2");
        assert_eq!(
            guidance(dispatcher.handle(&mut session, "$tracks")),
            "No documented setlist for this show"
        );
    }

    #[test]
    fn test_id_guidance() {
        let dispatcher = dispatcher(3);
        let mut session = Session::new(Instant::now());

        assert_eq!(
            guidance(dispatcher.handle(&mut session, "$id")),
            "You have to enter an id"
        );
        assert_eq!(
            guidance(dispatcher.handle(&mut session, "$id 404")),
            "No show with id 404"
        );
        guidance(dispatcher.handle(&mut session, "$id abc"));
        assert!(session.selected().is_none());
    }

    #[test]
    fn test_help_and_unknown() {
        let dispatcher = dispatcher(0);
        let mut session = Session::new(Instant::now());

        assert_eq!(title(dispatcher.handle(&mut session, "$help")), "Help");
        assert!(dispatcher.handle(&mut session, "$dance").is_none());
        assert!(dispatcher.handle(&mut session, "hello there").is_none());
    }

    #[test]
    fn test_catalog_failure_is_not_guidance() {
        let dispatcher = Dispatcher::new(
            FakeCatalog {
                count: 3,
                broken: true,
            },
            "$",
            "",
        );
        let mut session = Session::new(Instant::now());

        let reply = dispatcher.handle(&mut session, "$search london").unwrap();
        let notice = reply.as_notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Unavailable);
        assert_eq!(notice.text, UNAVAILABLE_TEXT);
        assert!(!session.has_results());
    }
}
