//! Per-conversation browsing state.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use dgm_core::model::Show;

use crate::transport::{ConversationId, MessageId};

/// Results shown per page.
pub const PAGE_SIZE: usize = 10;

/// What one conversation is looking at.
#[derive(Debug, Clone)]
pub struct Session {
    query: String,
    results: Vec<Show>,
    total: usize,
    page: usize,
    selected: Option<Show>,

    /// The live view message, deleted when the next view replaces it.
    pub last_outbound: Option<MessageId>,
    last_active: Instant,
}

impl Session {
    pub fn new(now: Instant) -> Self {
        Self {
            query: String::new(),
            results: Vec::new(),
            total: 0,
            page: 0,
            selected: None,
            last_outbound: None,
            last_active: now,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[Show] {
        &self.results
    }

    /// Match count reported by the index.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Zero-based current page.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn selected(&self) -> Option<&Show> {
        self.selected.as_ref()
    }

    pub fn page_count(&self) -> usize {
        self.results.len().div_ceil(PAGE_SIZE)
    }

    /// The shows on the current page with their indexes into the full
    /// result list.
    pub fn current_page(&self) -> impl Iterator<Item = (usize, &Show)> {
        self.results
            .iter()
            .enumerate()
            .skip(self.page * PAGE_SIZE)
            .take(PAGE_SIZE)
    }

    /// Start over with a new result set: first page, nothing selected.
    pub fn set_results(&mut self, query: impl Into<String>, results: Vec<Show>, total: usize) {
        self.query = query.into();
        self.results = results;
        self.total = total;
        self.page = 0;
        self.selected = None;
    }

    /// Move to the next page. Returns `false` on the last page.
    pub fn next_page(&mut self) -> bool {
        if self.page + 1 < self.page_count() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Select a result by its index in the full list.
    pub fn select_result(&mut self, index: usize) -> Option<&Show> {
        let show = self.results.get(index)?.clone();
        self.selected = Some(show);
        self.selected.as_ref()
    }

    pub fn select(&mut self, show: Show) {
        self.selected = Some(show);
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_active = now;
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_active)
    }
}

/// Sessions keyed by conversation, dropped after a period of inactivity.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<ConversationId, Session>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
        }
    }

    /// The session for `conversation`, created on first use and marked
    /// active at `now`.
    pub fn session(&mut self, conversation: &ConversationId, now: Instant) -> &mut Session {
        let session = self
            .sessions
            .entry(conversation.clone())
            .or_insert_with(|| Session::new(now));
        session.touch(now);
        session
    }

    pub fn get(&self, conversation: &ConversationId) -> Option<&Session> {
        self.sessions.get(conversation)
    }

    /// Drop sessions idle longer than the timeout; returns how many went.
    pub fn evict_idle(&mut self, now: Instant) -> usize {
        let before = self.sessions.len();
        let timeout = self.idle_timeout;
        self.sessions
            .retain(|_, session| session.idle_for(now) <= timeout);

        let evicted = before - self.sessions.len();
        if evicted > 0 {
            log::debug!("Evicted {} idle sessions", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
