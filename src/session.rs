// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Search session controller: query and pagination state.
//!
//! Owns the current query string and result-page size, and decides what each
//! input event means: a new query resets pagination to the initial page size,
//! re-entering the same query keeps it, clearing the input resets everything
//! and clears the shareable URL's `q` parameter, and "load more" doubles the
//! page size without touching the URL.
//!
//! The controller never touches a text field or a location bar. It returns
//! plans ([`InputPlan`]) and outcomes ([`SearchOutcome`]) as plain data, with
//! URL effects expressed as [`UrlAction`] values, so the whole state machine
//! is testable without a page context.
//!
//! ## Request sequencing
//!
//! A rapid keystroke burst can have several searches in flight at once, and
//! their completions can arrive out of order. Every planned search carries a
//! monotonically increasing [`Ticket`]; [`SessionController::complete`]
//! discards any completion whose ticket is no longer the latest, so a slow
//! response for an old query can never overwrite fresh results.

use crate::protocol::{decode_page, ProtocolError, SearchResultPage};
use serde::Serialize;
use std::fmt;

/// Page size for a fresh query; doubles on every "load more".
pub const INITIAL_MAX_RESULTS: usize = 12;

/// The session's shared mutable state, mutated only by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub current_query: String,
    pub current_max_results: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState {
            current_query: String::new(),
            current_max_results: INITIAL_MAX_RESULTS,
        }
    }
}

/// Identifies one issued search; stale tickets are discarded on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Effect to apply to the shareable URL, via history replacement only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlAction {
    /// Set the `q` query parameter.
    Set(String),
    /// Remove the `q` query parameter.
    Clear,
}

/// What an input event asks the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPlan {
    /// Input was cleared: drop results, show the explanation panel, clear `q`.
    Clear { url_action: UrlAction },
    /// Run a search.
    Search(SearchRequest),
}

/// One planned engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub ticket: Ticket,
    /// `Some` for typed input (keeps the URL shareable); `None` for
    /// "load more", which never touches the URL.
    pub url_action: Option<UrlAction>,
}

/// A completed, still-current search ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub query: String,
    pub limit: usize,
    pub page: SearchResultPage,
    /// True when the page came back full, meaning there may be more results.
    pub can_load_more: bool,
}

/// Result of driving a synchronous engine end to end.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// Input was cleared.
    Cleared { url_action: UrlAction },
    /// Fresh results to render.
    Results {
        outcome: SearchOutcome,
        url_action: Option<UrlAction>,
    },
    /// The completion lost a race with a newer request; render nothing.
    Stale,
}

/// The external search engine, reached over its JSON string interface.
pub trait SearchEngine {
    fn search(&self, query: &str, limit: usize) -> Result<String, EngineError>;
}

/// Failure reported by the engine itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub detail: String,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine search failed: {}", self.detail)
    }
}

impl std::error::Error for EngineError {}

/// Error type for a failed search round-trip.
#[derive(Debug)]
pub enum SessionError {
    Engine(EngineError),
    Protocol(ProtocolError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Engine(err) => err.fmt(f),
            SessionError::Protocol(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Engine(err) => Some(err),
            SessionError::Protocol(err) => Some(err),
        }
    }
}

/// The state machine over [`SessionState`].
#[derive(Debug, Default)]
pub struct SessionController {
    state: SessionState,
    next_ticket: u64,
    /// Ticket of the most recently planned search; completions with any
    /// other ticket are stale.
    latest: Option<Ticket>,
}

impl SessionController {
    pub fn new() -> Self {
        SessionController::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Apply one input event to the state and plan what to do.
    ///
    /// On page load, a URL `q` parameter is fed through here before any
    /// keystroke, so a shared link searches immediately.
    pub fn plan_input(&mut self, text: &str) -> InputPlan {
        if text.is_empty() {
            self.state = SessionState::default();
            // Invalidate anything still in flight.
            self.latest = None;
            return InputPlan::Clear {
                url_action: UrlAction::Clear,
            };
        }

        if text != self.state.current_query {
            self.state.current_query = text.to_string();
            self.state.current_max_results = INITIAL_MAX_RESULTS;
        }

        InputPlan::Search(SearchRequest {
            query: self.state.current_query.clone(),
            limit: self.state.current_max_results,
            ticket: self.issue_ticket(),
            url_action: Some(UrlAction::Set(self.state.current_query.clone())),
        })
    }

    /// Double the page size and plan a re-search of the current query.
    ///
    /// Hosts only offer this when the last outcome had `can_load_more` set.
    /// Returns `None` with no active query.
    pub fn plan_load_more(&mut self) -> Option<SearchRequest> {
        if self.state.current_query.is_empty() {
            return None;
        }
        self.state.current_max_results *= 2;
        Some(SearchRequest {
            query: self.state.current_query.clone(),
            limit: self.state.current_max_results,
            ticket: self.issue_ticket(),
            url_action: None,
        })
    }

    /// Decode a finished search. Returns `Ok(None)` when the request's
    /// ticket is stale, i.e. a newer plan superseded it while in flight.
    pub fn complete(
        &self,
        request: &SearchRequest,
        engine_json: &str,
    ) -> Result<Option<SearchOutcome>, SessionError> {
        if self.latest != Some(request.ticket) {
            tracing::debug!(query = %request.query, "dropping stale search completion");
            return Ok(None);
        }
        let page = decode_page(engine_json).map_err(SessionError::Protocol)?;
        let can_load_more = page.results.len() == request.limit;
        Ok(Some(SearchOutcome {
            query: request.query.clone(),
            limit: request.limit,
            page,
            can_load_more,
        }))
    }

    /// Drive a synchronous engine through one input event.
    pub fn handle_input<E: SearchEngine>(
        &mut self,
        engine: &E,
        text: &str,
    ) -> Result<SessionUpdate, SessionError> {
        match self.plan_input(text) {
            InputPlan::Clear { url_action } => Ok(SessionUpdate::Cleared { url_action }),
            InputPlan::Search(request) => self.run(engine, request),
        }
    }

    /// Drive a synchronous engine through one "load more" action.
    pub fn load_more<E: SearchEngine>(
        &mut self,
        engine: &E,
    ) -> Result<Option<SessionUpdate>, SessionError> {
        match self.plan_load_more() {
            Some(request) => self.run(engine, request).map(Some),
            None => Ok(None),
        }
    }

    fn run<E: SearchEngine>(
        &mut self,
        engine: &E,
        request: SearchRequest,
    ) -> Result<SessionUpdate, SessionError> {
        let json = engine
            .search(&request.query, request.limit)
            .map_err(SessionError::Engine)?;
        match self.complete(&request, &json)? {
            Some(outcome) => Ok(SessionUpdate::Results {
                outcome,
                url_action: request.url_action,
            }),
            None => Ok(SessionUpdate::Stale),
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.latest = Some(ticket);
        ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Engine that always returns exactly `limit` entries.
    struct FullPageEngine;

    fn page_json(count: usize) -> String {
        let entry = json!({
            "characters": "老師",
            "jyutping": "lou5 si1",
            "english_definitions": ["teacher"],
            "entry_source": "CEDict",
        });
        json!({
            "results": vec![entry; count],
            "timings": {"total_ms": 1},
        })
        .to_string()
    }

    impl SearchEngine for FullPageEngine {
        fn search(&self, _query: &str, limit: usize) -> Result<String, EngineError> {
            Ok(page_json(limit))
        }
    }

    /// Engine that always returns a fixed number of entries.
    struct FixedEngine(usize);

    impl SearchEngine for FixedEngine {
        fn search(&self, _query: &str, _limit: usize) -> Result<String, EngineError> {
            Ok(page_json(self.0))
        }
    }

    #[test]
    fn new_query_starts_at_initial_limit() {
        let mut session = SessionController::new();
        match session.plan_input("lou5") {
            InputPlan::Search(request) => {
                assert_eq!(request.query, "lou5");
                assert_eq!(request.limit, 12);
                assert_eq!(request.url_action, Some(UrlAction::Set("lou5".to_string())));
            }
            other => panic!("expected search plan, got {:?}", other),
        }
    }

    #[test]
    fn load_more_doubles_strictly() {
        let mut session = SessionController::new();
        let engine = FullPageEngine;
        session.handle_input(&engine, "lou5").unwrap();

        let mut limits = vec![session.state().current_max_results];
        for _ in 0..3 {
            match session.load_more(&engine).unwrap() {
                Some(SessionUpdate::Results { outcome, url_action }) => {
                    assert!(outcome.can_load_more);
                    assert_eq!(url_action, None, "load more must not touch the URL");
                    limits.push(outcome.limit);
                }
                other => panic!("expected results, got {:?}", other),
            }
        }
        assert_eq!(limits, vec![12, 24, 48, 96]);
    }

    #[test]
    fn changed_query_resets_limit() {
        let mut session = SessionController::new();
        let engine = FullPageEngine;
        session.handle_input(&engine, "lou5").unwrap();
        session.load_more(&engine).unwrap();
        session.load_more(&engine).unwrap();
        assert_eq!(session.state().current_max_results, 48);

        session.handle_input(&engine, "si1").unwrap();
        assert_eq!(session.state().current_max_results, 12);
        assert_eq!(session.state().current_query, "si1");
    }

    #[test]
    fn same_query_keeps_limit() {
        let mut session = SessionController::new();
        let engine = FullPageEngine;
        session.handle_input(&engine, "lou5").unwrap();
        session.load_more(&engine).unwrap();

        match session.handle_input(&engine, "lou5").unwrap() {
            SessionUpdate::Results { outcome, .. } => assert_eq!(outcome.limit, 24),
            other => panic!("expected results, got {:?}", other),
        }
    }

    #[test]
    fn cleared_input_resets_state_and_url() {
        let mut session = SessionController::new();
        let engine = FullPageEngine;
        session.handle_input(&engine, "lou5").unwrap();

        match session.handle_input(&engine, "").unwrap() {
            SessionUpdate::Cleared { url_action } => assert_eq!(url_action, UrlAction::Clear),
            other => panic!("expected cleared, got {:?}", other),
        }
        assert_eq!(session.state(), &SessionState::default());
    }

    #[test]
    fn load_more_without_query_is_noop() {
        let mut session = SessionController::new();
        assert_eq!(session.load_more(&FullPageEngine).unwrap(), None);
        assert_eq!(session.state().current_max_results, 12);
    }

    #[test]
    fn partial_page_disables_load_more() {
        let mut session = SessionController::new();
        match session.handle_input(&FixedEngine(5), "lou5").unwrap() {
            SessionUpdate::Results { outcome, .. } => {
                assert_eq!(outcome.page.results.len(), 5);
                assert!(!outcome.can_load_more);
            }
            other => panic!("expected results, got {:?}", other),
        }
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut session = SessionController::new();
        let first = match session.plan_input("lou") {
            InputPlan::Search(request) => request,
            other => panic!("expected search plan, got {:?}", other),
        };
        let second = match session.plan_input("lou5") {
            InputPlan::Search(request) => request,
            other => panic!("expected search plan, got {:?}", other),
        };

        // The older response arrives late and must be dropped.
        assert_eq!(session.complete(&first, &page_json(12)).unwrap(), None);
        let outcome = session.complete(&second, &page_json(12)).unwrap();
        assert_eq!(outcome.unwrap().query, "lou5");
    }

    #[test]
    fn clearing_input_invalidates_in_flight_search() {
        let mut session = SessionController::new();
        let request = match session.plan_input("lou5") {
            InputPlan::Search(request) => request,
            other => panic!("expected search plan, got {:?}", other),
        };
        session.plan_input("");
        assert_eq!(session.complete(&request, &page_json(12)).unwrap(), None);
    }

    #[test]
    fn malformed_engine_payload_is_loud() {
        let mut session = SessionController::new();
        let request = match session.plan_input("lou5") {
            InputPlan::Search(request) => request,
            other => panic!("expected search plan, got {:?}", other),
        };
        let err = session.complete(&request, "not json").unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
    }

    #[test]
    fn legacy_bare_array_payload_is_accepted() {
        let mut session = SessionController::new();

        struct BareEngine;
        impl SearchEngine for BareEngine {
            fn search(&self, _query: &str, _limit: usize) -> Result<String, EngineError> {
                Ok(r#"[{
                    "characters": "係",
                    "jyutping": "hai6",
                    "english_definitions": ["to be"],
                    "entry_source": "CCanto"
                }]"#
                .to_string())
            }
        }

        match session.handle_input(&BareEngine, "hai").unwrap() {
            SessionUpdate::Results { outcome, .. } => {
                assert_eq!(outcome.page.results.len(), 1);
            }
            other => panic!("expected results, got {:?}", other),
        }
    }
}
