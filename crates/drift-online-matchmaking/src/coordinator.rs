//! The search coordinator: owns the one search that may be in flight.
//!
//! Two kinds of search share a single slot:
//!
//! - **Find sessions**: one `GetActiveMatches` request, one result per
//!   running match.
//! - **Matchmaking**: join the match queue, then poll it through a
//!   [`MatchQueueClient`] until the backend places us or gives up.
//!
//! The coordinator never fires notifications itself. Each outcome is
//! queued as a [`SearchNotice`] and the owner collects them with
//! [`drain_notices`](SearchCoordinator::drain_notices) to broadcast.
//!
//! # Stale completions
//!
//! Nothing in flight can be aborted. Every backend request remembers the
//! [`SearchId`] it was sent for. If that search has since been replaced,
//! cancelled or finished, the completion is dropped with a debug log.

use std::collections::HashMap;
use std::time::Duration;

use drift_online_backend::{
    BackendCompletion, BackendError, BackendLink, BackendRequest, Ticket,
};
use drift_online_types::{ActiveMatch, Dispatch, QueueStatus, SessionName};

use crate::{
    MatchQueueClient, MatchmakingConfig, MatchmakingQuery, SearchError, SearchId, SearchKind,
    SearchRequest, SearchResult, SearchState,
};

/// An outcome the owner should broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchNotice {
    MatchmakingComplete { session: SessionName, success: bool },
    CancelMatchmakingComplete { session: SessionName, success: bool },
    FindSessionsComplete { success: bool },
    CancelFindSessionsComplete { success: bool },
}

/// What an in-flight backend request was for.
#[derive(Debug, Clone)]
enum SearchOp {
    /// JoinQueue, InvitePlayer or AcceptInvite.
    EnterQueue(SearchId),
    Poll(SearchId),
    ActiveMatches(SearchId),
    LeaveQueue { search: SearchId, session: SessionName },
}

/// Single-threaded owner of the current search and queue client.
pub struct SearchCoordinator {
    config: MatchmakingConfig,
    current: Option<SearchRequest>,
    queue: Option<MatchQueueClient>,
    in_flight: HashMap<Ticket, SearchOp>,
    notices: Vec<SearchNotice>,
}

impl SearchCoordinator {
    pub fn new(config: MatchmakingConfig) -> Self {
        Self {
            config,
            current: None,
            queue: None,
            in_flight: HashMap::new(),
            notices: Vec::new(),
        }
    }

    /// The latest search, finished or not.
    pub fn current_search(&self) -> Option<&SearchRequest> {
        self.current.as_ref()
    }

    pub fn search_state(&self) -> SearchState {
        self.current
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(SearchState::NotStarted)
    }

    /// Results of the latest search. Empty until it is `Done`.
    pub fn results(&self) -> &[SearchResult] {
        self.current
            .as_ref()
            .map(|s| s.results.as_slice())
            .unwrap_or_default()
    }

    pub fn queue_client(&self) -> Option<&MatchQueueClient> {
        self.queue.as_ref()
    }

    /// Returns `true` if this ticket belongs to one of our requests.
    pub fn owns(&self, ticket: Ticket) -> bool {
        self.in_flight.contains_key(&ticket)
    }

    /// Takes every notice queued since the last call.
    pub fn drain_notices(&mut self) -> Vec<SearchNotice> {
        std::mem::take(&mut self.notices)
    }

    // -----------------------------------------------------------------------
    // Matchmaking
    // -----------------------------------------------------------------------

    /// Starts a match-queue search for `session`.
    ///
    /// Any search already in progress is superseded and reported as failed.
    ///
    /// # Errors
    /// [`SearchError::Backend`] if the queue request couldn't be sent. The
    /// new search is marked failed and its notice queued.
    pub fn start_matchmaking(
        &mut self,
        link: &BackendLink,
        session: SessionName,
        query: MatchmakingQuery,
    ) -> Result<Dispatch, SearchError> {
        self.supersede();

        let search = SearchRequest::start(SearchKind::Matchmaking(session.clone()));
        let search_id = search.id;
        self.current = Some(search);

        let request = if let Some(friend) = query.friend_id {
            BackendRequest::InvitePlayer { player: friend }
        } else if let Some(token) = query.invite_token {
            BackendRequest::AcceptInvite { token }
        } else {
            BackendRequest::JoinQueue
        };

        match link.submit(request) {
            Ok(ticket) => {
                tracing::info!(%session, search = %search_id, "matchmaking started");
                self.in_flight.insert(ticket, SearchOp::EnterQueue(search_id));
                Ok(Dispatch::Pending)
            }
            Err(e) => {
                tracing::warn!(%session, error = %e, "failed to start matchmaking");
                self.finish(SearchState::Failed);
                Err(e.into())
            }
        }
    }

    /// Leaves the match queue.
    ///
    /// Without a matchmaking search in progress there is nothing to leave
    /// and the cancel succeeds immediately.
    ///
    /// # Errors
    /// - [`SearchError::Backend`] if no backend is attached
    /// - [`SearchError::QueueNotLeavable`] if the backend client is not
    ///   queued (joining, leaving, already matched, ...)
    pub fn cancel_matchmaking(
        &mut self,
        link: &BackendLink,
        session: SessionName,
    ) -> Result<Dispatch, SearchError> {
        let search_id = match &self.current {
            Some(search) if search.is_in_progress() && search.is_matchmaking() => search.id,
            _ => {
                tracing::debug!(%session, "no matchmaking to cancel");
                self.notices
                    .push(SearchNotice::CancelMatchmakingComplete { session, success: true });
                return Ok(Dispatch::Complete);
            }
        };

        let Some(queue_state) = link.match_queue_state() else {
            tracing::warn!(%session, "failed to cancel matchmaking, match service unavailable");
            self.notices
                .push(SearchNotice::CancelMatchmakingComplete { session, success: false });
            return Err(SearchError::Backend(BackendError::Unavailable));
        };

        if !queue_state.can_leave() {
            tracing::warn!(%session, state = %queue_state, "match queue cannot be left now");
            self.notices
                .push(SearchNotice::CancelMatchmakingComplete { session, success: false });
            return Err(SearchError::QueueNotLeavable(queue_state));
        }

        match link.submit(BackendRequest::LeaveQueue) {
            Ok(ticket) => {
                self.in_flight.insert(
                    ticket,
                    SearchOp::LeaveQueue {
                        search: search_id,
                        session,
                    },
                );
                Ok(Dispatch::Pending)
            }
            Err(e) => {
                self.notices
                    .push(SearchNotice::CancelMatchmakingComplete { session, success: false });
                Err(e.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Find sessions
    // -----------------------------------------------------------------------

    /// Lists joinable matches.
    ///
    /// If a search is already in progress the request is ignored: it
    /// returns `Pending` and the running search keeps its state and
    /// results. Its own notice is the only one that fires.
    ///
    /// # Errors
    /// [`SearchError::Backend`] if the listing couldn't be requested.
    pub fn find_sessions(&mut self, link: &BackendLink) -> Result<Dispatch, SearchError> {
        if self.current.as_ref().is_some_and(SearchRequest::is_in_progress) {
            tracing::warn!("ignoring session search while one is pending");
            return Ok(Dispatch::Pending);
        }

        let search = SearchRequest::start(SearchKind::FindSessions);
        let search_id = search.id;
        self.current = Some(search);

        match link.submit(BackendRequest::GetActiveMatches) {
            Ok(ticket) => {
                tracing::debug!(search = %search_id, "session search started");
                self.in_flight.insert(ticket, SearchOp::ActiveMatches(search_id));
                Ok(Dispatch::Pending)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to start session search");
                self.finish(SearchState::Failed);
                Err(e.into())
            }
        }
    }

    /// Abandons an in-progress session search.
    ///
    /// The abandoned search reports failure first, then the cancel reports
    /// success. Its listing, if it still arrives, is ignored.
    ///
    /// # Errors
    /// [`SearchError::NothingToCancel`] if no session search is running.
    pub fn cancel_find_sessions(&mut self) -> Result<Dispatch, SearchError> {
        let cancellable = self
            .current
            .as_ref()
            .is_some_and(|s| s.is_in_progress() && s.kind == SearchKind::FindSessions);

        if !cancellable {
            tracing::warn!("can't cancel a session search that isn't in progress");
            self.notices
                .push(SearchNotice::CancelFindSessionsComplete { success: false });
            return Err(SearchError::NothingToCancel);
        }

        self.finish(SearchState::Failed);
        self.notices
            .push(SearchNotice::CancelFindSessionsComplete { success: true });
        Ok(Dispatch::Complete)
    }

    // -----------------------------------------------------------------------
    // Tick and completions
    // -----------------------------------------------------------------------

    /// Advances the queue poll timer and sends a poll when one is due.
    pub fn tick(&mut self, link: &BackendLink, dt: Duration) {
        let Some(search_id) = self.current.as_ref().map(|s| s.id) else {
            return;
        };
        let Some(queue) = self.queue.as_mut() else {
            return;
        };
        if !queue.tick(dt) {
            return;
        }
        match link.submit(BackendRequest::PollQueue) {
            Ok(ticket) => {
                queue.begin_poll();
                self.in_flight.insert(ticket, SearchOp::Poll(search_id));
            }
            // Retried on the next tick.
            Err(e) => tracing::debug!(error = %e, "match queue poll not sent"),
        }
    }

    /// Routes a completion to the request that produced it.
    ///
    /// Returns `false` if the ticket isn't ours.
    pub fn on_completion(&mut self, completion: BackendCompletion) -> bool {
        let Some(op) = self.in_flight.remove(&completion.ticket) else {
            return false;
        };
        let ticket = completion.ticket;
        let outcome = completion.outcome;

        match op {
            SearchOp::LeaveQueue { search, session } => {
                self.on_left_queue(search, session, outcome.is_ok());
            }
            SearchOp::EnterQueue(search) if self.is_live(search) => {
                self.on_entered_queue(outcome.is_ok());
            }
            SearchOp::Poll(search) if self.is_live(search) => {
                let polled = outcome.and_then(|r| r.into_queue_status());
                let changed = self.queue.as_mut().and_then(|q| q.on_poll_complete(polled));
                if let Some(status) = changed {
                    self.on_queue_status_changed(status);
                }
            }
            SearchOp::ActiveMatches(search) if self.is_live(search) => {
                self.on_active_matches(outcome.and_then(|r| r.into_active_matches()));
            }
            stale => {
                tracing::debug!(%ticket, op = ?stale, "ignoring completion for a stale search");
            }
        }
        true
    }

    fn on_entered_queue(&mut self, success: bool) {
        if success {
            tracing::info!("joined match queue");
            self.queue = Some(MatchQueueClient::new(self.config.poll_interval));
        } else {
            tracing::warn!("failed to join match queue");
            self.finish(SearchState::Failed);
        }
    }

    fn on_queue_status_changed(&mut self, status: QueueStatus) {
        match status {
            QueueStatus::Matched => {
                let result = self
                    .queue
                    .as_ref()
                    .and_then(MatchQueueClient::current_match)
                    .map(|m| SearchResult::from_queue_match(m, self.config.matched_session_capacity));
                match result {
                    Some(result) => {
                        tracing::info!(match_id = %result.match_id, "matchmaking found a match");
                        if let Some(search) = self.current.as_mut() {
                            search.results.push(result);
                        }
                        self.finish(SearchState::Done);
                    }
                    None => {
                        tracing::warn!("match queue reported a match without details");
                        self.finish(SearchState::Failed);
                    }
                }
            }
            QueueStatus::TimedOut | QueueStatus::Usurped => {
                tracing::info!(%status, "matchmaking ended without a match");
                self.finish(SearchState::Failed);
            }
            QueueStatus::Waiting | QueueStatus::None => {
                tracing::debug!(%status, "still waiting in match queue");
            }
        }
    }

    fn on_active_matches(&mut self, listing: Result<Vec<ActiveMatch>, BackendError>) {
        match listing {
            Ok(matches) => {
                if let Some(search) = self.current.as_mut() {
                    search.results = matches.iter().map(SearchResult::from_active_match).collect();
                    tracing::debug!(found = search.results.len(), "session search complete");
                }
                self.finish(SearchState::Done);
            }
            Err(e) => {
                tracing::warn!(error = %e, "session search failed");
                self.finish(SearchState::Failed);
            }
        }
    }

    fn on_left_queue(&mut self, search: SearchId, session: SessionName, success: bool) {
        if success {
            tracing::info!(%session, "left match queue");
            // A newer search owns the current queue client.
            if self.is_live(search) {
                self.queue = None;
                self.finish(SearchState::Failed);
            }
        } else {
            tracing::warn!(%session, "failed to leave match queue");
        }
        self.notices
            .push(SearchNotice::CancelMatchmakingComplete { session, success });
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// `true` if `search` is the current search and still running.
    fn is_live(&self, search: SearchId) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.id == search && s.is_in_progress())
    }

    /// Fails a running search so a new one can take its place.
    fn supersede(&mut self) {
        if self.current.as_ref().is_some_and(SearchRequest::is_in_progress) {
            tracing::debug!("superseding in-progress search");
            self.finish(SearchState::Failed);
        }
        self.queue = None;
    }

    /// Moves the running search to a final state and queues its notice.
    ///
    /// Ending a matchmaking search also drops the queue client.
    fn finish(&mut self, state: SearchState) {
        let Some(search) = self.current.as_mut() else {
            return;
        };
        if !search.is_in_progress() {
            return;
        }
        search.state = state;
        let success = state == SearchState::Done;
        let notice = match &search.kind {
            SearchKind::FindSessions => SearchNotice::FindSessionsComplete { success },
            SearchKind::Matchmaking(session) => {
                self.queue = None;
                SearchNotice::MatchmakingComplete {
                    session: session.clone(),
                    success,
                }
            }
        };
        self.notices.push(notice);
    }
}

impl Default for SearchCoordinator {
    fn default() -> Self {
        Self::new(MatchmakingConfig::default())
    }
}
