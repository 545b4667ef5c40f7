//! The session interface: named-session lifecycle plus search.
//!
//! ```text
//!            create_session            AddMatch done
//!  NoSession ─────────────► Creating ───────────────► Pending
//!                                                       │ start_session
//!                     end_session                       ▼
//!            Ended ◄───────────────────────────── InProgress
//!              │  start_session (rematch)                ▲
//!              └─────────────────────────────────────────┘
//!
//!  destroy_session: any state ──► NoSession (row removed immediately)
//! ```
//!
//! Every operation returns `Result<Dispatch, DriftError>` and fires its
//! delegate exactly once. `Dispatch::Complete` means the delegate already
//! fired; `Dispatch::Pending` means it fires on a later [`tick`] when the
//! backend answers. On `Err` the failure notification has already fired.
//!
//! [`tick`]: OnlineSessionDrift::tick

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use drift_online_backend::{
    BackendError, BackendLink, BackendRequest, BackendResponse, MatchBackend, Ticket,
    match_status, server_status,
};
use drift_online_matchmaking::{
    MatchmakingQuery, SearchCoordinator, SearchNotice, SearchResult, SearchState,
};
use drift_online_session::{
    NamedSession, SessionError, SessionInfo, SessionRegistry, SessionSettings, SessionState,
};
use drift_online_types::{Dispatch, PlayerId, SessionName};

use crate::delegate::{
    JoinOutcome, JoinSessionResult, PlayersOutcome, SessionDelegates, SessionOutcome,
};
use crate::{DriftConfig, DriftError};

/// Called once when a destroy finishes, with the session name and outcome.
pub type DestroyCallback = Box<dyn FnOnce(&SessionName, bool) + Send>;

/// Team every player is added to on the backend.
const DEFAULT_TEAM: u32 = 0;

// ---------------------------------------------------------------------------
// In-flight bookkeeping
// ---------------------------------------------------------------------------

/// What a session-level backend request was for.
enum SessionOp {
    /// AddMatch for a session in `Creating`. The id tells this row apart
    /// from a later session created under the same name.
    RegisterMatch {
        session: SessionName,
        session_id: String,
    },
    /// UpdateMatch("completed") for a destroyed session.
    CompleteMatch {
        session: SessionName,
        on_complete: Option<DestroyCallback>,
    },
    /// One player of a register/unregister batch.
    BatchMember(BatchId),
    /// Status updates nobody waits for.
    FireAndForget(&'static str),
}

impl fmt::Debug for SessionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegisterMatch { session, session_id } => {
                write!(f, "RegisterMatch({session}, {session_id})")
            }
            Self::CompleteMatch { session, .. } => write!(f, "CompleteMatch({session})"),
            Self::BatchMember(batch) => write!(f, "BatchMember({})", batch.0),
            Self::FireAndForget(kind) => write!(f, "FireAndForget({kind})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BatchId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchKind {
    Register,
    Unregister,
}

/// A register/unregister call whose notification waits on the backend.
#[derive(Debug)]
struct PlayerBatch {
    kind: BatchKind,
    session: SessionName,
    players: Vec<PlayerId>,
    outstanding: usize,
    success: bool,
}

// ---------------------------------------------------------------------------
// OnlineSessionDrift
// ---------------------------------------------------------------------------

/// Named sessions and searches on top of the Drift match service.
///
/// Single-threaded: every method takes `&mut self` and completions are
/// only processed inside [`tick`](Self::tick). The [`SessionRegistry`] is
/// the one piece that can be shared with other threads.
pub struct OnlineSessionDrift {
    config: DriftConfig,
    registry: Arc<SessionRegistry>,
    link: BackendLink,
    search: SearchCoordinator,
    in_flight: HashMap<Ticket, SessionOp>,
    batches: HashMap<BatchId, PlayerBatch>,
    next_batch: u64,
    delegates: SessionDelegates,
}

impl OnlineSessionDrift {
    pub fn new(config: DriftConfig, registry: Arc<SessionRegistry>, link: BackendLink) -> Self {
        let search = SearchCoordinator::new(config.matchmaking());
        Self {
            config,
            registry,
            link,
            search,
            in_flight: HashMap::new(),
            batches: HashMap::new(),
            next_batch: 1,
            delegates: SessionDelegates::default(),
        }
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// A shared handle to the session registry.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn delegates(&self) -> &SessionDelegates {
        &self.delegates
    }

    /// Subscribe and unsubscribe here.
    pub fn delegates_mut(&mut self) -> &mut SessionDelegates {
        &mut self.delegates
    }

    pub fn attach_backend(&mut self, backend: Arc<dyn MatchBackend>) {
        self.link.attach(backend);
    }

    /// Requests already in flight still complete on later ticks.
    pub fn detach_backend(&mut self) {
        self.link.detach();
    }

    pub fn is_backend_available(&self) -> bool {
        self.link.is_available()
    }

    fn is_dedicated_server(&self) -> bool {
        self.config.role.is_dedicated_server()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Creates a session hosted by `host` (local user 0).
    pub fn create_session(
        &mut self,
        host: PlayerId,
        name: SessionName,
        settings: SessionSettings,
    ) -> Result<Dispatch, DriftError> {
        self.create_session_for(0, host, name, settings)
    }

    /// Creates a session and registers its match with the backend.
    ///
    /// The session is added in `Creating` right away and moves to `Pending`
    /// when the backend answers. The create delegate fires then.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyExists`] if the name is taken. The existing
    ///   session is left alone.
    /// - [`DriftError::BackendUnavailable`] without a backend. The new
    ///   session is removed again.
    pub fn create_session_for(
        &mut self,
        player_num: usize,
        host: PlayerId,
        name: SessionName,
        mut settings: SessionSettings,
    ) -> Result<Dispatch, DriftError> {
        settings.build_unique_id = self.config.build_unique_id;
        let request = BackendRequest::AddMatch {
            map_name: settings.map_name().to_owned(),
            game_mode: settings.game_mode().to_owned(),
            num_teams: settings.num_teams().unwrap_or(self.config.default_num_teams),
            max_players: settings.num_public_connections,
        };

        let info = SessionInfo::generate();
        let session_id = info.session_id.clone();
        let mut session = NamedSession::new(name.clone(), settings).with_host(host, player_num);
        session.session_info = Some(info);

        if let Err(e) = self.registry.add(session) {
            tracing::warn!(session = %name, "cannot create session, name already in use");
            return Err(self.fail_session_op(Op::Create, name, e.into()));
        }

        match self.link.submit(request) {
            Ok(ticket) => {
                tracing::info!(session = %name, %ticket, "session created, registering match");
                self.in_flight.insert(
                    ticket,
                    SessionOp::RegisterMatch {
                        session: name,
                        session_id,
                    },
                );
                Ok(Dispatch::Pending)
            }
            Err(e) => {
                tracing::warn!(session = %name, error = %e, "cannot register match");
                self.registry.remove(&name);
                Err(self.fail_session_op(Op::Create, name, e.into()))
            }
        }
    }

    /// Moves a `Pending` or `Ended` session to `InProgress`.
    ///
    /// With a backend attached this also reports the server as running and
    /// the match as started. Nobody waits for those answers.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] or [`SessionError::InvalidState`]. The
    /// state is unchanged.
    pub fn start_session(&mut self, name: &SessionName) -> Result<Dispatch, DriftError> {
        self.transition(Op::Start, name, SessionState::can_start, SessionState::InProgress)?;

        if self.link.is_available() {
            self.fire_and_forget(BackendRequest::update_server(server_status::RUNNING));
            self.fire_and_forget(BackendRequest::update_match(match_status::STARTED));
        }
        self.delegates
            .start
            .broadcast(&SessionOutcome::new(name.clone(), true));
        Ok(Dispatch::Complete)
    }

    /// Replaces a session's settings.
    ///
    /// # Errors
    /// [`SessionError::NotFound`], or
    /// [`SessionError::CapacityBelowRegistered`] if the new settings can't
    /// hold the players already registered.
    pub fn update_session(
        &mut self,
        name: &SessionName,
        mut settings: SessionSettings,
    ) -> Result<Dispatch, DriftError> {
        settings.build_unique_id = self.config.build_unique_id;
        let outcome = self
            .registry
            .with_session_mut(name, |session| session.rebase_settings(settings));

        match outcome {
            Some(Ok(())) => {
                tracing::info!(session = %name, "session settings updated");
                self.delegates
                    .update
                    .broadcast(&SessionOutcome::new(name.clone(), true));
                Ok(Dispatch::Complete)
            }
            Some(Err(e)) => {
                tracing::warn!(session = %name, error = %e, "session settings rejected");
                Err(self.fail_session_op(Op::Update, name.clone(), e.into()))
            }
            None => {
                tracing::warn!(session = %name, "cannot update missing session");
                Err(self.fail_session_op(Op::Update, name.clone(), not_found(name)))
            }
        }
    }

    /// Moves an `InProgress` session to `Ended`.
    ///
    /// A dedicated server also reports the match as ended.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] or [`SessionError::InvalidState`].
    pub fn end_session(&mut self, name: &SessionName) -> Result<Dispatch, DriftError> {
        self.transition(Op::End, name, SessionState::can_end, SessionState::Ended)?;

        if self.is_dedicated_server() && self.link.is_available() {
            self.fire_and_forget(BackendRequest::update_match(match_status::ENDED));
        }
        self.delegates
            .end
            .broadcast(&SessionOutcome::new(name.clone(), true));
        Ok(Dispatch::Complete)
    }

    /// Removes a session. See [`destroy_session_with`](Self::destroy_session_with).
    pub fn destroy_session(&mut self, name: &SessionName) -> Result<Dispatch, DriftError> {
        self.destroy_session_with(name, None)
    }

    /// Removes a session, calling `on_complete` once the destroy finishes.
    ///
    /// The session is gone from the registry as soon as this returns. A
    /// dedicated server with a backend then marks the match completed and
    /// finishes when that answer arrives; everyone else finishes inline.
    ///
    /// # Errors
    /// [`SessionError::NotFound`]. `on_complete` still runs, with `false`.
    pub fn destroy_session_with(
        &mut self,
        name: &SessionName,
        on_complete: Option<DestroyCallback>,
    ) -> Result<Dispatch, DriftError> {
        if self.registry.remove(name).is_none() {
            tracing::warn!(session = %name, "cannot destroy missing session");
            if let Some(callback) = on_complete {
                callback(name, false);
            }
            return Err(self.fail_session_op(Op::Destroy, name.clone(), not_found(name)));
        }

        if self.is_dedicated_server() {
            if let Ok(ticket) = self
                .link
                .submit(BackendRequest::update_match(match_status::COMPLETED))
            {
                tracing::info!(session = %name, %ticket, "session destroyed, completing match");
                self.in_flight.insert(
                    ticket,
                    SessionOp::CompleteMatch {
                        session: name.clone(),
                        on_complete,
                    },
                );
                return Ok(Dispatch::Pending);
            }
        }

        tracing::info!(session = %name, "session destroyed");
        self.finish_destroy(name, on_complete, true);
        Ok(Dispatch::Complete)
    }

    /// Joins a session found by a search (local user 0).
    pub fn join_session(
        &mut self,
        player: PlayerId,
        name: SessionName,
        result: &SearchResult,
    ) -> Result<Dispatch, DriftError> {
        self.join_session_for(0, player, name, result)
    }

    /// Records a session found by a search under `name`.
    ///
    /// The new session starts in `Pending` with the result's connection
    /// info, and the backend's match-queue entry is reset.
    ///
    /// # Errors
    /// [`DriftError::AlreadyInSession`] if `name` is taken.
    pub fn join_session_for(
        &mut self,
        player_num: usize,
        player: PlayerId,
        name: SessionName,
        result: &SearchResult,
    ) -> Result<Dispatch, DriftError> {
        let session = NamedSession::from_search_result(name.clone(), &result.session)
            .with_host(player, player_num);

        if self.registry.add(session).is_err() {
            tracing::warn!(session = %name, "already in a session with this name");
            self.delegates.join.broadcast(&JoinOutcome {
                session: name.clone(),
                result: JoinSessionResult::AlreadyInSession,
            });
            return Err(DriftError::AlreadyInSession(name));
        }

        self.link.reset_match_queue();
        tracing::info!(session = %name, match_id = %result.match_id, "joined session");
        self.delegates.join.broadcast(&JoinOutcome {
            session: name,
            result: JoinSessionResult::Success,
        });
        Ok(Dispatch::Complete)
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Registers players with a session, one slot each.
    ///
    /// Players already registered are skipped. A player that doesn't fit
    /// fails the batch but the others are still registered. A dedicated
    /// server adds each new player to the backend match, and the delegate
    /// waits for all of those answers.
    ///
    /// # Errors
    /// [`SessionError::NotFound`], or [`SessionError::SessionFull`] when a
    /// batch with nothing to wait for had a player that didn't fit.
    pub fn register_players(
        &mut self,
        name: &SessionName,
        players: &[PlayerId],
        was_invited: bool,
    ) -> Result<Dispatch, DriftError> {
        let registered = self.registry.with_session_mut(name, |session| {
            let mut added = Vec::new();
            let mut rejected = None;
            for &player in players {
                match session.register_player(player) {
                    Ok(true) => added.push(player),
                    Ok(false) => tracing::debug!(session = %name, %player, "player already registered"),
                    Err(e) => {
                        tracing::warn!(session = %name, %player, error = %e, "player rejected");
                        if rejected.is_none() {
                            rejected = Some(e);
                        }
                    }
                }
            }
            (added, rejected)
        });

        let Some((added, rejected)) = registered else {
            tracing::warn!(session = %name, "cannot register players with missing session");
            return Err(self.fail_players(BatchKind::Register, name, players, not_found(name)));
        };
        tracing::info!(
            session = %name,
            added = added.len(),
            was_invited,
            "players registered"
        );

        let requests = added
            .iter()
            .map(|&player| BackendRequest::AddPlayer {
                player,
                team: DEFAULT_TEAM,
            })
            .collect();
        self.finish_players(BatchKind::Register, name, players, requests, rejected)
    }

    /// Unregisters players, giving their slots back.
    ///
    /// Players that aren't registered only log a warning. A dedicated
    /// server removes each player from the backend match.
    ///
    /// # Errors
    /// [`SessionError::NotFound`].
    pub fn unregister_players(
        &mut self,
        name: &SessionName,
        players: &[PlayerId],
    ) -> Result<Dispatch, DriftError> {
        let removed = self.registry.with_session_mut(name, |session| {
            let mut removed = Vec::new();
            for &player in players {
                if session.unregister_player(player) {
                    removed.push(player);
                } else {
                    tracing::warn!(session = %name, %player, "player not registered");
                }
            }
            removed
        });

        let Some(removed) = removed else {
            tracing::warn!(session = %name, "cannot unregister players from missing session");
            return Err(self.fail_players(BatchKind::Unregister, name, players, not_found(name)));
        };
        tracing::info!(session = %name, removed = removed.len(), "players unregistered");

        let requests = removed
            .iter()
            .map(|&player| BackendRequest::RemovePlayer { player })
            .collect();
        self.finish_players(BatchKind::Unregister, name, players, requests, None)
    }

    /// Sends the per-player backend calls for a batch, or notifies inline
    /// when there is nothing to wait for.
    fn finish_players(
        &mut self,
        kind: BatchKind,
        name: &SessionName,
        players: &[PlayerId],
        requests: Vec<BackendRequest>,
        rejected: Option<SessionError>,
    ) -> Result<Dispatch, DriftError> {
        let mut batch = PlayerBatch {
            kind,
            session: name.clone(),
            players: players.to_vec(),
            outstanding: 0,
            success: rejected.is_none(),
        };

        if self.is_dedicated_server() && self.link.is_available() {
            let batch_id = BatchId(self.next_batch);
            for request in requests {
                match self.link.submit(request) {
                    Ok(ticket) => {
                        self.in_flight.insert(ticket, SessionOp::BatchMember(batch_id));
                        batch.outstanding += 1;
                    }
                    Err(e) => {
                        tracing::warn!(session = %name, error = %e, "player update not sent");
                        batch.success = false;
                    }
                }
            }
            if batch.outstanding > 0 {
                self.next_batch += 1;
                self.batches.insert(batch_id, batch);
                return Ok(Dispatch::Pending);
            }
        }

        let success = batch.success;
        self.notify_players(batch);
        match rejected {
            Some(e) => Err(e.into()),
            None if success => Ok(Dispatch::Complete),
            None => Err(DriftError::BackendUnavailable),
        }
    }

    fn fail_players(
        &mut self,
        kind: BatchKind,
        name: &SessionName,
        players: &[PlayerId],
        err: DriftError,
    ) -> DriftError {
        self.notify_players(PlayerBatch {
            kind,
            session: name.clone(),
            players: players.to_vec(),
            outstanding: 0,
            success: false,
        });
        err
    }

    fn notify_players(&mut self, batch: PlayerBatch) {
        let outcome = PlayersOutcome {
            session: batch.session,
            players: batch.players,
            success: batch.success,
        };
        match batch.kind {
            BatchKind::Register => self.delegates.register_players.broadcast(&outcome),
            BatchKind::Unregister => self.delegates.unregister_players.broadcast(&outcome),
        }
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Enters the match queue on behalf of `session`.
    ///
    /// # Errors
    /// [`DriftError::BackendUnavailable`] without a backend.
    pub fn start_matchmaking(
        &mut self,
        session: SessionName,
        query: MatchmakingQuery,
    ) -> Result<Dispatch, DriftError> {
        let result = self.search.start_matchmaking(&self.link, session, query);
        self.broadcast_search_notices();
        result.map_err(DriftError::from)
    }

    /// Leaves the match queue.
    ///
    /// # Errors
    /// [`DriftError::BackendUnavailable`], or
    /// [`SearchError::QueueNotLeavable`](drift_online_matchmaking::SearchError::QueueNotLeavable).
    pub fn cancel_matchmaking(&mut self, session: SessionName) -> Result<Dispatch, DriftError> {
        let result = self.search.cancel_matchmaking(&self.link, session);
        self.broadcast_search_notices();
        result.map_err(DriftError::from)
    }

    /// Lists joinable matches. Results land in
    /// [`search_results`](Self::search_results).
    pub fn find_sessions(&mut self) -> Result<Dispatch, DriftError> {
        let result = self.search.find_sessions(&self.link);
        self.broadcast_search_notices();
        result.map_err(DriftError::from)
    }

    pub fn cancel_find_sessions(&mut self) -> Result<Dispatch, DriftError> {
        let result = self.search.cancel_find_sessions();
        self.broadcast_search_notices();
        result.map_err(DriftError::from)
    }

    pub fn search_state(&self) -> SearchState {
        self.search.search_state()
    }

    pub fn search_results(&self) -> &[SearchResult] {
        self.search.results()
    }

    pub fn search(&self) -> &SearchCoordinator {
        &self.search
    }

    fn broadcast_search_notices(&mut self) {
        for notice in self.search.drain_notices() {
            match notice {
                SearchNotice::MatchmakingComplete { session, success } => self
                    .delegates
                    .matchmaking
                    .broadcast(&SessionOutcome::new(session, success)),
                SearchNotice::CancelMatchmakingComplete { session, success } => self
                    .delegates
                    .cancel_matchmaking
                    .broadcast(&SessionOutcome::new(session, success)),
                SearchNotice::FindSessionsComplete { success } => {
                    self.delegates.find_sessions.broadcast(&success)
                }
                SearchNotice::CancelFindSessionsComplete { success } => {
                    self.delegates.cancel_find_sessions.broadcast(&success)
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// `NoSession` if there is no session by that name.
    pub fn session_state(&self, name: &SessionName) -> SessionState {
        self.registry.state_of(name)
    }

    pub fn named_session(&self, name: &SessionName) -> Option<NamedSession> {
        self.registry.find(name)
    }

    pub fn session_settings(&self, name: &SessionName) -> Option<SessionSettings> {
        self.registry.with_session(name, |s| s.settings.clone())
    }

    pub fn is_player_in_session(&self, name: &SessionName, player: PlayerId) -> bool {
        self.registry
            .with_session(name, |s| s.is_player_registered(player))
            .unwrap_or(false)
    }

    /// `true` if any session advertises through presence.
    pub fn has_presence_session(&self) -> bool {
        self.registry.any(|s| s.settings.uses_presence)
    }

    pub fn num_sessions(&self) -> usize {
        self.registry.count()
    }

    /// The address to connect to for a named session.
    pub fn resolved_connect_string(&self, name: &SessionName) -> Option<String> {
        let url = self
            .registry
            .with_session(name, |s| s.connect_url().map(str::to_owned))
            .flatten();
        if url.is_none() {
            tracing::warn!(session = %name, "no connection info for session");
        }
        url
    }

    /// The address to connect to for a search result.
    pub fn resolved_connect_string_for(&self, result: &SearchResult) -> Option<String> {
        let url = result.connect_url().map(str::to_owned);
        if url.is_none() {
            tracing::warn!(match_id = %result.match_id, "search result has no connection info");
        }
        url
    }

    /// Drops a session without notifying anyone or telling the backend.
    pub fn remove_named_session(&mut self, name: &SessionName) -> bool {
        self.registry.remove(name).is_some()
    }

    /// Logs every session as JSON and returns the document.
    pub fn dump_session_state(&self) -> serde_json::Result<String> {
        let sessions = self.registry.snapshot();
        let dump = serde_json::to_string_pretty(&sessions)?;
        tracing::info!(sessions = sessions.len(), "session state:\n{dump}");
        Ok(dump)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Processes backend answers, then advances matchmaking.
    pub fn tick(&mut self, dt: Duration) {
        for completion in self.link.drain_completions() {
            let ticket = completion.ticket;
            if let Some(op) = self.in_flight.remove(&ticket) {
                tracing::trace!(%ticket, ?op, "session completion");
                self.on_session_completion(op, completion.outcome);
            } else if !self.search.on_completion(completion) {
                tracing::debug!(%ticket, "completion for unknown ticket");
            }
        }
        self.search.tick(&self.link, dt);
        self.broadcast_search_notices();
    }

    fn on_session_completion(
        &mut self,
        op: SessionOp,
        outcome: Result<BackendResponse, BackendError>,
    ) {
        let ok = outcome.is_ok();
        if let Err(e) = &outcome {
            tracing::warn!(?op, error = %e, "backend request failed");
        }

        match op {
            SessionOp::RegisterMatch {
                session: name,
                session_id,
            } => {
                // Advances even when registration failed.
                let exists = self
                    .registry
                    .with_session_mut(&name, |s| {
                        let same = s
                            .session_info
                            .as_ref()
                            .is_some_and(|info| info.session_id == session_id);
                        if same {
                            s.state = SessionState::Pending;
                        }
                        same
                    })
                    .unwrap_or(false);
                if exists {
                    tracing::info!(session = %name, registered = ok, "session pending");
                }
                self.delegates
                    .create
                    .broadcast(&SessionOutcome::new(name, ok && exists));
            }
            SessionOp::CompleteMatch {
                session,
                on_complete,
            } => {
                self.finish_destroy(&session, on_complete, ok);
            }
            SessionOp::BatchMember(batch_id) => {
                let Some(batch) = self.batches.get_mut(&batch_id) else {
                    return;
                };
                batch.outstanding -= 1;
                batch.success &= ok;
                if batch.outstanding == 0 {
                    if let Some(batch) = self.batches.remove(&batch_id) {
                        self.notify_players(batch);
                    }
                }
            }
            SessionOp::FireAndForget(kind) => {
                tracing::debug!(request = kind, ok, "status update answered");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Applies a state transition under the registry lock, or notifies
    /// failure and returns the error.
    fn transition(
        &mut self,
        op: Op,
        name: &SessionName,
        allowed: fn(&SessionState) -> bool,
        to: SessionState,
    ) -> Result<(), DriftError> {
        let result = self.registry.with_session_mut(name, |session| {
            let from = session.state;
            if allowed(&from) {
                session.state = to;
                Ok(from)
            } else {
                Err(from)
            }
        });

        match result {
            Some(Ok(from)) => {
                tracing::info!(session = %name, %from, %to, "session state changed");
                Ok(())
            }
            Some(Err(state)) => {
                tracing::warn!(session = %name, %state, operation = op.name(), "invalid session state");
                let err = SessionError::InvalidState {
                    name: name.clone(),
                    state,
                    operation: op.name(),
                };
                Err(self.fail_session_op(op, name.clone(), err.into()))
            }
            None => {
                tracing::warn!(session = %name, operation = op.name(), "session not found");
                Err(self.fail_session_op(op, name.clone(), not_found(name)))
            }
        }
    }

    fn fire_and_forget(&mut self, request: BackendRequest) {
        let kind = request.kind();
        match self.link.submit(request) {
            Ok(ticket) => {
                self.in_flight.insert(ticket, SessionOp::FireAndForget(kind));
            }
            Err(e) => tracing::debug!(request = kind, error = %e, "status update not sent"),
        }
    }

    fn finish_destroy(
        &mut self,
        name: &SessionName,
        on_complete: Option<DestroyCallback>,
        success: bool,
    ) {
        if let Some(callback) = on_complete {
            callback(name, success);
        }
        self.delegates
            .destroy
            .broadcast(&SessionOutcome::new(name.clone(), success));
    }

    /// Fires the failure notification for `op` and hands `err` back.
    fn fail_session_op(&mut self, op: Op, name: SessionName, err: DriftError) -> DriftError {
        let outcome = SessionOutcome::new(name, false);
        match op {
            Op::Create => self.delegates.create.broadcast(&outcome),
            Op::Start => self.delegates.start.broadcast(&outcome),
            Op::Update => self.delegates.update.broadcast(&outcome),
            Op::End => self.delegates.end.broadcast(&outcome),
            Op::Destroy => self.delegates.destroy.broadcast(&outcome),
        }
        err
    }
}

/// Session operations that report a [`SessionOutcome`].
#[derive(Debug, Clone, Copy)]
enum Op {
    Create,
    Start,
    Update,
    End,
    Destroy,
}

impl Op {
    fn name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Update => "update",
            Self::End => "end",
            Self::Destroy => "destroy",
        }
    }
}

fn not_found(name: &SessionName) -> DriftError {
    SessionError::NotFound(name.clone()).into()
}

impl fmt::Debug for OnlineSessionDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnlineSessionDrift")
            .field("config", &self.config)
            .field("sessions", &self.registry.count())
            .field("backend", &self.link.is_available())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
