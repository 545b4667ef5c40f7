//! Integration tests for the search coordinator using the recording backend.

use std::sync::Arc;
use std::time::Duration;

use drift_online_backend::{
    BackendError, BackendLink, BackendRequest, BackendResponse, RecordingBackend,
};
use drift_online_matchmaking::{
    MatchmakingConfig, MatchmakingQuery, SearchCoordinator, SearchError, SearchNotice,
    SearchState,
};
use drift_online_types::{
    ActiveMatch, Dispatch, MatchId, MatchQueueMatch, MatchQueueState, MatchQueueStatus,
    PlayerId, QueueStatus, SessionName,
};

// =========================================================================
// Harness
// =========================================================================

struct Harness {
    backend: Arc<RecordingBackend>,
    link: BackendLink,
    coordinator: SearchCoordinator,
}

impl Harness {
    fn new() -> Self {
        let backend = Arc::new(RecordingBackend::new());
        Self {
            link: BackendLink::new(backend.clone()),
            backend,
            coordinator: SearchCoordinator::new(MatchmakingConfig::default()),
        }
    }

    fn detached() -> Self {
        let mut harness = Self::new();
        harness.link.detach();
        harness
    }

    /// Routes every completion that has arrived to the coordinator.
    fn pump(&mut self) {
        for completion in self.link.drain_completions() {
            assert!(self.coordinator.on_completion(completion), "unrouted completion");
        }
    }

    fn tick(&mut self, dt: Duration) {
        self.pump();
        self.coordinator.tick(&self.link, dt);
    }

    fn notices(&mut self) -> Vec<SearchNotice> {
        self.coordinator.drain_notices()
    }

    /// Starts solo matchmaking and confirms the queue join.
    fn queued(&mut self) {
        self.coordinator
            .start_matchmaking(&self.link, SessionName::game(), MatchmakingQuery::solo())
            .unwrap();
        self.backend
            .complete_next(Ok(BackendResponse::Queue(MatchQueueStatus::waiting())));
        self.pump();
        self.backend.set_queue_state(MatchQueueState::Queued);
    }

    /// Ticks until a poll goes out, then answers it.
    fn answer_poll(&mut self, status: MatchQueueStatus) {
        for _ in 0..10 {
            self.tick(Duration::from_secs(1));
            if self.backend.pending_count() > 0 {
                break;
            }
        }
        let answered = self.backend.complete_where(
            |r| matches!(r, BackendRequest::PollQueue),
            Ok(BackendResponse::Queue(status)),
        );
        assert!(answered.is_some(), "no poll was sent");
        self.pump();
    }
}

fn matched(id: u32) -> MatchQueueStatus {
    MatchQueueStatus::matched(MatchQueueMatch {
        match_id: MatchId(id),
        connection_url: format!("10.0.0.{id}:7777"),
    })
}

fn game_notice(success: bool) -> SearchNotice {
    SearchNotice::MatchmakingComplete {
        session: SessionName::game(),
        success,
    }
}

// =========================================================================
// Matchmaking
// =========================================================================

#[test]
fn test_start_matchmaking_solo_sends_join_queue() {
    let mut h = Harness::new();

    let dispatch = h
        .coordinator
        .start_matchmaking(&h.link, SessionName::game(), MatchmakingQuery::solo())
        .unwrap();

    assert_eq!(dispatch, Dispatch::Pending);
    assert_eq!(h.backend.requests(), vec![BackendRequest::JoinQueue]);
    assert_eq!(h.coordinator.search_state(), SearchState::InProgress);
}

#[test]
fn test_start_matchmaking_friend_beats_invite_token() {
    let mut h = Harness::new();
    let query = MatchmakingQuery {
        friend_id: Some(PlayerId(77)),
        invite_token: Some("tok".into()),
    };

    h.coordinator
        .start_matchmaking(&h.link, SessionName::game(), query)
        .unwrap();

    assert_eq!(
        h.backend.requests(),
        vec![BackendRequest::InvitePlayer { player: PlayerId(77) }]
    );
}

#[test]
fn test_start_matchmaking_invite_token_accepts_invite() {
    let mut h = Harness::new();

    h.coordinator
        .start_matchmaking(&h.link, SessionName::game(), MatchmakingQuery::with_invite("tok"))
        .unwrap();

    assert_eq!(
        h.backend.requests(),
        vec![BackendRequest::AcceptInvite { token: "tok".into() }]
    );
}

#[test]
fn test_start_matchmaking_without_backend_fails_once() {
    let mut h = Harness::detached();

    let result = h
        .coordinator
        .start_matchmaking(&h.link, SessionName::game(), MatchmakingQuery::solo());

    assert_eq!(result, Err(SearchError::Backend(BackendError::Unavailable)));
    assert_eq!(h.coordinator.search_state(), SearchState::Failed);
    assert_eq!(h.notices(), vec![game_notice(false)]);
}

#[test]
fn test_join_queue_failure_fails_search() {
    let mut h = Harness::new();
    h.coordinator
        .start_matchmaking(&h.link, SessionName::game(), MatchmakingQuery::solo())
        .unwrap();

    h.backend
        .complete_next(Err(BackendError::Rejected("banned".into())));
    h.pump();

    assert_eq!(h.coordinator.search_state(), SearchState::Failed);
    assert!(h.coordinator.queue_client().is_none());
    assert_eq!(h.notices(), vec![game_notice(false)]);
}

#[test]
fn test_join_queue_success_creates_queue_client() {
    let mut h = Harness::new();
    h.queued();

    let client = h.coordinator.queue_client().expect("queue client");
    assert_eq!(client.status(), QueueStatus::Waiting);
    assert!(h.notices().is_empty());
}

#[test]
fn test_poll_waiting_waiting_matched_notifies_once_with_result() {
    let mut h = Harness::new();
    h.queued();

    h.answer_poll(MatchQueueStatus::waiting());
    h.answer_poll(MatchQueueStatus::waiting());
    assert!(h.notices().is_empty());

    h.answer_poll(matched(9));

    assert_eq!(h.notices(), vec![game_notice(true)]);
    assert_eq!(h.coordinator.search_state(), SearchState::Done);
    let results = h.coordinator.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].match_id, MatchId(9));
    assert_eq!(results[0].connect_url(), Some("10.0.0.9:7777"));
    assert_eq!(results[0].session.settings.max_players(), 2);
    assert!(h.coordinator.queue_client().is_none());
}

#[test]
fn test_poll_timed_out_fails_search() {
    let mut h = Harness::new();
    h.queued();

    h.answer_poll(MatchQueueStatus::with_status(QueueStatus::TimedOut));

    assert_eq!(h.notices(), vec![game_notice(false)]);
    assert_eq!(h.coordinator.search_state(), SearchState::Failed);
    assert!(h.coordinator.results().is_empty());
}

#[test]
fn test_poll_usurped_fails_search() {
    let mut h = Harness::new();
    h.queued();

    h.answer_poll(MatchQueueStatus::with_status(QueueStatus::Usurped));

    assert_eq!(h.notices(), vec![game_notice(false)]);
}

#[test]
fn test_tick_without_backend_retries_poll_later() {
    let mut h = Harness::new();
    h.queued();
    h.link.detach();

    h.tick(Duration::from_secs(5));
    assert!(!h.coordinator.queue_client().unwrap().is_polling());

    h.link.attach(h.backend.clone());
    h.tick(Duration::from_millis(16));
    assert!(h.coordinator.queue_client().unwrap().is_polling());
    assert_eq!(h.backend.pending_requests(), vec![BackendRequest::PollQueue]);
}

#[test]
fn test_start_matchmaking_supersedes_running_search() {
    let mut h = Harness::new();
    h.queued();

    h.coordinator
        .start_matchmaking(&h.link, SessionName::new("Party"), MatchmakingQuery::solo())
        .unwrap();

    assert_eq!(h.notices(), vec![game_notice(false)]);
    assert!(h.coordinator.queue_client().is_none());
    assert_eq!(h.coordinator.search_state(), SearchState::InProgress);
}

#[test]
fn test_stale_join_completion_is_ignored() {
    let mut h = Harness::new();
    h.coordinator
        .start_matchmaking(&h.link, SessionName::game(), MatchmakingQuery::solo())
        .unwrap();
    h.coordinator
        .start_matchmaking(&h.link, SessionName::game(), MatchmakingQuery::solo())
        .unwrap();
    h.notices();

    // Answer the first (superseded) join only.
    h.backend.complete_next(Ok(BackendResponse::Ack));
    h.pump();

    assert!(h.coordinator.queue_client().is_none());
    assert_eq!(h.coordinator.search_state(), SearchState::InProgress);
    assert!(h.notices().is_empty());
}

// =========================================================================
// Cancel matchmaking
// =========================================================================

#[test]
fn test_cancel_matchmaking_without_search_succeeds_without_backend_call() {
    let mut h = Harness::new();

    let dispatch = h
        .coordinator
        .cancel_matchmaking(&h.link, SessionName::game())
        .unwrap();

    assert_eq!(dispatch, Dispatch::Complete);
    assert!(h.backend.requests().is_empty());
    assert_eq!(
        h.notices(),
        vec![SearchNotice::CancelMatchmakingComplete {
            session: SessionName::game(),
            success: true
        }]
    );
}

#[test]
fn test_cancel_matchmaking_while_queued_leaves_queue() {
    let mut h = Harness::new();
    h.queued();

    let dispatch = h
        .coordinator
        .cancel_matchmaking(&h.link, SessionName::game())
        .unwrap();
    assert_eq!(dispatch, Dispatch::Pending);
    assert_eq!(h.backend.pending_requests(), vec![BackendRequest::LeaveQueue]);

    h.backend.complete_next(Ok(BackendResponse::Ack));
    h.pump();

    assert_eq!(
        h.notices(),
        vec![
            game_notice(false),
            SearchNotice::CancelMatchmakingComplete {
                session: SessionName::game(),
                success: true
            },
        ]
    );
    assert!(h.coordinator.queue_client().is_none());
    assert_eq!(h.coordinator.search_state(), SearchState::Failed);
}

#[test]
fn test_cancel_matchmaking_leave_failure_keeps_search() {
    let mut h = Harness::new();
    h.queued();
    h.coordinator
        .cancel_matchmaking(&h.link, SessionName::game())
        .unwrap();

    h.backend
        .complete_next(Err(BackendError::Unreachable("down".into())));
    h.pump();

    assert_eq!(
        h.notices(),
        vec![SearchNotice::CancelMatchmakingComplete {
            session: SessionName::game(),
            success: false
        }]
    );
    assert_eq!(h.coordinator.search_state(), SearchState::InProgress);
    assert!(h.coordinator.queue_client().is_some());
}

#[test]
fn test_cancel_matchmaking_late_leave_keeps_newer_search_polling() {
    let mut h = Harness::new();
    h.queued();
    h.coordinator
        .cancel_matchmaking(&h.link, SessionName::game())
        .unwrap();
    h.coordinator
        .start_matchmaking(&h.link, SessionName::game(), MatchmakingQuery::solo())
        .unwrap();

    // The new search's join is answered before the old leave.
    h.backend.complete_where(
        |r| matches!(r, BackendRequest::JoinQueue),
        Ok(BackendResponse::Queue(MatchQueueStatus::waiting())),
    );
    h.pump();
    h.backend.complete_where(
        |r| matches!(r, BackendRequest::LeaveQueue),
        Ok(BackendResponse::Ack),
    );
    h.pump();

    assert!(h.coordinator.queue_client().is_some());
    assert_eq!(h.coordinator.search_state(), SearchState::InProgress);
    assert_eq!(
        h.notices(),
        vec![
            game_notice(false),
            SearchNotice::CancelMatchmakingComplete {
                session: SessionName::game(),
                success: true
            },
        ]
    );

    h.answer_poll(matched(5));

    assert_eq!(h.notices(), vec![game_notice(true)]);
    assert_eq!(h.coordinator.search_state(), SearchState::Done);
}

#[test]
fn test_cancel_matchmaking_queue_not_leavable_fails() {
    let mut h = Harness::new();
    h.queued();
    h.backend.set_queue_state(MatchQueueState::Joining);
    let sent_before = h.backend.requests().len();

    let result = h.coordinator.cancel_matchmaking(&h.link, SessionName::game());

    assert_eq!(
        result,
        Err(SearchError::QueueNotLeavable(MatchQueueState::Joining))
    );
    assert_eq!(h.backend.requests().len(), sent_before);
    assert_eq!(
        h.notices(),
        vec![SearchNotice::CancelMatchmakingComplete {
            session: SessionName::game(),
            success: false
        }]
    );
}

#[test]
fn test_cancel_matchmaking_without_backend_fails() {
    let mut h = Harness::new();
    h.queued();
    h.link.detach();

    let result = h.coordinator.cancel_matchmaking(&h.link, SessionName::game());

    assert_eq!(result, Err(SearchError::Backend(BackendError::Unavailable)));
    assert_eq!(h.notices().len(), 1);
}

// =========================================================================
// Find sessions
// =========================================================================

#[test]
fn test_find_sessions_builds_one_result_per_match() {
    let mut h = Harness::new();
    h.coordinator.find_sessions(&h.link).unwrap();
    assert_eq!(h.backend.requests(), vec![BackendRequest::GetActiveMatches]);

    h.backend.complete_next(Ok(BackendResponse::ActiveMatches(vec![
        ActiveMatch {
            match_id: MatchId(1),
            connection_url: "a:1".into(),
            num_players: 2,
            max_players: 4,
        },
        ActiveMatch {
            match_id: MatchId(2),
            connection_url: "b:2".into(),
            num_players: 0,
            max_players: 8,
        },
    ])));
    h.pump();

    assert_eq!(h.notices(), vec![SearchNotice::FindSessionsComplete { success: true }]);
    let results = h.coordinator.results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].session.num_open_public_connections, 2);
    assert_eq!(results[1].session.num_open_public_connections, 8);
    assert_eq!(results[1].connect_url(), Some("b:2"));
}

#[test]
fn test_find_sessions_while_in_progress_is_ignored() {
    let mut h = Harness::new();
    h.coordinator.find_sessions(&h.link).unwrap();
    let first_id = h.coordinator.current_search().unwrap().id;

    let dispatch = h.coordinator.find_sessions(&h.link).unwrap();

    assert_eq!(dispatch, Dispatch::Pending);
    assert_eq!(h.coordinator.current_search().unwrap().id, first_id);
    assert_eq!(h.backend.requests().len(), 1);

    h.backend
        .complete_next(Ok(BackendResponse::ActiveMatches(Vec::new())));
    h.pump();
    assert_eq!(h.notices(), vec![SearchNotice::FindSessionsComplete { success: true }]);
}

#[test]
fn test_find_sessions_backend_failure_notifies_failure() {
    let mut h = Harness::new();
    h.coordinator.find_sessions(&h.link).unwrap();

    h.backend
        .complete_next(Err(BackendError::Unreachable("down".into())));
    h.pump();

    assert_eq!(h.notices(), vec![SearchNotice::FindSessionsComplete { success: false }]);
    assert_eq!(h.coordinator.search_state(), SearchState::Failed);
}

#[test]
fn test_cancel_find_sessions_in_progress_fails_search_then_succeeds() {
    let mut h = Harness::new();
    h.coordinator.find_sessions(&h.link).unwrap();

    let dispatch = h.coordinator.cancel_find_sessions().unwrap();

    assert_eq!(dispatch, Dispatch::Complete);
    assert_eq!(
        h.notices(),
        vec![
            SearchNotice::FindSessionsComplete { success: false },
            SearchNotice::CancelFindSessionsComplete { success: true },
        ]
    );

    // The listing still arrives, but nobody is waiting for it.
    h.backend
        .complete_next(Ok(BackendResponse::ActiveMatches(Vec::new())));
    h.pump();
    assert!(h.notices().is_empty());
    assert_eq!(h.coordinator.search_state(), SearchState::Failed);
}

#[test]
fn test_cancel_find_sessions_nothing_running_fails() {
    let mut h = Harness::new();

    let result = h.coordinator.cancel_find_sessions();

    assert_eq!(result, Err(SearchError::NothingToCancel));
    assert_eq!(
        h.notices(),
        vec![SearchNotice::CancelFindSessionsComplete { success: false }]
    );
}
