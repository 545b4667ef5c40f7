//! Search requests and their results.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use drift_online_session::{OnlineSession, SessionInfo, SessionSettings};
use drift_online_types::{ActiveMatch, MatchId, MatchQueueMatch, PlayerId, SessionName};

/// Counter for generating unique search ids.
static NEXT_SEARCH_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one search. Later searches always get larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SearchId(u64);

impl SearchId {
    fn next() -> Self {
        Self(NEXT_SEARCH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// What a search is looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKind {
    /// A listing of joinable running matches.
    FindSessions,
    /// A match-queue placement for the named session.
    Matchmaking(SessionName),
}

/// Progress of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchState {
    #[default]
    NotStarted,
    InProgress,
    Done,
    Failed,
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NotStarted"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Done => write!(f, "Done"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// How to enter the match queue.
///
/// A friend id takes priority over an invite token. With neither, the
/// player joins the queue alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchmakingQuery {
    /// Invite this player and queue together.
    pub friend_id: Option<PlayerId>,
    /// Accept an invite someone else sent us.
    pub invite_token: Option<String>,
}

impl MatchmakingQuery {
    pub fn solo() -> Self {
        Self::default()
    }

    pub fn with_friend(friend_id: PlayerId) -> Self {
        Self {
            friend_id: Some(friend_id),
            invite_token: None,
        }
    }

    pub fn with_invite(token: impl Into<String>) -> Self {
        Self {
            friend_id: None,
            invite_token: Some(token.into()),
        }
    }
}

/// One joinable session a search found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub session: OnlineSession,
    pub match_id: MatchId,
}

impl SearchResult {
    /// Builds a result from an active-match listing entry.
    ///
    /// Capacity is the match's player cap; open slots are what's left.
    pub fn from_active_match(active: &ActiveMatch) -> Self {
        let settings = listed_settings(active.max_players, active.match_id);
        Self {
            session: OnlineSession {
                settings,
                num_open_public_connections: active.open_slots(),
                num_open_private_connections: 0,
                session_info: Some(SessionInfo::with_url(active.connection_url.clone())),
            },
            match_id: active.match_id,
        }
    }

    /// Builds a result from a queue placement.
    ///
    /// The queue doesn't report a capacity, so the caller supplies one and
    /// every slot is reported open.
    pub fn from_queue_match(matched: &MatchQueueMatch, capacity: u32) -> Self {
        let settings = listed_settings(capacity, matched.match_id);
        Self {
            session: OnlineSession {
                settings,
                num_open_public_connections: capacity,
                num_open_private_connections: 0,
                session_info: Some(SessionInfo::with_url(matched.connection_url.clone())),
            },
            match_id: matched.match_id,
        }
    }

    pub fn connect_url(&self) -> Option<&str> {
        self.session.connect_url()
    }
}

/// Settings for a session hosted by a dedicated server somewhere else:
/// public slots only, nothing advertised, no presence or invites.
fn listed_settings(capacity: u32, match_id: MatchId) -> SessionSettings {
    let mut settings = SessionSettings {
        num_public_connections: capacity,
        is_dedicated: true,
        ..SessionSettings::default()
    };
    settings.set_match_id(match_id);
    settings
}

/// The coordinator's record of one search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub id: SearchId,
    pub kind: SearchKind,
    pub state: SearchState,
    pub results: Vec<SearchResult>,
}

impl SearchRequest {
    /// Creates a search that is already in progress.
    pub(crate) fn start(kind: SearchKind) -> Self {
        Self {
            id: SearchId::next(),
            kind,
            state: SearchState::InProgress,
            results: Vec::new(),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == SearchState::InProgress
    }

    pub fn is_matchmaking(&self) -> bool {
        matches!(self.kind, SearchKind::Matchmaking(_))
    }
}
