//! Match-queue and active-match payloads.
//!
//! These mirror what the Drift backend returns when a queue request or a
//! match listing completes. They carry no behavior beyond classification
//! helpers; the state machines that consume them live in
//! `drift-online-matchmaking`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{MatchId, TypesError};

// ---------------------------------------------------------------------------
// QueueStatus
// ---------------------------------------------------------------------------

/// A player's standing in the match queue, as reported by a poll.
///
/// ```text
///              ┌──→ Matched
/// Waiting ─────┼──→ TimedOut
///              └──→ Usurped
/// ```
///
/// - **None**: not queued (yet), or the queue entry was reset.
/// - **Waiting**: queued, no match found yet.
/// - **Matched**: the backend found a match; connection details attached.
/// - **TimedOut**: the queue entry expired without a match.
/// - **Usurped**: another client (same player) took over the queue entry.
///
/// The backend spells these in lowercase (`"timedout"`, not `"timed_out"`),
/// and the serde representation follows that spelling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    #[default]
    None,
    Waiting,
    Matched,
    TimedOut,
    Usurped,
}

impl QueueStatus {
    /// Returns `true` once nothing more can happen to this queue entry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Matched | Self::TimedOut | Self::Usurped)
    }

    /// Returns `true` for the two ways a queue entry ends without a match.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::TimedOut | Self::Usurped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Waiting => "waiting",
            Self::Matched => "matched",
            Self::TimedOut => "timedout",
            Self::Usurped => "usurped",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(Self::None),
            "waiting" => Ok(Self::Waiting),
            "matched" => Ok(Self::Matched),
            "timedout" => Ok(Self::TimedOut),
            "usurped" => Ok(Self::Usurped),
            other => Err(TypesError::UnknownQueueStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Queue payloads
// ---------------------------------------------------------------------------

/// Connection details for a match the queue placed us in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchQueueMatch {
    pub match_id: MatchId,
    /// Engine connection URL of the server hosting the match.
    pub connection_url: String,
}

/// Result payload of a queue join, invite, accept or poll request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchQueueStatus {
    pub status: QueueStatus,
    /// Present only when `status` is [`QueueStatus::Matched`].
    #[serde(default, rename = "match")]
    pub matched: Option<MatchQueueMatch>,
}

impl MatchQueueStatus {
    pub fn waiting() -> Self {
        Self {
            status: QueueStatus::Waiting,
            matched: None,
        }
    }

    pub fn matched(matched: MatchQueueMatch) -> Self {
        Self {
            status: QueueStatus::Matched,
            matched: Some(matched),
        }
    }

    pub fn with_status(status: QueueStatus) -> Self {
        Self {
            status,
            matched: None,
        }
    }
}

/// One running match, as listed by the backend's active-match query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveMatch {
    pub match_id: MatchId,
    pub connection_url: String,
    pub num_players: u32,
    pub max_players: u32,
}

impl ActiveMatch {
    /// Slots still free in this match. Never underflows, even if the
    /// backend reports more players than the cap.
    pub fn open_slots(&self) -> u32 {
        self.max_players.saturating_sub(self.num_players)
    }
}

// ---------------------------------------------------------------------------
// MatchQueueState
// ---------------------------------------------------------------------------

/// The backend client's own view of its queue membership.
///
/// This is distinct from [`QueueStatus`]: `QueueStatus` is what a poll
/// *returned*, `MatchQueueState` is what the backend client is *doing*
/// right now. Cancellation is only possible while `Queued` or `Updating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchQueueState {
    #[default]
    Idle,
    Joining,
    Queued,
    Updating,
    Leaving,
    Matched,
}

impl MatchQueueState {
    /// Returns `true` if a leave-queue request makes sense in this state.
    pub fn can_leave(&self) -> bool {
        matches!(self, Self::Queued | Self::Updating)
    }
}

impl fmt::Display for MatchQueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Joining => write!(f, "Joining"),
            Self::Queued => write!(f, "Queued"),
            Self::Updating => write!(f, "Updating"),
            Self::Leaving => write!(f, "Leaving"),
            Self::Matched => write!(f, "Matched"),
        }
    }
}
