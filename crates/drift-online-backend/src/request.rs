//! Requests sent to the match service and the payloads they complete with.

use drift_online_types::{ActiveMatch, MatchQueueStatus, PlayerId};

use crate::BackendError;

/// Match status strings understood by the backend's match-update call.
pub mod match_status {
    pub const STARTED: &str = "started";
    pub const ENDED: &str = "ended";
    pub const COMPLETED: &str = "completed";
}

/// Server status strings understood by the backend's server-update call.
pub mod server_status {
    pub const RUNNING: &str = "running";
}

/// One asynchronous operation on the Drift match service.
///
/// Every variant completes exactly once with a
/// `Result<BackendResponse, BackendError>`. See [`Responder`](crate::Responder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    /// Register a new match for this server.
    AddMatch {
        map_name: String,
        game_mode: String,
        num_teams: u32,
        max_players: u32,
    },
    /// Move this server's match to a new status ("started", "ended", ...).
    UpdateMatch { status: String, reason: String },
    /// Move this server process to a new status ("running", ...).
    UpdateServer { status: String, reason: String },
    AddPlayer { player: PlayerId, team: u32 },
    RemovePlayer { player: PlayerId },
    /// List running matches that can be joined.
    GetActiveMatches,
    JoinQueue,
    LeaveQueue,
    PollQueue,
    /// Queue together with a friend by inviting them.
    InvitePlayer { player: PlayerId },
    /// Join the queue entry a friend invited us to.
    AcceptInvite { token: String },
}

impl BackendRequest {
    /// Short, stable label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddMatch { .. } => "add_match",
            Self::UpdateMatch { .. } => "update_match",
            Self::UpdateServer { .. } => "update_server",
            Self::AddPlayer { .. } => "add_player",
            Self::RemovePlayer { .. } => "remove_player",
            Self::GetActiveMatches => "get_active_matches",
            Self::JoinQueue => "join_queue",
            Self::LeaveQueue => "leave_queue",
            Self::PollQueue => "poll_queue",
            Self::InvitePlayer { .. } => "invite_player",
            Self::AcceptInvite { .. } => "accept_invite",
        }
    }

    pub fn update_match(status: &str) -> Self {
        Self::UpdateMatch {
            status: status.to_string(),
            reason: String::new(),
        }
    }

    pub fn update_server(status: &str) -> Self {
        Self::UpdateServer {
            status: status.to_string(),
            reason: String::new(),
        }
    }
}

/// Successful completion payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendResponse {
    /// The request went through and carries no data.
    Ack,
    ActiveMatches(Vec<ActiveMatch>),
    /// Answer to join, invite, accept and poll requests.
    Queue(MatchQueueStatus),
}

impl BackendResponse {
    /// Unwraps an active-match listing.
    ///
    /// # Errors
    /// [`BackendError::UnexpectedResponse`] for any other payload.
    pub fn into_active_matches(self) -> Result<Vec<ActiveMatch>, BackendError> {
        match self {
            Self::ActiveMatches(matches) => Ok(matches),
            _ => Err(BackendError::UnexpectedResponse {
                expected: "active matches",
            }),
        }
    }

    /// Unwraps a queue status.
    ///
    /// # Errors
    /// [`BackendError::UnexpectedResponse`] for any other payload.
    pub fn into_queue_status(self) -> Result<MatchQueueStatus, BackendError> {
        match self {
            Self::Queue(status) => Ok(status),
            _ => Err(BackendError::UnexpectedResponse {
                expected: "queue status",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_queue_status_wrong_payload_returns_error() {
        let result = BackendResponse::Ack.into_queue_status();
        assert!(matches!(
            result,
            Err(BackendError::UnexpectedResponse { expected: "queue status" })
        ));
    }

    #[test]
    fn test_into_active_matches_returns_list() {
        let matches = BackendResponse::ActiveMatches(Vec::new())
            .into_active_matches()
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_update_match_helper_uses_empty_reason() {
        let req = BackendRequest::update_match(match_status::ENDED);
        assert_eq!(
            req,
            BackendRequest::UpdateMatch {
                status: "ended".into(),
                reason: String::new()
            }
        );
        assert_eq!(req.kind(), "update_match");
    }
}
