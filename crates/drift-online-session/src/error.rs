//! Error types for the session layer.

use drift_online_types::{PlayerId, SessionName};

use crate::SessionState;

/// Errors that can occur while creating, mutating or looking up sessions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A session with this name is already registered.
    /// At most one session per name can exist at a time.
    #[error("session {0} already exists")]
    AlreadyExists(SessionName),

    /// No session is registered under the given name.
    #[error("session {0} not found")]
    NotFound(SessionName),

    /// The operation isn't allowed from the session's current state,
    /// e.g. starting a session that is still `Creating`.
    #[error("session {name} is {state}, cannot {operation}")]
    InvalidState {
        name: SessionName,
        state: SessionState,
        operation: &'static str,
    },

    /// Neither a public nor a private slot was free for this player.
    #[error("session {name} has no open slot for player {player}")]
    SessionFull { name: SessionName, player: PlayerId },

    /// New settings would leave fewer slots than there are registered
    /// players.
    #[error("capacity {requested} is below the {registered} registered players")]
    CapacityBelowRegistered { requested: u32, registered: u32 },
}
