//! Error types for the shared types crate.

/// Errors produced while interpreting backend-provided values.
///
/// The Drift backend reports queue statuses and player ids as strings.
/// When one of those strings doesn't match anything we know, we surface
/// it as a `TypesError` instead of silently mapping it to a default.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The backend reported a queue status we don't recognise.
    #[error("unknown match queue status: {0:?}")]
    UnknownQueueStatus(String),

    /// A player id string was not a valid unsigned integer.
    #[error("invalid player id: {0:?}")]
    InvalidPlayerId(String),
}
