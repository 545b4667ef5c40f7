//! Unified error type for drift-online.

use drift_online_backend::BackendError;
use drift_online_matchmaking::SearchError;
use drift_online_session::SessionError;
use drift_online_types::SessionName;

/// Top-level error that wraps all crate-specific errors.
///
/// Every public operation on [`OnlineSessionDrift`](crate::OnlineSessionDrift)
/// returns this. By the time an `Err` comes back, the matching failure
/// notification has already been broadcast.
///
/// A missing backend, however it surfaces, always becomes
/// [`DriftError::BackendUnavailable`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriftError {
    /// No match service is attached.
    #[error("match service unavailable")]
    BackendUnavailable,

    /// A backend request failed for another reason.
    #[error(transparent)]
    Backend(BackendError),

    /// A session-level error (exists, not found, wrong state, full).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A search-level error (nothing to cancel, queue not leavable).
    #[error(transparent)]
    Search(SearchError),

    /// `join_session` on a name that is already registered.
    #[error("already in session {0}")]
    AlreadyInSession(SessionName),
}

impl From<BackendError> for DriftError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable => Self::BackendUnavailable,
            other => Self::Backend(other),
        }
    }
}

impl From<SearchError> for DriftError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Backend(backend) => backend.into(),
            other => Self::Search(other),
        }
    }
}
