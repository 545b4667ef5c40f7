//! Error types for the matchmaking layer.

use drift_online_backend::BackendError;
use drift_online_types::MatchQueueState;

/// Errors that can occur when starting or cancelling a search.
///
/// A request that fails with one of these has already produced its
/// failure notice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The request couldn't be sent to the match service.
    #[error("match service request failed: {0}")]
    Backend(#[from] BackendError),

    /// A cancel was requested but no matching search is in progress.
    #[error("no search in progress to cancel")]
    NothingToCancel,

    /// The backend client isn't in a queue state that can be left.
    #[error("cannot leave the match queue while {0}")]
    QueueNotLeavable(MatchQueueState),
}
