//! Error types for the backend boundary.

/// Errors a backend request can complete with.
///
/// These are delivered as the `Err` side of a completion. They never
/// panic the caller and never cause a retry; whoever submitted the request
/// decides what a failure means.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// No backend is attached, so the request was never sent.
    #[error("match service unavailable")]
    Unavailable,

    /// The backend answered, but refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached.
    #[error("match service unreachable: {0}")]
    Unreachable(String),

    /// The backend dropped the request without ever answering it.
    #[error("request abandoned by the backend")]
    Abandoned,

    /// The backend answered with a payload of the wrong shape.
    #[error("unexpected response, wanted {expected}")]
    UnexpectedResponse { expected: &'static str },
}
