//! The boundary between drift-online and the Drift match service.
//!
//! The session and matchmaking layers never talk to the network directly.
//! They describe what they want as a [`BackendRequest`], hand it to a
//! [`BackendLink`], and get a [`Ticket`] back. Later, during a tick, the
//! matching [`BackendCompletion`] shows up in the link's queue.
//!
//! # Key types
//!
//! - [`MatchBackend`]: the trait a real (or fake) match service implements
//! - [`BackendLink`]: an optional backend plus the completion queue
//! - [`Responder`]: one-shot reply handle passed along with each request
//! - [`RecordingBackend`]: in-memory backend for tests and demos
//!
//! # Availability
//!
//! The engine may not have a Drift instance yet (or may have torn it
//! down). That's modeled as a link with no backend attached: every
//! `submit` then fails fast with [`BackendError::Unavailable`].

use std::sync::Arc;

use drift_online_types::MatchQueueState;

mod completion;
mod error;
mod recording;
mod request;

pub use completion::{BackendCompletion, CompletionQueue, Responder, Ticket};
pub use error::BackendError;
pub use recording::RecordingBackend;
pub use request::{
    BackendRequest, BackendResponse, match_status, server_status,
};

/// A Drift match service.
///
/// `submit` must return immediately. The actual work happens wherever the
/// implementation likes, and the answer goes through the [`Responder`].
///
/// # Trait bounds
///
/// - `Send + Sync` → the backend is shared via `Arc` and may answer from
///   its own threads.
/// - `'static` → it lives as long as the link that holds it.
pub trait MatchBackend: Send + Sync + 'static {
    /// Starts one asynchronous request.
    fn submit(&self, request: BackendRequest, responder: Responder);

    /// What the backend client thinks its queue membership is right now.
    fn match_queue_state(&self) -> MatchQueueState;

    /// Forgets any queue membership without telling the server.
    ///
    /// Used after joining a session found through matchmaking: the queue
    /// entry has served its purpose.
    fn reset_match_queue(&self);
}

/// An optional backend plus the queue its completions arrive on.
pub struct BackendLink {
    backend: Option<Arc<dyn MatchBackend>>,
    completions: CompletionQueue,
}

impl BackendLink {
    /// Creates a link with no backend attached.
    pub fn detached() -> Self {
        Self {
            backend: None,
            completions: CompletionQueue::new(),
        }
    }

    pub fn new(backend: Arc<dyn MatchBackend>) -> Self {
        Self {
            backend: Some(backend),
            completions: CompletionQueue::new(),
        }
    }

    /// Attaches (or replaces) the backend.
    pub fn attach(&mut self, backend: Arc<dyn MatchBackend>) {
        tracing::info!("match service attached");
        self.backend = Some(backend);
    }

    /// Detaches the backend. Requests already in flight still complete.
    pub fn detach(&mut self) {
        if self.backend.take().is_some() {
            tracing::info!("match service detached");
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Sends a request to the backend.
    ///
    /// # Errors
    /// [`BackendError::Unavailable`] if no backend is attached. In that case
    /// nothing is sent and no completion will ever arrive.
    pub fn submit(&self, request: BackendRequest) -> Result<Ticket, BackendError> {
        let backend = self.backend.as_ref().ok_or(BackendError::Unavailable)?;
        let responder = self.completions.responder();
        let ticket = responder.ticket();
        tracing::debug!(%ticket, request = request.kind(), "submitting backend request");
        backend.submit(request, responder);
        Ok(ticket)
    }

    /// The backend's queue state, or `None` without a backend.
    pub fn match_queue_state(&self) -> Option<MatchQueueState> {
        self.backend.as_ref().map(|b| b.match_queue_state())
    }

    pub fn reset_match_queue(&self) {
        if let Some(backend) = &self.backend {
            backend.reset_match_queue();
        }
    }

    /// Takes all completions that have arrived. See [`CompletionQueue::drain`].
    pub fn drain_completions(&mut self) -> Vec<BackendCompletion> {
        self.completions.drain()
    }
}

impl Default for BackendLink {
    fn default() -> Self {
        Self::detached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_detached_returns_unavailable() {
        let link = BackendLink::detached();
        let result = link.submit(BackendRequest::JoinQueue);
        assert!(matches!(result, Err(BackendError::Unavailable)));
        assert!(!link.is_available());
        assert_eq!(link.match_queue_state(), None);
    }

    #[test]
    fn test_submit_attached_reaches_backend() {
        let backend = Arc::new(RecordingBackend::new());
        let link = BackendLink::new(backend.clone());

        let ticket = link.submit(BackendRequest::JoinQueue).unwrap();

        assert_eq!(backend.requests(), vec![BackendRequest::JoinQueue]);
        assert_eq!(backend.pending_tickets(), vec![ticket]);
    }

    #[test]
    fn test_completion_arrives_on_drain() {
        let backend = Arc::new(RecordingBackend::new());
        let mut link = BackendLink::new(backend.clone());
        let ticket = link.submit(BackendRequest::PollQueue).unwrap();

        backend.complete_next(Ok(BackendResponse::Ack));

        let drained = link.drain_completions();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].ticket, ticket);
    }

    #[test]
    fn test_detach_then_attach() {
        let backend = Arc::new(RecordingBackend::new());
        let mut link = BackendLink::new(backend.clone());
        link.detach();
        assert!(!link.is_available());

        link.attach(backend);
        assert!(link.is_available());
    }
}
