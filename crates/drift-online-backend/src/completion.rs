//! Completion plumbing: how answers travel back from the backend.
//!
//! The backend may finish a request on any thread (an HTTP client pool,
//! a test harness, ...). The session layer, on the other hand, is
//! single-threaded and only runs inside `tick`. The [`CompletionQueue`]
//! bridges the two: backends push into an unbounded Tokio channel, and the
//! tick thread drains it.
//!
//! ```text
//! submit(request) ──→ backend ──→ Responder::respond() ──→ channel
//!                                                             │
//!                          tick() ──→ CompletionQueue::drain()┘
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::{BackendError, BackendResponse};

/// Counter for generating unique tickets across all queues in the process.
static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Identifies one submitted request so its completion can be routed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub(crate) fn next() -> Self {
        Self(NEXT_TICKET.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

/// The answer to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCompletion {
    pub ticket: Ticket,
    pub outcome: Result<BackendResponse, BackendError>,
}

/// The one-shot reply handle a backend receives with each request.
///
/// Calling [`respond`](Self::respond) consumes it, so a request can't be
/// answered twice. If a backend drops the responder without answering, the
/// request completes with [`BackendError::Abandoned`]. Callers waiting on
/// it are never left hanging.
pub struct Responder {
    ticket: Ticket,
    sender: Option<mpsc::UnboundedSender<BackendCompletion>>,
}

impl Responder {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Delivers the outcome of the request.
    pub fn respond(mut self, outcome: Result<BackendResponse, BackendError>) {
        self.send(outcome);
    }

    pub fn succeed(self, response: BackendResponse) {
        self.respond(Ok(response));
    }

    pub fn fail(self, error: BackendError) {
        self.respond(Err(error));
    }

    fn send(&mut self, outcome: Result<BackendResponse, BackendError>) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        let completion = BackendCompletion {
            ticket: self.ticket,
            outcome,
        };
        if sender.send(completion).is_err() {
            // The session layer is gone; nobody is left to care.
            tracing::trace!(ticket = %self.ticket, "completion dropped, queue closed");
        }
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if self.sender.is_some() {
            tracing::debug!(ticket = %self.ticket, "responder dropped without an answer");
            self.send(Err(BackendError::Abandoned));
        }
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("ticket", &self.ticket)
            .field("answered", &self.sender.is_none())
            .finish()
    }
}

/// Receiving end of the completion channel, owned by the tick thread.
pub struct CompletionQueue {
    sender: mpsc::UnboundedSender<BackendCompletion>,
    receiver: mpsc::UnboundedReceiver<BackendCompletion>,
}

impl CompletionQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    /// Allocates a fresh ticket and the responder that answers it.
    pub fn responder(&self) -> Responder {
        Responder {
            ticket: Ticket::next(),
            sender: Some(self.sender.clone()),
        }
    }

    /// Takes every completion that has arrived so far, oldest first.
    ///
    /// Never blocks: anything that hasn't arrived yet is picked up by a
    /// later tick.
    pub fn drain(&mut self) -> Vec<BackendCompletion> {
        let mut drained = Vec::new();
        while let Ok(completion) = self.receiver.try_recv() {
            drained.push(completion);
        }
        drained
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_responder_respond_delivers_to_queue() {
        let mut queue = CompletionQueue::new();
        let responder = queue.responder();
        let ticket = responder.ticket();

        responder.succeed(BackendResponse::Ack);

        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].ticket, ticket);
        assert_eq!(drained[0].outcome, Ok(BackendResponse::Ack));
    }

    #[test]
    fn test_responder_dropped_completes_with_abandoned() {
        let mut queue = CompletionQueue::new();
        let responder = queue.responder();
        let ticket = responder.ticket();

        drop(responder);

        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].ticket, ticket);
        assert_eq!(drained[0].outcome, Err(BackendError::Abandoned));
    }

    #[test]
    fn test_responder_answered_does_not_send_again_on_drop() {
        let mut queue = CompletionQueue::new();
        queue.responder().fail(BackendError::Rejected("no".into()));

        assert_eq!(queue.drain().len(), 1);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_drain_empty_queue_returns_nothing() {
        let mut queue = CompletionQueue::new();
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_tickets_are_unique() {
        let queue = CompletionQueue::new();
        let a = queue.responder().ticket();
        let b = queue.responder().ticket();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_responder_from_another_thread_arrives() {
        let mut queue = CompletionQueue::new();
        let responder = queue.responder();

        std::thread::spawn(move || responder.succeed(BackendResponse::Ack))
            .join()
            .unwrap();

        assert_eq!(queue.drain().len(), 1);
    }
}
