//! An in-memory backend that records requests and answers on demand.
//!
//! Nothing is answered automatically. A test submits work through the
//! session layer, inspects what was sent with [`RecordingBackend::requests`],
//! then decides how (and when) each request completes. That makes the
//! asynchronous paths deterministic: the test *is* the network.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use drift_online_types::MatchQueueState;

use crate::{
    BackendError, BackendRequest, BackendResponse, MatchBackend, Responder,
    Ticket,
};

#[derive(Default)]
struct Recorded {
    /// Every request ever submitted, in order.
    history: Vec<BackendRequest>,
    /// Requests still waiting for an answer, oldest first.
    pending: VecDeque<(BackendRequest, Responder)>,
    queue_state: MatchQueueState,
    queue_resets: usize,
}

/// A [`MatchBackend`] driven by the test (or demo) that owns it.
#[derive(Default)]
pub struct RecordingBackend {
    inner: Mutex<Recorded>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All requests submitted so far, answered or not.
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.lock().history.clone()
    }

    /// Requests that haven't been answered yet.
    pub fn pending_requests(&self) -> Vec<BackendRequest> {
        self.lock().pending.iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn pending_tickets(&self) -> Vec<Ticket> {
        self.lock().pending.iter().map(|(_, r)| r.ticket()).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Answers the oldest pending request. Returns what was answered.
    pub fn complete_next(
        &self,
        outcome: Result<BackendResponse, BackendError>,
    ) -> Option<BackendRequest> {
        // Pop under the lock, answer outside it.
        let (request, responder) = self.lock().pending.pop_front()?;
        responder.respond(outcome);
        Some(request)
    }

    /// Answers the oldest pending request matching `pred`.
    pub fn complete_where(
        &self,
        pred: impl Fn(&BackendRequest) -> bool,
        outcome: Result<BackendResponse, BackendError>,
    ) -> Option<BackendRequest> {
        let entry = {
            let mut inner = self.lock();
            let index = inner.pending.iter().position(|(r, _)| pred(r))?;
            inner.pending.remove(index)
        };
        let (request, responder) = entry?;
        responder.respond(outcome);
        Some(request)
    }

    /// Acknowledges every pending request with [`BackendResponse::Ack`].
    /// Returns how many were answered.
    pub fn ack_all(&self) -> usize {
        let drained: Vec<_> = self.lock().pending.drain(..).collect();
        let count = drained.len();
        for (_, responder) in drained {
            responder.succeed(BackendResponse::Ack);
        }
        count
    }

    pub fn set_queue_state(&self, state: MatchQueueState) {
        self.lock().queue_state = state;
    }

    /// How many times `reset_match_queue` was called.
    pub fn queue_resets(&self) -> usize {
        self.lock().queue_resets
    }
}

impl MatchBackend for RecordingBackend {
    fn submit(&self, request: BackendRequest, responder: Responder) {
        let mut inner = self.lock();
        inner.history.push(request.clone());
        inner.pending.push_back((request, responder));
    }

    fn match_queue_state(&self) -> MatchQueueState {
        self.lock().queue_state
    }

    fn reset_match_queue(&self) {
        let mut inner = self.lock();
        inner.queue_resets += 1;
        inner.queue_state = MatchQueueState::Idle;
    }
}
