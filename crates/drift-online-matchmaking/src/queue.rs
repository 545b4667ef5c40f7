//! The match-queue client: turns a polled queue into status-change events.
//!
//! The Drift match queue has no push channel. Once we're queued, the only
//! way to learn about a match is to ask. [`MatchQueueClient`] owns that
//! polling loop:
//!
//! ```text
//!          tick(dt) counts the delay down
//!               │
//!               ▼ delay elapsed, not polling, not terminal
//!          begin_poll() ──→ PollQueue request in flight
//!               │
//!               ▼
//!   on_poll_complete(result) ──→ Some(status) if it changed
//!               │
//!               └──→ delay reset to poll_interval
//! ```
//!
//! It never talks to the backend itself. The caller decides how to send
//! the poll and feeds the answer back, which keeps this type a plain,
//! synchronous state machine.

use std::time::Duration;

use drift_online_backend::BackendError;
use drift_online_types::{MatchQueueMatch, MatchQueueStatus, QueueStatus};

/// Client-side view of one queue membership.
#[derive(Debug, Clone)]
pub struct MatchQueueClient {
    status: QueueStatus,
    current_match: Option<MatchQueueMatch>,
    poll_interval: Duration,
    /// Time left until the next poll is due.
    poll_delay: Duration,
    /// `true` while a poll request is in flight.
    is_polling: bool,
}

impl MatchQueueClient {
    /// Creates a client for a queue we've just joined.
    ///
    /// Starts in `Waiting` and waits one full interval before the first
    /// poll.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            status: QueueStatus::Waiting,
            current_match: None,
            poll_interval,
            poll_delay: poll_interval,
            is_polling: false,
        }
    }

    pub fn status(&self) -> QueueStatus {
        self.status
    }

    /// Connection details, once matched.
    pub fn current_match(&self) -> Option<&MatchQueueMatch> {
        self.current_match.as_ref()
    }

    pub fn is_polling(&self) -> bool {
        self.is_polling
    }

    /// Advances the poll timer.
    ///
    /// Returns `true` when a poll should be sent now. The timer is frozen
    /// while a poll is in flight and stops for good once the status is
    /// terminal.
    pub fn tick(&mut self, dt: Duration) -> bool {
        if self.is_polling || self.status.is_terminal() {
            return false;
        }
        self.poll_delay = self.poll_delay.saturating_sub(dt);
        self.poll_delay.is_zero()
    }

    /// Marks a poll as in flight. Call after the request was sent.
    pub fn begin_poll(&mut self) {
        tracing::trace!(status = %self.status, "polling match queue");
        self.is_polling = true;
    }

    /// Applies the answer to a poll.
    ///
    /// Returns the new status if it differs from the previous one. A failed
    /// poll only resets the timer; the next tick cycle will try again.
    pub fn on_poll_complete(
        &mut self,
        result: Result<MatchQueueStatus, BackendError>,
    ) -> Option<QueueStatus> {
        self.is_polling = false;
        self.poll_delay = self.poll_interval;

        let polled = match result {
            Ok(polled) => polled,
            Err(e) => {
                tracing::debug!(error = %e, "match queue poll failed");
                return None;
            }
        };

        let previous = self.status;
        match polled.status {
            QueueStatus::Matched => self.current_match = polled.matched,
            QueueStatus::Waiting | QueueStatus::TimedOut | QueueStatus::Usurped => {
                self.current_match = None;
            }
            QueueStatus::None => {}
        }
        self.status = polled.status;

        if previous == self.status {
            return None;
        }
        tracing::debug!(from = %previous, to = %self.status, "match queue status changed");
        Some(self.status)
    }
}

#[cfg(test)]
mod tests {
    use drift_online_types::MatchId;

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(3);

    fn matched() -> MatchQueueStatus {
        MatchQueueStatus::matched(MatchQueueMatch {
            match_id: MatchId(5),
            connection_url: "10.0.0.5:7777".into(),
        })
    }

    /// Ticks until a poll is due and marks it in flight.
    fn run_until_poll(client: &mut MatchQueueClient) {
        let mut guard = 0;
        while !client.tick(Duration::from_millis(500)) {
            guard += 1;
            assert!(guard < 100, "poll never became due");
        }
        client.begin_poll();
    }

    #[test]
    fn test_new_starts_waiting_without_match() {
        let client = MatchQueueClient::new(INTERVAL);
        assert_eq!(client.status(), QueueStatus::Waiting);
        assert!(client.current_match().is_none());
        assert!(!client.is_polling());
    }

    #[test]
    fn test_tick_due_only_after_full_interval() {
        let mut client = MatchQueueClient::new(INTERVAL);
        assert!(!client.tick(Duration::from_secs(1)));
        assert!(!client.tick(Duration::from_secs(1)));
        assert!(client.tick(Duration::from_secs(1)));
    }

    #[test]
    fn test_tick_while_polling_never_due() {
        let mut client = MatchQueueClient::new(INTERVAL);
        run_until_poll(&mut client);

        assert!(!client.tick(Duration::from_secs(60)));
    }

    #[test]
    fn test_on_poll_complete_waiting_waiting_matched_emits_once() {
        let mut client = MatchQueueClient::new(INTERVAL);
        let mut events = Vec::new();

        for polled in [MatchQueueStatus::waiting(), MatchQueueStatus::waiting(), matched()] {
            run_until_poll(&mut client);
            events.extend(client.on_poll_complete(Ok(polled)));
        }

        assert_eq!(events, vec![QueueStatus::Matched]);
        assert_eq!(client.current_match().map(|m| m.match_id), Some(MatchId(5)));
    }

    #[test]
    fn test_on_poll_complete_failure_only_resets_timer() {
        let mut client = MatchQueueClient::new(INTERVAL);
        run_until_poll(&mut client);

        let event = client.on_poll_complete(Err(BackendError::Unreachable("timeout".into())));

        assert_eq!(event, None);
        assert_eq!(client.status(), QueueStatus::Waiting);
        assert!(!client.is_polling());
        assert!(!client.tick(Duration::from_secs(2)));
        assert!(client.tick(Duration::from_secs(1)));
    }

    #[test]
    fn test_on_poll_complete_timed_out_clears_match_and_stops() {
        let mut client = MatchQueueClient::new(INTERVAL);
        run_until_poll(&mut client);

        let event = client.on_poll_complete(Ok(MatchQueueStatus::with_status(QueueStatus::TimedOut)));

        assert_eq!(event, Some(QueueStatus::TimedOut));
        assert!(client.current_match().is_none());
        assert!(!client.tick(Duration::from_secs(60)));
    }

    #[test]
    fn test_tick_after_matched_stops_polling() {
        let mut client = MatchQueueClient::new(INTERVAL);
        run_until_poll(&mut client);
        client.on_poll_complete(Ok(matched()));

        assert!(!client.tick(Duration::from_secs(60)));
    }
}
