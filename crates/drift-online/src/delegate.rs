//! Completion notifications.
//!
//! Every session and search operation reports its outcome exactly once
//! through a [`Delegate`]: a list of subscriber callbacks, called in
//! subscription order on the thread that ticks the subsystem.
//!
//! ```text
//! create_session ──► AddMatch ──► (tick) ──► delegates.create.broadcast(..)
//!                                               ├─► subscriber 1
//!                                               └─► subscriber 2
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use drift_online_types::{PlayerId, SessionName};

/// Counter for generating unique subscription handles.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Identifies one subscription. Pass it to [`Delegate::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelegateHandle(u64);

impl fmt::Display for DelegateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H-{}", self.0)
    }
}

/// Boxed subscriber callback.
pub type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// A multicast notification channel.
pub struct Delegate<T> {
    subscribers: Vec<(DelegateHandle, Callback<T>)>,
}

impl<T> Delegate<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Subscribes `callback`. It runs on every later broadcast until removed.
    pub fn add(&mut self, callback: impl FnMut(&T) + Send + 'static) -> DelegateHandle {
        let handle = DelegateHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed));
        self.subscribers.push((handle, Box::new(callback)));
        handle
    }

    /// Unsubscribes. Returns `false` if the handle wasn't subscribed here.
    pub fn remove(&mut self, handle: DelegateHandle) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(h, _)| *h != handle);
        self.subscribers.len() != before
    }

    /// Calls every subscriber with `value`, in subscription order.
    pub fn broadcast(&mut self, value: &T) {
        for (_, callback) in &mut self.subscribers {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

impl<T> Default for Delegate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Delegate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Outcome of an operation on one named session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session: SessionName,
    pub success: bool,
}

impl SessionOutcome {
    pub fn new(session: SessionName, success: bool) -> Self {
        Self { session, success }
    }
}

/// How a join request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSessionResult {
    Success,
    AlreadyInSession,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub session: SessionName,
    pub result: JoinSessionResult,
}

/// Outcome of a register or unregister batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayersOutcome {
    pub session: SessionName,
    pub players: Vec<PlayerId>,
    pub success: bool,
}

// ---------------------------------------------------------------------------
// The full set
// ---------------------------------------------------------------------------

/// One delegate per operation kind.
#[derive(Debug, Default)]
pub struct SessionDelegates {
    pub create: Delegate<SessionOutcome>,
    pub start: Delegate<SessionOutcome>,
    pub update: Delegate<SessionOutcome>,
    pub end: Delegate<SessionOutcome>,
    pub destroy: Delegate<SessionOutcome>,
    pub join: Delegate<JoinOutcome>,
    pub register_players: Delegate<PlayersOutcome>,
    pub unregister_players: Delegate<PlayersOutcome>,
    pub matchmaking: Delegate<SessionOutcome>,
    pub cancel_matchmaking: Delegate<SessionOutcome>,
    /// Carries the search's success flag.
    pub find_sessions: Delegate<bool>,
    pub cancel_find_sessions: Delegate<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_broadcast_reaches_all_subscribers_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut delegate = Delegate::<u32>::new();

        let a = seen.clone();
        delegate.add(move |v| a.lock().unwrap().push(("a", *v)));
        let b = seen.clone();
        delegate.add(move |v| b.lock().unwrap().push(("b", *v)));

        delegate.broadcast(&7);

        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_remove_stops_delivery() {
        let count = Arc::new(Mutex::new(0));
        let mut delegate = Delegate::<()>::new();
        let c = count.clone();
        let handle = delegate.add(move |_| *c.lock().unwrap() += 1);

        delegate.broadcast(&());
        assert!(delegate.remove(handle));
        delegate.broadcast(&());

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(delegate.is_empty());
    }

    #[test]
    fn test_remove_unknown_handle_returns_false() {
        let mut a = Delegate::<()>::new();
        let mut b = Delegate::<()>::new();
        let handle = a.add(|_| {});

        assert!(!b.remove(handle));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_handles_are_unique() {
        let mut delegate = Delegate::<()>::new();
        let h1 = delegate.add(|_| {});
        let h2 = delegate.add(|_| {});
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut delegate = Delegate::<()>::new();
        delegate.add(|_| {});
        delegate.add(|_| {});
        delegate.clear();
        assert!(delegate.is_empty());
    }
}
