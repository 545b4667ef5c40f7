//! The session registry: every named session this process knows about.
//!
//! # Concurrency note
//!
//! Unlike the rest of the session layer, the registry IS shared across
//! threads. Engine code may look sessions up from a render or game thread
//! while the tick thread is mutating them. Every scan and every mutation
//! takes the same `std::sync::Mutex`.
//!
//! Sessions are handed out as snapshots ([`find`](SessionRegistry::find))
//! or through a closure that runs under the lock
//! ([`with_session_mut`](SessionRegistry::with_session_mut)). There is no
//! way to hold a reference to a live entry after the lock is released.

use std::sync::{Mutex, MutexGuard, PoisonError};

use drift_online_types::SessionName;

use crate::{NamedSession, SessionError, SessionState};

/// Thread-safe collection of named sessions, at most one per name.
///
/// Typically shared as `Arc<SessionRegistry>`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<Vec<NamedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock.
    ///
    /// A panic while holding the lock can't leave a session half-written
    /// in a way that matters (every field is plain data), so a poisoned
    /// lock is simply recovered.
    fn lock(&self) -> MutexGuard<'_, Vec<NamedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a session.
    ///
    /// The duplicate check and the insert happen under one lock, so two
    /// threads racing to create the same name can't both succeed.
    ///
    /// # Errors
    /// [`SessionError::AlreadyExists`] if the name is taken. The existing
    /// session is left untouched.
    pub fn add(&self, session: NamedSession) -> Result<(), SessionError> {
        let mut sessions = self.lock();
        if sessions.iter().any(|s| s.name == session.name) {
            return Err(SessionError::AlreadyExists(session.name));
        }
        tracing::debug!(session = %session.name, state = %session.state, "session registered");
        sessions.push(session);
        Ok(())
    }

    /// Returns a copy of the named session.
    pub fn find(&self, name: &SessionName) -> Option<NamedSession> {
        self.lock().iter().find(|s| &s.name == name).cloned()
    }

    /// Reads the live session under the lock without cloning it.
    pub fn with_session<R>(
        &self,
        name: &SessionName,
        f: impl FnOnce(&NamedSession) -> R,
    ) -> Option<R> {
        let sessions = self.lock();
        sessions.iter().find(|s| &s.name == name).map(f)
    }

    /// Runs `f` on the live session while holding the lock.
    ///
    /// Returns `None` (without calling `f`) if no such session exists.
    /// Keep `f` short: every other registry user waits for it.
    pub fn with_session_mut<R>(
        &self,
        name: &SessionName,
        f: impl FnOnce(&mut NamedSession) -> R,
    ) -> Option<R> {
        let mut sessions = self.lock();
        sessions.iter_mut().find(|s| &s.name == name).map(f)
    }

    /// Removes the named session and returns it.
    ///
    /// Order is not preserved (`swap_remove`). Absent names are a no-op.
    pub fn remove(&self, name: &SessionName) -> Option<NamedSession> {
        let mut sessions = self.lock();
        let index = sessions.iter().position(|s| &s.name == name)?;
        let removed = sessions.swap_remove(index);
        tracing::debug!(session = %name, "session unregistered");
        Some(removed)
    }

    /// The session's state, or [`SessionState::NoSession`] if absent.
    pub fn state_of(&self, name: &SessionName) -> SessionState {
        self.lock()
            .iter()
            .find(|s| &s.name == name)
            .map(|s| s.state)
            .unwrap_or(SessionState::NoSession)
    }

    pub fn contains(&self, name: &SessionName) -> bool {
        self.lock().iter().any(|s| &s.name == name)
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if any session satisfies `pred`.
    pub fn any(&self, pred: impl Fn(&NamedSession) -> bool) -> bool {
        self.lock().iter().any(pred)
    }

    /// Copies of every session, in registry order.
    pub fn snapshot(&self) -> Vec<NamedSession> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionRegistry`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use std::sync::Arc;

    use drift_online_types::PlayerId;

    use super::*;
    use crate::SessionSettings;

    // -- Helpers ----------------------------------------------------------

    fn named(name: &str) -> NamedSession {
        NamedSession::new(
            SessionName::new(name),
            SessionSettings::default().with_public_connections(4),
        )
    }

    // -- add --------------------------------------------------------------

    #[test]
    fn test_add_new_name_succeeds() {
        let registry = SessionRegistry::new();
        registry.add(named("Game")).unwrap();

        assert_eq!(registry.count(), 1);
        assert_eq!(registry.state_of(&SessionName::game()), SessionState::Creating);
    }

    #[test]
    fn test_add_duplicate_returns_already_exists() {
        let registry = SessionRegistry::new();
        registry.add(named("Game")).unwrap();
        registry
            .with_session_mut(&SessionName::game(), |s| s.state = SessionState::InProgress)
            .unwrap();

        let result = registry.add(named("Game"));

        assert_eq!(result, Err(SessionError::AlreadyExists(SessionName::game())));
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.state_of(&SessionName::game()), SessionState::InProgress);
    }

    #[test]
    fn test_add_concurrent_same_name_only_one_wins() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.add(named("Game")).is_ok())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(registry.count(), 1);
    }

    // -- find / with_session_mut -----------------------------------------

    #[test]
    fn test_find_returns_snapshot_not_live_entry() {
        let registry = SessionRegistry::new();
        registry.add(named("Game")).unwrap();

        let mut copy = registry.find(&SessionName::game()).unwrap();
        copy.state = SessionState::Ended;

        assert_eq!(registry.state_of(&SessionName::game()), SessionState::Creating);
    }

    #[test]
    fn test_with_session_reads_live_entry() {
        let registry = SessionRegistry::new();
        registry.add(named("Game")).unwrap();
        registry.add(named("Party")).unwrap();

        let name = registry.with_session(&SessionName::new("Party"), |s| s.name.clone());
        let missing = registry.with_session(&SessionName::new("Lobby"), |_| ());

        assert_eq!(name, Some(SessionName::new("Party")));
        assert!(missing.is_none());
    }

    #[test]
    fn test_with_session_mut_missing_returns_none() {
        let registry = SessionRegistry::new();
        let called = registry.with_session_mut(&SessionName::game(), |_| ());
        assert!(called.is_none());
    }

    #[test]
    fn test_with_session_mut_mutates_live_entry() {
        let registry = SessionRegistry::new();
        registry.add(named("Game")).unwrap();

        let registered = registry
            .with_session_mut(&SessionName::game(), |s| s.register_player(PlayerId(1)))
            .unwrap();

        assert_eq!(registered, Ok(true));
        let session = registry.find(&SessionName::game()).unwrap();
        assert_eq!(session.num_open_public_connections, 3);
    }

    // -- remove -----------------------------------------------------------

    #[test]
    fn test_remove_existing_returns_session() {
        let registry = SessionRegistry::new();
        registry.add(named("Game")).unwrap();
        registry.add(named("Party")).unwrap();

        let removed = registry.remove(&SessionName::game()).unwrap();

        assert_eq!(removed.name, SessionName::game());
        assert_eq!(registry.count(), 1);
        assert!(registry.contains(&SessionName::new("Party")));
        assert_eq!(registry.state_of(&SessionName::game()), SessionState::NoSession);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = SessionRegistry::new();
        registry.add(named("Party")).unwrap();

        assert!(registry.remove(&SessionName::game()).is_none());
        assert_eq!(registry.count(), 1);
    }

    // -- any / snapshot ---------------------------------------------------

    #[test]
    fn test_any_matches_predicate() {
        let registry = SessionRegistry::new();
        let mut party = named("Party");
        party.settings.uses_presence = true;
        registry.add(named("Game")).unwrap();
        registry.add(party).unwrap();

        assert!(registry.any(|s| s.settings.uses_presence));
        assert!(!registry.any(|s| s.state == SessionState::InProgress));
    }

    #[test]
    fn test_snapshot_copies_every_session() {
        let registry = SessionRegistry::new();
        registry.add(named("Game")).unwrap();
        registry.add(named("Party")).unwrap();

        let names: Vec<_> = registry
            .snapshot()
            .into_iter()
            .map(|s| s.name.to_string())
            .collect();
        assert_eq!(names, vec!["Game", "Party"]);
    }
}
