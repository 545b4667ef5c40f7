//! Session types: a named session, its lifecycle state and connection info.
//!
//! A [`NamedSession`] is the local record of one game session. It tracks:
//! - WHAT state the session is in (creating, pending, in progress, ...)
//! - WHO hosts it and which players hold a slot
//! - HOW MANY public/private slots are still open
//! - WHERE to connect (the resolved server URL, once known)

use std::fmt;

use drift_online_types::{PlayerId, SessionName};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{SessionError, SessionSettings};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle state of a named session.
///
/// ```text
/// Creating ──(match added)──→ Pending ──(start)──→ InProgress
///                                ↑                     │
///                                └──(start)── Ended ←──(end)
///
/// any state ──(destroy)──→ [row removed] = NoSession
/// ```
///
/// `Starting`, `Ending` and `Destroying` exist for engine compatibility.
/// This implementation moves through them instantly and never stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// No session by that name exists.
    #[default]
    NoSession,
    Creating,
    Pending,
    Starting,
    InProgress,
    Ending,
    Ended,
    Destroying,
}

impl SessionState {
    /// Returns `true` if `start_session` is allowed from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Pending | Self::Ended)
    }

    /// Returns `true` if `end_session` is allowed from this state.
    pub fn can_end(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NoSession => "NoSession",
            Self::Creating => "Creating",
            Self::Pending => "Pending",
            Self::Starting => "Starting",
            Self::InProgress => "InProgress",
            Self::Ending => "Ending",
            Self::Ended => "Ended",
            Self::Destroying => "Destroying",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// SessionInfo
// ---------------------------------------------------------------------------

/// Identity and address of a session.
///
/// The id is generated locally when the session is created. The URL is
/// filled in once the match service tells us where the match runs; until
/// then the info is not [valid](Self::is_valid).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionInfo {
    /// 32-character hex string (128 bits of randomness).
    pub session_id: String,
    pub url: String,
}

impl SessionInfo {
    /// Creates info with a fresh random id and no URL.
    pub fn generate() -> Self {
        Self {
            session_id: generate_session_id(),
            url: String::new(),
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            session_id: generate_session_id(),
            url: url.into(),
        }
    }

    /// A session is joinable only once it has somewhere to connect to.
    pub fn is_valid(&self) -> bool {
        !self.url.is_empty()
    }
}

impl fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.session_id, self.url)
    }
}

/// Generates a cryptographically random session id.
///
/// 16 random bytes, formatted as lowercase hex.
fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// OnlineSession
// ---------------------------------------------------------------------------

/// A session as seen from outside: what a search result describes.
///
/// Joining turns one of these into a [`NamedSession`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OnlineSession {
    pub settings: SessionSettings,
    pub num_open_public_connections: u32,
    pub num_open_private_connections: u32,
    pub session_info: Option<SessionInfo>,
}

impl OnlineSession {
    /// The connection URL, if the session has a valid one.
    pub fn connect_url(&self) -> Option<&str> {
        self.session_info
            .as_ref()
            .filter(|info| info.is_valid())
            .map(|info| info.url.as_str())
    }
}

// ---------------------------------------------------------------------------
// NamedSession
// ---------------------------------------------------------------------------

/// A session registered locally under a name.
///
/// Slot bookkeeping lives here so the registry can stay a plain container.
/// The open counters never exceed the configured capacity, and
/// `registered_players` never outgrows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSession {
    pub name: SessionName,
    pub state: SessionState,
    pub settings: SessionSettings,
    pub num_open_public_connections: u32,
    pub num_open_private_connections: u32,
    /// The player that created or joined the session.
    pub hosting_player: Option<PlayerId>,
    /// Local user index of the hosting player.
    pub hosting_player_num: usize,
    pub registered_players: Vec<PlayerId>,
    pub session_info: Option<SessionInfo>,
}

impl NamedSession {
    /// Creates a session in `Creating` with every slot open.
    pub fn new(name: SessionName, settings: SessionSettings) -> Self {
        Self {
            name,
            state: SessionState::Creating,
            num_open_public_connections: settings.num_public_connections,
            num_open_private_connections: settings.num_private_connections,
            settings,
            hosting_player: None,
            hosting_player_num: 0,
            registered_players: Vec::new(),
            session_info: None,
        }
    }

    /// Builds the local record for a session found by a search.
    ///
    /// Settings, open counters and connection info are copied.
    /// Advertising is turned off: a joined session is never re-listed.
    pub fn from_search_result(name: SessionName, found: &OnlineSession) -> Self {
        let mut settings = found.settings.clone();
        settings.should_advertise = false;
        Self {
            name,
            state: SessionState::Pending,
            num_open_public_connections: found
                .num_open_public_connections
                .min(settings.num_public_connections),
            num_open_private_connections: found
                .num_open_private_connections
                .min(settings.num_private_connections),
            settings,
            hosting_player: None,
            hosting_player_num: 0,
            registered_players: Vec::new(),
            session_info: found.session_info.clone(),
        }
    }

    pub fn with_host(mut self, player: PlayerId, player_num: usize) -> Self {
        self.hosting_player = Some(player);
        self.hosting_player_num = player_num;
        self
    }

    pub fn is_player_registered(&self, player: PlayerId) -> bool {
        self.registered_players.contains(&player)
    }

    pub fn capacity(&self) -> u32 {
        self.settings.max_players()
    }

    pub fn open_connections(&self) -> u32 {
        self.num_open_public_connections
            .saturating_add(self.num_open_private_connections)
    }

    /// The resolved connection URL, if any.
    pub fn connect_url(&self) -> Option<&str> {
        self.session_info
            .as_ref()
            .filter(|info| info.is_valid())
            .map(|info| info.url.as_str())
    }

    /// Adds a player and takes a slot (public first, then private).
    ///
    /// Returns `Ok(false)` if the player was already registered. Nothing
    /// changes in that case.
    ///
    /// # Errors
    /// [`SessionError::SessionFull`] if no slot is open.
    pub fn register_player(&mut self, player: PlayerId) -> Result<bool, SessionError> {
        if self.is_player_registered(player) {
            return Ok(false);
        }
        if self.num_open_public_connections > 0 {
            self.num_open_public_connections -= 1;
        } else if self.num_open_private_connections > 0 {
            self.num_open_private_connections -= 1;
        } else {
            return Err(SessionError::SessionFull {
                name: self.name.clone(),
                player,
            });
        }
        self.registered_players.push(player);
        Ok(true)
    }

    /// Removes a player and gives a slot back.
    ///
    /// Public slots are refilled first. Neither counter goes past its
    /// capacity. Returns `false` if the player wasn't registered.
    pub fn unregister_player(&mut self, player: PlayerId) -> bool {
        let Some(index) = self.registered_players.iter().position(|p| *p == player) else {
            return false;
        };
        self.registered_players.swap_remove(index);

        if self.num_open_public_connections < self.settings.num_public_connections {
            self.num_open_public_connections += 1;
        } else if self.num_open_private_connections < self.settings.num_private_connections {
            self.num_open_private_connections += 1;
        }
        true
    }

    /// Replaces the settings and rebases the open counters on the new
    /// capacity.
    ///
    /// Occupied private slots stay private where they fit; the rest spill
    /// into public slots.
    ///
    /// # Errors
    /// [`SessionError::CapacityBelowRegistered`] if the new capacity can't
    /// hold the players already registered. The session is unchanged.
    pub fn rebase_settings(&mut self, settings: SessionSettings) -> Result<(), SessionError> {
        let registered = u32::try_from(self.registered_players.len()).unwrap_or(u32::MAX);
        if settings.max_players() < registered {
            return Err(SessionError::CapacityBelowRegistered {
                requested: settings.max_players(),
                registered,
            });
        }

        let used_public = self
            .settings
            .num_public_connections
            .saturating_sub(self.num_open_public_connections);
        let used_private = self
            .settings
            .num_private_connections
            .saturating_sub(self.num_open_private_connections);

        let kept_private = used_private.min(settings.num_private_connections);
        let spilled = used_private - kept_private;
        let kept_public = used_public
            .saturating_add(spilled)
            .min(settings.num_public_connections);

        self.num_open_public_connections = settings.num_public_connections - kept_public;
        self.num_open_private_connections = settings.num_private_connections - kept_private;
        self.settings = settings;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(public: u32, private: u32) -> NamedSession {
        NamedSession::new(
            SessionName::game(),
            SessionSettings::default()
                .with_public_connections(public)
                .with_private_connections(private),
        )
    }

    #[test]
    fn test_new_opens_all_slots_in_creating() {
        let s = session(4, 2);
        assert_eq!(s.state, SessionState::Creating);
        assert_eq!(s.num_open_public_connections, 4);
        assert_eq!(s.num_open_private_connections, 2);
        assert!(s.registered_players.is_empty());
    }

    #[test]
    fn test_register_player_takes_public_before_private() {
        let mut s = session(1, 1);

        assert_eq!(s.register_player(PlayerId(1)), Ok(true));
        assert_eq!(s.num_open_public_connections, 0);
        assert_eq!(s.num_open_private_connections, 1);

        assert_eq!(s.register_player(PlayerId(2)), Ok(true));
        assert_eq!(s.num_open_private_connections, 0);
    }

    #[test]
    fn test_register_player_twice_is_noop() {
        let mut s = session(4, 0);
        s.register_player(PlayerId(1)).unwrap();

        assert_eq!(s.register_player(PlayerId(1)), Ok(false));
        assert_eq!(s.registered_players, vec![PlayerId(1)]);
        assert_eq!(s.num_open_public_connections, 3);
    }

    #[test]
    fn test_register_player_full_returns_error() {
        let mut s = session(1, 0);
        s.register_player(PlayerId(1)).unwrap();

        let result = s.register_player(PlayerId(2));
        assert!(matches!(result, Err(SessionError::SessionFull { player, .. }) if player == PlayerId(2)));
        assert_eq!(s.registered_players.len(), 1);
    }

    #[test]
    fn test_unregister_player_refills_public_first_and_caps() {
        let mut s = session(1, 1);
        s.register_player(PlayerId(1)).unwrap();
        s.register_player(PlayerId(2)).unwrap();

        assert!(s.unregister_player(PlayerId(2)));
        assert_eq!(s.num_open_public_connections, 1);
        assert_eq!(s.num_open_private_connections, 0);

        assert!(s.unregister_player(PlayerId(1)));
        assert_eq!(s.num_open_public_connections, 1);
        assert_eq!(s.num_open_private_connections, 1);
    }

    #[test]
    fn test_unregister_player_absent_returns_false() {
        let mut s = session(2, 0);
        assert!(!s.unregister_player(PlayerId(9)));
        assert_eq!(s.num_open_public_connections, 2);
    }

    #[test]
    fn test_rebase_settings_below_registered_returns_error() {
        let mut s = session(4, 0);
        s.register_player(PlayerId(1)).unwrap();
        s.register_player(PlayerId(2)).unwrap();

        let result = s.rebase_settings(SessionSettings::default().with_public_connections(1));
        assert_eq!(
            result,
            Err(SessionError::CapacityBelowRegistered { requested: 1, registered: 2 })
        );
        assert_eq!(s.settings.num_public_connections, 4);
    }

    #[test]
    fn test_rebase_settings_keeps_occupied_slots() {
        let mut s = session(2, 2);
        s.register_player(PlayerId(1)).unwrap();
        s.register_player(PlayerId(2)).unwrap();
        s.register_player(PlayerId(3)).unwrap();

        // 2 public + 1 private used; shrink private to 0.
        s.rebase_settings(
            SessionSettings::default()
                .with_public_connections(5)
                .with_private_connections(0),
        )
        .unwrap();

        assert_eq!(s.num_open_public_connections, 2);
        assert_eq!(s.num_open_private_connections, 0);
        assert_eq!(s.capacity(), 5);
    }

    #[test]
    fn test_from_search_result_disables_advertising() {
        let found = OnlineSession {
            settings: SessionSettings::default()
                .with_public_connections(8)
                .with_advertise(true),
            num_open_public_connections: 5,
            num_open_private_connections: 0,
            session_info: Some(SessionInfo::with_url("10.0.0.2:7777")),
        };

        let s = NamedSession::from_search_result(SessionName::game(), &found);

        assert_eq!(s.state, SessionState::Pending);
        assert!(!s.settings.should_advertise);
        assert_eq!(s.num_open_public_connections, 5);
        assert_eq!(s.connect_url(), Some("10.0.0.2:7777"));
    }

    #[test]
    fn test_session_info_generate_is_invalid_until_url() {
        let info = SessionInfo::generate();
        assert_eq!(info.session_id.len(), 32);
        assert!(info.session_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!info.is_valid());

        assert_ne!(info.session_id, SessionInfo::generate().session_id);
    }

    #[test]
    fn test_session_state_transitions_allowed() {
        assert!(SessionState::Pending.can_start());
        assert!(SessionState::Ended.can_start());
        assert!(!SessionState::Creating.can_start());
        assert!(!SessionState::InProgress.can_start());
        assert!(SessionState::InProgress.can_end());
        assert!(!SessionState::Pending.can_end());
    }
}
