//! Session settings: capacity, flags and free-form attributes.
//!
//! The engine describes a session with a handful of fixed fields
//! (connection counts, advertising flags) plus an open-ended attribute
//! map. The map carries game-specific values such as the map name and
//! game mode, which the match service needs when a match is registered.

use std::collections::BTreeMap;
use std::fmt;

use drift_online_types::MatchId;
use serde::{Deserialize, Serialize};

/// Well-known attribute keys.
pub mod keys {
    pub const MAP_NAME: &str = "MAPNAME";
    pub const GAME_MODE: &str = "GAMEMODE";
    pub const NUM_TEAMS: &str = "NUMTEAMS";
    pub const MATCH_ID: &str = "MATCHID";
}

// ---------------------------------------------------------------------------
// SettingValue
// ---------------------------------------------------------------------------

/// One attribute value.
///
/// `#[serde(untagged)]` makes these serialize as plain JSON values
/// (`"dm"`, `4`, `true`) instead of `{"Str": "dm"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl SettingValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of the value. Numeric strings are accepted, since
    /// some callers store counts as text.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Str(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for SettingValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

// ---------------------------------------------------------------------------
// SessionSettings
// ---------------------------------------------------------------------------

/// Everything the caller decides about a session before it exists.
///
/// Use [`Default`] and the `with_*` setters:
///
/// ```
/// use drift_online_session::SessionSettings;
///
/// let settings = SessionSettings::default()
///     .with_public_connections(4)
///     .with_map_name("arena")
///     .with_game_mode("dm");
/// assert_eq!(settings.max_players(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSettings {
    pub num_public_connections: u32,
    pub num_private_connections: u32,
    pub should_advertise: bool,
    pub allow_join_in_progress: bool,
    pub is_lan_match: bool,
    pub is_dedicated: bool,
    pub uses_presence: bool,
    pub allow_invites: bool,
    /// Build compatibility stamp. Overwritten from config at creation.
    pub build_unique_id: u32,
    pub attributes: BTreeMap<String, SettingValue>,
}

impl SessionSettings {
    pub fn with_public_connections(mut self, count: u32) -> Self {
        self.num_public_connections = count;
        self
    }

    pub fn with_private_connections(mut self, count: u32) -> Self {
        self.num_private_connections = count;
        self
    }

    pub fn with_presence(mut self, uses_presence: bool) -> Self {
        self.uses_presence = uses_presence;
        self
    }

    pub fn with_advertise(mut self, should_advertise: bool) -> Self {
        self.should_advertise = should_advertise;
        self
    }

    /// Sets an arbitrary attribute.
    pub fn with(mut self, key: &str, value: impl Into<SettingValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_map_name(self, map_name: &str) -> Self {
        self.with(keys::MAP_NAME, map_name)
    }

    pub fn with_game_mode(self, game_mode: &str) -> Self {
        self.with(keys::GAME_MODE, game_mode)
    }

    pub fn with_num_teams(self, num_teams: u32) -> Self {
        self.with(keys::NUM_TEAMS, num_teams)
    }

    pub fn set(&mut self, key: &str, value: impl Into<SettingValue>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.attributes.get(key)
    }

    /// Total slots, public plus private.
    pub fn max_players(&self) -> u32 {
        self.num_public_connections
            .saturating_add(self.num_private_connections)
    }

    /// The map name attribute, or `""` when unset.
    pub fn map_name(&self) -> &str {
        self.get(keys::MAP_NAME)
            .and_then(SettingValue::as_str)
            .unwrap_or_default()
    }

    /// The game mode attribute, or `""` when unset.
    pub fn game_mode(&self) -> &str {
        self.get(keys::GAME_MODE)
            .and_then(SettingValue::as_str)
            .unwrap_or_default()
    }

    /// The team count attribute. Non-positive values count as unset.
    pub fn num_teams(&self) -> Option<u32> {
        self.get(keys::NUM_TEAMS)
            .and_then(SettingValue::as_int)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
    }

    pub fn match_id(&self) -> Option<MatchId> {
        self.get(keys::MATCH_ID)
            .and_then(SettingValue::as_int)
            .and_then(|n| u32::try_from(n).ok())
            .map(MatchId)
    }

    pub fn set_match_id(&mut self, match_id: MatchId) {
        self.set(keys::MATCH_ID, match_id.0);
    }
}
