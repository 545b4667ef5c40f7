//! Identity types: players, sessions and backend matches.
//!
//! All three are "newtype wrappers". A `PlayerId` and a `MatchId` are both
//! `u32` underneath, but the compiler won't let you pass one where the
//! other is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TypesError;

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// A Drift player identifier.
///
/// Drift hands out 32-bit ids and reserves `0` for "no player". The
/// `#[serde(transparent)]` attribute makes `PlayerId(42)` serialize as
/// just `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Returns `true` unless this is the reserved zero id.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player ids travel through search queries and invite payloads as
/// strings, so they need to parse back.
impl FromStr for PlayerId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(PlayerId)
            .map_err(|_| TypesError::InvalidPlayerId(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// SessionName
// ---------------------------------------------------------------------------

/// The key a local session is registered under.
///
/// Names are chosen by the caller ("Game", "Party", ...), not derived from
/// the session's content. At most one session per name exists at a time.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionName(String);

impl SessionName {
    /// The conventional name for the main game session.
    pub const GAME: &'static str = "Game";

    /// The conventional name for a party/lobby session.
    pub const PARTY: &'static str = "Party";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Shorthand for `SessionName::new(SessionName::GAME)`.
    pub fn game() -> Self {
        Self::new(Self::GAME)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SessionName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ---------------------------------------------------------------------------
// MatchId
// ---------------------------------------------------------------------------

/// Identifier of a match on the Drift backend.
///
/// Stored alongside search results (and in the `match_id` session
/// setting) so a joined session can be tied back to its backend match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MatchId(pub u32);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}
