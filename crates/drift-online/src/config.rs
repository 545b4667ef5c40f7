//! Subsystem configuration.

use std::time::Duration;

use drift_online_matchmaking::MatchmakingConfig;
use serde::{Deserialize, Serialize};

/// Which side of the match this process plays.
///
/// A dedicated server owns the backend match: it reports match status
/// changes and player membership. A client only reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NetRole {
    #[default]
    Client,
    DedicatedServer,
}

impl NetRole {
    pub fn is_dedicated_server(&self) -> bool {
        matches!(self, Self::DedicatedServer)
    }
}

/// Configuration for [`OnlineSubsystemDrift`](crate::OnlineSubsystemDrift).
///
/// Start from `DriftConfig::default()` and override what you need:
///
/// ```
/// use drift_online::{DriftConfig, NetRole};
///
/// let config = DriftConfig::default()
///     .with_role(NetRole::DedicatedServer)
///     .with_build_unique_id(42);
/// assert!(config.role.is_dedicated_server());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Client or dedicated server. Default: client.
    pub role: NetRole,

    /// Time between match-queue polls. Default: 3 seconds.
    pub poll_interval: Duration,

    /// Stamped onto every created session's settings. Default: 0.
    pub build_unique_id: u32,

    /// Capacity reported for a session found through matchmaking.
    /// Default: 2.
    pub matched_session_capacity: u32,

    /// Team count sent when a session's settings don't name one.
    /// Default: 1.
    pub default_num_teams: u32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        let matchmaking = MatchmakingConfig::default();
        Self {
            role: NetRole::default(),
            poll_interval: matchmaking.poll_interval,
            build_unique_id: 0,
            matched_session_capacity: matchmaking.matched_session_capacity,
            default_num_teams: 1,
        }
    }
}

impl DriftConfig {
    pub fn with_role(mut self, role: NetRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_build_unique_id(mut self, build_unique_id: u32) -> Self {
        self.build_unique_id = build_unique_id;
        self
    }

    pub fn with_matched_session_capacity(mut self, capacity: u32) -> Self {
        self.matched_session_capacity = capacity;
        self
    }

    /// The slice of this config the search coordinator needs.
    pub fn matchmaking(&self) -> MatchmakingConfig {
        MatchmakingConfig {
            poll_interval: self.poll_interval,
            matched_session_capacity: self.matched_session_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_config_default() {
        let config = DriftConfig::default();
        assert_eq!(config.role, NetRole::Client);
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.build_unique_id, 0);
        assert_eq!(config.matched_session_capacity, 2);
        assert_eq!(config.default_num_teams, 1);
    }

    #[test]
    fn test_drift_config_deserializes_with_role() {
        let json = r#"{
            "role": "DedicatedServer",
            "poll_interval": { "secs": 1, "nanos": 0 },
            "build_unique_id": 7,
            "matched_session_capacity": 4,
            "default_num_teams": 2
        }"#;
        let config: DriftConfig = serde_json::from_str(json).unwrap();
        assert!(config.role.is_dedicated_server());
        assert_eq!(config.matchmaking().poll_interval, Duration::from_secs(1));
        assert_eq!(config.matchmaking().matched_session_capacity, 4);
    }
}
