//! Matchmaking configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for queue polling and matched-session results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchmakingConfig {
    /// Time between match-queue polls.
    ///
    /// Default: 3 seconds.
    pub poll_interval: Duration,

    /// Public capacity reported for a session found through the queue.
    /// The queue doesn't say how big the match is.
    ///
    /// Default: 2.
    pub matched_session_capacity: u32,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            matched_session_capacity: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matchmaking_config_default() {
        let config = MatchmakingConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.matched_session_capacity, 2);
    }
}
