//! The subsystem: owns the session interface and drives it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use drift_online_backend::{BackendLink, MatchBackend};
use drift_online_session::SessionRegistry;
use drift_online_tick::{TickScheduler, Tickable, drive};

use crate::{DriftConfig, NetRole, OnlineSessionDrift};

/// Builder for [`OnlineSubsystemDrift`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use drift_online::prelude::*;
///
/// let backend = Arc::new(RecordingBackend::new());
/// let mut subsystem = OnlineSubsystemDrift::builder()
///     .role(NetRole::DedicatedServer)
///     .backend(backend)
///     .build();
/// subsystem.tick(std::time::Duration::from_millis(33));
/// ```
pub struct OnlineSubsystemDriftBuilder {
    config: DriftConfig,
    backend: Option<Arc<dyn MatchBackend>>,
    registry: Option<Arc<SessionRegistry>>,
}

impl OnlineSubsystemDriftBuilder {
    /// Creates a new builder with default settings and no backend.
    pub fn new() -> Self {
        Self {
            config: DriftConfig::default(),
            backend: None,
            registry: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: DriftConfig) -> Self {
        self.config = config;
        self
    }

    pub fn role(mut self, role: NetRole) -> Self {
        self.config.role = role;
        self
    }

    /// Attaches a match service. Without one every backend call fails
    /// with `BackendUnavailable` until one is attached.
    pub fn backend(mut self, backend: Arc<dyn MatchBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Shares an existing registry instead of creating a fresh one.
    pub fn registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> OnlineSubsystemDrift {
        let link = match self.backend {
            Some(backend) => BackendLink::new(backend),
            None => BackendLink::detached(),
        };
        let registry = self.registry.unwrap_or_default();
        tracing::info!(
            role = ?self.config.role,
            backend = link.is_available(),
            "drift online subsystem ready"
        );
        OnlineSubsystemDrift {
            sessions: OnlineSessionDrift::new(self.config, registry, link),
        }
    }
}

impl Default for OnlineSubsystemDriftBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry point for hosts: hands out the session interface and ticks it.
#[derive(Debug)]
pub struct OnlineSubsystemDrift {
    sessions: OnlineSessionDrift,
}

impl OnlineSubsystemDrift {
    pub fn builder() -> OnlineSubsystemDriftBuilder {
        OnlineSubsystemDriftBuilder::new()
    }

    pub fn session_interface(&self) -> &OnlineSessionDrift {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut OnlineSessionDrift {
        &mut self.sessions
    }

    /// Drains backend completions, then advances matchmaking.
    pub fn tick(&mut self, dt: Duration) {
        self.sessions.tick(dt);
    }

    /// Ticks on `scheduler` until `shutdown` resolves. Returns the number
    /// of ticks run.
    pub async fn run<F>(&mut self, scheduler: &mut TickScheduler, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tracing::info!(rate_hz = scheduler.tick_rate_hz(), "drift online subsystem running");
        drive(scheduler, self, shutdown).await
    }
}

impl Tickable for OnlineSubsystemDrift {
    fn tick(&mut self, dt: Duration) {
        OnlineSubsystemDrift::tick(self, dt);
    }
}
