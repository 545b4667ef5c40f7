//! # drift-online
//!
//! Sessions and matchmaking on the Drift match service, behind an
//! engine-style online-services interface.
//!
//! The host builds an [`OnlineSubsystemDrift`], subscribes to the
//! notifications it cares about, and ticks it. Sessions live in a shared
//! [`SessionRegistry`]; backend answers are processed on the tick.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use drift_online::prelude::*;
//!
//! drift_online::init_tracing();
//!
//! let mut subsystem = OnlineSubsystemDrift::builder()
//!     .backend(Arc::new(RecordingBackend::new()))
//!     .build();
//!
//! let sessions = subsystem.sessions_mut();
//! sessions.delegates_mut().create.add(|outcome| {
//!     println!("{} created: {}", outcome.session, outcome.success);
//! });
//! sessions.create_session(
//!     PlayerId(1),
//!     SessionName::game(),
//!     SessionSettings::default().with_public_connections(4),
//! )?;
//!
//! subsystem.tick(Duration::from_millis(33));
//! # Ok::<(), DriftError>(())
//! ```

mod config;
mod delegate;
mod error;
mod session_interface;
mod subsystem;

pub use config::{DriftConfig, NetRole};
pub use delegate::{
    Callback, Delegate, DelegateHandle, JoinOutcome, JoinSessionResult, PlayersOutcome,
    SessionDelegates, SessionOutcome,
};
pub use error::DriftError;
pub use session_interface::{DestroyCallback, OnlineSessionDrift};
pub use subsystem::{OnlineSubsystemDrift, OnlineSubsystemDriftBuilder};

pub use drift_online_backend as backend;
pub use drift_online_matchmaking as matchmaking;
pub use drift_online_session as session;
pub use drift_online_tick as tick;
pub use drift_online_types as types;

pub use drift_online_session::SessionRegistry;

/// Installs a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Convenient re-exports for hosts.
pub mod prelude {
    pub use crate::{
        DriftConfig, DriftError, JoinSessionResult, NetRole, OnlineSessionDrift,
        OnlineSubsystemDrift, SessionOutcome,
    };
    pub use drift_online_backend::{MatchBackend, RecordingBackend};
    pub use drift_online_matchmaking::{MatchmakingQuery, SearchResult, SearchState};
    pub use drift_online_session::{SessionSettings, SessionState};
    pub use drift_online_tick::{TickConfig, TickScheduler};
    pub use drift_online_types::{Dispatch, PlayerId, SessionName};
}
