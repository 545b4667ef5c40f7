//! Named-session bookkeeping for drift-online.
//!
//! This crate holds the local record of every game session:
//!
//! 1. **Settings**: capacity, flags and attributes ([`SessionSettings`])
//! 2. **Sessions**: state, host, registered players and open slots
//!    ([`NamedSession`])
//! 3. **Registry**: the thread-safe, name-keyed collection
//!    ([`SessionRegistry`])
//!
//! # How it fits in the stack
//!
//! ```text
//! OnlineSessionDrift (above)  ← drives the lifecycle, talks to the backend
//!     ↕
//! Session Layer (this crate)  ← stores sessions, enforces slot accounting
//!     ↕
//! Types (below)  ← provides PlayerId, SessionName, MatchId
//! ```
//!
//! Nothing here talks to the match service. Lifecycle *rules* (which
//! transitions are legal, what the backend is told) live one layer up.

mod error;
mod registry;
mod session;
mod settings;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{NamedSession, OnlineSession, SessionInfo, SessionState};
pub use settings::{SessionSettings, SettingValue, keys};
