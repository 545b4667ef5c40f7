//! Shared vocabulary for the drift-online crates.
//!
//! Every other crate in the workspace speaks in terms of these types:
//!
//! - **Identity** ([`PlayerId`], [`SessionName`], [`MatchId`]): who is
//!   playing, which local session they're in, which backend match hosts it.
//! - **Match-service payloads** ([`QueueStatus`], [`MatchQueueStatus`],
//!   [`MatchQueueMatch`], [`ActiveMatch`], [`MatchQueueState`]): the data
//!   the Drift backend hands back when a request completes.
//! - **Dispatch** ([`Dispatch`]): whether an operation finished inline
//!   or will finish on a later tick.
//! - **Errors** ([`TypesError`]): parsing failures for the string forms
//!   the backend uses.
//!
//! # Architecture
//!
//! ```text
//! Backend (requests/completions) → Types (payloads) ← Session / Matchmaking
//! ```
//!
//! Nothing in here knows about locks, ticks or notifications. These are
//! plain values that can be cloned, compared and serialized.

mod dispatch;
mod error;
mod ids;
mod queue;

pub use dispatch::Dispatch;
pub use error::TypesError;
pub use ids::{MatchId, PlayerId, SessionName};
pub use queue::{
    ActiveMatch, MatchQueueMatch, MatchQueueState, MatchQueueStatus,
    QueueStatus,
};
