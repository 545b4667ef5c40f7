//! Session search and match-queue polling for drift-online.
//!
//! The Drift match queue is request/response only: join it, then poll
//! until the backend places you. This crate turns that into the two
//! engine-facing searches (find sessions, matchmaking) and their
//! completion notices.
//!
//! # Key types
//!
//! - [`SearchCoordinator`]: owns the single in-flight search and routes
//!   backend completions to it
//! - [`MatchQueueClient`]: tick-driven polling loop, emits status changes
//! - [`SearchRequest`] / [`SearchResult`]: what was asked and what came back
//! - [`SearchNotice`]: outcomes for the owner to broadcast
//! - [`MatchmakingConfig`]: poll interval and matched-session capacity

mod config;
mod coordinator;
mod error;
mod queue;
mod search;

pub use config::MatchmakingConfig;
pub use coordinator::{SearchCoordinator, SearchNotice};
pub use error::SearchError;
pub use queue::MatchQueueClient;
pub use search::{
    MatchmakingQuery, SearchId, SearchKind, SearchRequest, SearchResult, SearchState,
};
