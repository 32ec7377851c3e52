//! Client-side repositories over the remote store.
//!
//! # Responsibility
//! - Cache live query results for the current session.
//! - Turn user intents (save into group) into store writes.
//!
//! # Invariants
//! - Repository writes go through the `RemoteStore` write boundary; the live
//!   subscription is the only path by which cached data changes.

pub mod memo_repo;
