//! Memo domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the raw document shape separate from the typed memo view.
//!
//! # Invariants
//! - Every memo is identified by a store-assigned `MemoId`.
//! - Deletion is a hard delete; there is no tombstone state.

pub mod memo;
