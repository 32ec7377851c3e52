//! Read-side projections of memo snapshots for list screens.
//!
//! # Responsibility
//! - Turn an ordered snapshot into display items without touching storage.
//!
//! # Invariants
//! - Projections are pure: same snapshot and mode, same items.

pub mod grouping;
