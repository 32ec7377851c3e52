//! Flutter bridge for the memo core.

pub mod api;
