//! Screen-level use-cases.
//!
//! # Responsibility
//! - Orchestrate repository and store calls into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod detail_service;
pub mod entry_service;
pub mod list_service;
