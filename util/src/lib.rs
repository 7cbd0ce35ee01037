//! Shared plumbing for the attendance capture workspace: environment-backed
//! configuration and helpers used by tests across crates.

pub mod config;
pub mod test_helpers;
