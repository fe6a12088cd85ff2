//! Integration test crate for gavel components.
//!
//! This crate exists solely to run integration tests that span the agent and
//! auction crates. It has no public API - all functionality is in the test
//! modules.

#![forbid(unsafe_code)]
