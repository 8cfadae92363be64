//! Test module for mobupps-core
//!
//! Covers the orchestrators end to end against a scripted transport:
//! - Search request building, reply mapping and bounded history
//! - Neighbor canonicalization and prediction mapping
//! - Metrics normalization of backend documents
//! - Poll scheduling, tick coalescing and stale-response rejection
//! - Config and history files on disk

// Test modules use exact float comparisons
#![allow(clippy::float_cmp)]

mod config_tests;
mod poll_tests;
