//! Integration test suite for devmap
//!
//! End-to-end tests over real data directories written to temporary folders.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: the `devmap` binary, one test per command plus error exits
//! - **pipeline**: library sessions over directory sources, including the
//!   consolidated-file fallback and the split tool

#[path = "../fixtures/mod.rs"]
mod fixtures;

mod cli;
mod pipeline;
