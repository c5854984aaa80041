//! Integration test suite for the derived-data engine
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **engine**: discovery, computation, invalidation, removal and validation
//!   over an in-memory repository
//! - **branch**: reads across document variants on different branches
//! - **cli**: the `derived-data` binary over snapshot files

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod branch;
mod cli;
mod engine;
