//! Derived-data engine for branch-aware content repositories.
//!
//! Documents in a content repository often carry properties computed from
//! other properties: a summary copied from a linked document, the list of
//! ancestor folders, a title mirrored from the parent. This crate keeps such
//! derived properties up to date.
//!
//! # Model
//!
//! - a **function definition** (`hipposys:deriveddefinition` below
//!   `/hippo:configuration/hippo:derivatives`) names an implementation, the
//!   node type it applies to, the *accessed* parameters it reads and the
//!   *derived* parameters it writes
//! - each parameter is bound by a **property reference**: a builtin value
//!   (`ancestors`), a relative path from the node, or a relative path that
//!   dereferences mirrors on the way
//! - every referenceable node read during a computation is recorded in the
//!   derived node's `hippo:related` property, so a later change to that node
//!   triggers recomputation
//! - reads across document variants honour branches: if the computed variant
//!   and the read variant sit on different branches, the read goes to the
//!   version labelled `<branchId>-<state>` instead of the live node
//!
//! # Modules
//!
//! - [`core`] - errors, values, schema names and node classification
//! - [`repository`] - the [`Session`](repository::Session) contract, an
//!   in-memory implementation and JSON snapshots
//! - [`branch`] - variant lookup and branch-aware property resolution
//! - [`reference`] - builtin, relative and resolving property references
//! - [`function`] - function definitions, parameter mapping and the
//!   implementation registry
//! - [`engine`] - [`DerivedDataEngine`](engine::DerivedDataEngine) and
//!   dependency diagnostics
//! - [`config`] - engine settings (`derived-data.toml`)
//! - [`cli`] - the `derived-data` command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use derived_data::config::EngineConfig;
//! use derived_data::engine::DerivedDataEngine;
//! use derived_data::function::FunctionRegistry;
//! use derived_data::repository::{MemoryRepository, Session};
//!
//! # fn main() -> derived_data::core::Result<()> {
//! let mut repository = MemoryRepository::new();
//! let engine = DerivedDataEngine::new(EngineConfig::default(), FunctionRegistry::with_stock_functions());
//! let outcome = engine.save(&mut repository, None)?;
//! repository.save()?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

pub mod branch;
pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod function;
pub mod reference;
pub mod repository;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
