//! Configuration of the derived-data engine.
//!
//! Engine settings live in a small TOML file (`derived-data.toml` in the
//! working directory unless a path is given). Every key is optional:
//!
//! ```toml
//! # Folder holding hipposys:deriveddefinition nodes
//! derivatives_path = "/hippo:configuration/hippo:derivatives"
//!
//! # validate() commits after this many changed nodes
//! validate_batch_size = 1000
//! ```
//!
//! Function definitions themselves are repository content, not part of this
//! file; see [`crate::function::FunctionDescription`].

mod engine;

pub use engine::{DEFAULT_CONFIG_FILE, EngineConfig};
