//! Core types shared across the derived-data engine
//!
//! - [`error`] - the error taxonomy ([`DerivedDataError`]) and user-facing
//!   [`ErrorContext`] rendering
//! - [`value`] - typed property values and the [`Parameters`] map exchanged
//!   with derivation functions
//! - [`schema`] - every repository type, property and child-node name the
//!   engine relies on
//! - [`node_kind`] - closed classification of nodes ([`NodeKind`])

pub mod error;
pub mod node_kind;
pub mod schema;
pub mod value;

pub use error::{DerivedDataError, ErrorContext, Result, user_friendly_error};
pub use node_kind::NodeKind;
pub use value::{Parameters, Property, PropertyValue, Value};
