//! Derivation functions: configuration, parameter mapping and implementations.
//!
//! - [`FunctionDescription`] reads one `hipposys:deriveddefinition` node
//! - [`PropertyMapper`] turns the description's references into a
//!   [`Parameters`](crate::core::Parameters) map and back
//! - [`FunctionRegistry`] instantiates the [`DerivedDataFunction`]
//!   implementation a description names

mod description;
mod mapper;
mod registry;
pub mod stock;

pub use description::{FunctionDescription, PropertyReferenceConfig};
pub use mapper::PropertyMapper;
pub use registry::{DerivedDataFunction, FunctionRegistry};
