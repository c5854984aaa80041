//! Branch and version aware property resolution.
//!
//! A document lives below a handle as one or more variants. Derivations read
//! properties relative to the node being derived, and such reads may cross
//! into a sibling variant. This module decides where the value comes from:
//!
//! - [`VariantFinder`] locates the variant enclosing a node
//! - [`RelativePathFinder`] turns an absolute property path into one relative
//!   to its variant
//! - [`RelativePathPropertyResolver`] and [`ResolvePropertyResolver`] perform
//!   the live lookup
//! - [`BranchResolvePropertyResolver`] replaces a live cross-branch result by
//!   the matching frozen value from version history

mod branch_resolver;
mod relative_path_finder;
mod resolver;
mod variant_finder;

pub use branch_resolver::BranchResolvePropertyResolver;
pub use relative_path_finder::RelativePathFinder;
pub use resolver::{
    PropertyOwner, PropertyResolver, RelativePathPropertyResolver, ResolvePropertyResolver,
    ResolvedProperty, TraversalOutcome,
};
pub use variant_finder::VariantFinder;
