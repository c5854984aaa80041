//! Property references: how a function parameter maps onto repository state.
//!
//! Each accessed or derived parameter of a derivation function is bound to a
//! [`PropertyReference`]. Reading a reference yields the parameter values and
//! records which referenceable nodes were read; writing it persists computed
//! values and reports whether anything changed.
//!
//! | Kind | Reads | Writes |
//! |------|-------|--------|
//! | [`Builtin`](PropertyReference::Builtin) | computed (`ancestors`) | never |
//! | [`Relative`](PropertyReference::Relative) | plain path walk | yes, creating missing nodes |
//! | [`Resolve`](PropertyReference::Resolve) | walk through mirrors | never |

mod builtin;
mod relative;
mod resolve;

pub use builtin::BuiltinReference;
pub use relative::RelativeReference;
pub use resolve::ResolveReference;

use std::collections::BTreeSet;
use uuid::Uuid;

use crate::branch::PropertyOwner;
use crate::core::{Parameters, Result, Value};
use crate::repository::{NodeId, Session, is_referenceable};

/// A configured binding between a parameter name and repository state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyReference {
    Builtin(BuiltinReference),
    Relative(RelativeReference),
    Resolve(ResolveReference),
}

impl PropertyReference {
    /// The parameter name.
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(r) => &r.name,
            Self::Relative(r) => &r.name,
            Self::Resolve(r) => &r.name,
        }
    }

    /// Read the parameter values for `modified`, adding the identifiers of
    /// the nodes read to `dependencies`.
    ///
    /// `None` means the parameter has no value (the property does not exist).
    pub fn resolve_values(
        &self,
        session: &dyn Session,
        modified: NodeId,
        dependencies: &mut BTreeSet<Uuid>,
    ) -> Result<Option<Vec<Value>>> {
        match self {
            Self::Builtin(r) => r.resolve_values(session, modified, dependencies),
            Self::Relative(r) => r.resolve_values(session, modified, dependencies),
            Self::Resolve(r) => r.resolve_values(session, modified, dependencies),
        }
    }

    /// Persist this reference's entry of `parameters` relative to `modified`.
    ///
    /// Returns whether the repository changed. A missing entry removes the
    /// target property. Permission failures are logged and yield `false`.
    pub fn persist_values(
        &self,
        session: &mut dyn Session,
        modified: NodeId,
        parameters: &Parameters,
    ) -> Result<bool> {
        match self {
            Self::Builtin(_) => Ok(false),
            Self::Relative(r) => r.persist_values(session, modified, parameters),
            Self::Resolve(r) => r.persist_values(session, modified, parameters),
        }
    }
}

/// Add the identifier of a property's owner when it is referenceable.
fn record_dependency(
    session: &dyn Session,
    owner: &PropertyOwner,
    dependencies: &mut BTreeSet<Uuid>,
) -> Result<()> {
    match owner {
        PropertyOwner::Live(node) => {
            if is_referenceable(session, *node)? {
                if let Some(identifier) = session.identifier(*node) {
                    dependencies.insert(identifier);
                }
            }
        }
        PropertyOwner::Frozen {
            identifier: Some(identifier),
            ..
        } => {
            dependencies.insert(*identifier);
        }
        PropertyOwner::Frozen {
            identifier: None,
            ..
        } => {}
    }
    Ok(())
}
