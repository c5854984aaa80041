//! Computed references that do not read a stored property.

use std::collections::BTreeSet;
use uuid::Uuid;

use crate::core::schema::BUILTIN_ANCESTORS;
use crate::core::{Result, Value};
use crate::repository::{NodeId, Session, display_path, is_referenceable};

/// A builtin reference such as `ancestors`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuiltinReference {
    pub name: String,
    pub method: String,
}

impl BuiltinReference {
    pub fn new(name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
        }
    }

    pub(super) fn resolve_values(
        &self,
        session: &dyn Session,
        modified: NodeId,
        _dependencies: &mut BTreeSet<Uuid>,
    ) -> Result<Option<Vec<Value>>> {
        match self.method.as_str() {
            BUILTIN_ANCESTORS => ancestors(session, modified).map(Some),
            other => {
                tracing::warn!(
                    "Unknown builtin method '{}' for parameter '{}' on {}",
                    other,
                    self.name,
                    display_path(session, modified)
                );
                Ok(None)
            }
        }
    }
}

/// Identifiers of every referenceable node from `node` up to the root.
fn ancestors(session: &dyn Session, node: NodeId) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    let mut current = Some(node);
    while let Some(id) = current {
        if is_referenceable(session, id)? {
            if let Some(identifier) = session.identifier(id) {
                values.push(Value::String(identifier.to_string()));
            }
        }
        current = session.parent(id);
    }
    Ok(values)
}
