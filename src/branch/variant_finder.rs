//! Locate the document variant enclosing a node.

use crate::core::{NodeKind, Result};
use crate::repository::{NodeId, Session};

/// Walks upwards from a node to its nearest enclosing document variant.
pub struct VariantFinder<'a> {
    session: &'a dyn Session,
}

impl<'a> VariantFinder<'a> {
    /// Create a finder over `session`.
    pub fn new(session: &'a dyn Session) -> Self {
        Self {
            session,
        }
    }

    /// The nearest document variant at or above `node`.
    ///
    /// Returns `None` once the root is reached without finding one.
    pub fn find(&self, node: NodeId) -> Result<Option<NodeId>> {
        let mut current = Some(node);
        while let Some(id) = current {
            match NodeKind::of(self.session, id)? {
                NodeKind::DocumentVariant => return Ok(Some(id)),
                NodeKind::Root => return Ok(None),
                _ => current = self.session.parent(id),
            }
        }
        Ok(None)
    }

    /// The nearest document variant enclosing a property owned by `owner`.
    pub fn find_for_property(&self, owner: NodeId) -> Result<Option<NodeId>> {
        self.find(owner)
    }
}
