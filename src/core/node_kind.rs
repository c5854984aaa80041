//! Closed classification of repository nodes.
//!
//! The engine decides several behaviours by what kind of node it is looking
//! at (is this a document variant, a handle, a mirror?). [`NodeKind`] answers
//! that once per visited node so callers match exhaustively instead of
//! repeating string type checks.

use crate::core::Result;
use crate::core::schema::types;
use crate::repository::{NodeId, Session};

/// What a node is, as far as derived-data processing cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The repository root
    Root,
    /// A `hippo:handle` grouping document variants
    Handle,
    /// A `hippo:document` directly below a handle
    DocumentVariant,
    /// A `hippo:document` anywhere else
    Document,
    /// A `hippo:mirror` (or facet select) aliasing another node
    Mirror,
    /// A folder
    Folder,
    /// Anything else
    Other,
}

impl NodeKind {
    /// Classify a node.
    pub fn of(session: &dyn Session, node: NodeId) -> Result<Self> {
        let Some(parent) = session.parent(node) else {
            return Ok(Self::Root);
        };

        if session.is_node_type(node, types::HIPPO_DOCUMENT)? {
            return Ok(if session.is_node_type(parent, types::HIPPO_HANDLE)? {
                Self::DocumentVariant
            } else {
                Self::Document
            });
        }
        if session.is_node_type(node, types::HIPPO_HANDLE)? {
            return Ok(Self::Handle);
        }
        if session.is_node_type(node, types::HIPPO_MIRROR)? {
            return Ok(Self::Mirror);
        }
        if session.is_node_type(node, types::HIPPOSTD_FOLDER)? {
            return Ok(Self::Folder);
        }
        Ok(Self::Other)
    }
}
