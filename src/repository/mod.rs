//! The content-repository contract the engine runs against.
//!
//! The engine never reaches for a global session: every engine, resolver and
//! property-reference call receives the [`Session`] explicitly. The contract
//! is deliberately narrow:
//!
//! - node/property read and write, type checks, parent traversal
//! - pending-change discovery below a scope node
//! - reverse-reference discovery for a referenceable node
//! - version history with labels and frozen snapshots
//! - permission checks before property writes
//!
//! [`MemoryRepository`] is the in-process implementation used by the CLI and
//! the test suites.

mod memory;
pub mod node_type;
pub mod path;
pub mod snapshot;
pub mod version;

pub use memory::MemoryRepository;
pub use node_type::{NodeTypeDefinition, NodeTypeRegistry, PropertyDefinition};
pub use snapshot::RepositorySnapshot;
pub use version::{FrozenNode, FrozenProperty, Version, VersionHistory};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::schema::types;
use crate::core::{Property, PropertyValue, Result};

/// Handle to a node inside one session.
///
/// Handles stay valid until the node is removed; stale handles make
/// lookups fail with [`DerivedDataError::ItemNotFound`](crate::core::DerivedDataError::ItemNotFound).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capabilities checked with [`Session::check_permission`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read an item
    Read,
    /// Create, modify or remove a property
    SetProperty,
    /// Add a child node
    AddNode,
    /// Remove a node
    Remove,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::SetProperty => "set_property",
            Self::AddNode => "add_node",
            Self::Remove => "remove",
        })
    }
}

/// A property somewhere in the graph, identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyLocation {
    /// Node owning the property
    pub node: NodeId,
    /// Property name
    pub name: String,
}

/// A live repository session.
pub trait Session {
    /// The root node.
    fn root(&self) -> NodeId;

    /// Node at an absolute path.
    fn node_by_path(&self, path: &str) -> Option<NodeId>;

    /// Referenceable node with the given identifier.
    fn node_by_identifier(&self, identifier: &Uuid) -> Option<NodeId>;

    /// Parent of a node; `None` for the root or a removed node.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Name of a node (empty for the root).
    fn name(&self, node: NodeId) -> Result<String>;

    /// Absolute path of a node, same-name-sibling indices included.
    fn path(&self, node: NodeId) -> Result<String>;

    /// Identifier of a referenceable node.
    fn identifier(&self, node: NodeId) -> Option<Uuid>;

    /// Primary node type name.
    fn primary_type(&self, node: NodeId) -> Result<String>;

    /// Whether the node is of `type_name` through its primary type, mixins or
    /// their supertypes.
    ///
    /// Fails with `UnknownNodeType` if `type_name` is not registered.
    fn is_node_type(&self, node: NodeId, type_name: &str) -> Result<bool>;

    /// Child by name; the name may carry a same-name-sibling index.
    fn child(&self, node: NodeId, name: &str) -> Option<NodeId>;

    /// Children in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// A property of a node.
    fn get_property(&self, node: NodeId, name: &str) -> Option<Property>;

    /// Whether a node has a property.
    fn has_property(&self, node: NodeId, name: &str) -> bool {
        self.get_property(node, name).is_some()
    }

    /// The definition that would govern property `name` on `node`.
    fn property_definition(&self, node: NodeId, name: &str) -> Option<PropertyDefinition>;

    /// Create or replace a property.
    fn set_property(&mut self, node: NodeId, name: &str, value: PropertyValue) -> Result<()>;

    /// Remove a property; removing a missing property is a no-op.
    fn remove_property(&mut self, node: NodeId, name: &str) -> Result<()>;

    /// Add a child node of `primary_type`.
    fn add_node(&mut self, parent: NodeId, name: &str, primary_type: &str) -> Result<NodeId>;

    /// Add a mixin to a node.
    fn add_mixin(&mut self, node: NodeId, mixin: &str) -> Result<()>;

    /// Remove a node and its subtree.
    fn remove_node(&mut self, node: NodeId) -> Result<()>;

    /// Nodes of `node_type` at or below `scope` touched since the last
    /// [`save`](Session::save).
    ///
    /// A modified node that is not itself of `node_type` is reported through
    /// its nearest ancestor of that type that is still at or below `scope`.
    fn pending_changes(&self, scope: NodeId, node_type: &str) -> Result<Vec<NodeId>>;

    /// Properties anywhere in the graph holding a reference to `identifier`.
    fn references(&self, identifier: &Uuid) -> Vec<PropertyLocation>;

    /// All nodes of a type.
    fn nodes_of_type(&self, node_type: &str) -> Result<Vec<NodeId>>;

    /// Version history of a versionable node.
    fn version_history(&self, node: NodeId) -> Option<&VersionHistory>;

    /// Fail with `AccessDenied` unless the session holds `permission` on `path`.
    fn check_permission(&self, path: &str, permission: Permission) -> Result<()>;

    /// Check out every checked-in versionable node at or above `node`.
    fn ensure_checked_out(&mut self, node: NodeId) -> Result<()>;

    /// Persist pending changes.
    fn save(&mut self) -> Result<()>;
}

/// Whether a node carries a stable identifier.
pub fn is_referenceable(session: &dyn Session, node: NodeId) -> Result<bool> {
    session.is_node_type(node, types::MIX_REFERENCEABLE)
}

/// Path of a node for log messages; never fails.
pub fn display_path(session: &dyn Session, node: NodeId) -> String {
    session.path(node).unwrap_or_else(|_| node.to_string())
}
