//! In-memory repository session.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

use super::node_type::{NodeTypeRegistry, PropertyDefinition};
use super::path::{self, Segment};
use super::version::{FrozenNode, VersionHistory};
use super::{NodeId, Permission, PropertyLocation, Session};
use crate::core::schema::{self, types};
use crate::core::{DerivedDataError, Property, PropertyValue, Result};

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) primary_type: String,
    pub(crate) mixins: Vec<String>,
    pub(crate) identifier: Option<Uuid>,
    pub(crate) properties: BTreeMap<String, PropertyValue>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) checked_out: bool,
}

/// A complete repository held in memory.
///
/// Nodes live in an arena addressed by [`NodeId`]; removed slots are never
/// reused, so stale handles fail lookups instead of aliasing new nodes.
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    nodes: Vec<Option<NodeData>>,
    identifiers: HashMap<Uuid, NodeId>,
    types: NodeTypeRegistry,
    histories: HashMap<Uuid, VersionHistory>,
    modified: BTreeSet<NodeId>,
    denied: Vec<(String, Permission)>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    /// An empty repository with the default node types and a referenceable root.
    pub fn new() -> Self {
        Self::with_types(NodeTypeRegistry::with_defaults())
    }

    /// An empty repository using the given node type registry.
    pub fn with_types(types: NodeTypeRegistry) -> Self {
        let root_id = Uuid::parse_str(schema::ROOT_IDENTIFIER).unwrap_or_else(|_| Uuid::nil());
        let root = NodeData {
            name: String::new(),
            parent: None,
            primary_type: types::REP_ROOT.to_string(),
            mixins: Vec::new(),
            identifier: Some(root_id),
            properties: BTreeMap::new(),
            children: Vec::new(),
            checked_out: true,
        };
        Self {
            nodes: vec![Some(root)],
            identifiers: HashMap::from([(root_id, NodeId(0))]),
            types,
            histories: HashMap::new(),
            modified: BTreeSet::new(),
            denied: Vec::new(),
        }
    }

    /// The node type registry.
    pub const fn node_types(&self) -> &NodeTypeRegistry {
        &self.types
    }

    /// Mutable access to the node type registry.
    pub fn node_types_mut(&mut self) -> &mut NodeTypeRegistry {
        &mut self.types
    }

    /// Deny `permission` on `path` and everything below it.
    pub fn deny(&mut self, path: impl Into<String>, permission: Permission) {
        self.denied.push((path.into(), permission));
    }

    /// Current permission denials.
    pub fn denials(&self) -> &[(String, Permission)] {
        &self.denied
    }

    /// Whether any change is waiting for [`Session::save`].
    pub fn has_pending_changes(&self) -> bool {
        self.modified.iter().any(|id| self.data(*id).is_ok())
    }

    /// Mark a node as modified without changing it.
    pub fn touch(&mut self, node: NodeId) -> Result<()> {
        self.data(node)?;
        self.modified.insert(node);
        Ok(())
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// All version histories, keyed by versionable identifier.
    pub const fn histories(&self) -> &HashMap<Uuid, VersionHistory> {
        &self.histories
    }

    /// Check in a versionable node, freezing its subtree into a new version.
    ///
    /// Returns the new version name.
    pub fn checkin(&mut self, node: NodeId) -> Result<String> {
        let identifier = self.versionable_identifier(node)?;
        let frozen = self.freeze(node)?;
        let history =
            self.histories.entry(identifier).or_insert_with(|| VersionHistory::new(identifier));
        let name = history.add_version(frozen);
        self.data_mut(node)?.checked_out = false;
        tracing::debug!("Checked in {} as version {}", self.path(node)?, name);
        Ok(name)
    }

    /// Check out a versionable node.
    pub fn checkout(&mut self, node: NodeId) -> Result<()> {
        self.versionable_identifier(node)?;
        self.data_mut(node)?.checked_out = true;
        Ok(())
    }

    /// Whether a node is checked out (always true for non-versionable nodes).
    pub fn is_checked_out(&self, node: NodeId) -> Result<bool> {
        Ok(self.data(node)?.checked_out)
    }

    /// Attach a label to a version of a versionable node.
    pub fn add_version_label(&mut self, node: NodeId, version: &str, label: &str) -> Result<()> {
        let identifier = self.versionable_identifier(node)?;
        let history =
            self.histories.get_mut(&identifier).ok_or_else(|| DerivedDataError::ItemNotFound {
                path: format!("version history of {identifier}"),
            })?;
        if history.add_label(version, label) {
            Ok(())
        } else {
            Err(DerivedDataError::not_found(format!("version {version} of {identifier}")))
        }
    }

    /// Install a version history wholesale (snapshot import).
    pub(crate) fn insert_history(&mut self, history: VersionHistory) {
        self.histories.insert(history.versionable, history);
    }

    /// Insert a node with explicit identity, bypassing write guards (snapshot import).
    pub(crate) fn insert_raw(&mut self, parent: NodeId, mut data: NodeData) -> Result<NodeId> {
        self.data(parent)?;
        if data.identifier.is_none() && self.types_referenceable(&data.primary_type, &data.mixins) {
            data.identifier = Some(Uuid::new_v4());
        }
        data.parent = Some(parent);
        let id = NodeId(self.nodes.len());
        if let Some(identifier) = data.identifier {
            self.identifiers.insert(identifier, id);
        }
        self.nodes.push(Some(data));
        self.data_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Replace the root's stored properties and mixins (snapshot import).
    pub(crate) fn root_data_mut(&mut self) -> Result<&mut NodeData> {
        self.data_mut(NodeId(0))
    }

    pub(crate) fn data(&self, node: NodeId) -> Result<&NodeData> {
        self.nodes
            .get(node.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| DerivedDataError::not_found(node.to_string()))
    }

    fn data_mut(&mut self, node: NodeId) -> Result<&mut NodeData> {
        self.nodes
            .get_mut(node.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| DerivedDataError::not_found(node.to_string()))
    }

    fn type_known(&self, type_name: &str) -> Result<()> {
        if self.types.contains(type_name) {
            Ok(())
        } else {
            Err(DerivedDataError::UnknownNodeType {
                name: type_name.to_string(),
            })
        }
    }

    fn types_referenceable(&self, primary_type: &str, mixins: &[String]) -> bool {
        std::iter::once(primary_type)
            .chain(mixins.iter().map(String::as_str))
            .any(|t| self.types.is_subtype(t, types::MIX_REFERENCEABLE))
    }

    fn versionable_identifier(&self, node: NodeId) -> Result<Uuid> {
        if !self.is_node_type(node, types::MIX_VERSIONABLE)? {
            return Err(DerivedDataError::repository(format!(
                "{} is not versionable",
                self.path(node)?
            )));
        }
        self.data(node)?
            .identifier
            .ok_or_else(|| DerivedDataError::repository("versionable node without identifier"))
    }

    /// Fail if the nearest versionable node at or above `node` is checked in.
    fn guard_writable(&self, node: NodeId) -> Result<()> {
        let mut current = Some(node);
        while let Some(id) = current {
            let data = self.data(id)?;
            if self.is_node_type(id, types::MIX_VERSIONABLE)? {
                if data.checked_out {
                    return Ok(());
                }
                return Err(DerivedDataError::CheckedIn {
                    path: self.path(id)?,
                });
            }
            current = data.parent;
        }
        Ok(())
    }

    fn sibling_index(&self, node: NodeId) -> Result<usize> {
        let data = self.data(node)?;
        let Some(parent) = data.parent else {
            return Ok(1);
        };
        let position = self
            .data(parent)?
            .children
            .iter()
            .filter(|c| self.data(**c).map(|d| d.name == data.name).unwrap_or(false))
            .position(|c| *c == node)
            .unwrap_or(0);
        Ok(position + 1)
    }

    fn freeze(&self, node: NodeId) -> Result<FrozenNode> {
        let data = self.data(node)?;
        let children =
            data.children.iter().map(|c| self.freeze(*c)).collect::<Result<Vec<_>>>()?;
        Ok(FrozenNode {
            name: data.name.clone(),
            primary_type: data.primary_type.clone(),
            mixins: data.mixins.clone(),
            frozen_identifier: data.identifier,
            properties: data.properties.clone(),
            children,
        })
    }

    fn is_at_or_below(&self, node: NodeId, scope: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == scope {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn live_nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|data| (NodeId(index), data)))
    }
}

impl Session for MemoryRepository {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node_by_path(&self, path: &str) -> Option<NodeId> {
        if !path.starts_with('/') {
            return None;
        }
        path::segments(path).into_iter().try_fold(self.root(), |node, segment| self.child(node, segment))
    }

    fn node_by_identifier(&self, identifier: &Uuid) -> Option<NodeId> {
        self.identifiers.get(identifier).copied().filter(|id| self.data(*id).is_ok())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).ok().and_then(|d| d.parent)
    }

    fn name(&self, node: NodeId) -> Result<String> {
        Ok(self.data(node)?.name.clone())
    }

    fn path(&self, node: NodeId) -> Result<String> {
        let mut segments = Vec::new();
        let mut current = node;
        while let Some(parent) = self.data(current)?.parent {
            segments.push(path::render_segment(&self.data(current)?.name, self.sibling_index(current)?));
            current = parent;
        }
        segments.reverse();
        Ok(format!("/{}", segments.join("/")))
    }

    fn identifier(&self, node: NodeId) -> Option<Uuid> {
        self.data(node).ok().and_then(|d| d.identifier)
    }

    fn primary_type(&self, node: NodeId) -> Result<String> {
        Ok(self.data(node)?.primary_type.clone())
    }

    fn is_node_type(&self, node: NodeId, type_name: &str) -> Result<bool> {
        self.type_known(type_name)?;
        let data = self.data(node)?;
        Ok(std::iter::once(&data.primary_type)
            .chain(data.mixins.iter())
            .any(|t| self.types.is_subtype(t, type_name)))
    }

    fn child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        let Ok(Segment::Child {
            name,
            index,
        }) = path::parse_segment(name)
        else {
            return None;
        };
        self.data(node)
            .ok()?
            .children
            .iter()
            .filter(|c| self.data(**c).map(|d| d.name == name).unwrap_or(false))
            .nth(index - 1)
            .copied()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.data(node).map(|d| d.children.clone()).unwrap_or_default()
    }

    fn get_property(&self, node: NodeId, name: &str) -> Option<Property> {
        self.data(node)
            .ok()?
            .properties
            .get(name)
            .map(|value| Property::new(name, value.clone()))
    }

    fn property_definition(&self, node: NodeId, name: &str) -> Option<PropertyDefinition> {
        let data = self.data(node).ok()?;
        let node_types: Vec<&str> = std::iter::once(data.primary_type.as_str())
            .chain(data.mixins.iter().map(String::as_str))
            .collect();
        self.types.property_definition(&node_types, name)
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: PropertyValue) -> Result<()> {
        self.guard_writable(node)?;
        self.data_mut(node)?.properties.insert(name.to_string(), value);
        self.modified.insert(node);
        Ok(())
    }

    fn remove_property(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.guard_writable(node)?;
        if self.data_mut(node)?.properties.remove(name).is_some() {
            self.modified.insert(node);
        }
        Ok(())
    }

    fn add_node(&mut self, parent: NodeId, name: &str, primary_type: &str) -> Result<NodeId> {
        self.type_known(primary_type)?;
        if self.types.get(primary_type).is_some_and(|t| t.mixin) {
            return Err(DerivedDataError::repository(format!(
                "{primary_type} is a mixin and cannot be a primary type"
            )));
        }
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '[', ']']) {
            return Err(DerivedDataError::InvalidPath {
                path: name.to_string(),
                reason: "not a valid node name".to_string(),
            });
        }
        self.guard_writable(parent)?;

        let id = self.insert_raw(
            parent,
            NodeData {
                name: name.to_string(),
                parent: Some(parent),
                primary_type: primary_type.to_string(),
                mixins: Vec::new(),
                identifier: None,
                properties: BTreeMap::new(),
                children: Vec::new(),
                checked_out: true,
            },
        )?;
        self.modified.insert(parent);
        self.modified.insert(id);
        Ok(id)
    }

    fn add_mixin(&mut self, node: NodeId, mixin: &str) -> Result<()> {
        self.type_known(mixin)?;
        if !self.types.get(mixin).is_some_and(|t| t.mixin) {
            return Err(DerivedDataError::repository(format!("{mixin} is not a mixin type")));
        }
        self.guard_writable(node)?;

        let referenceable = self.types.is_subtype(mixin, types::MIX_REFERENCEABLE);
        let data = self.data_mut(node)?;
        if data.mixins.iter().any(|m| m == mixin) {
            return Ok(());
        }
        data.mixins.push(mixin.to_string());
        if referenceable && data.identifier.is_none() {
            let identifier = Uuid::new_v4();
            data.identifier = Some(identifier);
            self.identifiers.insert(identifier, node);
        }
        self.modified.insert(node);
        Ok(())
    }

    fn remove_node(&mut self, node: NodeId) -> Result<()> {
        let parent = self
            .data(node)?
            .parent
            .ok_or_else(|| DerivedDataError::repository("the root node cannot be removed"))?;
        self.guard_writable(parent)?;

        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(data) = self.nodes.get_mut(current.0).and_then(Option::take) {
                if let Some(identifier) = data.identifier {
                    self.identifiers.remove(&identifier);
                }
                stack.extend(data.children);
            }
            self.modified.remove(&current);
        }

        self.data_mut(parent)?.children.retain(|c| *c != node);
        self.modified.insert(parent);
        Ok(())
    }

    fn pending_changes(&self, scope: NodeId, node_type: &str) -> Result<Vec<NodeId>> {
        self.type_known(node_type)?;
        self.data(scope)?;

        let mut found = BTreeSet::new();
        for modified in &self.modified {
            if self.data(*modified).is_err() || !self.is_at_or_below(*modified, scope) {
                continue;
            }
            let mut current = Some(*modified);
            while let Some(id) = current {
                if self.is_node_type(id, node_type)? {
                    found.insert(id);
                    break;
                }
                if id == scope {
                    break;
                }
                current = self.parent(id);
            }
        }
        Ok(found.into_iter().collect())
    }

    fn references(&self, identifier: &Uuid) -> Vec<PropertyLocation> {
        let mut locations = Vec::new();
        for (id, data) in self.live_nodes() {
            for (name, value) in &data.properties {
                let refers = match value {
                    PropertyValue::Single(v) => v.as_reference() == Some(*identifier),
                    PropertyValue::Multi(values) => {
                        values.iter().any(|v| v.as_reference() == Some(*identifier))
                    }
                };
                if refers {
                    locations.push(PropertyLocation {
                        node: id,
                        name: name.clone(),
                    });
                }
            }
        }
        locations
    }

    fn nodes_of_type(&self, node_type: &str) -> Result<Vec<NodeId>> {
        self.type_known(node_type)?;
        let mut result = Vec::new();
        for (id, _) in self.live_nodes() {
            if self.is_node_type(id, node_type)? {
                result.push(id);
            }
        }
        Ok(result)
    }

    fn version_history(&self, node: NodeId) -> Option<&VersionHistory> {
        self.identifier(node).and_then(|identifier| self.histories.get(&identifier))
    }

    fn check_permission(&self, path: &str, permission: Permission) -> Result<()> {
        let denied = self
            .denied
            .iter()
            .any(|(prefix, p)| *p == permission && path::is_at_or_below(path, prefix));
        if denied {
            Err(DerivedDataError::AccessDenied {
                path: path.to_string(),
                permission: permission.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn ensure_checked_out(&mut self, node: NodeId) -> Result<()> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.is_node_type(id, types::MIX_VERSIONABLE)? && !self.data(id)?.checked_out {
                tracing::debug!("Checking out {}", self.path(id)?);
                self.data_mut(id)?.checked_out = true;
            }
            current = self.parent(id);
        }
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        tracing::trace!("Saving {} modified node(s)", self.modified.len());
        self.modified.clear();
        Ok(())
    }
}
