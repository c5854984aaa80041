//! JSON snapshots of a [`MemoryRepository`].
//!
//! A snapshot carries the node tree (with identifiers), node type
//! definitions beyond the defaults, version histories and permission
//! denials, so a repository can be loaded, processed by the engine and
//! written back by the CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use super::memory::NodeData;
use super::node_type::{NodeTypeDefinition, NodeTypeRegistry};
use super::version::VersionHistory;
use super::{MemoryRepository, NodeId, Permission, Session};
use crate::core::PropertyValue;

/// One node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Node name (empty for the root)
    #[serde(default)]
    pub name: String,
    /// Primary node type
    pub primary_type: String,
    /// Mixin types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<String>,
    /// Identifier; generated on import for referenceable nodes without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Uuid>,
    /// Check-out state of versionable nodes
    #[serde(default = "default_checked_out", skip_serializing_if = "is_checked_out")]
    pub checked_out: bool,
    /// Properties
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Children in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

const fn default_checked_out() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_checked_out(checked_out: &bool) -> bool {
    *checked_out
}

/// A permission denial rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Path the rule applies to, including everything below it
    pub path: String,
    /// Denied permission
    pub permission: Permission,
}

/// Complete serialisable repository state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Node types registered on top of the defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_types: Vec<NodeTypeDefinition>,
    /// The root node
    pub root: NodeSnapshot,
    /// Version histories
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub histories: Vec<VersionHistory>,
    /// Permission denials
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub denied: Vec<PermissionRule>,
}

impl RepositorySnapshot {
    /// Read a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid snapshot.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read repository snapshot from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse repository snapshot {}", path.display()))
    }

    /// Write the snapshot as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create snapshot directory: {}", parent.display())
                })?;
            }
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize repository snapshot")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write repository snapshot to {}", path.display()))
    }

    /// Capture the state of a repository. Pending-change markers are not kept.
    pub fn capture(repository: &MemoryRepository) -> crate::core::Result<Self> {
        let defaults = NodeTypeRegistry::with_defaults();
        let node_types = repository
            .node_types()
            .definitions()
            .into_iter()
            .filter(|definition| defaults.get(&definition.name) != Some(*definition))
            .cloned()
            .collect();

        let mut histories: Vec<_> = repository.histories().values().cloned().collect();
        histories.sort_by_key(|h| h.versionable);

        Ok(Self {
            node_types,
            root: capture_node(repository, repository.root())?,
            histories,
            denied: repository
                .denials()
                .iter()
                .map(|(path, permission)| PermissionRule {
                    path: path.clone(),
                    permission: *permission,
                })
                .collect(),
        })
    }

    /// Build a repository from this snapshot.
    ///
    /// The restored repository has no pending changes.
    pub fn restore(&self) -> crate::core::Result<MemoryRepository> {
        let mut types = NodeTypeRegistry::with_defaults();
        for definition in &self.node_types {
            types.register(definition.clone());
        }

        let mut repository = MemoryRepository::with_types(types);
        {
            let root = repository.root_data_mut()?;
            root.mixins = self.root.mixins.clone();
            root.properties = self.root.properties.clone();
        }
        let root = repository.root();
        for child in &self.root.children {
            restore_node(&mut repository, root, child)?;
        }
        for history in &self.histories {
            repository.insert_history(history.clone());
        }
        for rule in &self.denied {
            repository.deny(rule.path.clone(), rule.permission);
        }
        repository.save()?;
        Ok(repository)
    }
}

fn capture_node(repository: &MemoryRepository, node: NodeId) -> crate::core::Result<NodeSnapshot> {
    let data = repository.data(node)?;
    let children = data
        .children
        .iter()
        .map(|child| capture_node(repository, *child))
        .collect::<crate::core::Result<Vec<_>>>()?;

    Ok(NodeSnapshot {
        name: data.name.clone(),
        primary_type: data.primary_type.clone(),
        mixins: data.mixins.clone(),
        identifier: data.identifier,
        checked_out: data.checked_out,
        properties: data.properties.clone(),
        children,
    })
}

fn restore_node(
    repository: &mut MemoryRepository,
    parent: NodeId,
    snapshot: &NodeSnapshot,
) -> crate::core::Result<()> {
    if !repository.node_types().contains(&snapshot.primary_type) {
        return Err(crate::core::DerivedDataError::UnknownNodeType {
            name: snapshot.primary_type.clone(),
        });
    }

    let id = repository.insert_raw(
        parent,
        NodeData {
            name: snapshot.name.clone(),
            parent: Some(parent),
            primary_type: snapshot.primary_type.clone(),
            mixins: snapshot.mixins.clone(),
            identifier: snapshot.identifier,
            properties: snapshot.properties.clone(),
            children: Vec::new(),
            checked_out: snapshot.checked_out,
        },
    )?;

    for child in &snapshot.children {
        restore_node(repository, id, child)?;
    }
    Ok(())
}
