//! Version history: checked-in versions, labels and frozen snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::path::{self, Segment};
use crate::core::{Property, PropertyValue};

/// Immutable copy of a node subtree captured at check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenNode {
    /// Name of the original node
    pub name: String,
    /// Primary type of the original node
    pub primary_type: String,
    /// Mixins of the original node
    #[serde(default)]
    pub mixins: Vec<String>,
    /// Identifier of the original node, if it was referenceable
    #[serde(default)]
    pub frozen_identifier: Option<Uuid>,
    /// Properties at check-in time
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Frozen children in document order
    #[serde(default)]
    pub children: Vec<FrozenNode>,
}

/// A property found inside a frozen snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct FrozenProperty {
    /// The frozen property
    pub property: Property,
    /// Path of the owning frozen node relative to the snapshot root (`""` for the root)
    pub owner_path: String,
    /// Identifier of the node the owner was frozen from
    pub owner_identifier: Option<Uuid>,
}

impl FrozenNode {
    /// The `index`-th child (1-based) called `name`.
    pub fn child(&self, name: &str, index: usize) -> Option<&FrozenNode> {
        self.children.iter().filter(|c| c.name == name).nth(index.checked_sub(1)?)
    }

    /// Resolve `rel_path` (nodes then property name) below this frozen node.
    ///
    /// Frozen snapshots cannot be left upwards, so `..` fails the lookup.
    pub fn property(&self, rel_path: &str) -> Option<FrozenProperty> {
        let (nodes, name) = path::split_property_path(rel_path).ok()?;

        let mut current = self;
        let mut owner_path = Vec::new();
        for segment in nodes {
            match path::parse_segment(segment).ok()? {
                Segment::Current => {}
                Segment::Parent => return None,
                Segment::Child {
                    name,
                    index,
                } => {
                    current = current.child(name, index)?;
                    owner_path.push(path::render_segment(name, index));
                }
            }
        }

        let value = current.properties.get(name)?;
        Some(FrozenProperty {
            property: Property::new(name, value.clone()),
            owner_path: owner_path.join("/"),
            owner_identifier: current.frozen_identifier,
        })
    }
}

/// One checked-in version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Version name, e.g. `1.2`
    pub name: String,
    /// Labels attached to this version
    #[serde(default)]
    pub labels: BTreeSet<String>,
    /// Check-in time
    pub created: DateTime<Utc>,
    /// Snapshot of the versionable node
    pub frozen: FrozenNode,
}

impl Version {
    /// The frozen snapshot of this version.
    pub const fn frozen_node(&self) -> &FrozenNode {
        &self.frozen
    }
}

/// All versions of one versionable node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionHistory {
    /// Identifier of the versionable node
    pub versionable: Uuid,
    /// Versions, oldest first
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl VersionHistory {
    /// Empty history for a versionable node.
    pub const fn new(versionable: Uuid) -> Self {
        Self {
            versionable,
            versions: Vec::new(),
        }
    }

    /// Whether any version carries `label`.
    pub fn has_version_label(&self, label: &str) -> bool {
        self.versions.iter().any(|v| v.labels.contains(label))
    }

    /// The version carrying `label`.
    pub fn version_by_label(&self, label: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.labels.contains(label))
    }

    /// Look up a version by name.
    pub fn version(&self, name: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.name == name)
    }

    /// Append a version frozen from `frozen`, returning its name.
    pub fn add_version(&mut self, frozen: FrozenNode) -> String {
        let name = format!("1.{}", self.versions.len());
        self.versions.push(Version {
            name: name.clone(),
            labels: BTreeSet::new(),
            created: Utc::now(),
            frozen,
        });
        name
    }

    /// Attach `label` to version `version_name`, moving it off any other version.
    ///
    /// Returns `false` if the version does not exist.
    pub fn add_label(&mut self, version_name: &str, label: &str) -> bool {
        if self.version(version_name).is_none() {
            return false;
        }
        for version in &mut self.versions {
            if version.name == version_name {
                version.labels.insert(label.to_string());
            } else {
                version.labels.remove(label);
            }
        }
        true
    }
}
