//! Derivation function definitions read from the repository.
//!
//! A definition node looks like this (names are the function and parameter
//! names):
//!
//! ```text
//! /hippo:configuration/hippo:derivatives
//!   summary                      hipposys:deriveddefinition
//!     hipposys:classname = "copy"
//!     hipposys:nodetype  = "hippo:document"
//!     hipposys:accessed
//!       title                    hipposys:relativepropertyreference
//!         hipposys:relPath = "body/title"
//!     hipposys:derived
//!       title                    hipposys:relativepropertyreference
//!         hipposys:relPath = "summary"
//! ```

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::schema::{nodes, props, types};
use crate::core::{DerivedDataError, Result};
use crate::reference::{BuiltinReference, PropertyReference, RelativeReference, ResolveReference};
use crate::repository::{NodeId, Session, display_path};

/// How one parameter is bound, as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyReferenceConfig {
    Builtin {
        method: String,
    },
    Relative {
        rel_path: String,
        multi_value: bool,
    },
    Resolve {
        rel_path: String,
    },
}

impl PropertyReferenceConfig {
    /// Read a reference definition node.
    ///
    /// Returns `None` (and logs) for nodes of an unrecognised kind.
    pub fn read(session: &dyn Session, node: NodeId) -> Result<Option<Self>> {
        if session.is_node_type(node, types::HIPPOSYS_BUILTIN_REFERENCE)? {
            return Ok(Some(Self::Builtin {
                method: required_string(session, node, props::HIPPOSYS_METHOD)?,
            }));
        }
        if session.is_node_type(node, types::HIPPOSYS_RELATIVE_REFERENCE)? {
            let multi_value = session
                .get_property(node, props::HIPPOSYS_MULTIVALUE)
                .and_then(|p| p.value.first().and_then(|v| v.as_bool()))
                .unwrap_or(false);
            return Ok(Some(Self::Relative {
                rel_path: required_string(session, node, props::HIPPOSYS_REL_PATH)?,
                multi_value,
            }));
        }
        if session.is_node_type(node, types::HIPPOSYS_RESOLVE_REFERENCE)? {
            return Ok(Some(Self::Resolve {
                rel_path: required_string(session, node, props::HIPPOSYS_REL_PATH)?,
            }));
        }

        tracing::warn!(
            "Ignoring property reference {} of unknown kind {}",
            display_path(session, node),
            session.primary_type(node)?
        );
        Ok(None)
    }

    /// Bind this configuration to a parameter name.
    pub fn build(&self, name: &str) -> PropertyReference {
        match self {
            Self::Builtin {
                method,
            } => PropertyReference::Builtin(BuiltinReference::new(name, method.as_str())),
            Self::Relative {
                rel_path,
                multi_value,
            } => PropertyReference::Relative(RelativeReference::new(name, rel_path.as_str(), *multi_value)),
            Self::Resolve {
                rel_path,
            } => PropertyReference::Resolve(ResolveReference::new(name, rel_path.as_str())),
        }
    }
}

/// One configured derivation function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDescription {
    pub name: String,
    /// Identifier the function implementation is registered under
    pub implementation_id: String,
    /// Node type the function applies to
    pub applicable_type: String,
    /// Accessed parameters by name
    pub accessed: BTreeMap<String, PropertyReferenceConfig>,
    /// Derived parameters by name
    pub derived: BTreeMap<String, PropertyReferenceConfig>,
}

impl FunctionDescription {
    /// Read a `hipposys:deriveddefinition` node.
    ///
    /// # Errors
    ///
    /// Fails with [`DerivedDataError::MissingConfigurationProperty`] when the
    /// implementation identifier or node type is not set.
    pub fn load(session: &dyn Session, node: NodeId) -> Result<Self> {
        Ok(Self {
            name: session.name(node)?,
            implementation_id: required_string(session, node, props::HIPPOSYS_CLASSNAME)?,
            applicable_type: required_string(session, node, props::HIPPOSYS_NODETYPE)?,
            accessed: read_references(session, node, nodes::HIPPOSYS_ACCESSED)?,
            derived: read_references(session, node, nodes::HIPPOSYS_DERIVED)?,
        })
    }

    /// Read every function definition below `folder`, in document order.
    pub fn load_all(session: &dyn Session, folder: NodeId) -> Result<Vec<Self>> {
        let mut functions = Vec::new();
        for child in session.children(folder) {
            if session.is_node_type(child, types::HIPPOSYS_DERIVED_DEFINITION)? {
                functions.push(Self::load(session, child)?);
            }
        }
        Ok(functions)
    }

    /// Accessed parameters as references.
    pub fn accessed_properties(&self) -> Vec<PropertyReference> {
        self.accessed.iter().map(|(name, config)| config.build(name)).collect()
    }

    /// Derived parameters as references.
    pub fn derived_properties(&self) -> Vec<PropertyReference> {
        self.derived.iter().map(|(name, config)| config.build(name)).collect()
    }
}

fn required_string(session: &dyn Session, node: NodeId, property: &str) -> Result<String> {
    session.get_property(node, property).and_then(|p| p.string()).ok_or_else(|| {
        DerivedDataError::MissingConfigurationProperty {
            node: display_path(session, node),
            property: property.to_string(),
        }
    })
}

fn read_references(
    session: &dyn Session,
    function: NodeId,
    collection: &str,
) -> Result<BTreeMap<String, PropertyReferenceConfig>> {
    let mut references = BTreeMap::new();
    let Some(collection) = session.child(function, collection) else {
        return Ok(references);
    };

    for node in session.children(collection) {
        let Some(config) = PropertyReferenceConfig::read(session, node)? else {
            continue;
        };
        let name = session.name(node)?;
        if references.contains_key(&name) {
            tracing::warn!("Duplicate parameter '{}' in {}", name, display_path(session, function));
            continue;
        }
        references.insert(name, config);
    }
    Ok(references)
}
