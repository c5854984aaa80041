//! Node type definitions and the registry that answers type checks.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::core::schema::{props, types};

/// Declared property slot of a node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Property name, or `*` for a residual definition
    pub name: String,
    /// Whether the slot holds multiple values
    #[serde(default)]
    pub multiple: bool,
    /// Whether the slot is maintained by the repository itself
    #[serde(default)]
    pub protected: bool,
}

impl PropertyDefinition {
    /// A named single-valued definition.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multiple: false,
            protected: false,
        }
    }

    /// A named multi-valued definition.
    pub fn multiple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multiple: true,
            protected: false,
        }
    }

    /// Mark the definition protected.
    #[must_use]
    pub const fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    /// Whether this is a residual (`*`) definition.
    #[must_use]
    pub fn is_residual(&self) -> bool {
        self.name == props::RESIDUAL
    }
}

/// A node type: primary or mixin, with supertypes and property definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTypeDefinition {
    /// Qualified type name
    pub name: String,
    /// Whether this is a mixin type
    #[serde(default)]
    pub mixin: bool,
    /// Direct supertypes
    #[serde(default)]
    pub supertypes: Vec<String>,
    /// Declared property definitions
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

impl NodeTypeDefinition {
    /// A primary type with the given supertypes.
    pub fn primary(name: impl Into<String>, supertypes: &[&str]) -> Self {
        Self {
            name: name.into(),
            mixin: false,
            supertypes: supertypes.iter().map(ToString::to_string).collect(),
            properties: Vec::new(),
        }
    }

    /// A mixin type with the given supertypes.
    pub fn mixin(name: impl Into<String>, supertypes: &[&str]) -> Self {
        Self {
            mixin: true,
            ..Self::primary(name, supertypes)
        }
    }

    /// Add a property definition.
    #[must_use]
    pub fn with_property(mut self, definition: PropertyDefinition) -> Self {
        self.properties.push(definition);
        self
    }
}

/// Registry of all known node types.
#[derive(Debug, Clone, Default)]
pub struct NodeTypeRegistry {
    types: HashMap<String, NodeTypeDefinition>,
}

impl NodeTypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the types the engine and its content model rely on.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let residual = PropertyDefinition::single(props::RESIDUAL);

        registry.register(NodeTypeDefinition::primary(types::NT_BASE, &[]));
        registry.register(
            NodeTypeDefinition::primary(types::NT_UNSTRUCTURED, &[types::NT_BASE])
                .with_property(residual.clone()),
        );
        registry.register(NodeTypeDefinition::mixin(types::MIX_REFERENCEABLE, &[]));
        registry
            .register(NodeTypeDefinition::mixin(types::MIX_VERSIONABLE, &[types::MIX_REFERENCEABLE]));
        registry.register(NodeTypeDefinition::primary(
            types::REP_ROOT,
            &[types::NT_UNSTRUCTURED, types::MIX_REFERENCEABLE],
        ));
        registry.register(
            NodeTypeDefinition::mixin(types::HIPPO_DERIVED, &[])
                .with_property(PropertyDefinition::multiple(props::HIPPO_RELATED)),
        );
        registry.register(
            NodeTypeDefinition::mixin(types::HIPPO_BRANCH_INFO, &[])
                .with_property(PropertyDefinition::single(props::HIPPO_BRANCH_ID)),
        );
        registry.register(NodeTypeDefinition::primary(
            types::HIPPO_DOCUMENT,
            &[types::NT_UNSTRUCTURED, types::MIX_REFERENCEABLE],
        ));
        registry.register(NodeTypeDefinition::primary(
            types::HIPPO_HANDLE,
            &[types::NT_UNSTRUCTURED, types::MIX_REFERENCEABLE],
        ));
        registry.register(
            NodeTypeDefinition::primary(types::HIPPO_MIRROR, &[types::NT_UNSTRUCTURED])
                .with_property(PropertyDefinition::single(props::HIPPO_DOCBASE)),
        );
        registry
            .register(NodeTypeDefinition::primary(types::HIPPO_FACETSELECT, &[types::HIPPO_MIRROR]));
        registry.register(NodeTypeDefinition::primary(
            types::HIPPOSTD_FOLDER,
            &[types::NT_UNSTRUCTURED, types::MIX_REFERENCEABLE],
        ));
        registry.register(NodeTypeDefinition::primary(
            types::HIPPOSYS_CONTAINER,
            &[types::NT_UNSTRUCTURED],
        ));
        registry.register(
            NodeTypeDefinition::primary(types::HIPPOSYS_DERIVED_DEFINITION, &[types::NT_BASE])
                .with_property(PropertyDefinition::single(props::HIPPOSYS_NODETYPE))
                .with_property(PropertyDefinition::single(props::HIPPOSYS_CLASSNAME))
                .with_property(residual),
        );
        registry.register(
            NodeTypeDefinition::primary(types::HIPPOSYS_PROPERTY_REFERENCE, &[types::NT_BASE])
                .with_property(PropertyDefinition::single(props::HIPPOSYS_REL_PATH)),
        );
        registry.register(
            NodeTypeDefinition::primary(
                types::HIPPOSYS_BUILTIN_REFERENCE,
                &[types::HIPPOSYS_PROPERTY_REFERENCE],
            )
            .with_property(PropertyDefinition::single(props::HIPPOSYS_METHOD)),
        );
        registry.register(
            NodeTypeDefinition::primary(
                types::HIPPOSYS_RELATIVE_REFERENCE,
                &[types::HIPPOSYS_PROPERTY_REFERENCE],
            )
            .with_property(PropertyDefinition::single(props::HIPPOSYS_MULTIVALUE)),
        );
        registry.register(NodeTypeDefinition::primary(
            types::HIPPOSYS_RESOLVE_REFERENCE,
            &[types::HIPPOSYS_PROPERTY_REFERENCE],
        ));

        registry
    }

    /// Register (or replace) a node type.
    pub fn register(&mut self, definition: NodeTypeDefinition) {
        self.types.insert(definition.name.clone(), definition);
    }

    /// Look up a type by name.
    pub fn get(&self, name: &str) -> Option<&NodeTypeDefinition> {
        self.types.get(name)
    }

    /// Whether a type name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// All registered definitions, sorted by name.
    pub fn definitions(&self) -> Vec<&NodeTypeDefinition> {
        let mut all: Vec<_> = self.types.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Whether `type_name` is `ancestor` or inherits from it, transitively.
    pub fn is_subtype(&self, type_name: &str, ancestor: &str) -> bool {
        self.hierarchy(type_name).iter().any(|t| t.name == ancestor)
    }

    /// The type and all of its supertypes, breadth first, each once.
    fn hierarchy(&self, type_name: &str) -> Vec<&NodeTypeDefinition> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([type_name]);
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(definition) = self.types.get(current) {
                result.push(definition);
                queue.extend(definition.supertypes.iter().map(String::as_str));
            }
        }

        result
    }

    /// Find the definition governing property `name` on a node with the given
    /// effective types (primary type first, then mixins).
    ///
    /// A named definition anywhere in the hierarchy wins over a residual one.
    pub fn property_definition(&self, node_types: &[&str], name: &str) -> Option<PropertyDefinition> {
        let hierarchy: Vec<_> = node_types.iter().flat_map(|t| self.hierarchy(t)).collect();

        hierarchy
            .iter()
            .flat_map(|t| t.properties.iter())
            .find(|d| d.name == name)
            .or_else(|| hierarchy.iter().flat_map(|t| t.properties.iter()).find(|d| d.is_residual()))
            .cloned()
    }
}
