//! Repository schema names consumed by the derived-data engine.
//!
//! Every node type, property and child-node name the engine compares against
//! lives here, so the rest of the crate never spells out a schema literal.

/// Node type names.
pub mod types {
    /// Base of every node type.
    pub const NT_BASE: &str = "nt:base";
    /// Schemaless node type with residual property definitions.
    pub const NT_UNSTRUCTURED: &str = "nt:unstructured";
    /// Primary type of the repository root.
    pub const REP_ROOT: &str = "rep:root";
    /// Mixin granting a stable identifier.
    pub const MIX_REFERENCEABLE: &str = "mix:referenceable";
    /// Mixin granting version history and check-in/check-out.
    pub const MIX_VERSIONABLE: &str = "mix:versionable";
    /// Mixin marking nodes that carry a reverse-dependency index.
    pub const HIPPO_DERIVED: &str = "hippo:derived";
    /// Document base type.
    pub const HIPPO_DOCUMENT: &str = "hippo:document";
    /// Container grouping the variants of one document.
    pub const HIPPO_HANDLE: &str = "hippo:handle";
    /// Node aliasing another node through `hippo:docbase`.
    pub const HIPPO_MIRROR: &str = "hippo:mirror";
    /// Mirror flavour used by faceted selections.
    pub const HIPPO_FACETSELECT: &str = "hippo:facetselect";
    /// Mixin carrying the branch identifier of a variant.
    pub const HIPPO_BRANCH_INFO: &str = "hippo:branchInfo";
    /// Folder type.
    pub const HIPPOSTD_FOLDER: &str = "hippostd:folder";
    /// Plain configuration container.
    pub const HIPPOSYS_CONTAINER: &str = "hipposys:container";
    /// A derivation function definition.
    pub const HIPPOSYS_DERIVED_DEFINITION: &str = "hipposys:deriveddefinition";
    /// Abstract property reference definition.
    pub const HIPPOSYS_PROPERTY_REFERENCE: &str = "hipposys:propertyreference";
    /// Builtin property reference definition.
    pub const HIPPOSYS_BUILTIN_REFERENCE: &str = "hipposys:builtinpropertyreference";
    /// Relative-path property reference definition.
    pub const HIPPOSYS_RELATIVE_REFERENCE: &str = "hipposys:relativepropertyreference";
    /// Resolving property reference definition.
    pub const HIPPOSYS_RESOLVE_REFERENCE: &str = "hipposys:resolvepropertyreference";
}

/// Property names.
pub mod props {
    /// Reverse-dependency index on derived nodes.
    pub const HIPPO_RELATED: &str = "hippo:related";
    /// Identifier of the node a mirror points at.
    pub const HIPPO_DOCBASE: &str = "hippo:docbase";
    /// Branch identifier of a variant.
    pub const HIPPO_BRANCH_ID: &str = "hippo:branchId";
    /// Lifecycle state of a variant (`draft`, `unpublished`, `published`).
    pub const HIPPOSTD_STATE: &str = "hippostd:state";
    /// Node type a function applies to.
    pub const HIPPOSYS_NODETYPE: &str = "hipposys:nodetype";
    /// Implementation identifier of a function.
    pub const HIPPOSYS_CLASSNAME: &str = "hipposys:classname";
    /// Method of a builtin reference.
    pub const HIPPOSYS_METHOD: &str = "hipposys:method";
    /// Relative path of a relative or resolve reference.
    pub const HIPPOSYS_REL_PATH: &str = "hipposys:relPath";
    /// Forces a relative reference to be treated as multi-valued.
    pub const HIPPOSYS_MULTIVALUE: &str = "hipposys:multivalue";
    /// Residual property definition name.
    pub const RESIDUAL: &str = "*";
}

/// Child node names.
pub mod nodes {
    /// Collection of accessed property references.
    pub const HIPPOSYS_ACCESSED: &str = "hipposys:accessed";
    /// Collection of derived property references.
    pub const HIPPOSYS_DERIVED: &str = "hipposys:derived";
}

/// Builtin reference method computing the identifiers of all ancestors.
pub const BUILTIN_ANCESTORS: &str = "ancestors";

/// Identifier of the repository root node.
pub const ROOT_IDENTIFIER: &str = "cafebabe-cafe-babe-cafe-babecafebabe";

/// Default location of the derivation function folder.
pub const DEFAULT_DERIVATIVES_PATH: &str = "/hippo:configuration/hippo:derivatives";
