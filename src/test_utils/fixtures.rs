//! Repository fixtures for tests.
//!
//! Fixture helpers panic on failure; they are meant for test setup only.

use crate::core::schema::{DEFAULT_DERIVATIVES_PATH, nodes, props, types};
use crate::core::{PropertyValue, Value};
use crate::repository::path;
use crate::repository::{MemoryRepository, NodeId, RepositorySnapshot, Session};

/// Builder over a [`MemoryRepository`] pre-populated with the derived-data
/// configuration folder.
pub struct RepositoryFixture {
    repo: MemoryRepository,
}

impl Default for RepositoryFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryFixture {
    /// Repository with an empty function folder at the default location.
    pub fn new() -> Self {
        let mut repo = MemoryRepository::new();
        let mut parent = repo.root();
        for segment in path::segments(DEFAULT_DERIVATIVES_PATH) {
            parent = repo
                .add_node(parent, segment, types::HIPPOSYS_CONTAINER)
                .expect("failed to create configuration folder");
        }
        repo.save().expect("failed to save fixture");
        Self {
            repo,
        }
    }

    /// Repository without any derived-data configuration.
    pub fn without_configuration() -> Self {
        Self {
            repo: MemoryRepository::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.repo.root()
    }

    pub const fn repository(&self) -> &MemoryRepository {
        &self.repo
    }

    pub fn repository_mut(&mut self) -> &mut MemoryRepository {
        &mut self.repo
    }

    pub fn into_repository(self) -> MemoryRepository {
        self.repo
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self) -> RepositorySnapshot {
        RepositorySnapshot::capture(&self.repo).expect("failed to capture snapshot")
    }

    /// Clear pending changes.
    pub fn commit(&mut self) {
        self.repo.save().expect("failed to save fixture");
    }

    /// Node at an absolute path.
    pub fn node(&self, path: &str) -> NodeId {
        self.repo.node_by_path(path).unwrap_or_else(|| panic!("no node at {path}"))
    }

    /// Folder directly below the root.
    pub fn folder(&mut self, name: &str) -> NodeId {
        let root = self.root();
        self.folder_in(root, name)
    }

    pub fn folder_in(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.add(parent, name, types::HIPPOSTD_FOLDER)
    }

    /// A derived-capable document outside any handle.
    pub fn document(&mut self, parent: NodeId, name: &str) -> NodeId {
        let doc = self.add(parent, name, types::HIPPO_DOCUMENT);
        self.mixin(doc, types::HIPPO_DERIVED);
        doc
    }

    pub fn handle(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.add(parent, name, types::HIPPO_HANDLE)
    }

    /// A versionable, derived-capable variant below `handle` in `state`.
    pub fn variant(&mut self, handle: NodeId, state: &str) -> NodeId {
        let name = self.repo.name(handle).expect("handle has no name");
        let variant = self.add(handle, &name, types::HIPPO_DOCUMENT);
        self.mixin(variant, types::HIPPO_DERIVED);
        self.mixin(variant, types::MIX_VERSIONABLE);
        self.set(variant, props::HIPPOSTD_STATE, state);
        variant
    }

    /// Put a variant on a branch.
    pub fn branch(&mut self, variant: NodeId, branch_id: &str) {
        self.mixin(variant, types::HIPPO_BRANCH_INFO);
        self.set(variant, props::HIPPO_BRANCH_ID, branch_id);
    }

    /// Check in `variant`, label the new version and check it out again.
    pub fn label(&mut self, variant: NodeId, label: &str) -> String {
        let version = self.repo.checkin(variant).expect("failed to check in");
        self.repo.add_version_label(variant, &version, label).expect("failed to label version");
        self.repo.checkout(variant).expect("failed to check out");
        version
    }

    /// Mirror below `parent` pointing at `target`.
    pub fn mirror(&mut self, parent: NodeId, name: &str, target: NodeId) -> NodeId {
        let mirror = self.add(parent, name, types::HIPPO_MIRROR);
        let identifier = self.repo.identifier(target).expect("mirror target is not referenceable");
        self.set(mirror, props::HIPPO_DOCBASE, Value::Reference(identifier));
        mirror
    }

    pub fn add(&mut self, parent: NodeId, name: &str, primary_type: &str) -> NodeId {
        self.repo
            .add_node(parent, name, primary_type)
            .unwrap_or_else(|e| panic!("failed to add {name}: {e}"))
    }

    pub fn mixin(&mut self, node: NodeId, mixin: &str) {
        self.repo.add_mixin(node, mixin).unwrap_or_else(|e| panic!("failed to add {mixin}: {e}"));
    }

    /// Set a single-valued property.
    pub fn set(&mut self, node: NodeId, name: &str, value: impl Into<Value>) {
        self.repo
            .set_property(node, name, PropertyValue::Single(value.into()))
            .unwrap_or_else(|e| panic!("failed to set {name}: {e}"));
    }

    /// Set a multi-valued property.
    pub fn set_multi(&mut self, node: NodeId, name: &str, values: Vec<Value>) {
        self.repo
            .set_property(node, name, PropertyValue::Multi(values))
            .unwrap_or_else(|e| panic!("failed to set {name}: {e}"));
    }

    /// String form of a property's first value.
    pub fn string(&self, node: NodeId, name: &str) -> Option<String> {
        self.repo.get_property(node, name).and_then(|p| p.string())
    }

    /// Start a function definition in the default function folder.
    pub fn function(
        &mut self,
        name: &str,
        implementation_id: &str,
        applicable_type: &str,
    ) -> FunctionBuilder<'_> {
        let folder = self.node(DEFAULT_DERIVATIVES_PATH);
        let node = self.add(folder, name, types::HIPPOSYS_DERIVED_DEFINITION);
        self.set(node, props::HIPPOSYS_CLASSNAME, implementation_id);
        self.set(node, props::HIPPOSYS_NODETYPE, applicable_type);
        FunctionBuilder {
            repo: &mut self.repo,
            node,
        }
    }
}

/// Adds parameter references to a function definition.
pub struct FunctionBuilder<'a> {
    repo: &'a mut MemoryRepository,
    node: NodeId,
}

impl FunctionBuilder<'_> {
    pub fn accessed_relative(self, name: &str, rel_path: &str) -> Self {
        self.reference(nodes::HIPPOSYS_ACCESSED, name, types::HIPPOSYS_RELATIVE_REFERENCE, |_| {
            vec![(props::HIPPOSYS_REL_PATH, Value::from(rel_path))]
        })
    }

    pub fn accessed_resolve(self, name: &str, rel_path: &str) -> Self {
        self.reference(nodes::HIPPOSYS_ACCESSED, name, types::HIPPOSYS_RESOLVE_REFERENCE, |_| {
            vec![(props::HIPPOSYS_REL_PATH, Value::from(rel_path))]
        })
    }

    pub fn accessed_builtin(self, name: &str, method: &str) -> Self {
        self.reference(nodes::HIPPOSYS_ACCESSED, name, types::HIPPOSYS_BUILTIN_REFERENCE, |_| {
            vec![(props::HIPPOSYS_METHOD, Value::from(method))]
        })
    }

    pub fn derived_relative(self, name: &str, rel_path: &str) -> Self {
        self.reference(nodes::HIPPOSYS_DERIVED, name, types::HIPPOSYS_RELATIVE_REFERENCE, |_| {
            vec![(props::HIPPOSYS_REL_PATH, Value::from(rel_path))]
        })
    }

    /// Derived reference whose new target property is multi-valued.
    pub fn derived_multi(self, name: &str, rel_path: &str) -> Self {
        self.reference(nodes::HIPPOSYS_DERIVED, name, types::HIPPOSYS_RELATIVE_REFERENCE, |_| {
            vec![
                (props::HIPPOSYS_REL_PATH, Value::from(rel_path)),
                (props::HIPPOSYS_MULTIVALUE, Value::from(true)),
            ]
        })
    }

    /// The definition node.
    pub const fn node(&self) -> NodeId {
        self.node
    }

    fn reference<F>(self, collection: &str, name: &str, reference_type: &str, properties: F) -> Self
    where
        F: FnOnce(&str) -> Vec<(&'static str, Value)>,
    {
        let container = match self.repo.child(self.node, collection) {
            Some(container) => container,
            None => self
                .repo
                .add_node(self.node, collection, types::NT_UNSTRUCTURED)
                .expect("failed to add reference collection"),
        };
        let reference =
            self.repo.add_node(container, name, reference_type).expect("failed to add reference");
        for (property, value) in properties(name) {
            self.repo
                .set_property(reference, property, PropertyValue::Single(value))
                .expect("failed to set reference property");
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionDescription;

    #[test]
    fn test_fixture_builds_function_definitions() {
        let mut fixture = RepositoryFixture::new();
        fixture
            .function("copy-title", "copy", types::HIPPO_DOCUMENT)
            .accessed_relative("title", "title")
            .accessed_builtin("ancestors", "ancestors")
            .derived_multi("title", "summary");

        let folder = fixture.node(DEFAULT_DERIVATIVES_PATH);
        let functions = FunctionDescription::load_all(fixture.repository(), folder).unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].accessed.len(), 2);
        assert_eq!(functions[0].derived.len(), 1);
    }

    #[test]
    fn test_variants_and_labels() {
        let mut fixture = RepositoryFixture::new();
        let handle = fixture.handle(fixture.root(), "news");
        let variant = fixture.variant(handle, "unpublished");
        fixture.branch(variant, "feature");
        let version = fixture.label(variant, "feature-unpublished");

        let history = fixture.repository().version_history(variant).unwrap();
        assert!(history.has_version_label("feature-unpublished"));
        assert_eq!(history.version_by_label("feature-unpublished").unwrap().name, version);
        assert!(fixture.repository().is_checked_out(variant).unwrap());
        assert_eq!(fixture.string(variant, props::HIPPO_BRANCH_ID).as_deref(), Some("feature"));
    }
}
