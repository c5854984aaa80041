//! The derived-data engine.
//!
//! The engine keeps derived properties up to date. Each pass:
//!
//! 1. discovers the nodes to (re)compute: changed documents and derived
//!    nodes, plus derived nodes whose `hippo:related` index points at a
//!    changed referenceable node
//! 2. orders them by path length, then path, so that shallow nodes compute
//!    before deep ones
//! 3. runs every function whose applicable type matches each node, reading
//!    accessed parameters, computing, and persisting derived parameters
//! 4. stores the identifiers of every referenceable node read during the
//!    computation as the node's `hippo:related` index
//!
//! The dependency graph is never materialised for computation; it exists only
//! as the `hippo:related` back-references. [`DependencyGraph`] rebuilds it on
//! demand for diagnostics.
//!
//! # Failure semantics
//!
//! - a function applying to an unknown node type makes [`save`](DerivedDataEngine::save)
//!   skip the pass (logged); [`compute`](DerivedDataEngine::compute) reports it
//! - permission failures on individual properties are logged and skipped
//! - ambiguous branch configuration, missing frozen variants and unknown
//!   function implementations abort the computation of the node

mod dependency_graph;
mod validate;

pub use dependency_graph::{DependencyGraph, DependencyNode};
pub use validate::{SaveOutcome, SkipReason, ValidationReport};

use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::core::schema::{props, types};
use crate::core::{DerivedDataError, PropertyValue, Result, Value};
use crate::function::{FunctionDescription, FunctionRegistry, PropertyMapper};
use crate::repository::{NodeId, Session, display_path};

/// Computes derived properties over a repository session.
#[derive(Debug)]
pub struct DerivedDataEngine {
    config: EngineConfig,
    registry: FunctionRegistry,
}

impl DerivedDataEngine {
    pub const fn new(config: EngineConfig, registry: FunctionRegistry) -> Self {
        Self {
            config,
            registry,
        }
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// The folder holding function definitions, if it exists.
    pub fn derivatives_folder(&self, session: &dyn Session) -> Option<NodeId> {
        session.node_by_path(&self.config.derivatives_path)
    }

    /// Read all function definitions; empty without a definitions folder.
    pub fn load_functions(&self, session: &dyn Session) -> Result<Vec<FunctionDescription>> {
        match self.derivatives_folder(session) {
            Some(folder) => FunctionDescription::load_all(session, folder),
            None => Ok(Vec::new()),
        }
    }

    /// Recompute derived data for the pending changes below `scope` (the
    /// whole repository when `None`).
    ///
    /// The caller decides whether to commit afterwards.
    pub fn save(&self, session: &mut dyn Session, scope: Option<NodeId>) -> Result<SaveOutcome> {
        if self.derivatives_folder(session).is_none() {
            tracing::debug!(
                "No derived-data configuration at {}, skipping",
                self.config.derivatives_path
            );
            return Ok(SaveOutcome::Skipped(SkipReason::NoConfiguration));
        }

        let functions = self.load_functions(session)?;
        if let Err(e) = check_node_types(session, &functions) {
            return match e {
                DerivedDataError::UnknownNodeType {
                    name,
                } => {
                    tracing::warn!("Skipping derived-data pass: no such node type {}", name);
                    Ok(SaveOutcome::Skipped(SkipReason::UnknownNodeType(name)))
                }
                other => Err(other),
            };
        }

        let nodes = self.find_nodes_to_compute(session, scope)?;
        let mut changed = 0;
        for node in &nodes {
            session.ensure_checked_out(*node)?;
            if self.compute_node(session, &functions, *node)? {
                changed += 1;
            }
        }

        tracing::info!("Derived data: {} node(s) computed, {} changed", nodes.len(), changed);
        Ok(SaveOutcome::Computed {
            nodes: nodes.len(),
            changed,
        })
    }

    /// Nodes to recompute for the pending changes below `scope`, ordered by
    /// path length, then path.
    pub fn find_nodes_to_compute(
        &self,
        session: &dyn Session,
        scope: Option<NodeId>,
    ) -> Result<Vec<NodeId>> {
        let scope = scope.unwrap_or_else(|| session.root());

        let mut found: HashSet<NodeId> = HashSet::new();
        found.extend(session.pending_changes(scope, types::HIPPO_DERIVED)?);
        found.extend(session.pending_changes(scope, types::HIPPO_DOCUMENT)?);

        for changed in session.pending_changes(scope, types::MIX_REFERENCEABLE)? {
            let Some(identifier) = session.identifier(changed) else {
                continue;
            };
            for location in session.references(&identifier) {
                if location.name == props::HIPPO_RELATED
                    && session.is_node_type(location.node, types::HIPPO_DERIVED)?
                    && found.insert(location.node)
                {
                    tracing::debug!(
                        "{} depends on changed {}",
                        display_path(session, location.node),
                        display_path(session, changed)
                    );
                }
            }
        }

        let mut ordered = Vec::with_capacity(found.len());
        for node in found {
            ordered.push((session.path(node)?, node));
        }
        ordered.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        Ok(ordered.into_iter().map(|(_, node)| node).collect())
    }

    /// Run every applicable function on `modified` and refresh its
    /// `hippo:related` index; returns whether anything changed.
    ///
    /// Function definitions are read afresh on every call.
    pub fn compute(&self, session: &mut dyn Session, modified: NodeId) -> Result<bool> {
        let functions = self.load_functions(session)?;
        check_node_types(session, &functions)?;
        self.compute_node(session, &functions, modified)
    }

    fn compute_node(
        &self,
        session: &mut dyn Session,
        functions: &[FunctionDescription],
        modified: NodeId,
    ) -> Result<bool> {
        let mut dependencies = BTreeSet::new();
        let mut changed = false;

        for description in functions {
            if !session.is_node_type(modified, &description.applicable_type)? {
                continue;
            }
            tracing::debug!(
                "Applying '{}' ({}) to {}",
                description.name,
                description.implementation_id,
                display_path(session, modified)
            );

            let mapper = PropertyMapper::new(description, modified);
            let accessed = mapper.accessed_values(session, &mut dependencies)?;
            let function = self.registry.create(&description.implementation_id)?;
            let derived = function.compute(accessed).map_err(|e| match e {
                failed @ DerivedDataError::FunctionFailed {
                    ..
                } => failed,
                other => DerivedDataError::FunctionFailed {
                    function: description.name.clone(),
                    reason: other.to_string(),
                },
            })?;
            changed |= mapper.persist_derived_values(session, &derived)?;
        }

        changed |= update_related(session, modified, dependencies)?;
        Ok(changed)
    }

    /// Recompute every derived node in the repository.
    ///
    /// Commits after every `validate_batch_size` changed nodes and once at the
    /// end. Per-node failures are logged and counted. An out-of-range
    /// configuration is rejected before any node is touched.
    pub fn validate(&self, session: &mut dyn Session) -> Result<ValidationReport> {
        self.config.validate()?;
        let functions = self.load_functions(session)?;
        check_node_types(session, &functions)?;

        let mut report = ValidationReport::default();
        for node in session.nodes_of_type(types::HIPPO_DERIVED)? {
            report.total += 1;
            let result = session
                .ensure_checked_out(node)
                .and_then(|()| self.compute_node(session, &functions, node));
            match result {
                Ok(true) => {
                    report.changed += 1;
                    if report.changed % self.config.validate_batch_size == 0 {
                        tracing::debug!("Committing after {} changed node(s)", report.changed);
                        session.save()?;
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("Failed to validate {}: {}", display_path(session, node), e);
                    report.failed += 1;
                }
            }
        }
        session.save()?;

        tracing::info!("Validation finished: {}", report);
        Ok(report)
    }

    /// Drop the identifier of `removed` from every `hippo:related` index
    /// referring to it, before the node itself is removed.
    ///
    /// Only the first occurrence is removed from each index. Returns the
    /// number of indices updated.
    pub fn removal(&self, session: &mut dyn Session, removed: NodeId) -> Result<usize> {
        let Some(identifier) = session.identifier(removed) else {
            return Ok(0);
        };

        let mut updated = 0;
        for location in session.references(&identifier) {
            if location.name != props::HIPPO_RELATED {
                continue;
            }
            let Some(related) = session.get_property(location.node, props::HIPPO_RELATED) else {
                continue;
            };
            let mut values = related.values();
            let Some(position) = values.iter().position(|v| v.as_reference() == Some(identifier))
            else {
                continue;
            };
            values.remove(position);

            session.ensure_checked_out(location.node)?;
            session.set_property(location.node, props::HIPPO_RELATED, PropertyValue::Multi(values))?;
            tracing::debug!(
                "Removed {} from related of {}",
                identifier,
                display_path(session, location.node)
            );
            updated += 1;
        }
        Ok(updated)
    }
}

/// Fail with `UnknownNodeType` if any function applies to an unregistered type.
fn check_node_types(session: &dyn Session, functions: &[FunctionDescription]) -> Result<()> {
    for description in functions {
        session.is_node_type(session.root(), &description.applicable_type)?;
    }
    Ok(())
}

/// Store `dependencies` (minus the node itself) as the `hippo:related` index.
fn update_related(
    session: &mut dyn Session,
    modified: NodeId,
    mut dependencies: BTreeSet<Uuid>,
) -> Result<bool> {
    if let Some(own) = session.identifier(modified) {
        dependencies.remove(&own);
    }
    if !session.is_node_type(modified, types::HIPPO_DERIVED)? {
        return Ok(false);
    }

    let related: Vec<Value> = dependencies.into_iter().map(Value::Reference).collect();
    let current =
        session.get_property(modified, props::HIPPO_RELATED).map(|p| p.values()).unwrap_or_default();
    if current == related {
        return Ok(false);
    }

    tracing::debug!(
        "Updating related of {}: {} dependency(ies)",
        display_path(session, modified),
        related.len()
    );
    session.ensure_checked_out(modified)?;
    session.set_property(modified, props::HIPPO_RELATED, PropertyValue::Multi(related))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::stock;
    use crate::repository::MemoryRepository;
    use crate::test_utils::fixtures::RepositoryFixture;

    fn engine() -> DerivedDataEngine {
        DerivedDataEngine::new(EngineConfig::default(), FunctionRegistry::with_stock_functions())
    }

    fn copy_fixture() -> (RepositoryFixture, NodeId) {
        let mut fixture = RepositoryFixture::new();
        fixture
            .function("copy-title", stock::COPY, types::HIPPO_DOCUMENT)
            .accessed_relative("title", "a/b")
            .derived_relative("title", "c");
        let content = fixture.folder("content");
        let doc = fixture.document(content, "doc");
        let a = fixture.folder_in(doc, "a");
        fixture.set(a, "b", "hello");
        fixture.commit();
        (fixture, doc)
    }

    #[test]
    fn test_compute_is_idempotent() {
        let (mut fixture, doc) = copy_fixture();
        let engine = engine();
        let repo = fixture.repository_mut();

        assert!(engine.compute(repo, doc).unwrap());
        let related = repo.get_property(doc, props::HIPPO_RELATED).unwrap();
        assert!(!engine.compute(repo, doc).unwrap());
        assert_eq!(repo.get_property(doc, props::HIPPO_RELATED).unwrap(), related);
    }

    #[test]
    fn test_related_excludes_own_identifier() {
        let mut fixture = RepositoryFixture::new();
        fixture
            .function("copy-own", stock::COPY, types::HIPPO_DOCUMENT)
            .accessed_relative("title", "title")
            .derived_relative("title", "copy");
        let doc = fixture.document(fixture.root(), "doc");
        fixture.set(doc, "title", "own");
        let engine = engine();
        let repo = fixture.repository_mut();

        assert!(engine.compute(repo, doc).unwrap());
        assert_eq!(repo.get_property(doc, "copy").unwrap().string().as_deref(), Some("own"));
        // only the own identifier was read, and related starts out absent
        assert!(repo.get_property(doc, props::HIPPO_RELATED).is_none());
    }

    #[test]
    fn test_save_updates_changed_input() {
        let (mut fixture, doc) = copy_fixture();
        let engine = engine();
        let a = fixture.node("/content/doc/a");
        let repo = fixture.repository_mut();
        engine.save(repo, Some(doc)).unwrap();
        repo.save().unwrap();

        repo.set_property(a, "b", PropertyValue::Single(Value::from("changed"))).unwrap();
        let outcome = engine.save(repo, Some(doc)).unwrap();
        assert_eq!(outcome.changed(), 1);
        assert_eq!(repo.get_property(doc, "c").unwrap().string().as_deref(), Some("changed"));

        let related = repo.get_property(doc, props::HIPPO_RELATED).unwrap().values();
        assert!(related.contains(&Value::Reference(repo.identifier(a).unwrap())));
    }

    #[test]
    fn test_reverse_discovery() {
        let (mut fixture, doc) = copy_fixture();
        let engine = engine();
        let source = fixture.document(fixture.root(), "source");
        let repo = fixture.repository_mut();
        let source_id = repo.identifier(source).unwrap();
        repo.set_property(doc, props::HIPPO_RELATED, PropertyValue::Multi(vec![Value::Reference(source_id)]))
            .unwrap();
        repo.save().unwrap();

        repo.set_property(source, "unrelated", PropertyValue::Single(Value::from("x"))).unwrap();
        let nodes = engine.find_nodes_to_compute(repo, None).unwrap();
        assert!(nodes.contains(&doc));
        assert!(nodes.contains(&source));
    }

    #[test]
    fn test_nodes_ordered_by_path_length() {
        let mut fixture = RepositoryFixture::new();
        let content = fixture.folder("content");
        let deep_parent = fixture.folder_in(content, "zz");
        let deep = fixture.document(deep_parent, "doc");
        let shallow = fixture.document(content, "b");
        let other = fixture.document(content, "a");
        let engine = engine();
        let nodes = engine.find_nodes_to_compute(fixture.repository(), None).unwrap();
        let interesting: Vec<_> = nodes.into_iter().filter(|n| [deep, shallow, other].contains(n)).collect();
        assert_eq!(interesting, [other, shallow, deep]);
    }

    #[test]
    fn test_save_without_configuration_is_noop() {
        let mut repo = MemoryRepository::new();
        let root = repo.root();
        repo.add_node(root, "doc", types::HIPPO_DOCUMENT).unwrap();
        let outcome = engine().save(&mut repo, None).unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::NoConfiguration));
    }

    #[test]
    fn test_unknown_applicable_type() {
        let mut fixture = RepositoryFixture::new();
        fixture
            .function("broken", stock::COPY, "myproject:gone")
            .accessed_relative("title", "title")
            .derived_relative("title", "copy");
        let doc = fixture.document(fixture.root(), "doc");
        let engine = engine();
        let repo = fixture.repository_mut();

        let outcome = engine.save(repo, None).unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::UnknownNodeType("myproject:gone".to_string())));
        assert!(matches!(engine.compute(repo, doc), Err(DerivedDataError::UnknownNodeType { .. })));
    }

    #[test]
    fn test_unknown_implementation_aborts_node() {
        let mut fixture = RepositoryFixture::new();
        fixture
            .function("missing", "org.example.Missing", types::HIPPO_DOCUMENT)
            .derived_relative("title", "copy");
        let doc = fixture.document(fixture.root(), "doc");
        let repo = fixture.repository_mut();
        assert!(matches!(engine().compute(repo, doc), Err(DerivedDataError::UnknownFunction { .. })));
    }

    #[test]
    fn test_function_error_is_wrapped() {
        let mut fixture = RepositoryFixture::new();
        fixture.function("failing", "fail", types::HIPPO_DOCUMENT).derived_relative("x", "x");
        let doc = fixture.document(fixture.root(), "doc");
        let mut registry = FunctionRegistry::new();
        registry.register_fn("fail", |_| Err(DerivedDataError::Other {
            message: "boom".to_string(),
        }));
        let engine = DerivedDataEngine::new(EngineConfig::default(), registry);

        match engine.compute(fixture.repository_mut(), doc) {
            Err(DerivedDataError::FunctionFailed {
                function,
                reason,
            }) => {
                assert_eq!(function, "failing");
                assert_eq!(reason, "boom");
            }
            other => panic!("expected FunctionFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_counts_and_commits() {
        let (mut fixture, _) = copy_fixture();
        fixture.document(fixture.root(), "plain");
        let engine = DerivedDataEngine::new(
            EngineConfig {
                validate_batch_size: 1,
                ..EngineConfig::default()
            },
            FunctionRegistry::with_stock_functions(),
        );
        let repo = fixture.repository_mut();

        let report = engine.validate(repo).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.changed, 1);
        assert_eq!(report.failed, 0);
        assert!(!repo.has_pending_changes());

        let again = engine.validate(repo).unwrap();
        assert_eq!(again.changed, 0);
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let (mut fixture, doc) = copy_fixture();
        let engine = DerivedDataEngine::new(
            EngineConfig {
                validate_batch_size: 0,
                ..EngineConfig::default()
            },
            FunctionRegistry::with_stock_functions(),
        );
        let repo = fixture.repository_mut();

        let err = engine.validate(repo).unwrap_err();
        assert!(matches!(err, DerivedDataError::InvalidConfiguration { .. }));
        assert!(repo.get_property(doc, "c").is_none());
    }

    #[test]
    fn test_removal_splices_first_match() {
        let mut fixture = RepositoryFixture::new();
        let doc = fixture.document(fixture.root(), "doc");
        let x = fixture.document(fixture.root(), "x");
        let y = fixture.document(fixture.root(), "y");
        let z = fixture.document(fixture.root(), "z");
        let repo = fixture.repository_mut();
        let [xi, yi, zi] = [x, y, z].map(|n| Value::Reference(repo.identifier(n).unwrap()));
        repo.set_property(
            doc,
            props::HIPPO_RELATED,
            PropertyValue::Multi(vec![yi.clone(), xi.clone(), zi.clone(), xi.clone()]),
        )
        .unwrap();

        let engine = engine();
        assert_eq!(engine.removal(repo, x).unwrap(), 1);
        repo.remove_node(x).unwrap();
        assert_eq!(repo.get_property(doc, props::HIPPO_RELATED).unwrap().values(), vec![yi, zi, xi]);
    }
}
