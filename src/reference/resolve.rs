//! Read-only references that follow mirrors while walking their path.

use std::collections::BTreeSet;
use uuid::Uuid;

use crate::branch::{BranchResolvePropertyResolver, PropertyResolver, ResolvePropertyResolver};
use crate::core::{Parameters, Result, Value};
use crate::repository::{NodeId, Session, display_path, is_referenceable};

use super::record_dependency;

/// A reference resolved through mirrors, e.g. `link/title`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolveReference {
    pub name: String,
    pub rel_path: String,
}

impl ResolveReference {
    pub fn new(name: impl Into<String>, rel_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rel_path: rel_path.into(),
        }
    }

    /// Resolve the values.
    ///
    /// When the walk stops early, the last node reached still becomes a
    /// dependency so that creating the missing part triggers recomputation.
    pub(super) fn resolve_values(
        &self,
        session: &dyn Session,
        modified: NodeId,
        dependencies: &mut BTreeSet<Uuid>,
    ) -> Result<Option<Vec<Value>>> {
        let mut resolver = BranchResolvePropertyResolver::new(ResolvePropertyResolver::new(
            modified,
            self.rel_path.as_str(),
        ));
        resolver.resolve(session)?;

        let Some(outcome) = resolver.outcome() else {
            return Ok(None);
        };
        match &outcome.property {
            Some(resolved) => {
                record_dependency(session, &resolved.owner, dependencies)?;
                Ok(Some(resolved.property.values()))
            }
            None => {
                let last = outcome.last_node_visited;
                if is_referenceable(session, last)? {
                    if let Some(identifier) = session.identifier(last) {
                        dependencies.insert(identifier);
                    }
                }
                Ok(None)
            }
        }
    }

    pub(super) fn persist_values(
        &self,
        session: &mut dyn Session,
        modified: NodeId,
        parameters: &Parameters,
    ) -> Result<bool> {
        if parameters.contains_key(&self.name) {
            tracing::warn!(
                "Parameter '{}' of {} uses a resolve reference and cannot be persisted",
                self.name,
                display_path(session, modified)
            );
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{props, types};
    use crate::core::PropertyValue;
    use crate::repository::MemoryRepository;

    #[test]
    fn test_missing_leaf_still_records_last_node() {
        let mut repo = MemoryRepository::new();
        let root = repo.root();
        let doc = repo.add_node(root, "doc", types::HIPPO_DOCUMENT).unwrap();
        let folder = repo.add_node(doc, "a", types::HIPPOSTD_FOLDER).unwrap();

        let mut dependencies = BTreeSet::new();
        let values = ResolveReference::new("p", "a/b/title")
            .resolve_values(&repo, doc, &mut dependencies)
            .unwrap();
        assert!(values.is_none());
        assert_eq!(dependencies, BTreeSet::from([repo.identifier(folder).unwrap()]));
    }

    #[test]
    fn test_resolved_through_mirror() {
        let mut repo = MemoryRepository::new();
        let root = repo.root();
        let target = repo.add_node(root, "target", types::HIPPO_DOCUMENT).unwrap();
        repo.set_property(target, "title", PropertyValue::Single(Value::from("T"))).unwrap();
        let doc = repo.add_node(root, "doc", types::HIPPO_DOCUMENT).unwrap();
        let link = repo.add_node(doc, "link", types::HIPPO_MIRROR).unwrap();
        let target_id = repo.identifier(target).unwrap();
        repo.set_property(link, props::HIPPO_DOCBASE, PropertyValue::Single(Value::Reference(target_id)))
            .unwrap();

        let mut dependencies = BTreeSet::new();
        let values = ResolveReference::new("p", "link/title")
            .resolve_values(&repo, doc, &mut dependencies)
            .unwrap();
        assert_eq!(values, Some(vec![Value::from("T")]));
        assert_eq!(dependencies, BTreeSet::from([target_id]));
    }

    #[test]
    fn test_not_persistable() {
        let mut repo = MemoryRepository::new();
        let root = repo.root();
        let parameters = Parameters::from([("p".to_string(), vec![Value::from("x")])]);
        let reference = ResolveReference::new("p", "title");
        assert!(!reference.persist_values(&mut repo, root, &parameters).unwrap());
        assert!(!repo.has_property(root, "title"));
    }
}
