//! References addressing a property by a path relative to the modified node.

use std::collections::BTreeSet;
use uuid::Uuid;

use crate::branch::{
    BranchResolvePropertyResolver, PropertyResolver, RelativePathPropertyResolver,
};
use crate::core::schema::types;
use crate::core::{DerivedDataError, Parameters, PropertyValue, Result, Value};
use crate::repository::path::{self, Segment};
use crate::repository::{NodeId, Permission, Session, display_path};

use super::record_dependency;

/// A readable and writable reference such as `body/title` or `../summary`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelativeReference {
    pub name: String,
    pub rel_path: String,
    /// Treat a property that does not exist yet as multi-valued
    pub multi_value: bool,
}

impl RelativeReference {
    pub fn new(name: impl Into<String>, rel_path: impl Into<String>, multi_value: bool) -> Self {
        Self {
            name: name.into(),
            rel_path: rel_path.into(),
            multi_value,
        }
    }

    pub(super) fn resolve_values(
        &self,
        session: &dyn Session,
        modified: NodeId,
        dependencies: &mut BTreeSet<Uuid>,
    ) -> Result<Option<Vec<Value>>> {
        let mut resolver = BranchResolvePropertyResolver::new(RelativePathPropertyResolver::new(
            modified,
            self.rel_path.as_str(),
        ));
        resolver.resolve(session)?;

        let Some(resolved) = resolver.property() else {
            return Ok(None);
        };
        record_dependency(session, &resolved.owner, dependencies)?;
        Ok(Some(resolved.property.values()))
    }

    pub(super) fn persist_values(
        &self,
        session: &mut dyn Session,
        modified: NodeId,
        parameters: &Parameters,
    ) -> Result<bool> {
        let values = parameters.get(&self.name);
        let (segments, property_name) = path::split_property_path(&self.rel_path)?;

        let mut target = modified;
        for segment in segments {
            match path::parse_segment(segment)? {
                Segment::Current => {}
                Segment::Parent => {
                    let Some(parent) = session.parent(target) else {
                        tracing::warn!(
                            "Path '{}' of parameter '{}' leaves the repository root",
                            self.rel_path,
                            self.name
                        );
                        return Ok(false);
                    };
                    target = parent;
                }
                Segment::Child {
                    name,
                    ..
                } => {
                    if let Some(child) = session.child(target, segment) {
                        target = child;
                        continue;
                    }
                    if values.is_none() {
                        return Ok(false);
                    }
                    match self.create_child(session, target, name) {
                        Ok(child) => target = child,
                        Err(DerivedDataError::AccessDenied {
                            path,
                            permission,
                        }) => {
                            tracing::warn!(
                                "Cannot create '{}' for parameter '{}': {} denied on {}",
                                name,
                                self.name,
                                permission,
                                path
                            );
                            return Ok(false);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        match self.write(session, target, property_name, values) {
            Err(DerivedDataError::AccessDenied {
                path,
                permission,
            }) => {
                tracing::warn!(
                    "Failed to persist parameter '{}': {} denied on {}",
                    self.name,
                    permission,
                    path
                );
                Ok(false)
            }
            other => other,
        }
    }

    fn create_child(&self, session: &mut dyn Session, parent: NodeId, name: &str) -> Result<NodeId> {
        let child_path = path::join(&session.path(parent)?, name);
        session.check_permission(&child_path, Permission::AddNode)?;
        session.ensure_checked_out(parent)?;
        tracing::debug!("Creating intermediate node {} for parameter '{}'", child_path, self.name);
        session.add_node(parent, name, types::NT_UNSTRUCTURED)
    }

    fn write(
        &self,
        session: &mut dyn Session,
        target: NodeId,
        name: &str,
        values: Option<&Vec<Value>>,
    ) -> Result<bool> {
        let existing = session.get_property(target, name);
        let definition = session.property_definition(target, name);
        if definition.as_ref().is_some_and(|d| d.protected) {
            tracing::debug!(
                "Skipping protected property '{}' on {}",
                name,
                display_path(session, target)
            );
            return Ok(false);
        }

        let Some(values) = values else {
            if existing.is_none() {
                return Ok(false);
            }
            self.remove(session, target, name)?;
            return Ok(true);
        };

        let multiple = match &existing {
            Some(property) => property.is_multiple(),
            None => match definition.filter(|d| !d.is_residual()) {
                Some(definition) => definition.multiple,
                None => self.multi_value,
            },
        };

        let new_value = if multiple {
            PropertyValue::Multi(values.clone())
        } else {
            match values.as_slice() {
                [] => {
                    if existing.is_none() {
                        return Ok(false);
                    }
                    self.remove(session, target, name)?;
                    return Ok(true);
                }
                [value] => PropertyValue::Single(value.clone()),
                _ => {
                    tracing::error!(
                        "Parameter '{}' has {} values but '{}' on {} is single-valued",
                        self.name,
                        values.len(),
                        name,
                        display_path(session, target)
                    );
                    return Ok(false);
                }
            }
        };

        if existing.as_ref().is_some_and(|property| property.value == new_value) {
            return Ok(false);
        }

        let property_path = path::join(&session.path(target)?, name);
        session.check_permission(&property_path, Permission::SetProperty)?;
        session.ensure_checked_out(target)?;
        session.set_property(target, name, new_value)?;
        tracing::debug!("Updated {} from parameter '{}'", property_path, self.name);
        Ok(true)
    }

    fn remove(&self, session: &mut dyn Session, target: NodeId, name: &str) -> Result<()> {
        let property_path = path::join(&session.path(target)?, name);
        session.check_permission(&property_path, Permission::SetProperty)?;
        session.ensure_checked_out(target)?;
        session.remove_property(target, name)?;
        tracing::debug!("Removed {} (parameter '{}' has no value)", property_path, self.name);
        Ok(())
    }
}
