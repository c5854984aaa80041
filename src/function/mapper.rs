//! Bridge between a function's references and its parameter map.

use std::collections::BTreeSet;
use uuid::Uuid;

use super::description::FunctionDescription;
use crate::core::{Parameters, Result};
use crate::repository::{NodeId, Session};

/// Reads accessed parameters and persists derived ones for one node.
pub struct PropertyMapper<'a> {
    description: &'a FunctionDescription,
    modified: NodeId,
}

impl<'a> PropertyMapper<'a> {
    pub const fn new(description: &'a FunctionDescription, modified: NodeId) -> Self {
        Self {
            description,
            modified,
        }
    }

    /// Values of every accessed parameter that currently has a value.
    pub fn accessed_values(
        &self,
        session: &dyn Session,
        dependencies: &mut BTreeSet<Uuid>,
    ) -> Result<Parameters> {
        let mut parameters = Parameters::new();
        for reference in self.description.accessed_properties() {
            if let Some(values) = reference.resolve_values(session, self.modified, dependencies)? {
                parameters.insert(reference.name().to_string(), values);
            }
        }
        Ok(parameters)
    }

    /// Persist every derived parameter; returns whether anything changed.
    pub fn persist_derived_values(
        &self,
        session: &mut dyn Session,
        parameters: &Parameters,
    ) -> Result<bool> {
        let mut changed = false;
        for reference in self.description.derived_properties() {
            changed |= reference.persist_values(session, self.modified, parameters)?;
        }
        Ok(changed)
    }
}
