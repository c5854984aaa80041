//! Branch-aware property resolution.
//!
//! When a derivation on one document variant reads a property of another
//! variant, the two may belong to different branches. In that case the live
//! property of the other variant is the wrong source: the value must come
//! from the version of that variant labelled `<branchId>-<state>` after the
//! modified variant.

use crate::core::schema::{props, types};
use crate::core::{DerivedDataError, Result};
use crate::repository::{NodeId, Session, display_path, path};

use super::relative_path_finder::RelativePathFinder;
use super::resolver::{PropertyOwner, PropertyResolver, ResolvedProperty, TraversalOutcome};
use super::variant_finder::VariantFinder;

/// Wraps another resolver and swaps cross-branch results for frozen values.
pub struct BranchResolvePropertyResolver<R> {
    inner: R,
    outcome: Option<TraversalOutcome>,
}

impl<R: PropertyResolver> BranchResolvePropertyResolver<R> {
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            outcome: None,
        }
    }

    fn branch_resolve(&self, session: &dyn Session, inner: TraversalOutcome) -> Result<TraversalOutcome> {
        let (owner, property_name) = match &inner.property {
            Some(ResolvedProperty {
                property,
                owner: PropertyOwner::Live(owner),
            }) => (*owner, property.name.clone()),
            _ => return Ok(inner),
        };

        let finder = VariantFinder::new(session);
        let Some(modified_variant) = finder.find(self.inner.modified_node())? else {
            return Ok(inner);
        };
        let Some(accessed_variant) = finder.find_for_property(owner)? else {
            return Ok(inner);
        };

        let modified_branch = branch_id(session, modified_variant)?;
        let accessed_branch = branch_id(session, accessed_variant)?;
        let modified_branch = match (modified_branch, accessed_branch) {
            (None, None) => return Ok(inner),
            (Some(modified), Some(accessed)) if modified == accessed => return Ok(inner),
            (Some(modified), Some(_)) => modified,
            _ => {
                return Err(DerivedDataError::AmbiguousBranchConfiguration {
                    modified_variant: display_path(session, modified_variant),
                    accessed_variant: display_path(session, accessed_variant),
                });
            }
        };

        let state = session
            .get_property(modified_variant, props::HIPPOSTD_STATE)
            .and_then(|state| state.string())
            .unwrap_or_default();
        let label = format!("{modified_branch}-{state}");

        let variant_path = session.path(accessed_variant)?;
        let version = session
            .version_history(accessed_variant)
            .and_then(|history| history.version_by_label(&label))
            .ok_or_else(|| DerivedDataError::MissingFrozenVariant {
                variant: variant_path.clone(),
                label: label.clone(),
            })?;

        let property_path = path::join(&session.path(owner)?, &property_name);
        let finder = RelativePathFinder::new(variant_path, property_path);
        let frozen = version.frozen_node();
        let mut found = frozen.property(&finder.relative_path()?);
        if found.is_none() {
            found = frozen.property(&finder.indexed_relative_path()?);
        }

        tracing::debug!(
            "Resolved '{}' of {} from version {} labelled {}: {}",
            self.inner.relative_path(),
            display_path(session, accessed_variant),
            version.name,
            label,
            if found.is_some() { "found" } else { "absent" }
        );

        Ok(TraversalOutcome {
            property: found.map(|frozen| ResolvedProperty {
                property: frozen.property,
                owner: PropertyOwner::Frozen {
                    identifier: frozen.owner_identifier,
                    path: frozen.owner_path,
                },
            }),
            last_node_visited: inner.last_node_visited,
        })
    }
}

impl<R: PropertyResolver> PropertyResolver for BranchResolvePropertyResolver<R> {
    fn resolve(&mut self, session: &dyn Session) -> Result<()> {
        self.inner.resolve(session)?;
        let Some(inner) = self.inner.outcome().cloned() else {
            self.outcome = None;
            return Ok(());
        };
        self.outcome = Some(self.branch_resolve(session, inner)?);
        Ok(())
    }

    fn outcome(&self) -> Option<&TraversalOutcome> {
        self.outcome.as_ref()
    }

    fn relative_path(&self) -> &str {
        self.inner.relative_path()
    }

    fn modified_node(&self) -> NodeId {
        self.inner.modified_node()
    }
}

/// Branch id of a variant carrying branch info; `None` without branch info.
fn branch_id(session: &dyn Session, variant: NodeId) -> Result<Option<String>> {
    if !session.is_node_type(variant, types::HIPPO_BRANCH_INFO)? {
        return Ok(None);
    }
    Ok(Some(
        session
            .get_property(variant, props::HIPPO_BRANCH_ID)
            .and_then(|id| id.string())
            .unwrap_or_default(),
    ))
}
