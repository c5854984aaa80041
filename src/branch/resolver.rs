//! Property lookup relative to the node being derived.
//!
//! Two traversal flavours exist: [`RelativePathPropertyResolver`] walks plain
//! child/parent steps, [`ResolvePropertyResolver`] additionally follows
//! mirrors to the document they point at. Both report a [`TraversalOutcome`]
//! so callers know the last node reached even when the property is missing.

use uuid::Uuid;

use crate::core::schema::props;
use crate::core::{NodeKind, Property, Result};
use crate::repository::path::{self, Segment};
use crate::repository::{NodeId, Session, display_path};

/// Where a resolved property lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyOwner {
    /// A node in the live session
    Live(NodeId),
    /// A node inside a frozen version snapshot
    Frozen {
        /// Identifier of the node the snapshot was taken from
        identifier: Option<Uuid>,
        /// Path of the frozen owner relative to the snapshot root
        path: String,
    },
}

/// A property together with its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProperty {
    pub property: Property,
    pub owner: PropertyOwner,
}

/// Result of walking a relative property path.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalOutcome {
    /// The property, if every step and the property itself exist
    pub property: Option<ResolvedProperty>,
    /// The last node the walk reached
    pub last_node_visited: NodeId,
}

/// Looks up one property relative to a modified node and caches the result.
pub trait PropertyResolver {
    /// Perform the lookup.
    fn resolve(&mut self, session: &dyn Session) -> Result<()>;

    /// Outcome of the last [`resolve`](PropertyResolver::resolve) call.
    fn outcome(&self) -> Option<&TraversalOutcome>;

    /// Relative path being resolved.
    fn relative_path(&self) -> &str;

    /// The node the path is relative to.
    fn modified_node(&self) -> NodeId;

    /// The resolved property, if any.
    fn property(&self) -> Option<&ResolvedProperty> {
        self.outcome().and_then(|outcome| outcome.property.as_ref())
    }
}

/// Plain relative-path lookup.
#[derive(Debug, Clone)]
pub struct RelativePathPropertyResolver {
    modified: NodeId,
    rel_path: String,
    outcome: Option<TraversalOutcome>,
}

impl RelativePathPropertyResolver {
    pub fn new(modified: NodeId, rel_path: impl Into<String>) -> Self {
        Self {
            modified,
            rel_path: rel_path.into(),
            outcome: None,
        }
    }
}

impl PropertyResolver for RelativePathPropertyResolver {
    fn resolve(&mut self, session: &dyn Session) -> Result<()> {
        self.outcome = Some(traverse(session, self.modified, &self.rel_path, false)?);
        Ok(())
    }

    fn outcome(&self) -> Option<&TraversalOutcome> {
        self.outcome.as_ref()
    }

    fn relative_path(&self) -> &str {
        &self.rel_path
    }

    fn modified_node(&self) -> NodeId {
        self.modified
    }
}

/// Lookup that follows mirrors and handles along the way.
///
/// A mirror carrying a `hippo:docbase` reference is replaced by its target;
/// a target handle is replaced by its first document variant.
#[derive(Debug, Clone)]
pub struct ResolvePropertyResolver {
    modified: NodeId,
    rel_path: String,
    outcome: Option<TraversalOutcome>,
}

impl ResolvePropertyResolver {
    pub fn new(modified: NodeId, rel_path: impl Into<String>) -> Self {
        Self {
            modified,
            rel_path: rel_path.into(),
            outcome: None,
        }
    }
}

impl PropertyResolver for ResolvePropertyResolver {
    fn resolve(&mut self, session: &dyn Session) -> Result<()> {
        self.outcome = Some(traverse(session, self.modified, &self.rel_path, true)?);
        Ok(())
    }

    fn outcome(&self) -> Option<&TraversalOutcome> {
        self.outcome.as_ref()
    }

    fn relative_path(&self) -> &str {
        &self.rel_path
    }

    fn modified_node(&self) -> NodeId {
        self.modified
    }
}

fn traverse(
    session: &dyn Session,
    start: NodeId,
    rel_path: &str,
    dereference: bool,
) -> Result<TraversalOutcome> {
    let (nodes, name) = path::split_property_path(rel_path)?;

    let mut current = start;
    for segment in nodes {
        let next = match path::parse_segment(segment)? {
            Segment::Current => Some(current),
            Segment::Parent => session.parent(current),
            Segment::Child {
                ..
            } => session.child(current, segment),
        };
        let next = match next {
            Some(node) if dereference => follow(session, node)?,
            other => other,
        };
        let Some(next) = next else {
            tracing::trace!(
                "'{}' stops at {} below {}",
                rel_path,
                display_path(session, current),
                display_path(session, start)
            );
            return Ok(TraversalOutcome {
                property: None,
                last_node_visited: current,
            });
        };
        current = next;
    }

    let property = session.get_property(current, name).map(|property| ResolvedProperty {
        property,
        owner: PropertyOwner::Live(current),
    });
    Ok(TraversalOutcome {
        property,
        last_node_visited: current,
    })
}

/// Replace a mirror by the document it points at.
fn follow(session: &dyn Session, node: NodeId) -> Result<Option<NodeId>> {
    if NodeKind::of(session, node)? != NodeKind::Mirror {
        return Ok(Some(node));
    }

    let target = session
        .get_property(node, props::HIPPO_DOCBASE)
        .and_then(|docbase| docbase.value.first().cloned())
        .and_then(|value| value.as_reference().or_else(|| value.as_string().parse().ok()))
        .and_then(|identifier| session.node_by_identifier(&identifier));
    let Some(target) = target else {
        tracing::debug!("Mirror {} does not point at an existing node", display_path(session, node));
        return Ok(None);
    };

    if NodeKind::of(session, target)? == NodeKind::Handle {
        for child in session.children(target) {
            if NodeKind::of(session, child)? == NodeKind::DocumentVariant {
                return Ok(Some(child));
            }
        }
        return Ok(None);
    }
    Ok(Some(target))
}
