//! Compute a property path relative to its enclosing variant.

use regex::Regex;
use std::sync::LazyLock;

use crate::core::{DerivedDataError, Result};

static SIBLING_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("same-name-sibling pattern is valid"));

/// Relates an absolute property path to the absolute path of a node above it.
///
/// Same-name-sibling indices are stripped from both paths, so
/// `/a/b[2]` and `/a/b[2]/c/d` give `c/d`.
#[derive(Debug, Clone)]
pub struct RelativePathFinder {
    node_path: String,
    property_path: String,
}

impl RelativePathFinder {
    /// Create a finder for `property_path` below `node_path`.
    pub fn new(node_path: impl Into<String>, property_path: impl Into<String>) -> Self {
        Self {
            node_path: node_path.into(),
            property_path: property_path.into(),
        }
    }

    /// The property path relative to the node, without sibling indices.
    ///
    /// # Errors
    ///
    /// Fails with [`DerivedDataError::PathOutsideNode`] if the property does
    /// not lie below the node.
    pub fn relative_path(&self) -> Result<String> {
        let node = strip_indices(&self.node_path);
        let property = strip_indices(&self.property_path);
        self.relativize(&node, &property)
    }

    /// The property path relative to the node, indices kept as given.
    pub fn indexed_relative_path(&self) -> Result<String> {
        self.relativize(&self.node_path, &self.property_path)
    }

    fn relativize(&self, node: &str, property: &str) -> Result<String> {
        let prefix = if node.ends_with('/') {
            node.to_string()
        } else {
            format!("{node}/")
        };
        match property.strip_prefix(&prefix) {
            Some(rest) if !rest.is_empty() => Ok(rest.to_string()),
            _ => Err(DerivedDataError::PathOutsideNode {
                node_path: self.node_path.clone(),
                property_path: self.property_path.clone(),
            }),
        }
    }
}

fn strip_indices(path: &str) -> String {
    SIBLING_INDEX.replace_all(path, "").into_owned()
}
