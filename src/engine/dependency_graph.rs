//! Reverse-dependency graph rebuilt from `hippo:related` indices.
//!
//! The engine itself only ever follows single `hippo:related` hops. This
//! graph materialises all of them at once for diagnostics: which nodes a
//! change ultimately affects, whether derivations feed each other in a
//! cycle, and in which order a full recomputation settles fastest.

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use uuid::Uuid;

use crate::core::schema::{props, types};
use crate::core::{DerivedDataError, Result};
use crate::repository::Session;

/// A referenceable node in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyNode {
    pub identifier: Uuid,
    /// Path at build time; `None` for identifiers no longer in the repository
    pub path: Option<String>,
}

impl DependencyNode {
    pub fn display_name(&self) -> String {
        match &self.path {
            Some(path) => path.clone(),
            None => format!("<missing {}>", self.identifier),
        }
    }
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Edges point from a derived node to each node it read.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<DependencyNode, ()>,
    node_map: HashMap<Uuid, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from every `hippo:related` index in the session.
    pub fn from_session(session: &dyn Session) -> Result<Self> {
        let mut graph = Self::new();
        let describe = |identifier: Uuid| DependencyNode {
            identifier,
            path: session.node_by_identifier(&identifier).and_then(|n| session.path(n).ok()),
        };

        for node in session.nodes_of_type(types::HIPPO_DERIVED)? {
            let Some(identifier) = session.identifier(node) else {
                continue;
            };
            let Some(related) = session.get_property(node, props::HIPPO_RELATED) else {
                continue;
            };
            for dependency in related.values().iter().filter_map(|v| v.as_reference()) {
                graph.add_dependency(describe(identifier), describe(dependency));
            }
        }
        Ok(graph)
    }

    fn ensure_node(&mut self, node: DependencyNode) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&node.identifier) {
            index
        } else {
            let identifier = node.identifier;
            let index = self.graph.add_node(node);
            self.node_map.insert(identifier, index);
            index
        }
    }

    /// Record that `from` was derived from `to`.
    pub fn add_dependency(&mut self, from: DependencyNode, to: DependencyNode) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// A cycle of derivations feeding each other, first node repeated at the end.
    pub fn find_cycle(&self) -> Option<Vec<DependencyNode>> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|n| (n, Color::White)).collect();
        let mut path = Vec::new();

        for node in self.graph.node_indices() {
            if colors.get(&node) == Some(&Color::White) {
                if let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<DependencyNode>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.graph.neighbors(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    let mut cycle: Vec<_> =
                        path[start..].iter().map(|n| self.graph[*n].clone()).collect();
                    cycle.push(self.graph[neighbor].clone());
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Nodes ordered so that every node comes after everything it reads.
    ///
    /// # Errors
    ///
    /// Fails with [`DerivedDataError::InvalidConfiguration`] naming the cycle
    /// if derivations feed each other.
    pub fn recompute_order(&self) -> Result<Vec<DependencyNode>> {
        if let Some(cycle) = self.find_cycle() {
            let cycle = cycle.iter().map(DependencyNode::display_name).collect::<Vec<_>>().join(" → ");
            return Err(DerivedDataError::InvalidConfiguration {
                message: format!("Circular derivation detected: {cycle}"),
            });
        }

        let indices = toposort(&self.graph, None).map_err(|_| DerivedDataError::InvalidConfiguration {
            message: "Failed to order derived nodes".to_string(),
        })?;
        Ok(indices.into_iter().rev().map(|idx| self.graph[idx].clone()).collect())
    }

    /// Every node whose derivation is affected, directly or transitively,
    /// when `identifier` changes.
    pub fn transitive_dependents(&self, identifier: &Uuid) -> HashSet<DependencyNode> {
        let mut dependents = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(&start) = self.node_map.get(identifier) {
            queue.push_back(start);
            while let Some(current) = queue.pop_front() {
                for neighbor in self.graph.neighbors_directed(current, Direction::Incoming) {
                    if dependents.insert(self.graph[neighbor].clone()) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        dependents
    }

    /// Nodes `identifier` was directly derived from.
    pub fn direct_dependencies(&self, identifier: &Uuid) -> Vec<DependencyNode> {
        let mut dependencies: Vec<_> = self
            .node_map
            .get(identifier)
            .map(|&idx| self.graph.neighbors(idx).map(|n| self.graph[n].clone()).collect())
            .unwrap_or_default();
        dependencies.sort_by_key(DependencyNode::display_name);
        dependencies
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes that are derived from something, sorted by path.
    pub fn derived_nodes(&self) -> Vec<DependencyNode> {
        let mut nodes: Vec<_> = self
            .graph
            .node_indices()
            .filter(|idx| self.graph.neighbors(*idx).next().is_some())
            .map(|idx| self.graph[idx].clone())
            .collect();
        nodes.sort_by_key(DependencyNode::display_name);
        nodes
    }

    /// Render what `root` was derived from as a tree.
    pub fn to_tree_string(&self, root: &DependencyNode) -> String {
        let mut result = String::new();
        let mut visited = HashSet::new();
        self.build_tree_string(root, &mut result, "", true, &mut visited);
        result
    }

    fn build_tree_string(
        &self,
        node: &DependencyNode,
        result: &mut String,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<Uuid>,
    ) {
        let connector = if is_last {
            "└── "
        } else {
            "├── "
        };
        result.push_str(&format!("{}{}{}\n", prefix, connector, node.display_name()));

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };
        if !visited.insert(node.identifier) {
            result.push_str(&format!("{child_prefix}└── (circular reference)\n"));
            return;
        }

        let dependencies = self.direct_dependencies(&node.identifier);
        for (i, dependency) in dependencies.iter().enumerate() {
            let is_last_child = i == dependencies.len() - 1;
            self.build_tree_string(dependency, result, &child_prefix, is_last_child, visited);
        }
        visited.remove(&node.identifier);
    }
}
