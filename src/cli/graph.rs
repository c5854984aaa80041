//! `graph`: inspect the reverse-dependency indices of a snapshot.
//!
//! ```bash
//! derived-data graph repo.json                      # every derived node and its inputs
//! derived-data graph repo.json --node /content/a    # inputs of one node
//! derived-data graph repo.json --impact /content/b  # nodes affected by a change
//! derived-data graph repo.json --order              # recomputation order
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{load_repository, node_at};
use crate::engine::{DependencyGraph, DependencyNode};
use crate::repository::{MemoryRepository, Session};

#[derive(Args, Debug)]
pub struct GraphCommand {
    /// Repository snapshot (JSON)
    snapshot: PathBuf,

    /// Show what the node at this path was derived from
    #[arg(long, conflicts_with_all = ["impact", "order"])]
    node: Option<String>,

    /// Show every node affected by a change of the node at this path
    #[arg(long, conflicts_with = "order")]
    impact: Option<String>,

    /// Print the order in which a full recomputation settles
    #[arg(long)]
    order: bool,
}

impl GraphCommand {
    pub async fn execute(self) -> Result<()> {
        let repository = load_repository(&self.snapshot).await?;
        let graph = DependencyGraph::from_session(&repository)?;

        if let Some(path) = &self.node {
            let root = describe(&repository, path)?;
            print!("{}", graph.to_tree_string(&root));
        } else if let Some(path) = &self.impact {
            let changed = describe(&repository, path)?;
            let mut affected: Vec<_> = graph
                .transitive_dependents(&changed.identifier)
                .into_iter()
                .map(|node| node.display_name())
                .collect();
            affected.sort();
            if affected.is_empty() {
                println!("No derived data depends on {}", path.cyan());
            } else {
                println!("{} node(s) depend on {}:", affected.len(), path.cyan());
                for name in affected {
                    println!("  {name}");
                }
            }
        } else if self.order {
            for (position, node) in graph.recompute_order()?.iter().enumerate() {
                println!("{:>4}. {}", position + 1, node);
            }
        } else {
            self.print_overview(&graph);
        }
        Ok(())
    }

    fn print_overview(&self, graph: &DependencyGraph) {
        if graph.is_empty() {
            println!("No derived dependencies recorded.");
            return;
        }

        println!(
            "{} ({} node(s), {} dependency edge(s))",
            self.snapshot.display().to_string().cyan().bold(),
            graph.node_count(),
            graph.edge_count()
        );
        for node in graph.derived_nodes() {
            print!("{}", graph.to_tree_string(&node));
        }

        if let Some(cycle) = graph.find_cycle() {
            let cycle = cycle.iter().map(DependencyNode::display_name).collect::<Vec<_>>();
            println!();
            println!("{} Circular derivation: {}", "⚠".yellow(), cycle.join(" → "));
        }
    }
}

fn describe(repository: &MemoryRepository, path: &str) -> Result<DependencyNode> {
    let node = node_at(repository, path)?;
    let identifier = repository
        .identifier(node)
        .with_context(|| format!("{path} is not referenceable and takes no part in derivations"))?;
    Ok(DependencyNode {
        identifier,
        path: Some(path.to_string()),
    })
}
