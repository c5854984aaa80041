//! Shared plumbing for commands that operate on repository snapshots.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::engine::DerivedDataEngine;
use crate::function::FunctionRegistry;
use crate::repository::{MemoryRepository, NodeId, RepositorySnapshot, Session};

/// Snapshot input plus optional separate output.
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Repository snapshot (JSON)
    pub snapshot: PathBuf,

    /// Write the result here instead of overwriting the input snapshot
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl SnapshotArgs {
    /// Load the input snapshot into a repository.
    pub async fn load(&self) -> Result<MemoryRepository> {
        load_repository(&self.snapshot).await
    }

    /// Where [`store`](Self::store) writes.
    pub fn output_path(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.snapshot)
    }

    /// Write `repository` to the output path.
    pub async fn store(&self, repository: &MemoryRepository) -> Result<()> {
        let snapshot = RepositorySnapshot::capture(repository)
            .context("Failed to capture repository state")?;
        snapshot.save_to(self.output_path()).await?;
        tracing::debug!("Wrote snapshot to {}", self.output_path().display());
        Ok(())
    }
}

/// Read `path` and rebuild the repository it describes.
pub async fn load_repository(path: &Path) -> Result<MemoryRepository> {
    let snapshot = RepositorySnapshot::load(path).await?;
    let repository = snapshot
        .restore()
        .with_context(|| format!("Failed to restore repository from {}", path.display()))?;
    tracing::debug!("Loaded {} node(s) from {}", repository.node_count(), path.display());
    Ok(repository)
}

/// Engine over the stock function implementations.
pub fn stock_engine(config: &EngineConfig) -> DerivedDataEngine {
    DerivedDataEngine::new(config.clone(), FunctionRegistry::with_stock_functions())
}

/// The node at an absolute `path`.
pub fn node_at(session: &dyn Session, path: &str) -> Result<NodeId> {
    session
        .node_by_path(path)
        .ok_or_else(|| crate::core::DerivedDataError::not_found(path))
        .with_context(|| format!("No node at '{path}' in the snapshot"))
}
