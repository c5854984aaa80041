//! `save`: recompute derived data for changed nodes.
//!
//! A snapshot carries no pending changes, so the nodes to treat as changed
//! are named with `--touch`:
//!
//! ```bash
//! derived-data save repo.json --touch /content/news/a --touch /content/news/b
//! derived-data save repo.json --scope /content/news --touch /content/news/a -o out.json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{SnapshotArgs, node_at, stock_engine};
use crate::config::EngineConfig;
use crate::engine::SaveOutcome;
use crate::repository::Session;

#[derive(Args, Debug)]
pub struct SaveCommand {
    #[command(flatten)]
    snapshot: SnapshotArgs,

    /// Only consider changes at or below this path
    #[arg(long)]
    scope: Option<String>,

    /// Mark the node at this path as changed (repeatable)
    #[arg(long = "touch", value_name = "PATH")]
    touched: Vec<String>,
}

impl SaveCommand {
    pub async fn execute(self, config: &EngineConfig) -> Result<()> {
        let mut repository = self.snapshot.load().await?;
        let engine = stock_engine(config);

        for path in &self.touched {
            let node = node_at(&repository, path)?;
            repository.touch(node)?;
        }
        let scope = self.scope.as_deref().map(|path| node_at(&repository, path)).transpose()?;

        let outcome = engine.save(&mut repository, scope)?;
        repository.save()?;
        self.snapshot.store(&repository).await?;

        match outcome {
            SaveOutcome::Skipped(reason) => {
                println!("{} Derived data not computed: {}", "⚠".yellow(), reason);
            }
            computed @ SaveOutcome::Computed {
                ..
            } => {
                println!("{} {}", "✓".green(), computed);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::common::load_repository;
    use crate::core::schema::types;
    use crate::function::stock;
    use crate::test_utils::fixtures::RepositoryFixture;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_touched_node_is_recomputed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repo.json");
        let mut fixture = RepositoryFixture::new();
        fixture
            .function("copy-title", stock::COPY, types::HIPPO_DOCUMENT)
            .accessed_relative("title", "title")
            .derived_relative("title", "summary");
        let doc = fixture.document(fixture.root(), "doc");
        fixture.set(doc, "title", "Hello");
        fixture.snapshot().save_to(&path).await.unwrap();

        let command = SaveCommand {
            snapshot: SnapshotArgs {
                snapshot: path.clone(),
                output: None,
            },
            scope: None,
            touched: vec!["/doc".to_string()],
        };
        command.execute(&EngineConfig::default()).await.unwrap();

        let repository = load_repository(&path).await.unwrap();
        let doc = repository.node_by_path("/doc").unwrap();
        assert_eq!(
            repository.get_property(doc, "summary").and_then(|p| p.string()).as_deref(),
            Some("Hello")
        );
    }

    #[tokio::test]
    async fn test_unknown_touch_path_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repo.json");
        RepositoryFixture::new().snapshot().save_to(&path).await.unwrap();

        let command = SaveCommand {
            snapshot: SnapshotArgs {
                snapshot: path,
                output: None,
            },
            scope: None,
            touched: vec!["/nowhere".to_string()],
        };
        assert!(command.execute(&EngineConfig::default()).await.is_err());
    }
}
