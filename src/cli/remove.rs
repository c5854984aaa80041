//! `remove`: delete a node and drop it from every `hippo:related` index.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{SnapshotArgs, node_at, stock_engine};
use crate::config::EngineConfig;
use crate::repository::Session;

#[derive(Args, Debug)]
pub struct RemoveCommand {
    #[command(flatten)]
    snapshot: SnapshotArgs,

    /// Absolute path of the node to remove
    path: String,
}

impl RemoveCommand {
    pub async fn execute(self, config: &EngineConfig) -> Result<()> {
        let mut repository = self.snapshot.load().await?;
        let engine = stock_engine(config);
        let node = node_at(&repository, &self.path)?;

        let updated = engine.removal(&mut repository, node)?;
        repository
            .remove_node(node)
            .with_context(|| format!("Failed to remove {}", self.path))?;
        repository.save()?;
        self.snapshot.store(&repository).await?;

        println!(
            "{} Removed {} ({} related index(es) updated)",
            "✓".green(),
            self.path.cyan(),
            updated
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::common::load_repository;
    use crate::core::schema::props;
    use crate::core::{PropertyValue, Value};
    use crate::test_utils::fixtures::RepositoryFixture;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_remove_cleans_related() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repo.json");
        let mut fixture = RepositoryFixture::new();
        let doc = fixture.document(fixture.root(), "doc");
        let gone = fixture.document(fixture.root(), "gone");
        let kept = fixture.document(fixture.root(), "kept");
        let repo = fixture.repository();
        let related = PropertyValue::Multi(vec![
            Value::Reference(repo.identifier(gone).unwrap()),
            Value::Reference(repo.identifier(kept).unwrap()),
        ]);
        let kept_id = repo.identifier(kept).unwrap();
        fixture.repository_mut().set_property(doc, props::HIPPO_RELATED, related).unwrap();
        fixture.snapshot().save_to(&path).await.unwrap();

        let command = RemoveCommand {
            snapshot: SnapshotArgs {
                snapshot: path.clone(),
                output: None,
            },
            path: "/gone".to_string(),
        };
        command.execute(&EngineConfig::default()).await.unwrap();

        let repository = load_repository(&path).await.unwrap();
        assert!(repository.node_by_path("/gone").is_none());
        let doc = repository.node_by_path("/doc").unwrap();
        assert_eq!(
            repository.get_property(doc, props::HIPPO_RELATED).unwrap().values(),
            vec![Value::Reference(kept_id)]
        );
    }
}
