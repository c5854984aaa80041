//! Common test utilities for the derived-data integration tests.

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use derived_data::repository::{MemoryRepository, RepositorySnapshot};
use derived_data::test_utils::fixtures::RepositoryFixture;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary working directory holding one repository snapshot.
pub struct TestProject {
    _temp_dir: TempDir,
    dir: PathBuf,
    snapshot_path: PathBuf,
}

/// Captured output of one CLI run.
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl TestProject {
    pub async fn new(fixture: &RepositoryFixture) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path().to_path_buf();
        let snapshot_path = dir.join("repository.json");
        fixture.snapshot().save_to(&snapshot_path).await?;
        Ok(Self {
            _temp_dir: temp_dir,
            dir,
            snapshot_path,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn snapshot_arg(&self) -> String {
        self.snapshot_path.display().to_string()
    }

    /// Write `derived-data.toml` into the working directory.
    pub async fn write_config(&self, content: &str) -> Result<()> {
        tokio::fs::write(self.dir.join("derived-data.toml"), content).await?;
        Ok(())
    }

    /// Reload a snapshot written by the CLI.
    pub async fn load(&self, path: &Path) -> Result<MemoryRepository> {
        Ok(RepositorySnapshot::load(path).await?.restore()?)
    }

    /// `derived-data` inside the project directory, logging only errors.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("derived-data").expect("binary is built");
        cmd.current_dir(&self.dir).env_remove("DERIVED_DATA_CONFIG").env("RUST_LOG", "error");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.command().args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
