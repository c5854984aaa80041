//! `validate`: recompute every derived node in a snapshot.
//!
//! Per-node failures are reported but do not stop the pass; the command
//! exits with an error when any node failed.
//!
//! ```bash
//! derived-data validate repo.json
//! derived-data validate repo.json --output validated.json
//! ```

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use super::common::{SnapshotArgs, stock_engine};
use crate::config::EngineConfig;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    snapshot: SnapshotArgs,
}

impl ValidateCommand {
    pub async fn execute(self, config: &EngineConfig) -> Result<()> {
        let mut repository = self.snapshot.load().await?;
        let engine = stock_engine(config);

        let report = engine.validate(&mut repository)?;
        self.snapshot.store(&repository).await?;

        if report.is_clean() {
            println!("{} {}", "✓".green(), report);
            Ok(())
        } else {
            println!("{} {}", "✗".red(), report);
            bail!("{} derived node(s) could not be computed", report.failed)
        }
    }
}
