//! `functions`: list the derivation functions configured in a snapshot.
//!
//! ```bash
//! derived-data functions repo.json
//! derived-data functions repo.json --format json
//! ```

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{load_repository, stock_engine};
use crate::config::EngineConfig;
use crate::function::{FunctionDescription, FunctionRegistry, PropertyReferenceConfig};

#[derive(Args, Debug)]
pub struct FunctionsCommand {
    /// Repository snapshot (JSON)
    snapshot: PathBuf,

    /// Output format (text, json)
    #[arg(short = 'f', long, default_value = "text")]
    format: String,
}

impl FunctionsCommand {
    pub async fn execute(self, config: &EngineConfig) -> Result<()> {
        let repository = load_repository(&self.snapshot).await?;
        let engine = stock_engine(config);
        let functions = engine.load_functions(&repository)?;

        match self.format.as_str() {
            "json" => {
                println!("{}", serde_json::to_string_pretty(&functions)?);
            }
            "text" => print_functions(&functions, engine.registry(), &config.derivatives_path),
            other => bail!("Unknown format '{other}', expected 'text' or 'json'"),
        }
        Ok(())
    }
}

fn print_functions(functions: &[FunctionDescription], registry: &FunctionRegistry, folder: &str) {
    if functions.is_empty() {
        println!("No derivation functions configured at {}", folder.cyan());
        return;
    }

    for function in functions {
        let status = if registry.contains(&function.implementation_id) {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "{} {} {} on {}",
            status,
            function.name.bold(),
            format!("({})", function.implementation_id).dimmed(),
            function.applicable_type.cyan()
        );
        for (name, binding) in &function.accessed {
            println!("    {} {} {}", "in ".dimmed(), name, describe_binding(binding).dimmed());
        }
        for (name, binding) in &function.derived {
            println!("    {} {} {}", "out".dimmed(), name, describe_binding(binding).dimmed());
        }
    }
}

fn describe_binding(binding: &PropertyReferenceConfig) -> String {
    match binding {
        PropertyReferenceConfig::Builtin {
            method,
        } => format!("builtin:{method}"),
        PropertyReferenceConfig::Relative {
            rel_path,
            multi_value: true,
        } => format!("{rel_path} (multiple)"),
        PropertyReferenceConfig::Relative {
            rel_path,
            ..
        } => rel_path.clone(),
        PropertyReferenceConfig::Resolve {
            rel_path,
        } => format!("resolve:{rel_path}"),
    }
}
