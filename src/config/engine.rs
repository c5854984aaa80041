//! Engine settings (`derived-data.toml`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::core::DerivedDataError;
use crate::core::schema::DEFAULT_DERIVATIVES_PATH;

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "derived-data.toml";

const DEFAULT_VALIDATE_BATCH_SIZE: usize = 1000;

/// Settings of the derived-data engine.
///
/// ```toml
/// derivatives_path = "/hippo:configuration/hippo:derivatives"
/// validate_batch_size = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Absolute path of the folder holding function definitions
    pub derivatives_path: String,

    /// Number of changed nodes after which `validate` commits
    pub validate_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            derivatives_path: DEFAULT_DERIVATIVES_PATH.to_string(),
            validate_batch_size: DEFAULT_VALIDATE_BATCH_SIZE,
        }
    }
}

impl EngineConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] when `None`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No engine config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML or
    /// fails [`validate`](Self::validate).
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read engine config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .map_err(DerivedDataError::from)
            .with_context(|| format!("Failed to parse engine config from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid engine config in {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize engine config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write engine config to {}", path.display()))
    }

    /// Check value ranges.
    pub fn validate(&self) -> crate::core::Result<()> {
        if !self.derivatives_path.starts_with('/') {
            return Err(DerivedDataError::InvalidConfiguration {
                message: format!(
                    "derivatives_path must be absolute, got '{}'",
                    self.derivatives_path
                ),
            });
        }
        if self.validate_batch_size == 0 {
            return Err(DerivedDataError::InvalidConfiguration {
                message: "validate_batch_size must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
