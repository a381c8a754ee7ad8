//! moo.toml configuration
//!
//! Every setting is optional; command-line flags take precedence.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG: &str = "moo.toml";

/// moo.toml structure
#[derive(Debug, Default, Deserialize)]
pub struct MooConfig {
    #[serde(default)]
    pub convert: ConvertSection,
}

/// `[convert]` section
#[derive(Debug, Deserialize)]
pub struct ConvertSection {
    /// CPU name written to the file header (at most 4 ASCII characters).
    /// Default: "8088"
    #[serde(default = "default_cpu")]
    pub cpu: String,

    /// Reject unknown register names instead of dropping them.
    /// Default: false
    #[serde(default)]
    pub strict: bool,

    /// Encode tests and files on the rayon thread pool.
    /// Default: false
    #[serde(default)]
    pub parallel: bool,
}

impl Default for ConvertSection {
    fn default() -> Self {
        Self {
            cpu: default_cpu(),
            strict: false,
            parallel: false,
        }
    }
}

fn default_cpu() -> String {
    "8088".to_string()
}

impl MooConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Parse configuration from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse moo.toml")
    }

    /// Load an explicit config, else `moo.toml` if present, else defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let local = Path::new(DEFAULT_CONFIG);
        if local.is_file() {
            tracing::debug!("Using {}", local.display());
            return Self::load(local);
        }
        Ok(Self::default())
    }
}
