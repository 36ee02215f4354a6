//! Optional YAML configuration for the CLI.
//!
//! ```yaml
//! idl: ./target/idl/perpetuals.json
//! registry:
//!   discriminator_len: 8
//! logging:
//!   level: info
//!   json: false
//! events:
//!   authority: 37hJBDnntwqhGbK7L6M1bLyvccj4u55CCUiLPdYkiqBN
//!   skip_failed: true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use idlcodec_events::ExtractorConfig;
use idlcodec_observability::LogConfig;
use idlcodec_registry::{perpetuals, MemoryRegistry, RegistryConfig};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// IDL to load instead of the bundled Perpetuals IDL
    pub idl: Option<PathBuf>,
    pub registry: RegistryConfig,
    pub logging: LogConfig,
    pub events: Option<ExtractorConfig>,
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parse config '{}'", path.display()))
    }

    /// The registry named by `--idl`, then the config file, then the
    /// bundled IDL.
    pub fn registry(&self, idl_flag: Option<&Path>) -> Result<MemoryRegistry> {
        match idl_flag.or(self.idl.as_deref()) {
            Some(path) => MemoryRegistry::load_idl_file(path, &self.registry)
                .with_context(|| format!("load IDL '{}'", path.display())),
            None => MemoryRegistry::from_idl_json(perpetuals::IDL_JSON, &self.registry)
                .context("load bundled Perpetuals IDL"),
        }
    }
}
