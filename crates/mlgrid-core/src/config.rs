//! mlgrid.toml configuration parser.
//!
//! The coordinator takes one explicit configuration value at startup and
//! threads it by value into the assembly — there is no global config
//! holder. A TOML file supplies defaults; the daemon's CLI can override
//! individual fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Endpoint;

/// Default bounded wait for an engine process to survive its launch.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Ordered engine endpoints; booking scans in this order.
    pub engines: Vec<Endpoint>,
    /// Directory containing the engine server executable.
    pub engine_path: PathBuf,
    /// Directory the engines write their log files into.
    pub logs_path: PathBuf,
    /// Seconds to wait for a freshly launched engine process to stay alive.
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
    /// Port the coordinator's own REST surface listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

fn default_startup_timeout_secs() -> u64 {
    DEFAULT_STARTUP_TIMEOUT_SECS
}

fn default_listen_port() -> u16 {
    8080
}

impl CoordinatorConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CoordinatorConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.engines.is_empty() {
            anyhow::bail!("configuration must declare at least one engine endpoint");
        }
        let mut seen = std::collections::HashSet::new();
        for endpoint in &self.engines {
            if !seen.insert(endpoint) {
                anyhow::bail!("duplicate engine endpoint in configuration: {endpoint}");
            }
        }
        Ok(())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}
