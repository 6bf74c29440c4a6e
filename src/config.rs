//! Configuration loading
//!
//! Resolution order for the config file:
//! 1. `--config` command-line argument
//! 2. `BUDGET_PLANNER_CONFIG` environment variable
//! 3. Compiled defaults (no file)
//!
//! `BUDGET_PLANNER_DB` overrides `database_path` from any source.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::applier::ReadinessRules;

pub const CONFIG_ENV: &str = "BUDGET_PLANNER_CONFIG";
pub const DATABASE_ENV: &str = "BUDGET_PLANNER_DB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file holding sessions and transitions
    pub database_path: PathBuf,

    /// Default tracing filter when RUST_LOG is unset
    pub log_filter: String,

    pub readiness: ReadinessRules,

    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("data/budget_sessions.db"),
            log_filter: "info".to_string(),
            readiness: ReadinessRules::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))
    }

    /// Load using the process environment
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        Self::resolve(
            cli_path,
            std::env::var(CONFIG_ENV).ok().as_deref(),
            std::env::var(DATABASE_ENV).ok().as_deref(),
        )
    }

    /// Resolution with the environment passed in explicitly
    pub fn resolve(
        cli_path: Option<&Path>,
        env_config: Option<&str>,
        env_database: Option<&str>,
    ) -> Result<Self> {
        let mut config = match (cli_path, env_config.filter(|s| !s.is_empty())) {
            (Some(path), _) => Self::from_file(path)?,
            (None, Some(path)) => Self::from_file(path)?,
            (None, None) => Self::default(),
        };

        if let Some(db) = env_database.filter(|s| !s.is_empty()) {
            config.database_path = PathBuf::from(db);
        }

        Ok(config)
    }
}
