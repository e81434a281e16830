//! Environment and Orchestrator Configuration
//!
//! Two layers feed the orchestrator:
//! - an optional env file, exported into the process environment at startup
//! - [`OrchestratorConfig`], built from defaults, an optional TOML file and
//!   `APTFLOW_*` variables, in that order of precedence
//!
//! ```no_run
//! use aptflow_core::config::{load_environment, OrchestratorConfig};
//!
//! load_environment();
//! let config = OrchestratorConfig::from_env().unwrap();
//! assert!(config.max_parallel > 0);
//! ```

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Env files tried when `APTFLOW_ENV_FILE` is unset or unreadable
pub const ENV_FILE_PATHS: &[&str] = &["/etc/aptflow/environment", ".env"];

pub const ENV_FILE_VAR: &str = "APTFLOW_ENV_FILE";

/// Prefix of the variables overriding [`OrchestratorConfig`] fields,
/// e.g. `APTFLOW_STEP_TIMEOUT_MS`
pub const ENV_PREFIX: &str = "APTFLOW";

/// Export the first env file found into the process environment.
///
/// Variables that are already set win. Returns the path that was loaded.
pub fn load_environment() -> Option<String> {
    let custom = std::env::var(ENV_FILE_VAR).ok();
    let loaded = custom
        .iter()
        .map(String::as_str)
        .chain(ENV_FILE_PATHS.iter().copied())
        .find_map(export_env_file);

    if loaded.is_none() {
        debug!("No environment file found");
    }
    loaded
}

fn export_env_file(path: &str) -> Option<String> {
    if !Path::new(path).exists() {
        return None;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path, error = %e, "Unreadable environment file");
            return None;
        }
    };

    let (mut exported, mut kept) = (0, 0);
    for (key, value) in content.lines().filter_map(parse_env_line) {
        if std::env::var_os(&key).is_some() {
            kept += 1;
            continue;
        }
        std::env::set_var(&key, &value);
        exported += 1;
    }

    info!(path = %path, exported, kept, "Loaded environment file");
    Some(path.to_string())
}

/// `KEY=VALUE` with optional single or double quotes; comments and blanks yield `None`
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
        .unwrap_or(value);

    Some((key.to_string(), unquoted.to_string()))
}

/// Tuning knobs for the orchestration engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound for one worker call before it is reported as timed out
    pub step_timeout_ms: u64,
    /// Maximum number of parallel-class workers running at once in a collaboration
    pub max_parallel: usize,
    /// Length of each worker's rolling interaction history
    pub history_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            step_timeout_ms: 30_000,
            max_parallel: 10,
            history_capacity: 50,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overridden by `APTFLOW_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::build(None, None)
    }

    /// A TOML file overridden by `APTFLOW_*` environment variables
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::build(Some(path), None)?;
        info!(path = %path.display(), ?config, "Loaded orchestrator config");
        Ok(config)
    }

    /// Layer the sources and validate. `env` replaces the process environment when given.
    fn build(file: Option<&Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.step_timeout_ms == 0 {
            return Err(Error::config("step_timeout_ms must be greater than zero"));
        }
        if self.max_parallel == 0 {
            return Err(Error::config("max_parallel must be greater than zero"));
        }
        if self.history_capacity == 0 {
            return Err(Error::config("history_capacity must be greater than zero"));
        }
        Ok(())
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}
