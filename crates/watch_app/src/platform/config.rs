use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use watch_engine::{ApiSettings, EngineSettings};
use watch_logging::watch_info;

use super::cli::Cli;
use super::logging::LogDestination;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid setting {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub ws_url: String,
    pub api_base: String,
    pub max_threads: u32,
    pub poll_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub log_destination: LogDestination,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8001/ws".to_string(),
            api_base: "http://localhost:8001".to_string(),
            max_threads: 5,
            poll_interval_ms: 5000,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            log_destination: LogDestination::Terminal,
        }
    }
}

impl WatchConfig {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Self = ron::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        watch_info!("loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Command-line flags win over file values.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(ws_url) = &cli.ws_url {
            self.ws_url = ws_url.clone();
        }
        if let Some(api_base) = &cli.api_base {
            self.api_base = api_base.clone();
        }
        if let Some(max_threads) = cli.max_threads {
            self.max_threads = max_threads;
        }
        if let Some(destination) = cli.log {
            self.log_destination = destination;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ws_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "ws_url",
                message: "must not be empty".to_string(),
            });
        }
        if self.max_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "max_threads",
                message: "must be at least 1".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let connect_timeout = Duration::from_millis(self.connect_timeout_ms);
        EngineSettings {
            connect_timeout,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            api: ApiSettings {
                base_url: self.api_base.clone(),
                connect_timeout,
                request_timeout: Duration::from_millis(self.request_timeout_ms),
            },
        }
    }
}
