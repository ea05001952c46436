use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

use crate::app::scan_orchestrator::OrchestratorConfig;

const CONFIG_DIR_NAME: &str = "iac-image-scan";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub orchestrator: OrchestratorConfig,
    pub backend: BackendConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub ecr: EcrConfig,
    pub trivy: TrivyConfig,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Ecr,
    Trivy,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EcrConfig {
    pub binary: String,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub registry_id: Option<String>,
}

impl Default for EcrConfig {
    fn default() -> Self {
        Self {
            binary: "aws".to_string(),
            region: None,
            profile: None,
            registry_id: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TrivyConfig {
    pub binary: String,
    pub flags: Vec<String>,
    pub server_url: Option<String>,
}

impl Default for TrivyConfig {
    fn default() -> Self {
        Self {
            binary: "trivy".to_string(),
            flags: ["-q", "-f", "json"].map(String::from).to_vec(),
            server_url: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    ParseToml {
        path: String,
        source: toml::de::Error,
    },

    #[error("failed to parse JSON config {path}: {source}")]
    ParseJson {
        path: String,
        source: serde_json::Error,
    },

    #[error("unsupported config format for {0}, expected a .toml or .json file")]
    UnsupportedFormat(String),

    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        let config: Config = match ext.as_str() {
            "toml" => toml::from_str(&content).map_err(|source| ConfigError::ParseToml {
                path: path.display().to_string(),
                source,
            })?,
            "json" => serde_json::from_str(&content).map_err(|source| ConfigError::ParseJson {
                path: path.display().to_string(),
                source,
            })?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        config.validate()?;
        Ok(config)
    }

    /// Explicit path, then the user config file, then defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                debug!("loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let orchestrator = &self.orchestrator;

        if orchestrator.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "orchestrator.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }

        if !orchestrator.backoff_multiplier.is_finite() || orchestrator.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "orchestrator.backoff_multiplier",
                reason: format!("must be >= 1.0, got {}", orchestrator.backoff_multiplier),
            });
        }

        if orchestrator.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "orchestrator.poll_interval",
                reason: "must be greater than zero".to_string(),
            });
        }

        if orchestrator.max_poll_interval < orchestrator.poll_interval {
            return Err(ConfigError::InvalidValue {
                field: "orchestrator.max_poll_interval",
                reason: format!(
                    "must not be shorter than poll_interval ({:?})",
                    orchestrator.poll_interval
                ),
            });
        }

        if orchestrator.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "orchestrator.timeout",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}
