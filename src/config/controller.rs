use crate::error::{ControllerError, ErrorCode};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "config.yml";
pub const DEFAULT_API_VERSION: &str = crate::batch::rest::DEFAULT_API_VERSION;

/// Directory holding the user-level configuration file
pub fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "batch-controller", "batch-controller")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ControllerConfig {
    pub batch: BatchConfig,
    pub pools: PoolConfig,
    pub container: ContainerConfig,
    pub filesystem: FilesystemConfig,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Account endpoint, e.g. `mybatch.eastus.batch.azure.com`
    pub endpoint: Option<String>,
    pub api_version: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            access_token: None,
            timeout_secs: 60,
        }
    }
}

impl BatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub azfinsim: String,
    pub lulesh_catalyst: String,
    pub trame: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            azfinsim: "azfinsim-pool".to_string(),
            lulesh_catalyst: "lulesh-catalyst-pool".to_string(),
            trame: "trame-pool".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ContainerConfig {
    /// Worker image; empty runs the command directly on the node
    pub image: String,
    pub run_options: String,
    /// Container registry name, without the `.azurecr.io` suffix
    pub registry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemConfig {
    pub shared_path: String,
    pub workdir: String,
    /// Extra run options for tasks mounting the shared volume
    pub run_options: String,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            shared_path: "/mnt/batch/tasks/fsmounts/data".to_string(),
            workdir: "azfinsim".to_string(),
            run_options: String::new(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from `path`, or from the user config directory
    /// when no path is given. A missing default file yields defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ControllerError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME)) {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        config.merge_env_vars();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ControllerError> {
        if !path.exists() {
            return Err(ControllerError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                "Configuration file not found",
                Some(path.to_path_buf()),
            ));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ControllerError::config_with_code(
                ErrorCode::CONFIG_IO_ERROR,
                format!("Failed to read configuration: {}", e),
                Some(path.to_path_buf()),
            )
        })?;

        debug!("Loading configuration from {}", path.display());
        Self::from_yaml(&content).map_err(|e| match e {
            ControllerError::Config { code, message, source, .. } => ControllerError::Config {
                code,
                message,
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, ControllerError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) {
        if let Ok(endpoint) = std::env::var("BATCH_CONTROLLER_ENDPOINT") {
            self.batch.endpoint = Some(endpoint);
        }

        if let Ok(token) = std::env::var("BATCH_CONTROLLER_ACCESS_TOKEN") {
            self.batch.access_token = Some(token);
        }

        if let Ok(version) = std::env::var("BATCH_CONTROLLER_API_VERSION") {
            self.batch.api_version = version;
        }

        if let Ok(image) = std::env::var("BATCH_CONTROLLER_CONTAINER_IMAGE") {
            self.container.image = image;
        }

        if let Ok(registry) = std::env::var("BATCH_CONTROLLER_CONTAINER_REGISTRY") {
            self.container.registry = Some(registry);
        }

        if let Ok(log_level) = std::env::var("BATCH_CONTROLLER_LOG_LEVEL") {
            self.log_level = Some(log_level);
        }

        if let Ok(timeout) = std::env::var("BATCH_CONTROLLER_TIMEOUT_SECS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.batch.timeout_secs = value;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.batch.api_version.trim().is_empty() {
            return Err(ControllerError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "batch.api_version must not be empty",
                None,
            ));
        }
        if self.batch.timeout_secs == 0 {
            return Err(ControllerError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "batch.timeout_secs must be greater than zero",
                None,
            ));
        }
        for (name, pool) in [
            ("pools.azfinsim", &self.pools.azfinsim),
            ("pools.lulesh_catalyst", &self.pools.lulesh_catalyst),
            ("pools.trame", &self.pools.trame),
        ] {
            if pool.trim().is_empty() {
                return Err(ControllerError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("{} must not be empty", name),
                    None,
                ));
            }
        }
        Ok(())
    }

    /// Endpoint to talk to, failing when none was configured
    pub fn endpoint(&self) -> Result<&str, ControllerError> {
        self.batch
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                ControllerError::config_with_code(
                    ErrorCode::CONFIG_MISSING_REQUIRED,
                    "No batch endpoint configured; pass --batch-endpoint or set BATCH_CONTROLLER_ENDPOINT",
                    None,
                )
            })
    }
}
