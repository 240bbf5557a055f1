//! Layered controller configuration
//!
//! Values come from, in increasing precedence: built-in defaults, a YAML
//! file (`--config` or `config.yml` in the user config directory),
//! `BATCH_CONTROLLER_*` environment variables and finally command-line flags
//! applied by the CLI layer.

mod controller;

pub use controller::{
    get_config_dir, BatchConfig, ContainerConfig, ControllerConfig, FilesystemConfig, PoolConfig,
    CONFIG_FILE_NAME, DEFAULT_API_VERSION,
};
