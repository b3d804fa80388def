//! Configuration system for Glade.
//!
//! Runtime settings persist to disk as RON files. CLI overrides are applied
//! via clap, and every section tolerates missing or unknown fields so old
//! config files keep loading.

mod cli;
mod config;
mod error;
mod profile;

pub use cli::CliArgs;
pub use config::{
    CameraConfig, Config, DebugConfig, RenderConfig, SceneConfig, WindConfig, WindowConfig,
    default_config_dir,
};
pub use error::ConfigError;
pub use profile::{ScatterConfig, ScatterPreset, ScatterProfile};
