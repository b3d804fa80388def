//! Glade: a wind-swept forest with screen-space god rays.
//!
//! Run with: `cargo run -p glade-app -- --profile dusk`
//! Headless: `cargo run -p glade-app -- --snapshot frame.png`

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use glade_app::{AppError, Scene, snapshot};
use glade_config::{CliArgs, Config, ConfigError, default_config_dir};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let config = load_config(&config_dir, &args);

    glade_log::init_logging(
        Some(&config_dir.join("logs")),
        cfg!(debug_assertions),
        config.as_ref().ok(),
    );

    let result = config
        .map_err(AppError::from)
        .and_then(|config| run(config, &args));
    if let Err(e) = result {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn load_config(config_dir: &Path, args: &CliArgs) -> Result<Config, ConfigError> {
    let mut config = Config::load_or_create(config_dir)?;
    config.apply_cli_overrides(args)?;
    config.validate()?;
    Ok(config)
}

fn run(config: Config, args: &CliArgs) -> Result<(), AppError> {
    info!("Glade {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Window: {}x{} | Profile: {} | Trees: {} | Seed: {}",
        config.window.width,
        config.window.height,
        config.scatter.preset.name(),
        config.scene.tree_count,
        config.scene.seed
    );

    if let Some(path) = &args.snapshot {
        snapshot::write_snapshot(&config, path)?;
        return Ok(());
    }

    let scene = Scene::build(&config)?;
    glade_app::run(config, scene)
}
