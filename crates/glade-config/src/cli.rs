//! Command-line argument parsing for Glade.

use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;
use crate::profile::ScatterPreset;
use crate::Config;

/// Glade command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "glade", about = "Forest scene with screen-space god rays")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Number of trees to place.
    #[arg(long)]
    pub trees: Option<u32>,

    /// Scatter profile (meadow, dusk, noon).
    #[arg(long)]
    pub profile: Option<String>,

    /// Terrain and placement seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Render one frame headlessly to this PNG and exit.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    ///
    /// Fails only when the requested scatter profile does not exist.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) -> Result<(), ConfigError> {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(trees) = args.trees {
            self.scene.tree_count = trees;
        }
        if let Some(ref name) = args.profile {
            self.scatter.preset = name.parse::<ScatterPreset>()?;
            self.scatter.custom = None;
        }
        if let Some(seed) = args.seed {
            self.scene.seed = seed;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        Ok(())
    }
}
