//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::profile::ScatterConfig;

const APP_NAME: &str = "glade";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Render target and compositing settings.
    pub render: RenderConfig,
    /// Light-scatter falloff constants.
    pub scatter: ScatterConfig,
    /// Terrain and forest population.
    pub scene: SceneConfig,
    /// Wind driving the foliage animation.
    pub wind: WindConfig,
    /// Free-fly camera.
    pub camera: CameraConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in physical pixels.
    pub width: u32,
    /// Window height in physical pixels.
    pub height: u32,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// The scatter buffer is the backbuffer size divided by this.
    pub scatter_divisor: u32,
    /// Tint applied to the scene buffer when it is laid under the colour pass.
    pub scene_exposure: f32,
    /// Sun elevation (sine) over which god rays fade in above the horizon.
    pub horizon_fade: f32,
    /// Distance fog colour (linear RGB).
    pub fog_color: [f32; 3],
    /// Distance at which fog starts.
    pub fog_start: f32,
    /// Distance at which fog is total.
    pub fog_end: f32,
}

/// Terrain and forest population.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Seed for terrain noise and tree placement.
    pub seed: u64,
    /// Heightmap resolution (texels per side).
    pub heightmap_size: u32,
    /// World units between neighbouring heightmap texels.
    pub terrain_scale: f32,
    /// Vertical scale applied to normalized heights.
    pub bumpiness: f32,
    /// Number of trees placed on the terrain.
    pub tree_count: u32,
    /// Number of distinct procedural tree shapes.
    pub tree_variants: u32,
    /// Base uniform scale of every tree.
    pub tree_scale: f32,
    /// Random scale variation, as a fraction of `tree_scale`.
    pub tree_scale_jitter: f32,
    /// Direction towards the sun (normalized at load).
    pub sun_direction: [f32; 3],
}

/// Wind configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindConfig {
    /// Peak wind strength.
    pub amplitude: f32,
    /// Base gust frequency in radians per second.
    pub frequency: f32,
    /// Horizontal wind direction (x, z).
    pub direction: [f32; 2],
    /// Largest time step fed to the animation, in seconds.
    pub max_time_step: f32,
}

/// Camera configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Movement speed in world units per second.
    pub move_speed: f32,
    /// Radians of rotation per pixel of mouse motion.
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Near clip plane.
    pub near: f32,
    /// Far clip plane.
    pub far: f32,
    /// Height above the terrain centre at startup.
    pub start_height: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log per-frame pass statistics at debug level.
    pub frame_stats: bool,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            vsync: true,
            title: "Glade".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scatter_divisor: 4,
            scene_exposure: 0.5,
            horizon_fade: 0.1,
            fog_color: [0.62, 0.70, 0.78],
            fog_start: 200.0,
            fog_end: 900.0,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            heightmap_size: 128,
            terrain_scale: 4.0,
            bumpiness: 24.0,
            tree_count: 300,
            tree_variants: 3,
            tree_scale: 1.0,
            tree_scale_jitter: 0.3,
            sun_direction: [0.0, 0.35, -1.0],
        }
    }
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            amplitude: 0.6,
            frequency: 1.3,
            direction: [1.0, 0.25],
            max_time_step: 0.25,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            move_speed: 100.0,
            mouse_sensitivity: 0.0025,
            fov_degrees: 45.0,
            near: 1.0,
            far: 10_000.0,
            start_height: 30.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            frame_stats: false,
        }
    }
}

/// Default directory holding `config.ron`.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

// --- Validation ---

impl Config {
    /// Check values that would make the renderer misbehave rather than fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window",
                reason: format!(
                    "size must be non-zero, got {}x{}",
                    self.window.width, self.window.height
                ),
            });
        }
        if self.render.scatter_divisor == 0 {
            return Err(ConfigError::InvalidValue {
                field: "render.scatter_divisor",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scene.heightmap_size < 2 {
            return Err(ConfigError::InvalidValue {
                field: "scene.heightmap_size",
                reason: format!("must be at least 2, got {}", self.scene.heightmap_size),
            });
        }
        if self.scene.tree_variants == 0 && self.scene.tree_count > 0 {
            return Err(ConfigError::InvalidValue {
                field: "scene.tree_variants",
                reason: "at least one variant is needed to place trees".to_string(),
            });
        }
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            return Err(ConfigError::InvalidValue {
                field: "camera",
                reason: format!(
                    "clip planes must satisfy 0 < near < far, got {} / {}",
                    self.camera.near, self.camera.far
                ),
            });
        }
        self.scatter.resolve().validate()
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ScatterPreset, ScatterProfile};

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("width: 1024"));
        assert!(ron_str.contains("tree_count: 300"));
        assert!(ron_str.contains("scatter_divisor: 4"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.scatter.custom = Some(ScatterProfile {
            density: 0.5,
            weight: 0.05,
            decay: 0.95,
            exposure: 0.4,
        });
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(window: (), render: (), scene: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.wind, WindConfig::default());
        assert_eq!(config.scatter.preset, ScatterPreset::Meadow);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let ron_str = "(scene: (tree_count: 12))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.scene.tree_count, 12);
        assert_eq!(config.scene.heightmap_size, 128);
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.window.width = 1920;
        config.scatter.preset = ScatterPreset::Dusk;
        config.scene.seed = 99;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let created = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(created, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.wind.amplitude = 2.0;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().wind.amplitude, 2.0);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_default_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_divisor_rejected() {
        let mut config = Config::default();
        config.render.scatter_divisor = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "render.scatter_divisor", .. })
        ));
    }

    #[test]
    fn test_inverted_clip_planes_rejected() {
        let mut config = Config::default();
        config.camera.near = 100.0;
        config.camera.far = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_dir_ends_with_app_name() {
        assert!(default_config_dir().ends_with(APP_NAME));
    }
}
