//! Named light-scattering presets.
//!
//! The four falloff constants of the god-ray filter are chosen per scene
//! rather than per frame, so they live in config as a preset name with an
//! optional hand-tuned override.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Falloff constants consumed by the radial light-scatter filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScatterProfile {
    /// Fraction of the pixel-to-light vector covered by the sample march.
    pub density: f32,
    /// Per-sample contribution scale.
    pub weight: f32,
    /// Geometric falloff applied per sample step.
    pub decay: f32,
    /// Final brightness multiplier.
    pub exposure: f32,
}

impl Default for ScatterProfile {
    fn default() -> Self {
        ScatterPreset::Meadow.profile()
    }
}

impl ScatterProfile {
    /// Reject values the filter cannot sensibly use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("scatter.density", self.density),
            ("scatter.weight", self.weight),
            ("scatter.decay", self.decay),
            ("scatter.exposure", self.exposure),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be finite and non-negative, got {value}"),
                });
            }
        }
        if self.decay > 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "scatter.decay",
                reason: format!("must not exceed 1.0, got {}", self.decay),
            });
        }
        Ok(())
    }
}

/// Built-in scene profiles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ScatterPreset {
    /// Late-morning forest: short, soft shafts.
    #[default]
    Meadow,
    /// Low sun: long, bright streaks.
    Dusk,
    /// High sun: faint and tight.
    Noon,
}

impl ScatterPreset {
    /// All presets, in display order.
    pub const ALL: [ScatterPreset; 3] = [Self::Meadow, Self::Dusk, Self::Noon];

    /// The falloff constants for this preset.
    pub fn profile(self) -> ScatterProfile {
        match self {
            Self::Meadow => ScatterProfile {
                density: 0.7,
                weight: 1.0 / 32.0,
                decay: 0.99,
                exposure: 0.3,
            },
            Self::Dusk => ScatterProfile {
                density: 0.85,
                weight: 1.0 / 60.0,
                decay: 0.99,
                exposure: 0.5,
            },
            Self::Noon => ScatterProfile {
                density: 0.6,
                weight: 1.0 / 40.0,
                decay: 0.97,
                exposure: 0.25,
            },
        }
    }

    /// Lowercase name used on the command line and in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Meadow => "meadow",
            Self::Dusk => "dusk",
            Self::Noon => "noon",
        }
    }
}

impl fmt::Display for ScatterPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScatterPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownProfile(s.to_string()))
    }
}

/// Scatter section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScatterConfig {
    /// Preset to start from.
    pub preset: ScatterPreset,
    /// Explicit constants; replaces the preset when set.
    pub custom: Option<ScatterProfile>,
}

impl ScatterConfig {
    /// The constants the renderer should use.
    pub fn resolve(&self) -> ScatterProfile {
        self.custom.unwrap_or_else(|| self.preset.profile())
    }
}
