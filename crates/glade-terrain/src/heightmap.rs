//! Multi-octave fBm heightmap and its placement in world space.
//!
//! Heights are stored normalized to `[-1, 1]`; [`Terrain`] scales them by the
//! bumpiness and spaces texels `scale` world units apart, centred on the
//! origin.

use glam::{Vec2, Vec3};
use noise::{NoiseFn, Simplex};

use crate::error::TerrainError;

/// Parameters for the fractal Brownian motion used to fill a heightmap.
#[derive(Clone, Debug)]
pub struct HeightmapParams {
    /// Seed for deterministic generation.
    pub seed: u64,
    /// Number of noise octaves.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles per texel.
    pub base_frequency: f64,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 5,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 1.0 / 48.0,
        }
    }
}

/// A `width x depth` grid of normalized heights.
#[derive(Clone, Debug, PartialEq)]
pub struct Heightmap {
    width: u32,
    depth: u32,
    heights: Vec<f32>,
}

impl Heightmap {
    /// Wrap existing samples, stored row by row (`z * width + x`).
    pub fn from_heights(width: u32, depth: u32, heights: Vec<f32>) -> Result<Self, TerrainError> {
        if width < 2 || depth < 2 {
            return Err(TerrainError::TooSmall { width, depth });
        }
        let expected = width as usize * depth as usize;
        if heights.len() != expected {
            return Err(TerrainError::SizeMismatch {
                width,
                depth,
                expected,
                actual: heights.len(),
            });
        }
        Ok(Self {
            width,
            depth,
            heights,
        })
    }

    /// Fill a heightmap by evaluating `f(x, z)` for every texel.
    pub fn from_fn(
        width: u32,
        depth: u32,
        mut f: impl FnMut(u32, u32) -> f32,
    ) -> Result<Self, TerrainError> {
        let mut heights = Vec::with_capacity(width as usize * depth as usize);
        for z in 0..depth {
            for x in 0..width {
                heights.push(f(x, z));
            }
        }
        Self::from_heights(width, depth, heights)
    }

    /// Generate rolling hills from seeded fBm simplex noise.
    pub fn generate(width: u32, depth: u32, params: &HeightmapParams) -> Result<Self, TerrainError> {
        let noise = Simplex::new(params.seed as u32);
        let max_amplitude = max_amplitude(params);

        let map = Self::from_fn(width, depth, |x, z| {
            let mut total = 0.0;
            let mut frequency = params.base_frequency;
            let mut amplitude = 1.0;
            for _ in 0..params.octaves {
                total += noise.get([x as f64 * frequency, z as f64 * frequency]) * amplitude;
                frequency *= params.lacunarity;
                amplitude *= params.persistence;
            }
            if max_amplitude > 0.0 {
                (total / max_amplitude).clamp(-1.0, 1.0) as f32
            } else {
                0.0
            }
        })?;
        log::debug!(
            "Generated {width}x{depth} heightmap (seed {}, {} octaves)",
            params.seed,
            params.octaves
        );
        Ok(map)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Normalized height of a single texel.
    pub fn texel(&self, x: u32, z: u32) -> Result<f32, TerrainError> {
        if x >= self.width || z >= self.depth {
            return Err(TerrainError::OutOfBounds {
                x,
                z,
                width: self.width,
                depth: self.depth,
            });
        }
        Ok(self.heights[(z * self.width + x) as usize])
    }

    /// Texel lookup with coordinates clamped to the grid.
    fn texel_clamped(&self, x: i64, z: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let z = z.clamp(0, self.depth as i64 - 1) as u32;
        self.heights[(z * self.width + x) as usize]
    }

    /// Bilinear sample at fractional texel coordinates, clamped to the edges.
    pub fn sample_bilinear(&self, tx: f32, tz: f32) -> f32 {
        let x0 = tx.floor();
        let z0 = tz.floor();
        let fx = tx - x0;
        let fz = tz - z0;
        let (x0, z0) = (x0 as i64, z0 as i64);

        let h00 = self.texel_clamped(x0, z0);
        let h10 = self.texel_clamped(x0 + 1, z0);
        let h01 = self.texel_clamped(x0, z0 + 1);
        let h11 = self.texel_clamped(x0 + 1, z0 + 1);

        let top = h00 + (h10 - h00) * fx;
        let bottom = h01 + (h11 - h01) * fx;
        top + (bottom - top) * fz
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }
}

fn max_amplitude(params: &HeightmapParams) -> f64 {
    let mut sum = 0.0;
    let mut amp = 1.0;
    for _ in 0..params.octaves {
        sum += amp;
        amp *= params.persistence;
    }
    sum
}

/// A heightmap placed in world space.
#[derive(Clone, Debug)]
pub struct Terrain {
    heightmap: Heightmap,
    /// World units between neighbouring texels.
    scale: f32,
    /// World height of a normalized height of 1.0.
    bumpiness: f32,
}

impl Terrain {
    pub fn new(heightmap: Heightmap, scale: f32, bumpiness: f32) -> Self {
        Self {
            heightmap,
            scale,
            bumpiness,
        }
    }

    pub fn heightmap(&self) -> &Heightmap {
        &self.heightmap
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn bumpiness(&self) -> f32 {
        self.bumpiness
    }

    /// Half the world-space size along x and z.
    pub fn half_extent(&self) -> Vec2 {
        Vec2::new(
            (self.heightmap.width - 1) as f32,
            (self.heightmap.depth - 1) as f32,
        ) * self.scale
            * 0.5
    }

    /// World height of the texel at grid cell `(x, z)`.
    pub fn height_at_cell(&self, x: u32, z: u32) -> Result<f32, TerrainError> {
        Ok(self.heightmap.texel(x, z)? * self.bumpiness)
    }

    /// World position of grid cell `(x, z)`, on the surface.
    pub fn cell_position(&self, x: u32, z: u32) -> Result<Vec3, TerrainError> {
        let y = self.height_at_cell(x, z)?;
        let half = self.half_extent();
        Ok(Vec3::new(
            x as f32 * self.scale - half.x,
            y,
            z as f32 * self.scale - half.y,
        ))
    }

    /// Interpolated surface height at a world-space `(x, z)`.
    ///
    /// Positions off the grid take the height of the nearest edge.
    pub fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        let half = self.half_extent();
        let tx = (world_x + half.x) / self.scale;
        let tz = (world_z + half.y) / self.scale;
        self.heightmap.sample_bilinear(tx, tz) * self.bumpiness
    }

    /// Surface normal at grid cell `(x, z)` from central differences.
    pub fn normal_at_cell(&self, x: u32, z: u32) -> Vec3 {
        let (x, z) = (x as i64, z as i64);
        let hm = &self.heightmap;
        let dx = (hm.texel_clamped(x + 1, z) - hm.texel_clamped(x - 1, z)) * self.bumpiness;
        let dz = (hm.texel_clamped(x, z + 1) - hm.texel_clamped(x, z - 1)) * self.bumpiness;
        Vec3::new(-dx, 2.0 * self.scale, -dz).normalize()
    }
}
