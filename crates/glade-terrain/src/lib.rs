//! Terrain heightmap generation, sampling, and mesh construction.
//!
//! The heightmap is a regular grid of normalized heights; [`Terrain`] places
//! it in the world with a horizontal texel spacing and a vertical bumpiness.

mod error;
pub mod heightmap;
pub mod mesh;

pub use error::TerrainError;
pub use heightmap::{Heightmap, HeightmapParams, Terrain};
pub use mesh::{TerrainMesh, TerrainVertex};
