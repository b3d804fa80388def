/// Errors raised while building or sampling terrain.
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("heightmap must be at least 2x2 texels, got {width}x{depth}")]
    TooSmall { width: u32, depth: u32 },

    #[error("heightmap data has {actual} samples but {width}x{depth} needs {expected}")]
    SizeMismatch {
        width: u32,
        depth: u32,
        expected: usize,
        actual: usize,
    },

    #[error("cell ({x}, {z}) is outside the {width}x{depth} heightmap")]
    OutOfBounds { x: u32, z: u32, width: u32, depth: u32 },
}
