//! Vertex buffer layouts for the scene pipelines.
//!
//! ## Leaf vertex packing
//!
//! | Location | Offset | Format    | Field          |
//! |----------|--------|-----------|----------------|
//! | 0        | 0      | Float32x3 | position       |
//! | 1        | 12     | Float32x2 | texcoord       |
//! | 2        | 20     | Float32x2 | corner offset  |
//! | 3        | 28     | Float32x4 | color          |
//! | 4        | 44     | Sint16x2  | bone id        |
//! | 5        | 48     | Float32x3 | branch normal  |
//!
//! Instance data starts at location 8 so every mesh layout can share it.

use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use glade_foliage::{LeafVertex, TrunkVertex};
use glade_terrain::TerrainVertex;
use wgpu::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

pub const TERRAIN_VERTEX_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 24,
        shader_location: 2,
    },
];

pub const TERRAIN_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<TerrainVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &TERRAIN_VERTEX_ATTRIBUTES,
};

pub const TRUNK_VERTEX_ATTRIBUTES: [VertexAttribute; 4] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 24,
        shader_location: 2,
    },
    VertexAttribute {
        format: VertexFormat::Uint32,
        offset: 32,
        shader_location: 3,
    },
];

pub const TRUNK_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<TrunkVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &TRUNK_VERTEX_ATTRIBUTES,
};

pub const LEAF_VERTEX_ATTRIBUTES: [VertexAttribute; 6] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 20,
        shader_location: 2,
    },
    VertexAttribute {
        format: VertexFormat::Float32x4,
        offset: 28,
        shader_location: 3,
    },
    VertexAttribute {
        format: VertexFormat::Sint16x2,
        offset: 44,
        shader_location: 4,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 48,
        shader_location: 5,
    },
];

pub const LEAF_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<LeafVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &LEAF_VERTEX_ATTRIBUTES,
};

/// Per-tree instance data: world matrix and the first palette entry of the
/// tree's skeleton.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub world: [[f32; 4]; 4],
    pub palette_offset: u32,
    pub _pad: [u32; 3],
}

impl InstanceRaw {
    pub fn new(world: Mat4, palette_offset: u32) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            palette_offset,
            _pad: [0; 3],
        }
    }
}

pub const INSTANCE_ATTRIBUTES: [VertexAttribute; 5] = [
    VertexAttribute {
        format: VertexFormat::Float32x4,
        offset: 0,
        shader_location: 8,
    },
    VertexAttribute {
        format: VertexFormat::Float32x4,
        offset: 16,
        shader_location: 9,
    },
    VertexAttribute {
        format: VertexFormat::Float32x4,
        offset: 32,
        shader_location: 10,
    },
    VertexAttribute {
        format: VertexFormat::Float32x4,
        offset: 48,
        shader_location: 11,
    },
    VertexAttribute {
        format: VertexFormat::Uint32,
        offset: 64,
        shader_location: 12,
    },
];

pub const INSTANCE_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<InstanceRaw>() as u64,
    step_mode: VertexStepMode::Instance,
    attributes: &INSTANCE_ATTRIBUTES,
};

// ---------------------------------------------------------------------------
// Compile-time validation
// ---------------------------------------------------------------------------

const _: () = assert!(mem::size_of::<TerrainVertex>() == 32);
const _: () = assert!(mem::size_of::<TrunkVertex>() == 36);
const _: () = assert!(
    mem::size_of::<LeafVertex>() == glade_foliage::leaf_vertex::LEAF_VERTEX_SIZE,
    "LeafVertex size changed, update LEAF_VERTEX_LAYOUT"
);
const _: () = assert!(mem::size_of::<InstanceRaw>() == 80);
const _: () = assert!(LEAF_VERTEX_ATTRIBUTES[5].offset + 12 <= mem::size_of::<LeafVertex>() as u64);
const _: () = assert!(INSTANCE_ATTRIBUTES[4].offset + 4 <= mem::size_of::<InstanceRaw>() as u64);
