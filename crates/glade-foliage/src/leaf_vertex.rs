//! Leaf billboard vertex format.
//!
//! A leaf is four vertices sharing one centre position. Each corner carries
//! its own view-space offset; the vertex shader adds the offset after the
//! centre is transformed to view space so the quad always faces the camera.
//!
//! | Offset | Field           | Format     |
//! |--------|-----------------|------------|
//! | 0      | position        | f32 x 3    |
//! | 12     | texcoord        | f32 x 2    |
//! | 20     | offset          | f32 x 2    |
//! | 28     | color           | f32 x 4    |
//! | 44     | bone (id, pad)  | i16 x 2    |
//! | 48     | branch_normal   | f32 x 3    |

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use crate::skeleton::{BoneId, MAX_BONES};

/// One corner of a leaf billboard. 60 bytes, immutable once built.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LeafVertex {
    /// Leaf centre in the tree's rest-pose model space.
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
    /// Corner displacement in view space.
    pub offset: [f32; 2],
    /// RGBA tint.
    pub color: [f32; 4],
    /// Controlling bone in `[0]`; `[1]` is padding.
    pub bone: [i16; 2],
    /// Orientation of the branch the leaf grew from, used for lighting.
    pub branch_normal: [f32; 3],
}

/// Size of [`LeafVertex`] in bytes.
pub const LEAF_VERTEX_SIZE: usize = 60;

const _: () = assert!(std::mem::size_of::<LeafVertex>() == LEAF_VERTEX_SIZE);

/// Corner layout shared by every leaf: (offset sign, texcoord).
const CORNERS: [([f32; 2], [f32; 2]); 4] = [
    ([-1.0, -1.0], [0.0, 1.0]),
    ([1.0, -1.0], [1.0, 1.0]),
    ([1.0, 1.0], [1.0, 0.0]),
    ([-1.0, 1.0], [0.0, 0.0]),
];

/// Two counter-clockwise triangles per leaf, relative to its first vertex.
pub const LEAF_QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

impl LeafVertex {
    /// Build the four corners of a leaf.
    ///
    /// `size` is the full width and height of the billboard; `rotation`
    /// spins the quad in the view plane so leaves do not all line up.
    pub fn quad(
        center: Vec3,
        size: Vec2,
        rotation: f32,
        color: Vec4,
        bone: BoneId,
        branch_normal: Vec3,
    ) -> [LeafVertex; 4] {
        debug_assert!(usize::from(bone) < MAX_BONES, "bone {bone} overflows Sint16");
        let (sin, cos) = rotation.sin_cos();
        let half = size * 0.5;
        CORNERS.map(|(sign, texcoord)| {
            let local = Vec2::new(sign[0] * half.x, sign[1] * half.y);
            let offset = Vec2::new(local.x * cos - local.y * sin, local.x * sin + local.y * cos);
            LeafVertex {
                position: center.to_array(),
                texcoord,
                offset: offset.to_array(),
                color: color.to_array(),
                bone: [bone as i16, 0],
                branch_normal: branch_normal.to_array(),
            }
        })
    }

    pub fn bone_id(&self) -> BoneId {
        self.bone[0] as BoneId
    }
}

/// All leaves of one tree shape, in one vertex and index buffer.
#[derive(Clone, Debug, Default)]
pub struct LeafBatch {
    pub vertices: Vec<LeafVertex>,
    pub indices: Vec<u32>,
}

impl LeafBatch {
    pub fn push_leaf(&mut self, corners: [LeafVertex; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.indices
            .extend(LEAF_QUAD_INDICES.iter().map(|i| base + i));
    }

    pub fn leaf_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}
