//! Procedural tree shapes.
//!
//! A [`TreeProfile`] grows a branching skeleton from a seed, then bakes a
//! tapered trunk mesh and a leaf batch against its rest pose. Every vertex
//! references the bone it follows, so the shapes can be shared by any number
//! of animated instances.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::SkeletonError;
use crate::leaf_vertex::{LeafBatch, LeafVertex};
use crate::skeleton::{Bone, BoneId, Skeleton};

/// Vertex of the bark mesh.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TrunkVertex {
    /// Rest-pose model-space position.
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub bone: u32,
}

/// Bark geometry for one tree shape.
#[derive(Clone, Debug, Default)]
pub struct TrunkMesh {
    pub vertices: Vec<TrunkVertex>,
    pub indices: Vec<u32>,
}

/// Everything needed to draw and animate one tree shape.
#[derive(Clone, Debug)]
pub struct TreeModel {
    pub skeleton: Skeleton,
    pub trunk: TrunkMesh,
    pub leaves: LeafBatch,
}

/// Parameters of the branching generator.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeProfile {
    pub trunk_length: f32,
    pub trunk_radius: f32,
    /// Branching generations below the trunk.
    pub levels: u32,
    /// Side branches spawned from each bone.
    pub branches: u32,
    /// Child length relative to its parent.
    pub length_ratio: f32,
    /// Child radius relative to its parent.
    pub radius_ratio: f32,
    /// Tilt of side branches away from their parent, in radians.
    pub branch_angle: f32,
    /// Leaves spawned on each bone of the outermost generation.
    pub leaves_per_bone: u32,
    pub leaf_size: f32,
    pub leaf_color: Vec4,
    /// Sides of the bark cylinders.
    pub bark_sides: u32,
}

impl Default for TreeProfile {
    fn default() -> Self {
        Self {
            trunk_length: 6.0,
            trunk_radius: 0.45,
            levels: 3,
            branches: 3,
            length_ratio: 0.68,
            radius_ratio: 0.55,
            branch_angle: 0.75,
            leaves_per_bone: 6,
            leaf_size: 1.1,
            leaf_color: Vec4::new(0.34, 0.55, 0.22, 1.0),
            bark_sides: 6,
        }
    }
}

impl TreeProfile {
    /// A few distinct shapes derived from this profile.
    pub fn variants(&self, count: u32) -> Vec<TreeProfile> {
        (0..count)
            .map(|i| {
                let t = i as f32 / count.max(1) as f32;
                TreeProfile {
                    trunk_length: self.trunk_length * (0.85 + 0.4 * t),
                    branch_angle: self.branch_angle * (1.15 - 0.35 * t),
                    branches: self.branches + (i % 2),
                    leaf_color: self.leaf_color * Vec4::new(1.0 - 0.15 * t, 1.0, 1.0 + 0.3 * t, 1.0),
                    ..self.clone()
                }
            })
            .collect()
    }

    /// Grow a tree from `seed`.
    pub fn generate(&self, seed: u64) -> Result<TreeModel, SkeletonError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let bones = self.grow_bones(&mut rng);
        let skeleton = Skeleton::new(bones)?;
        let trunk = self.build_trunk(&skeleton);
        let leaves = self.build_leaves(&skeleton, &mut rng);
        log::debug!(
            "Grew tree seed {seed}: {} bones, {} bark triangles, {} leaves",
            skeleton.len(),
            trunk.indices.len() / 3,
            leaves.leaf_count()
        );
        Ok(TreeModel {
            skeleton,
            trunk,
            leaves,
        })
    }

    fn grow_bones(&self, rng: &mut ChaCha8Rng) -> Vec<Bone> {
        let mut bones = vec![Bone {
            parent: None,
            rest: Mat4::IDENTITY,
            length: self.trunk_length,
            radius: self.trunk_radius,
        }];
        let mut frontier = vec![0usize];

        for _ in 0..self.levels {
            let mut next = Vec::new();
            for &parent in &frontier {
                let parent_bone = bones[parent];
                let azimuth0 = rng.random_range(0.0..TAU);
                for b in 0..self.branches {
                    let azimuth = azimuth0 + TAU * b as f32 / self.branches as f32;
                    let tilt = self.branch_angle * rng.random_range(0.8..1.2);
                    let along = parent_bone.length * rng.random_range(0.55..0.95);
                    let rotation = Quat::from_rotation_y(azimuth) * Quat::from_rotation_x(tilt);
                    next.push(bones.len());
                    bones.push(Bone {
                        parent: Some(parent as BoneId),
                        rest: Mat4::from_rotation_translation(rotation, Vec3::new(0.0, along, 0.0)),
                        length: parent_bone.length * self.length_ratio * rng.random_range(0.85..1.15),
                        radius: parent_bone.radius * self.radius_ratio,
                    });
                }
            }
            frontier = next;
        }
        bones
    }

    fn build_trunk(&self, skeleton: &Skeleton) -> TrunkMesh {
        let sides = self.bark_sides.max(3);
        let mut mesh = TrunkMesh::default();

        for (id, bone) in skeleton.bones().iter().enumerate() {
            let world = skeleton.rest_world(id as BoneId);
            let base = mesh.vertices.len() as u32;
            let tip_radius = bone.radius * self.radius_ratio;

            for ring in 0..2 {
                let (y, radius) = if ring == 0 {
                    (0.0, bone.radius)
                } else {
                    (bone.length, tip_radius)
                };
                for s in 0..=sides {
                    let angle = TAU * s as f32 / sides as f32;
                    let dir = Vec3::new(angle.cos(), 0.0, angle.sin());
                    mesh.vertices.push(TrunkVertex {
                        position: world.transform_point3(dir * radius + Vec3::Y * y).to_array(),
                        normal: world.transform_vector3(dir).normalize_or_zero().to_array(),
                        uv: [s as f32 / sides as f32, ring as f32 * bone.length],
                        bone: id as u32,
                    });
                }
            }

            let stride = sides + 1;
            for s in 0..sides {
                let a = base + s;
                let b = base + s + 1;
                let c = base + stride + s;
                let d = base + stride + s + 1;
                mesh.indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }
        mesh
    }

    fn build_leaves(&self, skeleton: &Skeleton, rng: &mut ChaCha8Rng) -> LeafBatch {
        let outer = skeleton.max_depth();
        let mut batch = LeafBatch::default();

        for (id, bone) in skeleton.bones().iter().enumerate() {
            if skeleton.depth(id as BoneId) != outer {
                continue;
            }
            let world = skeleton.rest_world(id as BoneId);
            let branch_normal = world.transform_vector3(Vec3::Y).normalize_or_zero();
            for _ in 0..self.leaves_per_bone {
                let along = bone.length * rng.random_range(0.3..1.1);
                let spread = (self.leaf_size * 0.8).max(1e-3);
                let jitter = Vec3::new(
                    rng.random_range(-spread..spread),
                    rng.random_range(-spread * 0.5..spread * 0.5),
                    rng.random_range(-spread..spread),
                );
                let center = world.transform_point3(Vec3::new(0.0, along, 0.0)) + jitter;
                let size = Vec2::splat(self.leaf_size * rng.random_range(0.8..1.25));
                let shade = rng.random_range(0.85..1.1);
                let color = (self.leaf_color.truncate() * shade).extend(self.leaf_color.w);
                batch.push_leaf(LeafVertex::quad(
                    center,
                    size,
                    rng.random_range(0.0..TAU),
                    color,
                    id as BoneId,
                    branch_normal,
                ));
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trunk_vertex_is_36_bytes() {
        assert_eq!(std::mem::size_of::<TrunkVertex>(), 36);
    }

    #[test]
    fn test_bone_count_matches_branching() {
        let profile = TreeProfile {
            levels: 2,
            branches: 3,
            ..Default::default()
        };
        let tree = profile.generate(1).unwrap();
        assert_eq!(tree.skeleton.len(), 1 + 3 + 9);
        assert_eq!(tree.skeleton.max_depth(), 2);
    }

    #[test]
    fn test_same_seed_same_tree() {
        let profile = TreeProfile::default();
        let a = profile.generate(5).unwrap();
        let b = profile.generate(5).unwrap();
        assert_eq!(a.skeleton.rest_pose(), b.skeleton.rest_pose());
        assert_eq!(a.leaves.vertices, b.leaves.vertices);
        assert_eq!(a.trunk.vertices, b.trunk.vertices);
    }

    #[test]
    fn test_leaves_only_on_outer_bones() {
        let profile = TreeProfile::default();
        let tree = profile.generate(9).unwrap();
        let outer = tree.skeleton.max_depth();
        let outer_bones = (0..tree.skeleton.len() as BoneId)
            .filter(|&b| tree.skeleton.depth(b) == outer)
            .count();
        assert_eq!(tree.leaves.leaf_count(), outer_bones * profile.leaves_per_bone as usize);
        for v in &tree.leaves.vertices {
            assert_eq!(tree.skeleton.depth(v.bone_id()), outer);
        }
    }

    #[test]
    fn test_trunk_indices_in_range_and_bones_valid() {
        let tree = TreeProfile::default().generate(3).unwrap();
        let n = tree.trunk.vertices.len() as u32;
        assert!(tree.trunk.indices.iter().all(|&i| i < n));
        let bones = tree.skeleton.len() as u32;
        assert!(tree.trunk.vertices.iter().all(|v| v.bone < bones));
    }

    #[test]
    fn test_trunk_starts_at_origin_and_grows_up() {
        let tree = TreeProfile::default().generate(11).unwrap();
        let base = &tree.trunk.vertices[0];
        assert!(base.position[1].abs() < 1e-6);
        let max_y = tree
            .trunk
            .vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        assert!(max_y > TreeProfile::default().trunk_length * 0.5);
    }

    #[test]
    fn test_variants_differ() {
        let variants = TreeProfile::default().variants(3);
        assert_eq!(variants.len(), 3);
        assert_ne!(variants[0], variants[2]);
    }
}
