//! Bone arena with parent indices.
//!
//! Bones live in a flat `Vec` and refer to their parent by index. Validation
//! happens once at construction; after that the evaluation order, depths, and
//! rest-pose world transforms are cached and every query is infallible.

use glam::Mat4;

use crate::error::SkeletonError;

/// Index of a bone within its skeleton.
pub type BoneId = u16;

/// Leaf vertices carry the bone index as a signed 16-bit integer.
pub const MAX_BONES: usize = i16::MAX as usize + 1;

/// A single bone in rest pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bone {
    /// Parent bone, or `None` for a root.
    pub parent: Option<BoneId>,
    /// Transform relative to the parent (or model space for roots).
    /// The bone extends along its local +Y axis.
    pub rest: Mat4,
    /// Length along local +Y.
    pub length: f32,
    /// Radius at the base, used to derive flexibility.
    pub radius: f32,
}

/// Compose a parent's world transform with a child's local transform.
///
/// Rest and animated poses both go through here so that an unperturbed
/// animation reproduces the rest pose bit for bit.
#[inline]
pub(crate) fn compose(parent_world: Mat4, local: Mat4) -> Mat4 {
    parent_world * local
}

#[derive(Clone, Debug)]
pub struct Skeleton {
    bones: Vec<Bone>,
    /// Parents always precede children.
    order: Vec<BoneId>,
    depth: Vec<u32>,
    rest_world: Vec<Mat4>,
    inverse_rest_world: Vec<Mat4>,
    /// Animated model-space transform per bone, rewritten every frame.
    pose: Vec<Mat4>,
}

impl Skeleton {
    /// Validate a bone list and cache its rest pose.
    pub fn new(bones: Vec<Bone>) -> Result<Self, SkeletonError> {
        if bones.is_empty() {
            return Err(SkeletonError::Empty);
        }
        let count = bones.len();
        if count > MAX_BONES {
            return Err(SkeletonError::TooManyBones {
                count,
                max: MAX_BONES,
            });
        }

        let mut depth = vec![0u32; count];
        for (i, bone) in bones.iter().enumerate() {
            let mut steps = 0usize;
            let mut cursor = bone.parent;
            while let Some(parent) = cursor {
                if parent as usize >= count {
                    return Err(SkeletonError::MissingParent {
                        bone: i as BoneId,
                        parent,
                        count,
                    });
                }
                steps += 1;
                if steps > count || parent as usize == i {
                    return Err(SkeletonError::MalformedSkeleton { bone: i as BoneId });
                }
                cursor = bones[parent as usize].parent;
            }
            depth[i] = steps as u32;
        }

        let mut order: Vec<BoneId> = (0..count as BoneId).collect();
        order.sort_by_key(|&i| depth[i as usize]);

        let mut rest_world = vec![Mat4::IDENTITY; count];
        for &i in &order {
            let bone = &bones[i as usize];
            rest_world[i as usize] = match bone.parent {
                Some(p) => compose(rest_world[p as usize], bone.rest),
                None => bone.rest,
            };
        }
        let inverse_rest_world = rest_world.iter().map(Mat4::inverse).collect();
        let pose = rest_world.clone();

        Ok(Self {
            bones,
            order,
            depth,
            rest_world,
            inverse_rest_world,
            pose,
        })
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, id: BoneId) -> &Bone {
        &self.bones[id as usize]
    }

    /// Bone ids with every parent listed before its children.
    pub fn evaluation_order(&self) -> &[BoneId] {
        &self.order
    }

    /// Number of ancestors; roots have depth 0.
    pub fn depth(&self, id: BoneId) -> u32 {
        self.depth[id as usize]
    }

    pub fn max_depth(&self) -> u32 {
        self.depth.iter().copied().max().unwrap_or(0)
    }

    /// Rest-pose model-space transform.
    pub fn rest_world(&self, id: BoneId) -> Mat4 {
        self.rest_world[id as usize]
    }

    pub fn inverse_rest_world(&self, id: BoneId) -> Mat4 {
        self.inverse_rest_world[id as usize]
    }

    /// Animated model-space transforms from the last update.
    pub fn pose(&self) -> &[Mat4] {
        &self.pose
    }

    pub fn rest_pose(&self) -> &[Mat4] {
        &self.rest_world
    }

    pub(crate) fn pose_mut(&mut self) -> &mut [Mat4] {
        &mut self.pose
    }

    /// Skinning matrices: animated transform times inverse rest transform.
    pub fn skinning_palette(&self) -> impl Iterator<Item = Mat4> + '_ {
        self.pose
            .iter()
            .zip(&self.inverse_rest_world)
            .map(|(pose, inv)| *pose * *inv)
    }
}
