//! Wind sway for tree skeletons.
//!
//! The pose is never integrated: every frame starts again from the rest pose
//! and applies a rotation per bone whose angle is the wind strength times a
//! flexibility factor times an oscillation. Deeper and thinner bones sway more.

use std::f64::consts::TAU;

use glam::{Mat4, Vec3};

use crate::skeleton::{Skeleton, compose};
use crate::wind::WindSample;

/// Per-tree animation state, fixed at population time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    /// Phase offset so neighbouring trees do not sway in lockstep.
    pub phase: f32,
    /// Divides every sway angle; 1.0 is the reference tree.
    pub stiffness: f32,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            phase: 0.0,
            stiffness: 1.0,
        }
    }
}

/// Tuning for [`SkeletonAnimator`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwayParams {
    /// Radians of bend per unit of wind for a root bone.
    pub base_flex: f32,
    /// Extra flex added per level of depth.
    pub depth_flex: f32,
    /// Extra flex for a bone much thinner than the root.
    pub thin_flex: f32,
    /// Frequency of the per-bone flutter, radians per second.
    pub flutter_frequency: f32,
    /// Share of the angle that oscillates; the rest follows the wind directly.
    pub flutter_share: f32,
    /// Hard limit on any single bend.
    pub max_angle: f32,
}

impl Default for SwayParams {
    fn default() -> Self {
        Self {
            base_flex: 0.02,
            depth_flex: 0.06,
            thin_flex: 0.08,
            flutter_frequency: 3.1,
            flutter_share: 0.35,
            max_angle: 0.6,
        }
    }
}

/// Drives skeleton poses from the wind.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkeletonAnimator {
    params: SwayParams,
}

impl SkeletonAnimator {
    pub fn new(params: SwayParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SwayParams {
        &self.params
    }

    /// Flexibility of a bone from its depth and relative thinness.
    fn flex(&self, depth: u32, radius: f32, root_radius: f32) -> f32 {
        let thinness = if root_radius > 0.0 {
            1.0 - (radius / root_radius).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.params.base_flex
            + self.params.depth_flex * depth as f32
            + self.params.thin_flex * thinness
    }

    /// Bend angle of one bone.
    fn sway_angle(
        &self,
        wind: f32,
        flex: f32,
        depth: u32,
        state: &AnimationState,
        elapsed: f64,
    ) -> f32 {
        let p = &self.params;
        // Wrapped before narrowing so f32 keeps sub-frame resolution.
        let cycle = (elapsed * f64::from(p.flutter_frequency)).rem_euclid(TAU) as f32;
        let flutter = (cycle + state.phase + depth as f32 * 0.9).sin();
        let oscillation = (1.0 - p.flutter_share) + p.flutter_share * flutter;
        let stiffness = state.stiffness.max(f32::EPSILON);
        (wind * flex * oscillation / stiffness).clamp(-p.max_angle, p.max_angle)
    }

    /// Overwrite the skeleton's animated pose for time `elapsed`.
    ///
    /// Bones rotate about the horizontal axis perpendicular to the wind, in
    /// their own frame, so children follow their parent's bend.
    pub fn animate(
        &self,
        skeleton: &mut Skeleton,
        state: &AnimationState,
        elapsed: f64,
        wind: WindSample,
    ) {
        let world_axis = Vec3::Y.cross(wind.direction).try_normalize().unwrap_or(Vec3::Z);
        let root_radius = skeleton
            .bones()
            .iter()
            .filter(|b| b.parent.is_none())
            .map(|b| b.radius)
            .fold(0.0_f32, f32::max);

        let order = skeleton.evaluation_order().to_vec();
        let mut pose = skeleton.pose().to_vec();

        for id in order {
            let bone = *skeleton.bone(id);
            let depth = skeleton.depth(id);
            let flex = self.flex(depth, bone.radius, root_radius);
            let angle = self.sway_angle(wind.strength, flex, depth, state, elapsed);

            let local = if angle == 0.0 {
                bone.rest
            } else {
                let axis = skeleton
                    .inverse_rest_world(id)
                    .transform_vector3(world_axis)
                    .try_normalize()
                    .unwrap_or(Vec3::Z);
                bone.rest * Mat4::from_axis_angle(axis, angle)
            };

            pose[id as usize] = match bone.parent {
                Some(parent) => compose(pose[parent as usize], local),
                None => local,
            };
        }

        skeleton.pose_mut().copy_from_slice(&pose);
    }
}
