//! Procedural trees, skeletal wind animation, and billboarded leaves.
//!
//! Each tree owns a bone [`Skeleton`] whose animated pose is re-derived every
//! frame from its rest pose, a [`WindField`] sample, and elapsed time. Leaf
//! billboards reference bones by index and are never rewritten on the CPU;
//! the renderer applies the bone palette in the vertex shader.

mod error;

pub mod animator;
pub mod forest;
pub mod leaf_vertex;
pub mod profile;
pub mod skeleton;
pub mod wind;

pub use animator::{AnimationState, SkeletonAnimator, SwayParams};
pub use error::{ForestError, SkeletonError};
pub use forest::{Forest, ForestParams, TreeInstance};
pub use leaf_vertex::{LeafBatch, LeafVertex};
pub use profile::{TreeModel, TreeProfile, TrunkMesh, TrunkVertex};
pub use skeleton::{Bone, BoneId, MAX_BONES, Skeleton};
pub use wind::{WindClock, WindField, WindSample};
