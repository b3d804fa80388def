use glade_terrain::TerrainError;

use crate::skeleton::BoneId;

/// Errors raised when a bone hierarchy cannot be evaluated.
#[derive(Debug, thiserror::Error)]
pub enum SkeletonError {
    #[error("skeleton has no bones")]
    Empty,

    #[error("bone {bone} names parent {parent}, but the skeleton has {count} bones")]
    MissingParent {
        bone: BoneId,
        parent: BoneId,
        count: usize,
    },

    #[error("malformed skeleton: bone {bone} is its own ancestor")]
    MalformedSkeleton { bone: BoneId },

    #[error("skeleton has {count} bones, at most {max} fit the leaf bone index")]
    TooManyBones { count: usize, max: usize },
}

/// Errors raised while populating the forest.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    #[error("cannot place {requested} trees on {available} terrain cells")]
    TooManyTrees { requested: usize, available: usize },

    #[error("at least one tree variant is required")]
    NoVariants,

    #[error(transparent)]
    Terrain(#[from] TerrainError),

    #[error(transparent)]
    Skeleton(#[from] SkeletonError),
}
