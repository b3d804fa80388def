//! Tree instances placed on the terrain.
//!
//! Instances are a flat array, separate from the skeletons they animate.
//! Every instance owns exactly one skeleton (same index in `skeletons`), and
//! shares its trunk mesh and leaf batch with other instances of the same
//! variant.

use std::f32::consts::TAU;

use glam::{Mat4, Quat, Vec3};
use glade_terrain::Terrain;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::animator::{AnimationState, SkeletonAnimator};
use crate::error::ForestError;
use crate::profile::TreeModel;
use crate::skeleton::Skeleton;
use crate::wind::WindSample;

/// Placement parameters for [`Forest::populate`].
#[derive(Clone, Debug, PartialEq)]
pub struct ForestParams {
    pub count: usize,
    pub seed: u64,
    /// Uniform scale of an unjittered tree.
    pub scale: f32,
    /// Scale varies by up to this fraction either way.
    pub scale_jitter: f32,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            count: 300,
            seed: 0,
            scale: 1.0,
            scale_jitter: 0.3,
        }
    }
}

/// One placed tree.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeInstance {
    /// Index into [`Forest::skeletons`]; owned by this instance alone.
    pub skeleton: usize,
    /// Index into [`Forest::variants`]; selects trunk mesh and leaf batch.
    pub variant: usize,
    /// Heightmap cell the tree stands on.
    pub cell: (u32, u32),
    pub position: Vec3,
    pub scale: f32,
    /// Rotation about +Y in radians.
    pub yaw: f32,
    pub world: Mat4,
    pub animation: AnimationState,
}

#[derive(Clone, Debug)]
pub struct Forest {
    variants: Vec<TreeModel>,
    skeletons: Vec<Skeleton>,
    instances: Vec<TreeInstance>,
}

impl Forest {
    /// Place `params.count` trees on distinct, randomly chosen heightmap cells.
    ///
    /// Each tree's world Y is exactly the terrain height at its cell.
    pub fn populate(
        terrain: &Terrain,
        variants: Vec<TreeModel>,
        params: &ForestParams,
    ) -> Result<Self, ForestError> {
        if variants.is_empty() {
            return if params.count == 0 {
                Ok(Self {
                    variants,
                    skeletons: Vec::new(),
                    instances: Vec::new(),
                })
            } else {
                Err(ForestError::NoVariants)
            };
        }

        let hm = terrain.heightmap();
        let width = hm.width() as usize;
        let available = width * hm.depth() as usize;
        if params.count > available {
            return Err(ForestError::TooManyTrees {
                requested: params.count,
                available,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let cells = rand::seq::index::sample(&mut rng, available, params.count);

        let mut skeletons = Vec::with_capacity(params.count);
        let mut instances = Vec::with_capacity(params.count);
        for (i, cell_index) in cells.into_iter().enumerate() {
            let x = (cell_index % width) as u32;
            let z = (cell_index / width) as u32;
            let position = terrain.cell_position(x, z)?;

            let variant = rng.random_range(0..variants.len());
            let jitter = params.scale_jitter.abs();
            let scale = params.scale * (1.0 + rng.random_range(-jitter..=jitter));
            let yaw = rng.random_range(0.0..TAU);
            let animation = AnimationState {
                phase: rng.random_range(0.0..TAU),
                stiffness: rng.random_range(0.8..1.25),
            };

            skeletons.push(variants[variant].skeleton.clone());
            instances.push(TreeInstance {
                skeleton: i,
                variant,
                cell: (x, z),
                position,
                scale,
                yaw,
                world: Mat4::from_scale_rotation_translation(
                    Vec3::splat(scale),
                    Quat::from_rotation_y(yaw),
                    position,
                ),
                animation,
            });
        }

        log::info!(
            "Placed {} trees ({} variants) on a {}x{} heightmap",
            instances.len(),
            variants.len(),
            hm.width(),
            hm.depth()
        );
        Ok(Self {
            variants,
            skeletons,
            instances,
        })
    }

    pub fn variants(&self) -> &[TreeModel] {
        &self.variants
    }

    pub fn skeletons(&self) -> &[Skeleton] {
        &self.skeletons
    }

    pub fn instances(&self) -> &[TreeInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Re-derive every skeleton's pose for time `elapsed`.
    pub fn animate(&mut self, animator: &SkeletonAnimator, elapsed: f64, wind: WindSample) {
        for instance in &self.instances {
            animator.animate(
                &mut self.skeletons[instance.skeleton],
                &instance.animation,
                elapsed,
                wind,
            );
        }
    }

    /// Instances of one variant, for instanced drawing.
    pub fn instances_of(&self, variant: usize) -> impl Iterator<Item = &TreeInstance> + '_ {
        self.instances.iter().filter(move |i| i.variant == variant)
    }

    /// Append every instance's skinning palette to `out`, grouped by variant.
    ///
    /// Returns, per variant, the instances in draw order together with the
    /// offset of each instance's first matrix in `out`.
    pub fn write_palettes(&self, out: &mut Vec<Mat4>) -> Vec<Vec<(usize, u32)>> {
        let mut groups = vec![Vec::new(); self.variants.len()];
        for (variant, group) in groups.iter_mut().enumerate() {
            for (index, instance) in self.instances.iter().enumerate() {
                if instance.variant != variant {
                    continue;
                }
                group.push((index, out.len() as u32));
                out.extend(self.skeletons[instance.skeleton].skinning_palette());
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::TreeProfile;
    use glade_terrain::{Heightmap, HeightmapParams};

    fn terrain() -> Terrain {
        let map = Heightmap::generate(24, 20, &HeightmapParams { seed: 3, ..Default::default() })
            .unwrap();
        Terrain::new(map, 4.0, 30.0)
    }

    fn variants() -> Vec<TreeModel> {
        let profile = TreeProfile {
            levels: 1,
            leaves_per_bone: 2,
            ..Default::default()
        };
        profile
            .variants(2)
            .iter()
            .enumerate()
            .map(|(i, p)| p.generate(i as u64).unwrap())
            .collect()
    }

    fn forest(count: usize) -> Forest {
        let params = ForestParams {
            count,
            seed: 17,
            ..Default::default()
        };
        Forest::populate(&terrain(), variants(), &params).unwrap()
    }

    #[test]
    fn test_tree_y_equals_terrain_height_at_cell() {
        let t = terrain();
        let params = ForestParams {
            count: 120,
            seed: 5,
            ..Default::default()
        };
        let forest = Forest::populate(&t, variants(), &params).unwrap();
        assert_eq!(forest.len(), 120);
        for tree in forest.instances() {
            let (x, z) = tree.cell;
            assert_eq!(tree.position.y, t.height_at_cell(x, z).unwrap());
            assert_eq!(tree.world.w_axis.y, tree.position.y);
        }
    }

    #[test]
    fn test_cells_are_distinct() {
        let forest = forest(200);
        let mut cells: Vec<_> = forest.instances().iter().map(|t| t.cell).collect();
        cells.sort_unstable();
        cells.dedup();
        assert_eq!(cells.len(), 200);
    }

    #[test]
    fn test_each_tree_owns_its_skeleton() {
        let forest = forest(30);
        assert_eq!(forest.skeletons().len(), 30);
        let mut owners: Vec<_> = forest.instances().iter().map(|t| t.skeleton).collect();
        owners.sort_unstable();
        assert_eq!(owners, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_population_is_deterministic() {
        assert_eq!(forest(50).instances(), forest(50).instances());
    }

    #[test]
    fn test_too_many_trees_rejected() {
        let params = ForestParams {
            count: 24 * 20 + 1,
            ..Default::default()
        };
        assert!(matches!(
            Forest::populate(&terrain(), variants(), &params),
            Err(ForestError::TooManyTrees { available: 480, .. })
        ));
    }

    #[test]
    fn test_no_variants_rejected() {
        let params = ForestParams {
            count: 1,
            ..Default::default()
        };
        assert!(matches!(
            Forest::populate(&terrain(), Vec::new(), &params),
            Err(ForestError::NoVariants)
        ));
    }

    #[test]
    fn test_scale_within_jitter() {
        let forest = forest(100);
        for tree in forest.instances() {
            assert!((0.7..=1.3).contains(&tree.scale), "scale {}", tree.scale);
        }
    }

    #[test]
    fn test_calm_animation_keeps_rest_pose() {
        let mut forest = forest(10);
        forest.animate(&SkeletonAnimator::default(), 5.0, WindSample::CALM);
        for s in forest.skeletons() {
            assert_eq!(s.pose(), s.rest_pose());
        }
    }

    #[test]
    fn test_wind_moves_every_tree() {
        let mut forest = forest(10);
        let wind = WindSample {
            strength: 0.8,
            direction: Vec3::X,
        };
        forest.animate(&SkeletonAnimator::default(), 1.0, wind);
        for s in forest.skeletons() {
            assert_ne!(s.pose(), s.rest_pose());
        }
    }

    #[test]
    fn test_palettes_cover_every_instance_once() {
        let forest = forest(25);
        let mut palette = Vec::new();
        let groups = forest.write_palettes(&mut palette);
        assert_eq!(groups.len(), 2);
        let total: usize = groups.iter().map(Vec::len).sum();
        assert_eq!(total, 25);
        let bones: usize = forest.skeletons().iter().map(Skeleton::len).sum();
        assert_eq!(palette.len(), bones);
        for (variant, group) in groups.iter().enumerate() {
            for &(index, _) in group {
                assert_eq!(forest.instances()[index].variant, variant);
            }
        }
    }
}
