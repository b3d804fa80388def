//! Terrain, forest, wind and lighting assembled from the config.

use glam::{Vec2, Vec3};
use glade_config::Config;
use glade_foliage::{
    Forest, ForestError, ForestParams, SkeletonAnimator, SkeletonError, TreeProfile, WindClock,
    WindField,
};
use glade_render::{Camera, SceneLighting};
use glade_terrain::{Heightmap, HeightmapParams, Terrain, TerrainError, TerrainMesh};
use tracing::{info, instrument};

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("terrain: {0}")]
    Terrain(#[from] TerrainError),

    #[error("tree profile: {0}")]
    Skeleton(#[from] SkeletonError),

    #[error("forest: {0}")]
    Forest(#[from] ForestError),
}

/// Everything simulated on the CPU each frame.
pub struct Scene {
    pub terrain: Terrain,
    pub mesh: TerrainMesh,
    pub forest: Forest,
    pub wind: WindField,
    pub wind_clock: WindClock,
    pub animator: SkeletonAnimator,
    pub lighting: SceneLighting,
}

impl Scene {
    #[instrument(skip_all, fields(seed = config.scene.seed))]
    pub fn build(config: &Config) -> Result<Self, SceneError> {
        let sc = &config.scene;
        let heightmap = Heightmap::generate(
            sc.heightmap_size,
            sc.heightmap_size,
            &HeightmapParams {
                seed: sc.seed,
                ..Default::default()
            },
        )?;
        let terrain = Terrain::new(heightmap, sc.terrain_scale, sc.bumpiness);
        let mesh = TerrainMesh::build(&terrain);

        let variants = TreeProfile::default()
            .variants(sc.tree_variants)
            .iter()
            .enumerate()
            .map(|(i, profile)| profile.generate(sc.seed.wrapping_add(i as u64)))
            .collect::<Result<Vec<_>, _>>()?;
        let forest = Forest::populate(
            &terrain,
            variants,
            &ForestParams {
                count: sc.tree_count as usize,
                seed: sc.seed,
                scale: sc.tree_scale,
                scale_jitter: sc.tree_scale_jitter,
            },
        )?;
        info!(
            "Scene: {}x{} heightmap, {} triangles, {} trees in {} variants",
            sc.heightmap_size,
            sc.heightmap_size,
            mesh.triangle_count(),
            forest.len(),
            forest.variants().len()
        );

        let wind = WindField::new(
            config.wind.amplitude,
            config.wind.frequency,
            Vec2::from(config.wind.direction),
        );

        Ok(Self {
            terrain,
            mesh,
            forest,
            wind,
            wind_clock: WindClock::new(config.wind.max_time_step),
            animator: SkeletonAnimator::default(),
            lighting: lighting_from_config(config),
        })
    }

    /// Advance the wind and re-pose every tree. Returns the wind time.
    pub fn update(&mut self, dt: f32) -> f64 {
        let elapsed = self.wind_clock.advance(dt);
        self.forest
            .animate(&self.animator, elapsed, self.wind.sample_at(elapsed));
        elapsed
    }

    /// Camera above the terrain centre, looking toward the sun's azimuth.
    pub fn initial_camera(&self, config: &Config, aspect_ratio: f32) -> Camera {
        let sun = self.lighting.sun_direction;
        let forward = Vec3::new(sun.x, 0.0, sun.z)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z);
        let ground = self.terrain.height_at(0.0, 0.0);
        Camera {
            position: Vec3::new(0.0, ground + config.camera.start_height, 0.0),
            forward,
            fov_y: config.camera.fov_degrees.to_radians(),
            aspect_ratio,
            near: config.camera.near,
            far: config.camera.far,
        }
    }
}

pub fn lighting_from_config(config: &Config) -> SceneLighting {
    let defaults = SceneLighting::default();
    SceneLighting {
        sun_direction: Vec3::from(config.scene.sun_direction)
            .try_normalize()
            .unwrap_or(defaults.sun_direction),
        fog_color: Vec3::from(config.render.fog_color),
        fog_start: config.render.fog_start,
        fog_end: config.render.fog_end,
        ..defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.scene.heightmap_size = 16;
        config.scene.tree_count = 12;
        config.scene.tree_variants = 2;
        config
    }

    #[test]
    fn test_build_places_requested_trees() {
        let scene = Scene::build(&small_config()).unwrap();
        assert_eq!(scene.forest.len(), 12);
        assert_eq!(scene.forest.variants().len(), 2);
        assert!(!scene.mesh.indices.is_empty());
    }

    #[test]
    fn test_trees_stand_on_their_cells() {
        let scene = Scene::build(&small_config()).unwrap();
        for tree in scene.forest.instances() {
            let (x, z) = tree.cell;
            let ground = scene.terrain.height_at_cell(x, z).unwrap();
            assert!((tree.position.y - ground).abs() < 1e-4);
        }
    }

    #[test]
    fn test_same_seed_same_scene() {
        let a = Scene::build(&small_config()).unwrap();
        let b = Scene::build(&small_config()).unwrap();
        let cells = |s: &Scene| s.forest.instances().iter().map(|t| t.cell).collect::<Vec<_>>();
        assert_eq!(cells(&a), cells(&b));
    }

    #[test]
    fn test_too_many_trees_is_an_error() {
        let mut config = small_config();
        config.scene.heightmap_size = 4;
        config.scene.tree_count = 100;
        assert!(matches!(Scene::build(&config), Err(SceneError::Forest(_))));
    }

    #[test]
    fn test_update_clamps_wind_step() {
        let mut config = small_config();
        config.wind.max_time_step = 0.1;
        let mut scene = Scene::build(&config).unwrap();
        assert!((scene.update(2.0) - 0.1).abs() < 1e-6);
        assert!((scene.update(0.05) - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_initial_camera_faces_sun_azimuth() {
        let config = small_config();
        let scene = Scene::build(&config).unwrap();
        let camera = scene.initial_camera(&config, 1.5);
        assert_eq!(camera.forward.y, 0.0);
        assert!(camera.forward.dot(scene.lighting.sun_direction) > 0.0);
        assert!(camera.position.y > scene.terrain.height_at(0.0, 0.0));
        assert_eq!(camera.aspect_ratio, 1.5);
    }

    #[test]
    fn test_zero_sun_direction_falls_back() {
        let mut config = small_config();
        config.scene.sun_direction = [0.0; 3];
        let lighting = lighting_from_config(&config);
        assert!((lighting.sun_direction.length() - 1.0).abs() < 1e-5);
    }
}
