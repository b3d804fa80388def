//! Per-frame values shared by the scene update and the compositor.

use glade_render::{Camera, FrameInputs, FrameUniform, SceneLighting};

/// Derived once per frame, after the camera moved and before anything draws.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    pub uniform: FrameUniform,
    pub inputs: FrameInputs,
    /// Wind time in seconds.
    pub elapsed: f64,
}

impl FrameContext {
    pub fn new(camera: &Camera, lighting: &SceneLighting, horizon_fade: f32, elapsed: f64) -> Self {
        Self {
            uniform: FrameUniform::new(camera, lighting, elapsed as f32),
            inputs: FrameInputs::from_camera(camera, lighting.sun_direction, horizon_fade),
            elapsed,
        }
    }

    /// Whether this frame runs the god-ray passes.
    pub fn has_god_rays(&self) -> bool {
        self.inputs.intensity > 0.0
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn lighting(sun: Vec3) -> SceneLighting {
        SceneLighting {
            sun_direction: sun.normalize(),
            ..Default::default()
        }
    }

    #[test]
    fn test_facing_sun_centres_light() {
        let sun = Vec3::new(0.0, 0.4, -1.0);
        let camera = Camera {
            forward: sun.normalize(),
            ..Default::default()
        };
        let frame = FrameContext::new(&camera, &lighting(sun), 0.1, 0.0);
        assert!(frame.has_god_rays());
        assert!((frame.inputs.light_screen_pos - glam::Vec2::splat(0.5)).length() < 1e-3);
    }

    #[test]
    fn test_facing_away_disables_god_rays() {
        let camera = Camera {
            forward: Vec3::Z,
            ..Default::default()
        };
        let frame = FrameContext::new(&camera, &lighting(Vec3::new(0.0, 0.4, -1.0)), 0.1, 0.0);
        assert!(!frame.has_god_rays());
        assert_eq!(frame.inputs.intensity, 0.0);
    }

    #[test]
    fn test_sun_below_horizon_disables_god_rays() {
        let sun = Vec3::new(0.0, -0.2, -1.0);
        let camera = Camera {
            forward: sun.normalize(),
            ..Default::default()
        };
        let frame = FrameContext::new(&camera, &lighting(sun), 0.1, 0.0);
        assert!(!frame.has_god_rays());
    }

    #[test]
    fn test_uniform_carries_elapsed_time() {
        let camera = Camera {
            position: Vec3::new(1.0, 2.0, 3.0),
            ..Default::default()
        };
        let frame = FrameContext::new(&camera, &SceneLighting::default(), 0.1, 4.5);
        assert_eq!(frame.uniform.camera_pos, [1.0, 2.0, 3.0, 4.5]);
        assert_eq!(frame.elapsed, 4.5);
    }
}
