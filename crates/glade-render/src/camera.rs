//! Perspective camera and the per-frame uniform block.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// A free camera looking along `forward`, with reverse-Z projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Unit view direction.
    pub forward: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect_ratio: 4.0 / 3.0,
            near: 1.0,
            far: 10000.0,
        }
    }
}

impl Camera {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, Vec3::Y)
    }

    /// Reverse-Z: the near plane maps to depth 1, the far plane to 0.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.far, self.near)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect_ratio = width / height;
        }
    }

    /// Project a direction at infinity to normalized screen space (0..1, y down).
    ///
    /// Returns `None` when the direction points behind the camera. Positions
    /// outside 0..1 are valid and mean the point is off-screen.
    pub fn project_direction(&self, direction: Vec3) -> Option<Vec2> {
        let clip = self.view_projection_matrix() * direction.extend(0.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
        Some(Vec2::new(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5))
    }
}

/// Scene-wide lighting and atmosphere constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLighting {
    /// Unit vector toward the sun.
    pub sun_direction: Vec3,
    pub sun_color: Vec3,
    pub sky_zenith: Vec3,
    pub sky_horizon: Vec3,
    pub fog_color: Vec3,
    pub fog_start: f32,
    pub fog_end: f32,
    /// Angular radius of the sun sprite, in radians.
    pub sun_size: f32,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            sun_direction: Vec3::new(0.0, 0.35, -1.0).normalize(),
            sun_color: Vec3::new(1.0, 0.93, 0.78),
            sky_zenith: Vec3::new(0.26, 0.45, 0.78),
            sky_horizon: Vec3::new(0.70, 0.78, 0.86),
            fog_color: Vec3::new(0.62, 0.70, 0.78),
            fog_start: 200.0,
            fog_end: 900.0,
            sun_size: 0.06,
        }
    }
}

/// Uniform block at group 0, binding 0 of every scene shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FrameUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    /// `xyz`: camera position. `w`: elapsed seconds.
    pub camera_pos: [f32; 4],
    /// `xyz`: toward the sun. `w`: sun sprite size.
    pub sun_dir: [f32; 4],
    pub sun_color: [f32; 4],
    pub sky_zenith: [f32; 4],
    pub sky_horizon: [f32; 4],
    pub fog_color: [f32; 4],
    /// `x`: fog start. `y`: fog end.
    pub fog_params: [f32; 4],
}

impl FrameUniform {
    pub fn new(camera: &Camera, lighting: &SceneLighting, elapsed: f32) -> Self {
        let view = camera.view_matrix();
        let proj = camera.projection_matrix();
        let view_proj = proj * view;
        Self {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_pos: camera.position.extend(elapsed).to_array(),
            sun_dir: lighting.sun_direction.extend(lighting.sun_size).to_array(),
            sun_color: lighting.sun_color.extend(1.0).to_array(),
            sky_zenith: lighting.sky_zenith.extend(1.0).to_array(),
            sky_horizon: lighting.sky_horizon.extend(1.0).to_array(),
            fog_color: lighting.fog_color.extend(1.0).to_array(),
            fog_params: Vec4::new(lighting.fog_start, lighting.fog_end, 0.0, 0.0).to_array(),
        }
    }
}
