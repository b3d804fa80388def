//! Free-fly camera: mouse look plus WASD movement, no collision.

use glam::{Quat, Vec3};
use glade_config::CameraConfig;
use glade_render::Camera;

use crate::input::MoveIntent;

/// Pitch limit, short of straight up or down so the yaw axis stays defined.
pub const MAX_PITCH: f32 = 89.0 * std::f32::consts::PI / 180.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FreeFlyController {
    /// World units per second.
    pub speed: f32,
    /// Radians per pixel of mouse motion.
    pub mouse_sensitivity: f32,
}

impl Default for FreeFlyController {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl FreeFlyController {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            speed: config.move_speed,
            mouse_sensitivity: config.mouse_sensitivity,
        }
    }

    /// Apply one frame of look and movement to `camera`.
    ///
    /// Yaw turns around world up and pitch around `cross(forward, up)`.
    /// W/S move along the view direction; A/D strafe horizontally.
    pub fn update(&self, camera: &mut Camera, intent: &MoveIntent, dt: f32) {
        let yaw = -intent.look.x * self.mouse_sensitivity;
        let pitch = -intent.look.y * self.mouse_sensitivity;

        let mut forward = Quat::from_axis_angle(Vec3::Y, yaw) * camera.forward;
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        if right != Vec3::ZERO {
            let current = pitch_of(forward);
            let target = (current + pitch).clamp(-MAX_PITCH, MAX_PITCH);
            forward = Quat::from_axis_angle(right, target - current) * forward;
        }
        // Accumulated rotations drift off unit length.
        camera.forward = forward.try_normalize().unwrap_or(Vec3::NEG_Z);

        let step = self.speed * dt;
        let strafe_axis = camera.forward.cross(Vec3::Y).normalize_or_zero();
        camera.position += camera.forward * intent.forward * step;
        camera.position += strafe_axis * intent.strafe * step;
    }
}

/// Current pitch of a view direction, in radians.
pub fn pitch_of(forward: Vec3) -> f32 {
    forward.normalize_or_zero().y.clamp(-1.0, 1.0).asin()
}
