//! Headless rendering: one frame through the compositor on the CPU,
//! written as a PNG.

use std::path::Path;

use glam::{Vec2, Vec4};
use glade_config::Config;
use glade_render::{
    CompositorError, CompositorSettings, FrameInputs, FrameReport, SceneCompositor, Shape,
    SoftScene, SoftwareDevice, Sprite, TargetId, TargetLayout,
};
use tracing::{info, instrument};

use crate::error::AppError;

/// Sun centre in normalized screen space.
pub const SUN_POSITION: Vec2 = Vec2::new(0.5, 0.3);

const SUN_COLOR: Vec4 = Vec4::new(1.0, 0.93, 0.78, 1.0);
const OCCLUDER_COLOR: Vec4 = Vec4::new(0.12, 0.10, 0.08, 1.0);

/// Occluders as `(x, y, width, height)` on an 800x480 reference frame.
const OCCLUDERS: [(f32, f32, f32, f32); 4] = [
    (80.0, 200.0, 64.0, 200.0),
    (180.0, 200.0, 64.0, 200.0),
    (270.0, 200.0, 64.0, 200.0),
    (400.0, 200.0, 64.0, 200.0),
];
const REFERENCE_SIZE: Vec2 = Vec2::new(800.0, 480.0);

/// A sun glow behind a row of dark posts, over the default sky gradient.
pub fn snapshot_scene() -> SoftScene {
    let trunks = OCCLUDERS
        .iter()
        .map(|&(x, y, w, h)| Sprite {
            shape: Shape::Rect {
                min: Vec2::new(x, y) / REFERENCE_SIZE,
                max: Vec2::new(x + w, y + h) / REFERENCE_SIZE,
            },
            color: OCCLUDER_COLOR,
            depth: 0.5,
        })
        .collect();
    SoftScene {
        sun: Some(Sprite {
            shape: Shape::Glow {
                center: SUN_POSITION,
                radius: 0.15,
            },
            color: SUN_COLOR,
            depth: 0.0,
        }),
        trunks,
        ..Default::default()
    }
}

/// Render the snapshot scene at the configured window size.
pub fn render_snapshot(config: &Config) -> Result<(SoftwareDevice, FrameReport), CompositorError> {
    let layout = TargetLayout::new(
        config.window.width,
        config.window.height,
        config.render.scatter_divisor,
    );
    let mut device = SoftwareDevice::new(snapshot_scene(), layout);
    let compositor = SceneCompositor::new(CompositorSettings::from_config(config), layout)?;
    let inputs = FrameInputs {
        light_screen_pos: SUN_POSITION,
        intensity: 1.0,
    };
    let report = compositor.render(&mut device, &inputs)?;
    Ok((device, report))
}

#[instrument(skip(config))]
pub fn write_snapshot(config: &Config, path: &Path) -> Result<FrameReport, AppError> {
    let (device, report) = render_snapshot(config)?;
    let image = device
        .image(TargetId::Backbuffer)
        .ok_or(CompositorError::TargetsReleased)?;
    image.write_png(path)?;
    info!(
        "Snapshot: passes {:?}, {} draw calls",
        report.passes, report.draw_calls
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use glade_render::FramePhase;

    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.window.width = 160;
        config.window.height = 96;
        config
    }

    #[test]
    fn test_snapshot_runs_full_pipeline() {
        let (_, report) = render_snapshot(&small_config()).unwrap();
        for phase in [
            FramePhase::Occlusion,
            FramePhase::Scatter,
            FramePhase::Color,
            FramePhase::Composite,
        ] {
            assert!(report.ran(phase), "{phase:?} missing");
        }
        assert!(!report.ran(FramePhase::BaseColor));
    }

    #[test]
    fn test_sun_brighter_than_occluders() {
        let (device, _) = render_snapshot(&small_config()).unwrap();
        let image = device.image(TargetId::Backbuffer).unwrap();
        let sun = image.get(80, 29);
        // Inside the first occluder, well below the glow.
        let post = image.get(22, 70);
        assert!(sun.truncate().length() > post.truncate().length());
    }

    #[test]
    fn test_occlusion_mask_is_dark_on_posts() {
        let (device, _) = render_snapshot(&small_config()).unwrap();
        let mask = device.image(TargetId::Scene).unwrap();
        assert_eq!(mask.get(22, 60).truncate(), glam::Vec3::ZERO);
    }

    #[test]
    fn test_write_snapshot_creates_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let report = write_snapshot(&small_config(), &path).unwrap();
        assert!(report.draw_calls > 0);
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("frame.png");
        assert!(matches!(
            write_snapshot(&small_config(), &path),
            Err(AppError::Snapshot(_))
        ));
    }
}
