//! Multi-pass frame compositor.
//!
//! Every frame walks the same fixed sequence of passes:
//!
//! 1. **Occlusion** into the scene buffer: visible sky and the sun keep their
//!    color, terrain, trunks and leaves are drawn as black silhouettes.
//! 2. **Scatter** into the scatter buffer: the radial filter smears the
//!    occlusion mask toward the light.
//! 3. **Color** into the backbuffer: the mask as a dimmed backdrop, then the
//!    lit geometry on top.
//! 4. **Composite**: the scatter buffer added over the backbuffer.
//!
//! When the camera faces away from the sun (or the sun has set) the god rays
//! would be invisible, so a single **BaseColor** pass draws the sky and the
//! geometry straight into the backbuffer instead.
//!
//! The compositor never touches a graphics API directly; it drives a
//! [`RenderDevice`], which is implemented for wgpu and for the software
//! rasterizer used in tests and snapshots.

use std::ops::{Deref, DerefMut};

use glam::{UVec2, Vec2, Vec3, Vec4};
use glade_config::{Config, ScatterProfile};

use crate::camera::Camera;
use crate::error::CompositorError;
use crate::pass::{BlendMode, PassDescriptor};
use crate::scatter::ScatterParams;
use crate::target::{TargetId, TargetLayout};

/// Geometry the compositor can ask a device to draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SceneDraw {
    Sky,
    Sun,
    Terrain,
    TreeTrunks,
    TreeLeaves,
}

/// One step of the frame sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramePhase {
    Occlusion,
    Scatter,
    Color,
    Composite,
    BaseColor,
}

/// An operation a device must be prepared to execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlannedOp {
    Draw(SceneDraw, PassDescriptor),
    Fullscreen(BlendMode),
    Scatter,
}

/// Backend the compositor renders through.
///
/// Exactly one target is bound at a time; the backbuffer is bound whenever
/// nothing else is. Use [`BoundTarget`] rather than calling
/// [`bind_target`](Self::bind_target) directly so the backbuffer is always
/// restored.
pub trait RenderDevice {
    fn bind_target(&mut self, target: TargetId) -> Result<(), CompositorError>;

    /// Restore the backbuffer.
    fn unbind_target(&mut self);

    fn bound_target(&self) -> TargetId;

    /// Clear the bound target's color to `color` and its depth to the far plane.
    fn clear(&mut self, color: Vec4) -> Result<(), CompositorError>;

    fn draw(&mut self, draw: SceneDraw, pass: &PassDescriptor) -> Result<(), CompositorError>;

    /// Draw `source` over the whole bound target, multiplied by `tint`.
    fn draw_fullscreen(
        &mut self,
        source: TargetId,
        blend: BlendMode,
        tint: Vec4,
    ) -> Result<(), CompositorError>;

    /// Replace the bound target with the light-scatter filter of `source`.
    fn light_scatter(
        &mut self,
        source: TargetId,
        params: &ScatterParams,
    ) -> Result<(), CompositorError>;
}

/// Binds a target for its lifetime and restores the backbuffer on drop.
pub struct BoundTarget<'a, D: RenderDevice + ?Sized> {
    device: &'a mut D,
    target: TargetId,
}

impl<'a, D: RenderDevice + ?Sized> BoundTarget<'a, D> {
    pub fn bind(device: &'a mut D, target: TargetId) -> Result<Self, CompositorError> {
        device.bind_target(target)?;
        Ok(Self { device, target })
    }

    pub fn target(&self) -> TargetId {
        self.target
    }
}

impl<D: RenderDevice + ?Sized> Deref for BoundTarget<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<D: RenderDevice + ?Sized> DerefMut for BoundTarget<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
    }
}

impl<D: RenderDevice + ?Sized> Drop for BoundTarget<'_, D> {
    fn drop(&mut self) {
        self.device.unbind_target();
    }
}

/// Per-frame values derived from the camera and the sun.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInputs {
    /// Sun position in normalized screen space, y down.
    pub light_screen_pos: Vec2,
    /// God-ray strength; the full pipeline runs only when positive.
    pub intensity: f32,
}

impl FrameInputs {
    pub fn from_camera(camera: &Camera, sun_direction: Vec3, horizon_fade: f32) -> Self {
        let sun = sun_direction.normalize_or_zero();
        Self {
            light_screen_pos: camera.project_direction(sun).unwrap_or(Vec2::splat(0.5)),
            intensity: god_ray_intensity(camera.forward, sun, horizon_fade),
        }
    }
}

/// `clamp(dot(forward, sun), 0, 1) * clamp(sun.y / horizon_fade, 0, 1)`.
pub fn god_ray_intensity(forward: Vec3, sun_direction: Vec3, horizon_fade: f32) -> f32 {
    let facing = forward.dot(sun_direction).clamp(0.0, 1.0);
    let elevation = if horizon_fade > 0.0 {
        (sun_direction.y / horizon_fade).clamp(0.0, 1.0)
    } else if sun_direction.y > 0.0 {
        1.0
    } else {
        0.0
    };
    facing * elevation
}

/// Statistics of one rendered frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub passes: Vec<FramePhase>,
    /// Scene draws, full-screen quads and filter runs issued.
    pub draw_calls: u32,
    pub intensity: f32,
}

impl FrameReport {
    pub fn ran(&self, phase: FramePhase) -> bool {
        self.passes.contains(&phase)
    }
}

/// Scene-level constants for the compositor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositorSettings {
    /// Brightness of the occlusion mask used as the color pass backdrop.
    pub scene_exposure: f32,
    pub scatter: ScatterProfile,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            scene_exposure: 0.5,
            scatter: ScatterProfile::default(),
        }
    }
}

impl CompositorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scene_exposure: config.render.scene_exposure,
            scatter: config.scatter.resolve(),
        }
    }
}

const OCCLUSION_DRAWS: [(SceneDraw, PassDescriptor); 5] = [
    (SceneDraw::Sky, PassDescriptor::OCCLUSION_SKY),
    (SceneDraw::Sun, PassDescriptor::OCCLUSION_SUN),
    (SceneDraw::Terrain, PassDescriptor::OCCLUSION_OPAQUE),
    (SceneDraw::TreeTrunks, PassDescriptor::OCCLUSION_OPAQUE),
    (SceneDraw::TreeLeaves, PassDescriptor::OCCLUSION_LEAVES),
];

const COLOR_DRAWS: [(SceneDraw, PassDescriptor); 3] = [
    (SceneDraw::Terrain, PassDescriptor::COLOR_OPAQUE),
    (SceneDraw::TreeTrunks, PassDescriptor::COLOR_OPAQUE),
    (SceneDraw::TreeLeaves, PassDescriptor::COLOR_LEAVES),
];

const BASE_COLOR_DRAWS: [(SceneDraw, PassDescriptor); 4] = [
    (SceneDraw::Sky, PassDescriptor::COLOR_SKY),
    (SceneDraw::Terrain, PassDescriptor::COLOR_OPAQUE),
    (SceneDraw::TreeTrunks, PassDescriptor::COLOR_OPAQUE),
    (SceneDraw::TreeLeaves, PassDescriptor::COLOR_LEAVES),
];

/// Blend of the mask backdrop in the color pass.
const BACKDROP_BLEND: BlendMode = BlendMode::Opaque;

/// Blend of the scatter buffer over the backbuffer.
const COMPOSITE_BLEND: BlendMode = BlendMode::Additive;

/// Drives the per-frame pass sequence.
#[derive(Clone, Debug)]
pub struct SceneCompositor {
    settings: CompositorSettings,
    layout: TargetLayout,
}

impl SceneCompositor {
    pub fn new(settings: CompositorSettings, layout: TargetLayout) -> Result<Self, CompositorError> {
        if !settings.scene_exposure.is_finite() {
            return Err(CompositorError::MissingParameter("scene exposure"));
        }
        let p = settings.scatter;
        if ![p.density, p.weight, p.decay, p.exposure]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(CompositorError::MissingParameter("scatter profile"));
        }
        Ok(Self { settings, layout })
    }

    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    pub fn layout(&self) -> TargetLayout {
        self.layout
    }

    /// Adopt a new target layout. Call between frames, after the device's
    /// targets have been reallocated.
    pub fn set_layout(&mut self, layout: TargetLayout) {
        self.layout = layout;
    }

    /// Every operation [`render`](Self::render) can issue, without duplicates.
    pub fn pipeline_plan() -> Vec<PlannedOp> {
        let mut plan = Vec::new();
        let draws = OCCLUSION_DRAWS
            .iter()
            .chain(&COLOR_DRAWS)
            .chain(&BASE_COLOR_DRAWS)
            .map(|&(draw, pass)| PlannedOp::Draw(draw, pass));
        let others = [
            PlannedOp::Fullscreen(BACKDROP_BLEND),
            PlannedOp::Fullscreen(COMPOSITE_BLEND),
            PlannedOp::Scatter,
        ];
        for op in draws.chain(others) {
            if !plan.contains(&op) {
                plan.push(op);
            }
        }
        plan
    }

    /// Render one frame.
    ///
    /// Any error aborts the frame; the backbuffer is bound again on return
    /// either way.
    pub fn render<D: RenderDevice + ?Sized>(
        &self,
        device: &mut D,
        inputs: &FrameInputs,
    ) -> Result<FrameReport, CompositorError> {
        if !inputs.intensity.is_finite() {
            return Err(CompositorError::MissingParameter("god-ray intensity"));
        }
        if !inputs.light_screen_pos.is_finite() {
            return Err(CompositorError::MissingParameter("light position"));
        }

        let mut report = FrameReport {
            intensity: inputs.intensity,
            ..Default::default()
        };

        if inputs.intensity > 0.0 {
            self.occlusion_pass(device, &mut report)?;
            self.scatter_pass(device, inputs, &mut report)?;
            self.color_pass(device, &mut report)?;
            self.composite_pass(device, inputs, &mut report)?;
        } else {
            self.base_color_pass(device, &mut report)?;
        }
        Ok(report)
    }

    fn occlusion_pass<D: RenderDevice + ?Sized>(
        &self,
        device: &mut D,
        report: &mut FrameReport,
    ) -> Result<(), CompositorError> {
        let mut target = BoundTarget::bind(device, TargetId::Scene)?;
        target.clear(Vec4::new(0.0, 0.0, 0.0, 1.0))?;
        draw_all(&mut *target, TargetId::Scene, &OCCLUSION_DRAWS, report)?;
        report.passes.push(FramePhase::Occlusion);
        Ok(())
    }

    fn scatter_pass<D: RenderDevice + ?Sized>(
        &self,
        device: &mut D,
        inputs: &FrameInputs,
        report: &mut FrameReport,
    ) -> Result<(), CompositorError> {
        let (w, h) = self.layout.size_of(TargetId::Scatter);
        let params = ScatterParams::new(self.settings.scatter, inputs.light_screen_pos, UVec2::new(w, h));
        params.validate()?;

        let mut target = BoundTarget::bind(device, TargetId::Scatter)?;
        expect_bound(&*target, TargetId::Scatter)?;
        target.light_scatter(TargetId::Scene, &params)?;
        report.draw_calls += 1;
        report.passes.push(FramePhase::Scatter);
        Ok(())
    }

    fn color_pass<D: RenderDevice + ?Sized>(
        &self,
        device: &mut D,
        report: &mut FrameReport,
    ) -> Result<(), CompositorError> {
        let mut target = BoundTarget::bind(device, TargetId::Backbuffer)?;
        target.clear(Vec4::new(0.0, 0.0, 0.0, 1.0))?;
        expect_bound(&*target, TargetId::Backbuffer)?;

        let e = self.settings.scene_exposure;
        target.draw_fullscreen(TargetId::Scene, BACKDROP_BLEND, Vec4::new(e, e, e, 1.0))?;
        report.draw_calls += 1;

        draw_all(&mut *target, TargetId::Backbuffer, &COLOR_DRAWS, report)?;
        report.passes.push(FramePhase::Color);
        Ok(())
    }

    fn composite_pass<D: RenderDevice + ?Sized>(
        &self,
        device: &mut D,
        inputs: &FrameInputs,
        report: &mut FrameReport,
    ) -> Result<(), CompositorError> {
        expect_bound(device, TargetId::Backbuffer)?;
        let i = inputs.intensity;
        device.draw_fullscreen(TargetId::Scatter, COMPOSITE_BLEND, Vec4::new(i, i, i, 1.0))?;
        report.draw_calls += 1;
        report.passes.push(FramePhase::Composite);
        Ok(())
    }

    fn base_color_pass<D: RenderDevice + ?Sized>(
        &self,
        device: &mut D,
        report: &mut FrameReport,
    ) -> Result<(), CompositorError> {
        let mut target = BoundTarget::bind(device, TargetId::Backbuffer)?;
        target.clear(Vec4::new(0.0, 0.0, 0.0, 1.0))?;
        draw_all(&mut *target, TargetId::Backbuffer, &BASE_COLOR_DRAWS, report)?;
        report.passes.push(FramePhase::BaseColor);
        Ok(())
    }
}

fn expect_bound<D: RenderDevice + ?Sized>(
    device: &D,
    expected: TargetId,
) -> Result<(), CompositorError> {
    let actual = device.bound_target();
    if actual != expected {
        return Err(CompositorError::TargetNotBound { expected, actual });
    }
    Ok(())
}

fn draw_all<D: RenderDevice + ?Sized>(
    device: &mut D,
    expected: TargetId,
    draws: &[(SceneDraw, PassDescriptor)],
    report: &mut FrameReport,
) -> Result<(), CompositorError> {
    for (draw, pass) in draws {
        expect_bound(device, expected)?;
        device.draw(*draw, pass)?;
        report.draw_calls += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Bind(TargetId),
        Unbind,
        Clear(TargetId),
        Draw(TargetId, SceneDraw, PassDescriptor),
        Fullscreen(TargetId, TargetId, BlendMode, Vec4),
        Scatter(TargetId, TargetId, Vec2),
    }

    /// Records every call; optionally fails on a chosen draw or ignores binds.
    #[derive(Default)]
    struct Recorder {
        bound: Option<TargetId>,
        ops: Vec<Op>,
        fail_on: Option<SceneDraw>,
        ignore_binds: bool,
    }

    impl Recorder {
        fn bound(&self) -> TargetId {
            self.bound.unwrap_or(TargetId::Backbuffer)
        }
    }

    impl RenderDevice for Recorder {
        fn bind_target(&mut self, target: TargetId) -> Result<(), CompositorError> {
            self.ops.push(Op::Bind(target));
            if !self.ignore_binds {
                self.bound = Some(target);
            }
            Ok(())
        }

        fn unbind_target(&mut self) {
            self.ops.push(Op::Unbind);
            self.bound = None;
        }

        fn bound_target(&self) -> TargetId {
            self.bound()
        }

        fn clear(&mut self, _color: Vec4) -> Result<(), CompositorError> {
            self.ops.push(Op::Clear(self.bound()));
            Ok(())
        }

        fn draw(&mut self, draw: SceneDraw, pass: &PassDescriptor) -> Result<(), CompositorError> {
            if self.fail_on == Some(draw) {
                return Err(CompositorError::MissingPipeline { draw, pass: *pass });
            }
            self.ops.push(Op::Draw(self.bound(), draw, *pass));
            Ok(())
        }

        fn draw_fullscreen(
            &mut self,
            source: TargetId,
            blend: BlendMode,
            tint: Vec4,
        ) -> Result<(), CompositorError> {
            self.ops.push(Op::Fullscreen(self.bound(), source, blend, tint));
            Ok(())
        }

        fn light_scatter(
            &mut self,
            source: TargetId,
            params: &ScatterParams,
        ) -> Result<(), CompositorError> {
            self.ops.push(Op::Scatter(self.bound(), source, params.light_pos));
            Ok(())
        }
    }

    fn compositor() -> SceneCompositor {
        SceneCompositor::new(CompositorSettings::default(), TargetLayout::new(320, 240, 4)).unwrap()
    }

    fn facing_sun() -> FrameInputs {
        FrameInputs {
            light_screen_pos: Vec2::new(0.4, 0.3),
            intensity: 0.8,
        }
    }

    #[test]
    fn test_full_sequence_order() {
        let mut dev = Recorder::default();
        let report = compositor().render(&mut dev, &facing_sun()).unwrap();
        assert_eq!(
            report.passes,
            vec![
                FramePhase::Occlusion,
                FramePhase::Scatter,
                FramePhase::Color,
                FramePhase::Composite
            ]
        );

        use SceneDraw::*;
        use TargetId::*;
        let expected = vec![
            Op::Bind(Scene),
            Op::Clear(Scene),
            Op::Draw(Scene, Sky, PassDescriptor::OCCLUSION_SKY),
            Op::Draw(Scene, Sun, PassDescriptor::OCCLUSION_SUN),
            Op::Draw(Scene, Terrain, PassDescriptor::OCCLUSION_OPAQUE),
            Op::Draw(Scene, TreeTrunks, PassDescriptor::OCCLUSION_OPAQUE),
            Op::Draw(Scene, TreeLeaves, PassDescriptor::OCCLUSION_LEAVES),
            Op::Unbind,
            Op::Bind(TargetId::Scatter),
            Op::Scatter(TargetId::Scatter, Scene, Vec2::new(0.4, 0.3)),
            Op::Unbind,
            Op::Bind(Backbuffer),
            Op::Clear(Backbuffer),
            Op::Fullscreen(Backbuffer, Scene, BlendMode::Opaque, Vec4::new(0.5, 0.5, 0.5, 1.0)),
            Op::Draw(Backbuffer, Terrain, PassDescriptor::COLOR_OPAQUE),
            Op::Draw(Backbuffer, TreeTrunks, PassDescriptor::COLOR_OPAQUE),
            Op::Draw(Backbuffer, TreeLeaves, PassDescriptor::COLOR_LEAVES),
            Op::Unbind,
            Op::Fullscreen(
                Backbuffer,
                TargetId::Scatter,
                BlendMode::Additive,
                Vec4::new(0.8, 0.8, 0.8, 1.0)
            ),
        ];
        assert_eq!(dev.ops, expected);
        assert_eq!(report.draw_calls, 5 + 1 + 1 + 3 + 1);
    }

    #[test]
    fn test_facing_away_runs_base_pass_without_sun() {
        let mut dev = Recorder::default();
        let inputs = FrameInputs {
            light_screen_pos: Vec2::splat(0.5),
            intensity: 0.0,
        };
        let report = compositor().render(&mut dev, &inputs).unwrap();
        assert_eq!(report.passes, vec![FramePhase::BaseColor]);
        assert!(!dev.ops.iter().any(|op| matches!(op, Op::Draw(_, SceneDraw::Sun, _))));
        assert!(!dev.ops.iter().any(|op| matches!(op, Op::Scatter(..) | Op::Fullscreen(..))));
        assert!(dev.ops.iter().all(|op| !matches!(op, Op::Bind(TargetId::Scene))));
        assert_eq!(
            dev.ops.get(2),
            Some(&Op::Draw(TargetId::Backbuffer, SceneDraw::Sky, PassDescriptor::COLOR_SKY))
        );
    }

    #[test]
    fn test_trunks_before_leaves_in_every_pass() {
        for intensity in [0.0, 1.0] {
            let mut dev = Recorder::default();
            let inputs = FrameInputs {
                intensity,
                ..facing_sun()
            };
            compositor().render(&mut dev, &inputs).unwrap();
            let draws: Vec<_> = dev
                .ops
                .iter()
                .filter_map(|op| match op {
                    Op::Draw(t, d, _) => Some((*t, *d)),
                    _ => None,
                })
                .collect();
            for target in [TargetId::Scene, TargetId::Backbuffer] {
                let pos = |d| draws.iter().position(|&x| x == (target, d));
                if let (Some(t), Some(l)) = (pos(SceneDraw::TreeTrunks), pos(SceneDraw::TreeLeaves)) {
                    assert!(t < l);
                }
            }
        }
    }

    #[test]
    fn test_every_bind_is_paired_with_unbind() {
        let mut dev = Recorder::default();
        compositor().render(&mut dev, &facing_sun()).unwrap();
        let binds = dev.ops.iter().filter(|o| matches!(o, Op::Bind(_))).count();
        let unbinds = dev.ops.iter().filter(|o| matches!(o, Op::Unbind)).count();
        assert_eq!(binds, unbinds);
        assert_eq!(dev.bound_target(), TargetId::Backbuffer);
    }

    #[test]
    fn test_error_mid_pass_still_restores_backbuffer() {
        let mut dev = Recorder {
            fail_on: Some(SceneDraw::Terrain),
            ..Default::default()
        };
        let err = compositor().render(&mut dev, &facing_sun()).unwrap_err();
        assert!(matches!(err, CompositorError::MissingPipeline { draw: SceneDraw::Terrain, .. }));
        assert_eq!(dev.ops.last(), Some(&Op::Unbind));
        assert_eq!(dev.bound_target(), TargetId::Backbuffer);
    }

    #[test]
    fn test_unbound_target_is_reported() {
        let mut dev = Recorder {
            ignore_binds: true,
            ..Default::default()
        };
        let err = compositor().render(&mut dev, &facing_sun()).unwrap_err();
        assert!(matches!(
            err,
            CompositorError::TargetNotBound {
                expected: TargetId::Scene,
                actual: TargetId::Backbuffer
            }
        ));
    }

    #[test]
    fn test_non_finite_inputs_rejected() {
        let mut dev = Recorder::default();
        let bad = FrameInputs {
            light_screen_pos: Vec2::new(f32::NAN, 0.0),
            intensity: 1.0,
        };
        assert!(matches!(
            compositor().render(&mut dev, &bad),
            Err(CompositorError::MissingParameter(_))
        ));
        assert!(dev.ops.is_empty());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = CompositorSettings {
            scene_exposure: f32::NAN,
            ..Default::default()
        };
        assert!(SceneCompositor::new(settings, TargetLayout::new(1, 1, 1)).is_err());
    }

    #[test]
    fn test_scatter_viewport_is_reduced_target() {
        struct Viewport(Option<UVec2>, TargetId);
        impl RenderDevice for Viewport {
            fn bind_target(&mut self, t: TargetId) -> Result<(), CompositorError> {
                self.1 = t;
                Ok(())
            }
            fn unbind_target(&mut self) {
                self.1 = TargetId::Backbuffer;
            }
            fn bound_target(&self) -> TargetId {
                self.1
            }
            fn clear(&mut self, _: Vec4) -> Result<(), CompositorError> {
                Ok(())
            }
            fn draw(&mut self, _: SceneDraw, _: &PassDescriptor) -> Result<(), CompositorError> {
                Ok(())
            }
            fn draw_fullscreen(&mut self, _: TargetId, _: BlendMode, _: Vec4) -> Result<(), CompositorError> {
                Ok(())
            }
            fn light_scatter(&mut self, _: TargetId, p: &ScatterParams) -> Result<(), CompositorError> {
                self.0 = Some(p.viewport);
                Ok(())
            }
        }
        let mut dev = Viewport(None, TargetId::Backbuffer);
        compositor().render(&mut dev, &facing_sun()).unwrap();
        assert_eq!(dev.0, Some(UVec2::new(80, 60)));
    }

    #[test]
    fn test_pipeline_plan_covers_all_states() {
        let plan = SceneCompositor::pipeline_plan();
        let draws: Vec<_> = plan
            .iter()
            .filter(|op| matches!(op, PlannedOp::Draw(..)))
            .collect();
        // Sky shared between occlusion and base color.
        assert_eq!(draws.len(), 5 + 3);
        assert!(plan.contains(&PlannedOp::Draw(SceneDraw::TreeLeaves, PassDescriptor::OCCLUSION_LEAVES)));
        assert!(plan.contains(&PlannedOp::Draw(SceneDraw::TreeLeaves, PassDescriptor::COLOR_LEAVES)));
        assert!(plan.contains(&PlannedOp::Fullscreen(BlendMode::Opaque)));
        assert!(plan.contains(&PlannedOp::Fullscreen(BlendMode::Additive)));
        assert!(plan.contains(&PlannedOp::Scatter));
    }

    #[test]
    fn test_god_ray_intensity() {
        let sun = Vec3::new(0.0, 0.5, -1.0).normalize();
        let toward = god_ray_intensity(sun, sun, 0.1);
        assert!((toward - 1.0).abs() < 1e-6);
        assert_eq!(god_ray_intensity(-sun, sun, 0.1), 0.0);
        let low_sun = Vec3::new(0.0, 0.05, -1.0).normalize();
        let dimmed = god_ray_intensity(low_sun, low_sun, 0.1);
        assert!(dimmed > 0.0 && dimmed < 0.6);
        let set = Vec3::new(0.0, -0.2, -1.0).normalize();
        assert_eq!(god_ray_intensity(set, set, 0.1), 0.0);
        assert_eq!(god_ray_intensity(sun, sun, 0.0), 1.0);
    }

    #[test]
    fn test_inputs_from_camera_looking_at_sun() {
        let sun = Vec3::new(0.2, 0.4, -1.0).normalize();
        let camera = Camera {
            forward: sun,
            ..Camera::default()
        };
        let inputs = FrameInputs::from_camera(&camera, sun, 0.1);
        assert!((inputs.light_screen_pos - Vec2::splat(0.5)).length() < 1e-4);
        assert!(inputs.intensity > 0.99);

        let away = Camera {
            forward: -sun,
            ..Camera::default()
        };
        assert_eq!(FrameInputs::from_camera(&away, sun, 0.1).intensity, 0.0);
    }
}
