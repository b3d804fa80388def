//! CPU render device.
//!
//! Rasterizes a flat, screen-space stand-in for each [`SceneDraw`] with the
//! same blend, depth and alpha-test rules the GPU pipelines use. Used by the
//! headless snapshot and by the compositor's end-to-end tests.

use std::collections::HashMap;

use glam::{Vec2, Vec4};

use crate::compositor::{RenderDevice, SceneDraw};
use crate::error::CompositorError;
use crate::image::Image;
use crate::pass::{BlendMode, DEPTH_CLEAR_VALUE, PassDescriptor};
use crate::scatter::{ScatterParams, apply_cpu};
use crate::target::{TargetId, TargetLayout};

/// Screen-space footprint of a sprite, in normalized coordinates (y down).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Rect { min: Vec2, max: Vec2 },
    Disk { center: Vec2, radius: f32 },
    /// Soft radial falloff reaching zero at `radius`.
    Glow { center: Vec2, radius: f32 },
}

impl Shape {
    /// Coverage in 0..=1 at `uv`, with aspect-corrected distances.
    fn coverage(&self, uv: Vec2, aspect: f32) -> f32 {
        let scaled = |v: Vec2| Vec2::new(v.x * aspect, v.y);
        match *self {
            Shape::Rect { min, max } => {
                if uv.cmpge(min).all() && uv.cmplt(max).all() {
                    1.0
                } else {
                    0.0
                }
            }
            Shape::Disk { center, radius } => {
                if scaled(uv - center).length() <= radius {
                    1.0
                } else {
                    0.0
                }
            }
            Shape::Glow { center, radius } => {
                let d = scaled(uv - center).length() / radius.max(f32::EPSILON);
                let f = (1.0 - d).max(0.0);
                f * f
            }
        }
    }
}

/// One flat primitive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite {
    pub shape: Shape,
    /// Straight (non-premultiplied) RGBA.
    pub color: Vec4,
    /// Reverse-Z depth: larger is nearer.
    pub depth: f32,
}

/// Geometry for every [`SceneDraw`].
#[derive(Clone, Debug, PartialEq)]
pub struct SoftScene {
    pub sky_top: Vec4,
    pub sky_bottom: Vec4,
    pub sun: Option<Sprite>,
    pub terrain: Vec<Sprite>,
    pub trunks: Vec<Sprite>,
    pub leaves: Vec<Sprite>,
}

impl Default for SoftScene {
    fn default() -> Self {
        Self {
            sky_top: Vec4::new(0.26, 0.45, 0.78, 1.0),
            sky_bottom: Vec4::new(0.70, 0.78, 0.86, 1.0),
            sun: None,
            terrain: Vec::new(),
            trunks: Vec::new(),
            leaves: Vec::new(),
        }
    }
}

impl SoftScene {
    fn sprites(&self, draw: SceneDraw) -> &[Sprite] {
        match draw {
            SceneDraw::Sky => &[],
            SceneDraw::Sun => self.sun.as_slice(),
            SceneDraw::Terrain => &self.terrain,
            SceneDraw::TreeTrunks => &self.trunks,
            SceneDraw::TreeLeaves => &self.leaves,
        }
    }
}

/// Everything a [`SoftwareDevice`] was asked to do, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceOp {
    Bind(TargetId),
    Unbind,
    Clear(TargetId),
    Draw {
        target: TargetId,
        draw: SceneDraw,
        pass: PassDescriptor,
    },
    Fullscreen {
        target: TargetId,
        source: TargetId,
        blend: BlendMode,
    },
    Scatter {
        target: TargetId,
        source: TargetId,
    },
}

struct SoftTarget {
    color: Image,
    depth: Vec<f32>,
}

impl SoftTarget {
    fn new((width, height): (u32, u32)) -> Self {
        let color = Image::new(width, height, Vec4::ZERO);
        let depth = vec![DEPTH_CLEAR_VALUE; color.pixels().len()];
        Self { color, depth }
    }
}

/// Renders into CPU images.
pub struct SoftwareDevice {
    scene: SoftScene,
    layout: TargetLayout,
    /// `None` once released.
    targets: Option<HashMap<TargetId, SoftTarget>>,
    bound: TargetId,
    ops: Vec<DeviceOp>,
}

impl SoftwareDevice {
    pub fn new(scene: SoftScene, layout: TargetLayout) -> Self {
        Self {
            scene,
            layout,
            targets: Some(allocate(layout)),
            bound: TargetId::Backbuffer,
            ops: Vec::new(),
        }
    }

    pub fn layout(&self) -> TargetLayout {
        self.layout
    }

    pub fn scene_mut(&mut self) -> &mut SoftScene {
        &mut self.scene
    }

    /// Color contents of a target, or `None` after release.
    pub fn image(&self, target: TargetId) -> Option<&Image> {
        self.targets.as_ref()?.get(&target).map(|t| &t.color)
    }

    pub fn ops(&self) -> &[DeviceOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Free every target. Later rendering fails with `TargetsReleased`.
    pub fn release(&mut self) {
        self.targets = None;
        self.bound = TargetId::Backbuffer;
    }

    /// Reallocate targets for a new backbuffer size. Between frames only.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), CompositorError> {
        if self.targets.is_none() {
            return Err(CompositorError::TargetsReleased);
        }
        if let Some(layout) = self.layout.resized(width, height) {
            self.layout = layout;
            self.targets = Some(allocate(layout));
        }
        Ok(())
    }

    fn targets_mut(&mut self) -> Result<&mut HashMap<TargetId, SoftTarget>, CompositorError> {
        self.targets.as_mut().ok_or(CompositorError::TargetsReleased)
    }

    fn bound_mut(&mut self) -> Result<&mut SoftTarget, CompositorError> {
        let bound = self.bound;
        self.targets_mut()?
            .get_mut(&bound)
            .ok_or(CompositorError::TargetsReleased)
    }
}

fn allocate(layout: TargetLayout) -> HashMap<TargetId, SoftTarget> {
    TargetId::ALL
        .into_iter()
        .map(|id| (id, SoftTarget::new(layout.size_of(id))))
        .collect()
}

/// Blend one fragment into `dst`.
fn blend(mode: BlendMode, src: Vec4, dst: Vec4) -> Vec4 {
    let a = src.w;
    let rgb = Vec4::new(
        mode.blend_channel(src.x, a, dst.x),
        mode.blend_channel(src.y, a, dst.y),
        mode.blend_channel(src.z, a, dst.z),
        0.0,
    );
    let alpha = match mode {
        BlendMode::Opaque => a,
        _ => a + dst.w * (1.0 - a),
    };
    rgb.truncate().extend(alpha)
}

impl RenderDevice for SoftwareDevice {
    fn bind_target(&mut self, target: TargetId) -> Result<(), CompositorError> {
        self.targets_mut()?;
        self.bound = target;
        self.ops.push(DeviceOp::Bind(target));
        Ok(())
    }

    fn unbind_target(&mut self) {
        self.bound = TargetId::Backbuffer;
        self.ops.push(DeviceOp::Unbind);
    }

    fn bound_target(&self) -> TargetId {
        self.bound
    }

    fn clear(&mut self, color: Vec4) -> Result<(), CompositorError> {
        let bound = self.bound;
        let target = self.bound_mut()?;
        target.color.fill(color);
        target.depth.fill(DEPTH_CLEAR_VALUE);
        self.ops.push(DeviceOp::Clear(bound));
        Ok(())
    }

    fn draw(&mut self, draw: SceneDraw, pass: &PassDescriptor) -> Result<(), CompositorError> {
        let bound = self.bound;
        if !bound.has_depth() && (pass.depth_test || pass.depth_write) {
            return Err(CompositorError::Device(format!(
                "{draw:?} needs depth but {bound:?} has no depth attachment"
            )));
        }
        let sky = (self.scene.sky_top, self.scene.sky_bottom);
        let sprites = self.scene.sprites(draw).to_vec();
        let target = self.bound_mut()?;
        let (w, h) = (target.color.width(), target.color.height());
        let aspect = w as f32 / h as f32;

        for y in 0..h {
            for x in 0..w {
                let uv = target.color.uv_of(x, y);
                let index = (y * w + x) as usize;
                if draw == SceneDraw::Sky {
                    let src = sky.0.lerp(sky.1, uv.y);
                    let dst = target.color.get(x, y);
                    target.color.set(x, y, blend(pass.blend, src, dst));
                    continue;
                }
                for sprite in &sprites {
                    let coverage = sprite.shape.coverage(uv, aspect);
                    if coverage <= 0.0 {
                        continue;
                    }
                    let alpha = sprite.color.w * coverage;
                    if !pass.passes_alpha(alpha) {
                        continue;
                    }
                    if pass.depth_test && sprite.depth < target.depth[index] {
                        continue;
                    }
                    // Additive sprites are emissive; their falloff scales the color.
                    let rgb = if pass.blend == BlendMode::Additive {
                        sprite.color.truncate() * alpha
                    } else {
                        sprite.color.truncate()
                    };
                    let src = rgb.extend(alpha);
                    let dst = target.color.get(x, y);
                    target.color.set(x, y, blend(pass.blend, src, dst));
                    if pass.depth_write {
                        target.depth[index] = sprite.depth;
                    }
                }
            }
        }

        self.ops.push(DeviceOp::Draw {
            target: bound,
            draw,
            pass: *pass,
        });
        Ok(())
    }

    fn draw_fullscreen(
        &mut self,
        source: TargetId,
        blend_mode: BlendMode,
        tint: Vec4,
    ) -> Result<(), CompositorError> {
        let bound = self.bound;
        if source == bound {
            return Err(CompositorError::SourceIsBound(source));
        }
        let source_image = self
            .targets_mut()?
            .get(&source)
            .map(|t| t.color.clone())
            .ok_or(CompositorError::TargetsReleased)?;
        let target = self.bound_mut()?;
        for y in 0..target.color.height() {
            for x in 0..target.color.width() {
                let s = source_image.sample(target.color.uv_of(x, y));
                let src = (s.truncate() * tint.truncate()).extend(tint.w);
                let dst = target.color.get(x, y);
                target.color.set(x, y, blend(blend_mode, src, dst));
            }
        }
        self.ops.push(DeviceOp::Fullscreen {
            target: bound,
            source,
            blend: blend_mode,
        });
        Ok(())
    }

    fn light_scatter(
        &mut self,
        source: TargetId,
        params: &ScatterParams,
    ) -> Result<(), CompositorError> {
        let bound = self.bound;
        if source == bound {
            return Err(CompositorError::SourceIsBound(source));
        }
        params.validate()?;
        let filtered = {
            let targets = self.targets_mut()?;
            let src = targets.get(&source).ok_or(CompositorError::TargetsReleased)?;
            let dst = targets.get(&bound).ok_or(CompositorError::TargetsReleased)?;
            apply_cpu(&src.color, dst.color.width(), dst.color.height(), params)
        };
        self.bound_mut()?.color = filtered;
        self.ops.push(DeviceOp::Scatter {
            target: bound,
            source,
        });
        Ok(())
    }
}
