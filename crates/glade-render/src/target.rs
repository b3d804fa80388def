//! Offscreen render targets.
//!
//! The compositor renders through three color targets: the backbuffer, a
//! full-resolution scene buffer holding the occlusion mask, and a reduced
//! scattering buffer. The scene and scatter buffers are allocated at load,
//! reallocated only between frames, and released at unload.

use crate::fullscreen::create_texture_bind_group;
use crate::pass::{DEPTH_CLEAR_VALUE, DEPTH_COMPARE, DEPTH_FORMAT};

/// Names one of the compositor's color targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetId {
    Backbuffer,
    /// Full resolution; receives the occlusion mask.
    Scene,
    /// Backbuffer size divided by the scatter divisor.
    Scatter,
}

impl TargetId {
    pub const ALL: [TargetId; 3] = [TargetId::Backbuffer, TargetId::Scene, TargetId::Scatter];

    /// Whether draws into this target carry a depth attachment.
    pub fn has_depth(self) -> bool {
        !matches!(self, TargetId::Scatter)
    }
}

/// Pixel dimensions of every target, derived from the backbuffer size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetLayout {
    width: u32,
    height: u32,
    divisor: u32,
}

impl TargetLayout {
    /// Zero sizes are clamped to one pixel, a zero divisor to one.
    pub fn new(width: u32, height: u32, divisor: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            divisor: divisor.max(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    pub fn size_of(&self, target: TargetId) -> (u32, u32) {
        match target {
            TargetId::Backbuffer | TargetId::Scene => (self.width, self.height),
            TargetId::Scatter => (
                (self.width / self.divisor).max(1),
                (self.height / self.divisor).max(1),
            ),
        }
    }

    /// Returns the resized layout, or `None` if nothing changed.
    pub fn resized(&self, width: u32, height: u32) -> Option<Self> {
        let next = Self::new(width, height, self.divisor);
        (next != *self).then_some(next)
    }
}

/// Reverse-Z depth buffer shared by the scene and backbuffer passes.
pub struct DepthBuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = DEPTH_FORMAT;
    pub const CLEAR_VALUE: f32 = DEPTH_CLEAR_VALUE;
    pub const COMPARE_FUNCTION: wgpu::CompareFunction = DEPTH_COMPARE;

    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-buffer"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// An offscreen color target that can also be sampled.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Texture + sampler bind group for reading this target.
    pub bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn new(
        device: &wgpu::Device,
        texture_bgl: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        format: wgpu::TextureFormat,
        (width, height): (u32, u32),
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = create_texture_bind_group(device, texture_bgl, &view, sampler, label);
        Self {
            texture,
            view,
            bind_group,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// The scene and scatter buffers plus the shared depth buffer.
pub struct RenderTargets {
    layout: TargetLayout,
    format: wgpu::TextureFormat,
    pub scene: RenderTarget,
    pub scatter: RenderTarget,
    pub depth: DepthBuffer,
}

impl RenderTargets {
    pub fn new(
        device: &wgpu::Device,
        texture_bgl: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        format: wgpu::TextureFormat,
        layout: TargetLayout,
    ) -> Self {
        let scene = RenderTarget::new(
            device,
            texture_bgl,
            sampler,
            format,
            layout.size_of(TargetId::Scene),
            "scene-target",
        );
        let scatter = RenderTarget::new(
            device,
            texture_bgl,
            sampler,
            format,
            layout.size_of(TargetId::Scatter),
            "scatter-target",
        );
        let depth = DepthBuffer::new(device, layout.width(), layout.height());
        log::debug!(
            "Allocated render targets: scene {}x{}, scatter {}x{}",
            scene.width(),
            scene.height(),
            scatter.width(),
            scatter.height()
        );
        Self {
            layout,
            format,
            scene,
            scatter,
            depth,
        }
    }

    pub fn layout(&self) -> TargetLayout {
        self.layout
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Reallocate for a new backbuffer size. Must not be called mid-frame.
    /// Returns whether anything was reallocated.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        texture_bgl: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> bool {
        let Some(layout) = self.layout.resized(width, height) else {
            return false;
        };
        *self = Self::new(device, texture_bgl, sampler, self.format, layout);
        true
    }
}
