//! Multi-pass scene compositor with screen-space light scattering.
//!
//! [`SceneCompositor`] drives occlusion, scatter, color and composite passes
//! through a [`RenderDevice`]. [`GpuScene`] implements the device on wgpu;
//! [`SoftwareDevice`] rasterizes on the CPU for tests and headless snapshots.

pub mod buffer;
pub mod camera;
pub mod compositor;
mod error;
pub mod fullscreen;
pub mod gpu;
pub mod gpu_device;
pub mod image;
pub mod pass;
pub mod scatter;
pub mod shaders;
pub mod soft;
pub mod target;
pub mod vertex_format;


pub use buffer::{BufferAllocator, MeshBuffer};
pub use camera::{Camera, FrameUniform, SceneLighting};
pub use compositor::{
    BoundTarget, CompositorSettings, FrameInputs, FramePhase, FrameReport, PlannedOp,
    RenderDevice, SceneCompositor, SceneDraw, god_ray_intensity,
};
pub use error::CompositorError;
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use gpu_device::{GpuFrame, GpuScene};
pub use image::{Image, SnapshotError};
pub use pass::{BlendMode, CullMode, PassDescriptor};
pub use scatter::{LightScatterFilter, SCATTER_SAMPLES, ScatterParams, apply_cpu};
pub use soft::{DeviceOp, Shape, SoftScene, SoftwareDevice, Sprite};
pub use target::{RenderTargets, TargetId, TargetLayout};
