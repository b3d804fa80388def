//! Window renderer: the wgpu context, the scene's GPU resources and the
//! compositor, driven once per redraw.

use std::sync::Arc;

use glade_config::Config;
use glade_foliage::Forest;
use glade_render::{
    CompositorError, CompositorSettings, FrameReport, GpuScene, RenderContext, RenderContextError,
    SceneCompositor, SurfaceError, TargetId, TargetLayout, init_render_context_blocking,
};
use tracing::{debug, info, instrument, warn};
use winit::window::Window;

use crate::frame::FrameContext;
use crate::scene::Scene;

#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error(transparent)]
    Context(#[from] RenderContextError),

    #[error(transparent)]
    Compositor(#[from] CompositorError),

    #[error("surface: {0}")]
    Surface(#[from] SurfaceError),
}

pub struct Renderer {
    ctx: RenderContext,
    gpu: GpuScene,
    compositor: SceneCompositor,
    /// Applied at the start of the next frame, never mid-frame.
    pending_resize: Option<(u32, u32)>,
    frame_stats: bool,
}

impl Renderer {
    #[instrument(skip_all)]
    pub fn new(window: Arc<Window>, config: &Config, scene: &Scene) -> Result<Self, RendererError> {
        let ctx = init_render_context_blocking(window, config.window.vsync)?;
        let (width, height) = ctx.size();
        let layout = TargetLayout::new(width, height, config.render.scatter_divisor);
        let gpu = GpuScene::new(
            &ctx.device,
            ctx.surface_format,
            layout,
            &scene.mesh,
            &scene.forest,
        );
        let compositor = SceneCompositor::new(CompositorSettings::from_config(config), layout)?;
        info!(
            "Renderer ready: {}x{}, scatter buffer {:?}",
            width,
            height,
            layout.size_of(TargetId::Scatter)
        );
        Ok(Self {
            ctx,
            gpu,
            compositor,
            pending_resize: None,
            frame_stats: config.debug.frame_stats,
        })
    }

    pub fn request_resize(&mut self, width: u32, height: u32) {
        self.pending_resize = Some((width, height));
    }

    /// Render and present one frame.
    ///
    /// Returns `Ok(None)` when the surface was unavailable and the frame was
    /// skipped.
    pub fn render(
        &mut self,
        frame: &FrameContext,
        forest: &Forest,
    ) -> Result<Option<FrameReport>, RendererError> {
        self.apply_pending_resize()?;
        self.gpu
            .update(&self.ctx.device, &self.ctx.queue, &frame.uniform, forest);

        let output = match self.ctx.get_current_texture() {
            Ok(output) => output,
            Err(SurfaceError::Timeout) => {
                warn!("Surface timeout, skipping frame");
                return Ok(None);
            }
            Err(SurfaceError::Lost) => {
                let (w, h) = self.ctx.size();
                self.ctx.resize(w, h);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glade-frame"),
            });

        let report = {
            let mut device = self.gpu.frame(&self.ctx.queue, &mut encoder, &view);
            self.compositor.render(&mut device, &frame.inputs)?
        };
        self.ctx.queue.submit(Some(encoder.finish()));
        output.present();

        if self.frame_stats {
            debug!(
                "Frame: passes {:?}, {} draw calls, intensity {:.3}",
                report.passes, report.draw_calls, report.intensity
            );
        }
        Ok(Some(report))
    }

    /// Free the render targets. Frames after this fail.
    pub fn release(&mut self) {
        self.gpu.release();
    }

    fn apply_pending_resize(&mut self) -> Result<(), RendererError> {
        let Some((width, height)) = self.pending_resize.take() else {
            return Ok(());
        };
        self.ctx.resize(width, height);
        let (width, height) = self.ctx.size();
        if self.gpu.resize(&self.ctx.device, width, height)?
            && let Some(layout) = self.gpu.layout()
        {
            self.compositor.set_layout(layout);
            info!("Render targets resized to {width}x{height}");
        }
        Ok(())
    }
}
