use glade_config::ConfigError;
use glade_render::{CompositorError, SnapshotError};

use crate::renderer::RendererError;
use crate::scene::SceneError;

/// Anything that stops the application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("renderer: {0}")]
    Renderer(#[from] RendererError),

    #[error("compositor: {0}")]
    Compositor(#[from] CompositorError),

    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}
