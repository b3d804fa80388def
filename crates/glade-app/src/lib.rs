//! Application layer for Glade: window, input, free-fly camera, and the
//! per-frame update that feeds the compositor.

pub mod app;
pub mod camera_controller;
pub mod clock;
mod error;
pub mod frame;
pub mod gamepad;
pub mod input;
pub mod renderer;
pub mod scene;
pub mod snapshot;

pub use app::{App, run};
pub use camera_controller::FreeFlyController;
pub use clock::FrameClock;
pub use error::AppError;
pub use frame::FrameContext;
pub use gamepad::{GamepadPoller, PadButton};
pub use input::{InputState, MoveIntent};
pub use renderer::{Renderer, RendererError};
pub use scene::{Scene, SceneError};
