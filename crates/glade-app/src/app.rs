//! Windowed application: winit event handling around the per-frame
//! update and draw.

use std::sync::Arc;

use glade_config::Config;
use glade_render::Camera;
use tracing::{error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{CursorGrabMode, Window, WindowAttributes, WindowId};

use crate::camera_controller::FreeFlyController;
use crate::clock::FrameClock;
use crate::error::AppError;
use crate::frame::FrameContext;
use crate::gamepad::GamepadPoller;
use crate::input::InputState;
use crate::renderer::Renderer;
use crate::scene::Scene;

pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::PhysicalSize::new(
            config.window.width,
            config.window.height,
        ))
}

pub struct App {
    config: Config,
    scene: Scene,
    camera: Camera,
    controller: FreeFlyController,
    input: InputState,
    gamepads: GamepadPoller,
    clock: FrameClock,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    error: Option<AppError>,
}

impl App {
    pub fn new(config: Config, scene: Scene) -> Self {
        let aspect = config.window.width.max(1) as f32 / config.window.height.max(1) as f32;
        let camera = scene.initial_camera(&config, aspect);
        Self {
            controller: FreeFlyController::from_config(&config.camera),
            clock: FrameClock::new(config.wind.max_time_step),
            input: InputState::new(),
            gamepads: GamepadPoller::disabled(),
            camera,
            scene,
            config,
            window: None,
            renderer: None,
            error: None,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Move the camera, advance the wind and derive this frame's context.
    pub fn update(&mut self, dt: f32) -> FrameContext {
        let intent = self.input.intent();
        self.controller.update(&mut self.camera, &intent, dt);
        let elapsed = self.scene.update(dt);
        FrameContext::new(
            &self.camera,
            &self.scene.lighting,
            self.config.render.horizon_fade,
            elapsed,
        )
    }

    /// The error that ended the event loop, if any.
    pub fn take_error(&mut self) -> Option<AppError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn set_captured(&mut self, captured: bool) {
        let Some(window) = &self.window else {
            return;
        };
        if captured {
            if window.set_cursor_grab(CursorGrabMode::Locked).is_err()
                && let Err(e) = window.set_cursor_grab(CursorGrabMode::Confined)
            {
                warn!("Cursor grab unavailable: {e}");
            }
            window.set_cursor_visible(false);
        } else {
            let _ = window.set_cursor_grab(CursorGrabMode::None);
            window.set_cursor_visible(true);
        }
        self.input.set_captured(captured);
    }

    /// Open gilrs. Called when the window appears so headless tests never
    /// touch the platform backend.
    fn enable_gamepads(&mut self) {
        if !self.gamepads.is_enabled() {
            self.gamepads = GamepadPoller::new();
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.gamepads.poll(&mut self.input);
        if self.input.quit_requested() {
            info!("Quit requested");
            event_loop.exit();
            return;
        }
        let dt = self.clock.tick();
        let frame = self.update(dt);
        self.input.clear_transients();

        let Some(renderer) = &mut self.renderer else {
            return;
        };
        if let Err(e) = renderer.render(&frame, &self.scene.forest) {
            self.fail(event_loop, e.into());
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window = match event_loop.create_window(window_attributes_from_config(&self.config)) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, e.into());
                return;
            }
        };
        let size = window.inner_size();
        self.camera
            .set_aspect_ratio(size.width as f32, size.height as f32);

        match Renderer::new(window.clone(), &self.config, &self.scene) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => {
                self.fail(event_loop, e.into());
                return;
            }
        }
        self.window = Some(window);
        self.enable_gamepads();
        self.set_captured(true);
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.camera
                    .set_aspect_ratio(size.width as f32, size.height as f32);
                if let Some(renderer) = &mut self.renderer {
                    renderer.request_resize(size.width, size.height);
                }
            }
            WindowEvent::Focused(focused) => {
                if !focused {
                    self.input.reset();
                }
                self.set_captured(focused);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.input.process_event(&event);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.on_raw_motion(delta.0, delta.1);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &mut self.renderer {
            renderer.release();
        }
    }
}

/// Open the window and run until it closes.
#[instrument(skip_all)]
pub fn run(config: Config, scene: Scene) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, scene);
    event_loop.run_app(&mut app)?;
    match app.take_error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use winit::event::ElementState;
    use winit::keyboard::{KeyCode, PhysicalKey};

    use super::*;
    use crate::input::RawKeyEvent;

    fn small_app() -> App {
        let mut config = Config::default();
        config.scene.heightmap_size = 16;
        config.scene.tree_count = 8;
        config.scene.tree_variants = 2;
        let scene = Scene::build(&config).unwrap();
        App::new(config, scene)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.input_mut().process_raw(RawKeyEvent {
            key: PhysicalKey::Code(code),
            state: ElementState::Pressed,
            repeat: false,
        });
    }

    #[test]
    fn test_initial_camera_sees_god_rays() {
        let mut app = small_app();
        let frame = app.update(0.0);
        assert!(frame.has_god_rays());
    }

    #[test]
    fn test_w_moves_camera_forward() {
        let mut app = small_app();
        let start = app.camera().position;
        let forward = app.camera().forward;
        press(&mut app, KeyCode::KeyW);
        app.update(0.1);
        let moved = app.camera().position - start;
        assert!(moved.dot(forward) > 0.0);
    }

    #[test]
    fn test_turning_around_disables_god_rays() {
        let mut app = small_app();
        app.input_mut().set_captured(true);
        // Half a turn at the default sensitivity.
        let pixels = std::f32::consts::PI / app.controller.mouse_sensitivity;
        app.input_mut().on_raw_motion(f64::from(pixels), 0.0);
        let frame = app.update(0.0);
        assert!(!frame.has_god_rays());
    }

    #[test]
    fn test_update_advances_wind_time() {
        let mut app = small_app();
        let a = app.update(0.05).elapsed;
        let b = app.update(0.05).elapsed;
        assert!(b > a);
    }

    #[test]
    fn test_gamepad_back_requests_quit() {
        let mut app = small_app();
        app.input_mut()
            .on_pad_button(crate::gamepad::PadButton::Select, ElementState::Pressed);
        assert!(app.input.quit_requested());
    }

    #[test]
    fn test_take_error_is_empty_without_failure() {
        let mut app = small_app();
        assert!(app.take_error().is_none());
    }
}
