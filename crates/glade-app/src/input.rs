//! Frame-coherent keyboard, mouse and gamepad button state.
//!
//! Physical key codes are used so WASD sits in the same place on every
//! layout. Mouse look uses raw device motion, which keeps working while the
//! cursor is grabbed.

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::gamepad::PadButton;

/// Minimal description of a key event.
#[derive(Debug, Clone, Copy)]
pub struct RawKeyEvent {
    pub key: PhysicalKey,
    pub state: ElementState,
    pub repeat: bool,
}

/// Movement requested this frame, each axis in -1..=1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveIntent {
    /// +1 along the view direction.
    pub forward: f32,
    /// +1 to the right.
    pub strafe: f32,
    /// Accumulated mouse motion in pixels, y down.
    pub look: Vec2,
}

/// Keys held, keys pressed this frame, and accumulated mouse motion.
///
/// Forward events as they arrive, read [`intent`](Self::intent) once per
/// frame, then call [`clear_transients`](Self::clear_transients).
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pressed: HashSet<PhysicalKey>,
    just_pressed: HashSet<PhysicalKey>,
    mouse_delta: Vec2,
    captured: bool,
    pad_pressed: HashSet<PadButton>,
    pad_just_pressed: HashSet<PadButton>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_event(&mut self, event: &KeyEvent) {
        self.process_raw(RawKeyEvent {
            key: event.physical_key,
            state: event.state,
            repeat: event.repeat,
        });
    }

    /// Repeat events are ignored.
    pub fn process_raw(&mut self, event: RawKeyEvent) {
        if event.repeat {
            return;
        }
        match event.state {
            ElementState::Pressed => {
                self.pressed.insert(event.key);
                self.just_pressed.insert(event.key);
            }
            ElementState::Released => {
                self.pressed.remove(&event.key);
            }
        }
    }

    pub fn on_pad_button(&mut self, button: PadButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.pad_pressed.insert(button) {
                    self.pad_just_pressed.insert(button);
                }
            }
            ElementState::Released => {
                self.pad_pressed.remove(&button);
            }
        }
    }

    /// Raw `DeviceEvent::MouseMotion`. Ignored unless the cursor is captured.
    pub fn on_raw_motion(&mut self, dx: f64, dy: f64) {
        if self.captured {
            self.mouse_delta += Vec2::new(dx as f32, dy as f32);
        }
    }

    pub fn set_captured(&mut self, captured: bool) {
        self.captured = captured;
        if !captured {
            self.mouse_delta = Vec2::ZERO;
        }
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&PhysicalKey::Code(key))
    }

    pub fn just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed.contains(&PhysicalKey::Code(key))
    }

    pub fn pad_just_pressed(&self, button: PadButton) -> bool {
        self.pad_just_pressed.contains(&button)
    }

    /// Escape, Backspace or the gamepad Back button was pressed this frame.
    pub fn quit_requested(&self) -> bool {
        self.just_pressed(KeyCode::Escape)
            || self.just_pressed(KeyCode::Backspace)
            || self.pad_just_pressed(PadButton::Select)
    }

    pub fn intent(&self) -> MoveIntent {
        let axis = |pos: KeyCode, neg: KeyCode| {
            f32::from(u8::from(self.is_pressed(pos))) - f32::from(u8::from(self.is_pressed(neg)))
        };
        MoveIntent {
            forward: axis(KeyCode::KeyW, KeyCode::KeyS),
            strafe: axis(KeyCode::KeyD, KeyCode::KeyA),
            look: self.mouse_delta,
        }
    }

    /// Forget this frame's presses and mouse motion.
    pub fn clear_transients(&mut self) {
        self.just_pressed.clear();
        self.pad_just_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
    }

    /// Release every key, e.g. when the window loses focus.
    pub fn reset(&mut self) {
        self.pressed.clear();
        self.pad_pressed.clear();
        self.clear_transients();
    }
}
