//! Gamepad buttons polled through [`gilrs`].
//!
//! Only buttons are tracked. Events are drained once per frame and forwarded
//! to [`InputState`] before the quit check runs.

use gilrs::{Button, EventType, Gilrs};
use tracing::{info, warn};
use winit::event::ElementState;

use crate::input::InputState;

/// Layout-neutral gamepad buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadButton {
    /// A / Cross
    South,
    /// B / Circle
    East,
    Start,
    /// Back / Select / Share
    Select,
}

impl PadButton {
    pub fn from_gilrs(button: Button) -> Option<Self> {
        match button {
            Button::South => Some(Self::South),
            Button::East => Some(Self::East),
            Button::Start => Some(Self::Start),
            Button::Select => Some(Self::Select),
            _ => None,
        }
    }
}

/// Owns the gilrs context. Without a platform backend it stays empty and
/// polling is a no-op.
pub struct GamepadPoller {
    gilrs: Option<Gilrs>,
}

impl GamepadPoller {
    pub fn new() -> Self {
        let gilrs = match Gilrs::new() {
            Ok(gilrs) => {
                for (_, pad) in gilrs.gamepads().filter(|(_, g)| g.is_connected()) {
                    info!("Gamepad connected: {}", pad.name());
                }
                Some(gilrs)
            }
            Err(e) => {
                warn!("Gamepad support unavailable: {e}");
                None
            }
        };
        Self { gilrs }
    }

    /// A poller that never reports events.
    pub fn disabled() -> Self {
        Self { gilrs: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.gilrs.is_some()
    }

    /// Drain pending events into `input`. Call once per frame.
    pub fn poll(&mut self, input: &mut InputState) {
        let Some(gilrs) = &mut self.gilrs else {
            return;
        };
        while let Some(event) = gilrs.next_event() {
            match event.event {
                EventType::Connected => {
                    info!("Gamepad connected: {}", gilrs.gamepad(event.id).name());
                }
                EventType::Disconnected => info!("Gamepad disconnected"),
                EventType::ButtonPressed(button, _) => {
                    if let Some(button) = PadButton::from_gilrs(button) {
                        input.on_pad_button(button, ElementState::Pressed);
                    }
                }
                EventType::ButtonReleased(button, _) => {
                    if let Some(button) = PadButton::from_gilrs(button) {
                        input.on_pad_button(button, ElementState::Released);
                    }
                }
                _ => {}
            }
        }
    }
}

impl Default for GamepadPoller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_maps_to_select() {
        assert_eq!(PadButton::from_gilrs(Button::Select), Some(PadButton::Select));
        assert_eq!(PadButton::from_gilrs(Button::South), Some(PadButton::South));
        assert_eq!(PadButton::from_gilrs(Button::LeftThumb), None);
    }

    #[test]
    fn test_disabled_poller_leaves_input_untouched() {
        let mut poller = GamepadPoller::disabled();
        let mut input = InputState::new();
        poller.poll(&mut input);
        assert!(!poller.is_enabled());
        assert!(!input.quit_requested());
    }
}
