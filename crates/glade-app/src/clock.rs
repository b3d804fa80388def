//! Variable-rate frame clock.
//!
//! Measures wall-clock time between frames and clamps long stalls so a
//! hitch never turns into a huge camera jump or wind step.

use std::time::Instant;
use tracing::warn;

/// Longest frame delta ever reported, in seconds.
pub const MAX_FRAME_TIME: f32 = 0.25;

/// Measures per-frame deltas.
pub struct FrameClock {
    previous_time: Instant,
    max_step: f32,
    frame_count: u64,
    total_time: f64,
}

impl FrameClock {
    /// A clock starting now. `max_step` is capped at [`MAX_FRAME_TIME`].
    pub fn new(max_step: f32) -> Self {
        Self {
            previous_time: Instant::now(),
            max_step: clamp_step(max_step),
            frame_count: 0,
            total_time: 0.0,
        }
    }

    /// Measure the time since the previous tick and advance by it.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f32();
        self.previous_time = now;
        self.advance(frame_time)
    }

    /// Advance by an explicit frame time and return the clamped delta.
    pub fn advance(&mut self, frame_time: f32) -> f32 {
        let dt = if !frame_time.is_finite() || frame_time < 0.0 {
            0.0
        } else if frame_time > self.max_step {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                self.max_step * 1000.0
            );
            self.max_step
        } else {
            frame_time
        };
        self.total_time += f64::from(dt);
        self.frame_count += 1;
        dt
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Sum of every clamped delta, in seconds.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    pub fn max_step(&self) -> f32 {
        self.max_step
    }
}

fn clamp_step(max_step: f32) -> f32 {
    if max_step.is_finite() && max_step > 0.0 {
        max_step.min(MAX_FRAME_TIME)
    } else {
        MAX_FRAME_TIME
    }
}
