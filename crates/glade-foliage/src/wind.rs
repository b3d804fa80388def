//! Global wind signal.

use glam::{Vec2, Vec3};

/// Relative weight of the slow component of the gust signal.
const PRIMARY_WEIGHT: f64 = 0.7;
/// Relative weight of the faster, out-of-phase component.
const GUST_WEIGHT: f64 = 0.3;
const GUST_FREQUENCY_RATIO: f64 = 2.3;
const GUST_PHASE: f64 = 1.1;

/// Wind strength and direction at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindSample {
    /// Signed strength in `[-amplitude, amplitude]`.
    pub strength: f32,
    /// Unit horizontal direction the wind blows towards.
    pub direction: Vec3,
}

impl WindSample {
    /// No wind at all.
    pub const CALM: Self = Self {
        strength: 0.0,
        direction: Vec3::X,
    };
}

/// A pure function of time producing the wind strength.
///
/// The signal is a sum of two sines whose weights add to one, so its
/// magnitude never exceeds `amplitude`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindField {
    amplitude: f32,
    frequency: f32,
    direction: Vec3,
}

impl WindField {
    /// `direction` is the horizontal (x, z) heading; zero falls back to +X.
    pub fn new(amplitude: f32, frequency: f32, direction: Vec2) -> Self {
        let direction = Vec3::new(direction.x, 0.0, direction.y)
            .try_normalize()
            .unwrap_or(Vec3::X);
        Self {
            amplitude: amplitude.abs(),
            frequency,
            direction,
        }
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Wind strength at `time` seconds.
    ///
    /// Phases are evaluated in f64 so the signal stays smooth however long
    /// the clock has run.
    pub fn sample(&self, time: f64) -> f32 {
        let t = f64::from(self.frequency) * time;
        let raw = PRIMARY_WEIGHT * t.sin()
            + GUST_WEIGHT * (GUST_FREQUENCY_RATIO * t + GUST_PHASE).sin();
        (self.amplitude * raw as f32).clamp(-self.amplitude, self.amplitude)
    }

    /// Strength plus direction at `time` seconds.
    pub fn sample_at(&self, time: f64) -> WindSample {
        WindSample {
            strength: self.sample(time),
            direction: self.direction,
        }
    }
}

/// Accumulates elapsed time for the wind, clamping each step.
#[derive(Clone, Copy, Debug)]
pub struct WindClock {
    elapsed: f64,
    max_step: f32,
}

impl WindClock {
    pub fn new(max_step: f32) -> Self {
        Self {
            elapsed: 0.0,
            max_step: max_step.max(0.0),
        }
    }

    /// Advance by `dt` seconds and return the new elapsed time.
    ///
    /// Negative or non-finite deltas are ignored; long stalls are clamped to
    /// `max_step`.
    pub fn advance(&mut self, dt: f32) -> f64 {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += f64::from(dt.min(self.max_step));
        }
        self.elapsed
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_is_deterministic() {
        let a = WindField::new(0.8, 1.3, Vec2::X);
        let b = WindField::new(0.8, 1.3, Vec2::X);
        for i in 0..100 {
            let t = f64::from(i) * 0.173;
            assert_eq!(a.sample(t), b.sample(t));
        }
    }

    #[test]
    fn test_sample_bounded_by_amplitude() {
        let wind = WindField::new(2.5, 3.7, Vec2::new(1.0, 1.0));
        for i in 0..10_000 {
            let t = f64::from(i) * 0.0137;
            assert!(wind.sample(t).abs() <= 2.5, "t={t} s={}", wind.sample(t));
        }
    }

    #[test]
    fn test_zero_amplitude_is_calm() {
        let wind = WindField::new(0.0, 1.0, Vec2::X);
        assert_eq!(wind.sample(12.3), 0.0);
    }

    #[test]
    fn test_signal_varies_over_time() {
        let wind = WindField::new(1.0, 1.0, Vec2::X);
        assert_ne!(wind.sample(0.0), wind.sample(1.0));
    }

    #[test]
    fn test_direction_is_normalized_and_horizontal() {
        let wind = WindField::new(1.0, 1.0, Vec2::new(3.0, 4.0));
        let d = wind.sample_at(0.5).direction;
        assert!((d.length() - 1.0).abs() < 1e-6);
        assert_eq!(d.y, 0.0);
        assert!((d.x - 0.6).abs() < 1e-6 && (d.z - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_zero_direction_falls_back_to_x() {
        assert_eq!(WindField::new(1.0, 1.0, Vec2::ZERO).direction(), Vec3::X);
    }

    #[test]
    fn test_clock_clamps_large_steps() {
        let mut clock = WindClock::new(0.25);
        assert!((clock.advance(0.1) - 0.1).abs() < 1e-6);
        assert!((clock.advance(5.0) - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_clock_ignores_bad_deltas() {
        let mut clock = WindClock::new(0.25);
        clock.advance(0.2);
        clock.advance(-1.0);
        clock.advance(f32::NAN);
        assert_eq!(clock.elapsed(), f64::from(0.2f32));
    }

    #[test]
    fn test_clock_keeps_frame_resolution_after_days() {
        let mut clock = WindClock::new(0.25);
        // Two days of 0.25 s steps.
        for _ in 0..(2 * 24 * 3600 * 4) {
            clock.advance(1.0);
        }
        let before = clock.elapsed();
        assert!((before - 172_800.0).abs() < 1e-6);
        let frame = 1.0 / 60.0;
        let step = clock.advance(frame) - before;
        assert!((step - f64::from(frame)).abs() < 1e-9, "step={step}");
    }

    #[test]
    fn test_sample_moves_between_frames_late_in_the_day() {
        let wind = WindField::new(1.0, 1.0, Vec2::X);
        let t: f64 = 130_000.0;
        let frame = 1.0 / 60.0;
        assert_ne!(wind.sample(t), wind.sample(t + frame));
        let expected = 0.7 * t.sin() + 0.3 * (2.3 * t + 1.1).sin();
        assert!((f64::from(wind.sample(t)) - expected).abs() < 1e-6);
    }
}
