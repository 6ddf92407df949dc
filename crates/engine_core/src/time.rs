//! Fixed-rate frame clock driving the early/late update phases.

use std::time::Duration;

/// Slowest supported tick rate: one frame every 1000 seconds.
pub const MIN_TICK_RATE: f32 = 0.001;

/// Steps simulated time at a constant tick rate.
#[derive(Debug, Clone)]
pub struct FrameClock {
    step: Duration,
    elapsed: Duration,
    frame: u64,
}

impl FrameClock {
    /// Clock ticking `hz` times per simulated second.
    ///
    /// Non-positive or non-finite rates fall back to 1 Hz; tiny rates clamp to [`MIN_TICK_RATE`].
    pub fn fixed(hz: f32) -> Self {
        let hz = if hz > 0.0 && hz.is_finite() { hz.max(MIN_TICK_RATE) } else { 1.0 };
        Self {
            step: Duration::from_secs_f32(1.0 / hz),
            elapsed: Duration::ZERO,
            frame: 0,
        }
    }

    /// Advance one frame and return its delta in seconds.
    pub fn tick(&mut self) -> f32 {
        self.elapsed += self.step;
        self.frame += 1;
        self.step.as_secs_f32()
    }

    pub fn delta_seconds(&self) -> f32 {
        self.step.as_secs_f32()
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// True on the frame that crosses each multiple of `period` seconds.
    pub fn crossed(&self, period: f32) -> bool {
        if period <= 0.0 || self.frame == 0 {
            return false;
        }
        let now = self.elapsed.as_secs_f64();
        let before = now - self.step.as_secs_f64();
        let period = f64::from(period);
        (now / period).floor() > (before / period).floor()
    }
}
