//! Frame pacing and the fixed simulation step.
//!
//! The encounter always advances in whole ticks of `fixed_dt`; frames of any
//! length feed the accumulator and report how many ticks to run.

use std::time::{Duration, Instant};

/// Most ticks one frame may request before the backlog is dropped.
pub const MAX_CATCH_UP: u32 = 10;

/// Fixed-timestep frame clock.
#[derive(Debug)]
pub struct FrameClock {
    /// Time budget per frame
    frame_budget: Duration,
    /// Time of last frame start
    last_frame: Instant,
    /// Accumulator for fixed timestep
    accumulator: f32,
    /// Fixed timestep delta
    fixed_dt: f32,
    /// Maximum frame delta fed to the accumulator
    max_dt: f32,
    /// Ticks dropped because a frame fell too far behind
    dropped: u64,
}

impl FrameClock {
    /// Creates a clock ticking at `tick_rate` and presenting at `render_fps`.
    #[must_use]
    pub fn new(tick_rate: u32, render_fps: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        let render_fps = render_fps.max(1);
        Self {
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(render_fps)),
            last_frame: Instant::now(),
            accumulator: 0.0,
            fixed_dt: 1.0 / tick_rate as f32,
            max_dt: 0.25,
            dropped: 0,
        }
    }

    /// Seconds per tick.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Seconds per presented frame.
    #[must_use]
    pub fn frame_dt(&self) -> f32 {
        self.frame_budget.as_secs_f32()
    }

    /// Whole ticks discarded so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Wall-clock delta since the previous call, clamped to `max_dt`.
    pub fn delta_time(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        dt.min(self.max_dt)
    }

    /// Accumulate a frame of `dt` seconds.
    /// Returns the number of fixed ticks to run.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.clamp(0.0, self.max_dt);
        let mut count = 0;

        while self.accumulator >= self.fixed_dt && count < MAX_CATCH_UP {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind: drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.dropped += (self.accumulator / self.fixed_dt) as u64;
            self.accumulator = 0.0;
        }

        count
    }

    /// Sleep for whatever is left of the frame budget.
    pub fn sleep_remainder(&self) {
        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_rates_one_tick_per_frame() {
        let mut clock = FrameClock::new(60, 60);
        let dt = clock.frame_dt();
        let total: u32 = (0..600).map(|_| clock.accumulate(dt)).sum();
        assert!((599..=600).contains(&total), "ran {total} ticks");
        assert_eq!(clock.dropped(), 0);
    }

    #[test]
    fn test_slow_frames_run_several_ticks() {
        let mut clock = FrameClock::new(120, 30);
        assert_eq!(clock.accumulate(1.0 / 30.0 + 1e-4), 4);
    }

    #[test]
    fn test_fast_frames_skip_ticks() {
        let mut clock = FrameClock::new(30, 120);
        let ticks: Vec<u32> = (0..4).map(|_| clock.accumulate(1.0 / 120.0 + 1e-5)).collect();
        assert_eq!(ticks, vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_catch_up_is_capped() {
        let mut clock = FrameClock::new(240, 60);
        // 0.25 s at 240 Hz would be 60 ticks
        assert_eq!(clock.accumulate(5.0), MAX_CATCH_UP);
        assert!(clock.dropped() > 0);
        assert_eq!(clock.accumulate(0.0), 0);
    }
}
