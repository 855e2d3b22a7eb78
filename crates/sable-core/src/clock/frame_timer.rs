// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::config::{LoopConfig, MAX_TICKS_PER_SECOND};

/// Slack used when comparing tick debt against one whole tick, so that
/// `0.1 s * 50 tps` still yields five ticks after float rounding.
const TICK_EPSILON: f64 = 1e-9;

/// Upper bound on ticks paid in a single iteration, whatever the configuration.
pub const MAX_CATCH_UP_TICKS: u32 = 100_000;

/// What the loop must do for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStep {
    /// Number of tick callbacks to run, all before any render.
    pub ticks: u32,
    /// Whether the render callback runs this iteration.
    pub render: bool,
    /// Set when a measurement window closed; carries the measured fps.
    pub fps: Option<u32>,
    /// Ticks discarded because the debt exceeded the catch-up cap.
    pub dropped_ticks: u32,
}

/// Converts elapsed wall time into tick and render invocations.
///
/// Ticks follow a fixed-timestep accumulator: each second of elapsed time adds
/// `ticks_per_second` units of debt and every whole unit is paid with one tick.
/// Rendering follows `render_interval`, which a negative-feedback controller
/// nudges by `correction_step` once per measurement window toward the desired fps.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    ticks_per_second: f64,
    desired_fps: i32,
    render_interval: f64,
    frame_check_interval: f64,
    correction_step: f64,
    max_catch_up_seconds: f64,

    tick_debt: f64,
    render_accumulator: f64,
    check_accumulator: f64,
    frames_in_window: u32,
    fps: u32,
}

impl FrameTimer {
    /// Creates a timer from a validated [`LoopConfig`].
    pub fn new(config: &LoopConfig) -> Self {
        let mut timer = Self {
            ticks_per_second: config.ticks_per_second,
            desired_fps: -1,
            render_interval: 0.0,
            frame_check_interval: config.frame_check_interval,
            correction_step: config.correction_step,
            max_catch_up_seconds: config.max_catch_up_seconds,
            tick_debt: 0.0,
            render_accumulator: 0.0,
            check_accumulator: 0.0,
            frames_in_window: 0,
            fps: 0,
        };
        timer.set_frame_rate(config.desired_fps);
        timer
    }

    /// Advances the timer by `delta` seconds of wall time.
    pub fn advance(&mut self, delta: f64) -> FrameStep {
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        let mut step = FrameStep::default();

        self.tick_debt += delta * self.ticks_per_second;
        let cap = (self.max_catch_up_seconds * self.ticks_per_second)
            .max(1.0)
            .min(MAX_CATCH_UP_TICKS as f64);
        if self.tick_debt > cap {
            step.dropped_ticks = (self.tick_debt - cap).floor() as u32;
            self.tick_debt = cap;
        }
        while self.tick_debt >= 1.0 - TICK_EPSILON {
            step.ticks += 1;
            self.tick_debt -= 1.0;
        }
        self.tick_debt = self.tick_debt.max(0.0);

        self.render_accumulator += delta;
        if self.render_interval <= 0.0 || self.render_accumulator >= self.render_interval {
            step.render = true;
            self.render_accumulator = 0.0;
            self.frames_in_window += 1;
        }

        self.check_accumulator += delta;
        if self.check_accumulator >= self.frame_check_interval {
            let measured = (self.frames_in_window as f64 / self.check_accumulator).round() as u32;
            self.fps = measured;
            self.frames_in_window = 0;
            self.check_accumulator = 0.0;
            self.correct_render_interval(measured);
            step.fps = Some(measured);
        }

        step
    }

    fn correct_render_interval(&mut self, measured: u32) {
        if self.desired_fps <= 0 {
            return;
        }
        let desired = self.desired_fps as u32;
        if measured > desired {
            self.render_interval += self.correction_step;
        } else if measured < desired {
            self.render_interval = (self.render_interval - self.correction_step).max(0.0);
        }
    }

    /// Sets the simulation rate. Rates outside `(0, MAX_TICKS_PER_SECOND]` are ignored.
    pub fn set_ticks_per_second(&mut self, ticks_per_second: f64) -> bool {
        if !(ticks_per_second > 0.0 && ticks_per_second <= MAX_TICKS_PER_SECOND) {
            log::warn!("Ignoring invalid tick rate {ticks_per_second}");
            return false;
        }
        self.ticks_per_second = ticks_per_second;
        true
    }

    /// Sets the desired render rate; any non-positive value means uncapped.
    ///
    /// A positive rate seeds the render interval at `1 / fps`; the controller
    /// refines it from there.
    pub fn set_frame_rate(&mut self, fps: i32) {
        if fps > 0 {
            self.desired_fps = fps;
            self.render_interval = 1.0 / fps as f64;
        } else {
            self.desired_fps = -1;
            self.render_interval = 0.0;
        }
    }

    /// Sets how often, in seconds, the fps measurement window closes.
    pub fn set_fps_update_rate(&mut self, seconds: f64) -> bool {
        if !(seconds > 0.0) {
            log::warn!("Ignoring invalid fps update rate {seconds}");
            return false;
        }
        self.frame_check_interval = seconds;
        true
    }

    /// Overrides the current render interval. Negative values clamp to zero.
    pub fn set_render_interval(&mut self, seconds: f64) {
        self.render_interval = seconds.max(0.0);
    }

    /// Length of one tick in seconds.
    pub fn tick_duration(&self) -> f64 {
        1.0 / self.ticks_per_second
    }

    /// The simulation rate.
    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }

    /// Desired fps, `-1` when uncapped.
    pub fn desired_fps(&self) -> i32 {
        self.desired_fps
    }

    /// Current render interval in seconds.
    pub fn render_interval(&self) -> f64 {
        self.render_interval
    }

    /// Fps measured over the last closed window.
    pub fn fps(&self) -> u32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn timer(ticks_per_second: f64) -> FrameTimer {
        FrameTimer::new(&LoopConfig {
            ticks_per_second,
            ..Default::default()
        })
    }

    #[test]
    fn test_fixed_ticks_per_window() {
        let mut timer = timer(50.0);
        for _ in 0..20 {
            let step = timer.advance(0.1);
            assert_eq!(step.ticks, 5);
        }
    }

    #[test]
    fn test_ticks_independent_of_render_rate() {
        let mut capped = timer(50.0);
        capped.set_frame_rate(2);
        let mut uncapped = timer(50.0);

        let mut capped_ticks = 0;
        let mut capped_renders = 0;
        let mut uncapped_ticks = 0;
        let mut uncapped_renders = 0;
        for _ in 0..10 {
            let a = capped.advance(0.1);
            let b = uncapped.advance(0.1);
            capped_ticks += a.ticks;
            capped_renders += a.render as u32;
            uncapped_ticks += b.ticks;
            uncapped_renders += b.render as u32;
        }

        assert_eq!(capped_ticks, 50);
        assert_eq!(uncapped_ticks, 50);
        assert!(capped_renders < uncapped_renders);
    }

    #[test]
    fn test_catch_up_after_stall() {
        let mut timer = timer(60.0);
        let step = timer.advance(0.5);
        assert_eq!(step.ticks, 30);
        assert!(step.render);
        assert_eq!(step.dropped_ticks, 0);
    }

    #[test]
    fn test_catch_up_is_capped() {
        let mut timer = FrameTimer::new(&LoopConfig {
            ticks_per_second: 60.0,
            max_catch_up_seconds: 1.0,
            ..Default::default()
        });
        let step = timer.advance(10.0);
        assert_eq!(step.ticks, 60);
        assert_eq!(step.dropped_ticks, 540);
    }

    #[test]
    fn test_unbounded_rate_stays_within_hard_cap() {
        let mut timer = FrameTimer::new(&LoopConfig {
            ticks_per_second: f64::INFINITY,
            ..Default::default()
        });
        assert_eq!(timer.advance(0.0).ticks, 0);
        let step = timer.advance(0.016);
        assert_eq!(step.ticks, MAX_CATCH_UP_TICKS);

        let mut timer = FrameTimer::new(&LoopConfig {
            ticks_per_second: 1.0e12,
            max_catch_up_seconds: 1.0e6,
            ..Default::default()
        });
        assert_eq!(timer.advance(1.0).ticks, MAX_CATCH_UP_TICKS);
    }

    #[test]
    fn test_partial_ticks_carry_over() {
        let mut timer = timer(10.0);
        assert_eq!(timer.advance(0.05).ticks, 0);
        assert_eq!(timer.advance(0.05).ticks, 1);
    }

    #[test]
    fn test_uncapped_renders_every_iteration() {
        let mut timer = timer(60.0);
        for _ in 0..5 {
            assert!(timer.advance(0.001).render);
        }
    }

    #[test]
    fn test_capped_render_waits_for_interval() {
        let mut timer = timer(60.0);
        timer.set_frame_rate(4);
        assert_relative_eq!(timer.render_interval(), 0.25);

        assert!(!timer.advance(0.125).render);
        assert!(timer.advance(0.125).render);
        assert!(!timer.advance(0.125).render);
    }

    #[test]
    fn test_fps_measured_per_window() {
        let mut timer = FrameTimer::new(&LoopConfig {
            frame_check_interval: 1.0,
            ..Default::default()
        });
        let mut reported = None;
        for _ in 0..4 {
            reported = timer.advance(0.25).fps.or(reported);
        }
        assert_eq!(reported, Some(4));
        assert_eq!(timer.fps(), 4);
    }

    #[test]
    fn test_controller_slows_down_when_too_fast() {
        let mut timer = FrameTimer::new(&LoopConfig {
            frame_check_interval: 1.0,
            ..Default::default()
        });
        timer.set_frame_rate(2);
        timer.set_render_interval(0.0);
        for _ in 0..4 {
            timer.advance(0.25);
        }
        assert_relative_eq!(timer.render_interval(), 0.00005);
    }

    #[test]
    fn test_controller_speeds_up_when_too_slow() {
        let mut timer = FrameTimer::new(&LoopConfig {
            frame_check_interval: 1.0,
            ..Default::default()
        });
        timer.set_frame_rate(8);
        timer.set_render_interval(0.5);
        for _ in 0..4 {
            timer.advance(0.25);
        }
        assert_relative_eq!(timer.render_interval(), 0.5 - 0.00005);
    }

    #[test]
    fn test_controller_never_goes_negative() {
        let mut timer = FrameTimer::new(&LoopConfig {
            frame_check_interval: 0.25,
            ..Default::default()
        });
        timer.set_frame_rate(1000);
        timer.set_render_interval(0.0001);
        for _ in 0..5 {
            timer.advance(0.25);
        }
        assert_eq!(timer.render_interval(), 0.0);
    }

    #[test]
    fn test_uncapped_leaves_interval_alone() {
        let mut timer = FrameTimer::new(&LoopConfig {
            frame_check_interval: 0.1,
            ..Default::default()
        });
        for _ in 0..50 {
            timer.advance(0.01);
        }
        assert_eq!(timer.render_interval(), 0.0);
        assert_eq!(timer.desired_fps(), -1);
    }

    #[test]
    fn test_rejects_invalid_rates() {
        let mut timer = timer(60.0);
        assert!(!timer.set_ticks_per_second(0.0));
        assert!(!timer.set_ticks_per_second(f64::NAN));
        assert!(!timer.set_ticks_per_second(f64::INFINITY));
        assert!(!timer.set_fps_update_rate(-1.0));
        assert_eq!(timer.ticks_per_second(), 60.0);
        assert!(timer.set_ticks_per_second(30.0));
        assert_relative_eq!(timer.tick_duration(), 1.0 / 30.0);
    }

    #[test]
    fn test_negative_delta_is_ignored() {
        let mut timer = timer(60.0);
        let step = timer.advance(-1.0);
        assert_eq!(step.ticks, 0);
    }
}
