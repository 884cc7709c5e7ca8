//! Blink scheduling: a randomized, self-rescheduling half-sine pulse.
//!
//! Runs every frame regardless of animation state. The value drives both eyes
//! identically.

use std::f32::consts::PI;

use crate::config::BlinkConfig;

/// Time accumulated toward the next blink.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlinkTimer {
    pub elapsed_since_last_blink: f32,
    pub next_blink_threshold: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BlinkPhase {
    Waiting,
    /// Seconds into the current pulse.
    Blinking(f32),
}

#[derive(Debug)]
pub struct BlinkScheduler {
    cfg: BlinkConfig,
    timer: BlinkTimer,
    phase: BlinkPhase,
    rng: fastrand::Rng,
    completed: u64,
}

impl BlinkScheduler {
    pub fn new(cfg: BlinkConfig) -> Self {
        let mut rng = match cfg.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let first = draw_threshold(&mut rng, &cfg);
        Self {
            cfg,
            timer: BlinkTimer {
                elapsed_since_last_blink: 0.0,
                next_blink_threshold: first,
            },
            phase: BlinkPhase::Waiting,
            rng,
            completed: 0,
        }
    }

    pub fn timer(&self) -> BlinkTimer {
        self.timer
    }

    pub fn phase(&self) -> BlinkPhase {
        self.phase
    }

    pub fn is_blinking(&self) -> bool {
        matches!(self.phase, BlinkPhase::Blinking(_))
    }

    /// Number of pulses that have run to completion.
    pub fn completed_pulses(&self) -> u64 {
        self.completed
    }

    /// Advance by `dt` seconds and return the eyelid weight in [0, 1].
    ///
    /// The value is the pulse peak over the span of the pulse this frame
    /// covered, so a frame longer than the pulse still closes the eyes.
    pub fn advance(&mut self, dt: f32) -> f32 {
        let dt = dt.max(0.0);
        match self.phase {
            BlinkPhase::Waiting => {
                self.timer.elapsed_since_last_blink += dt;
                let over = self.timer.elapsed_since_last_blink - self.timer.next_blink_threshold;
                if over >= 0.0 {
                    self.step_pulse(0.0, over)
                } else {
                    0.0
                }
            }
            BlinkPhase::Blinking(t) => self.step_pulse(t, t + dt),
        }
    }

    fn step_pulse(&mut self, from: f32, to: f32) -> f32 {
        let duration = self.cfg.duration.max(f32::EPSILON);
        let value = window_peak(from / duration, to / duration);
        if to >= duration {
            self.timer = BlinkTimer {
                elapsed_since_last_blink: to - duration,
                next_blink_threshold: draw_threshold(&mut self.rng, &self.cfg),
            };
            self.phase = BlinkPhase::Waiting;
            self.completed += 1;
        } else {
            self.phase = BlinkPhase::Blinking(to);
        }
        value
    }
}

/// Largest pulse value for normalized pulse time in `[a, b]`.
fn window_peak(a: f32, b: f32) -> f32 {
    let b = b.min(1.0);
    if a <= 0.5 && b >= 0.5 {
        1.0
    } else {
        pulse_value(a).max(pulse_value(b))
    }
}

fn draw_threshold(rng: &mut fastrand::Rng, cfg: &BlinkConfig) -> f32 {
    cfg.min_interval + (cfg.max_interval - cfg.min_interval) * rng.f32()
}

/// Half-sine rise and fall over `u` in [0, 1].
#[inline]
pub fn pulse_value(u: f32) -> f32 {
    (PI * u.clamp(0.0, 1.0)).sin().clamp(0.0, 1.0)
}
