//! Signal synthesis: pure per-frame target values for the lip, brow and jaw roles.
//!
//! Nothing here is derived from audio. The waveforms are plausible-looking
//! substitutes; only their bounds and qualitative behavior are contracts.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::config::SynthConfig;
use crate::probe::CapabilityDescriptor;
use crate::state::AnimationState;

/// Lip-sync technique, chosen once per asset from its capabilities.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LipSyncStrategy {
    Visemes,
    MouthOpen,
    JawBone,
    /// No mouth capability at all; only whole-body motion conveys speech.
    None,
}

impl LipSyncStrategy {
    /// Priority: visemes, then mouth-open, then jaw joint.
    pub fn select(desc: &CapabilityDescriptor) -> Self {
        if desc.has_visemes {
            LipSyncStrategy::Visemes
        } else if desc.has_mouth_open {
            LipSyncStrategy::MouthOpen
        } else if desc.joints.jaw.is_some() {
            LipSyncStrategy::JawBone
        } else {
            LipSyncStrategy::None
        }
    }
}

/// Targets for one frame. `None`/empty means the role is inactive this frame and
/// its channels should decay.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelTargets {
    /// One weight per `CapabilityDescriptor::viseme_slots` entry.
    pub visemes: Vec<f32>,
    pub mouth_open: Option<f32>,
    /// Jaw opening in radians about X, relative to the base pose.
    pub jaw_angle: Option<f32>,
    pub brow: Option<f32>,
}

impl ChannelTargets {
    pub fn is_active(&self) -> bool {
        !self.visemes.is_empty()
            || self.mouth_open.is_some()
            || self.jaw_angle.is_some()
            || self.brow.is_some()
    }
}

/// Speech visuals fire only when both the state and the flag agree.
#[inline]
pub fn speech_active(state: AnimationState, speaking: bool) -> bool {
    state == AnimationState::Speaking && speaking
}

/// Weight of viseme slot `i` of `n` at `time`.
pub fn viseme_weight(time: f32, i: usize, n: usize, cfg: &SynthConfig) -> f32 {
    if n == 0 {
        return 0.0;
    }
    let phase = TAU * i as f32 / n as f32;
    let carrier = (time * cfg.viseme_cycle_speed + phase).sin().max(0.0);
    let amp = cfg.viseme_peak * (0.6 + 0.4 * (time * cfg.viseme_amp_speed + phase * 1.7).sin());
    (carrier * amp).clamp(0.0, 1.0)
}

/// Single mouth-open channel: three sines, clamped below the ceiling.
pub fn mouth_open_weight(time: f32, cfg: &SynthConfig) -> f32 {
    let v = 0.25
        + 0.2 * (time * 9.0).sin()
        + 0.15 * (time * 14.3).sin()
        + 0.1 * (time * 23.7).sin();
    v.clamp(0.0, cfg.mouth_open_ceiling)
}

/// Jaw opening from two sines, bounded by `jaw_max_angle`.
pub fn jaw_angle(time: f32, cfg: &SynthConfig) -> f32 {
    let v = 0.5 * (time * 9.0).sin().abs() + 0.3 * (time * 15.7).sin().abs();
    (v * cfg.jaw_max_angle).clamp(0.0, cfg.jaw_max_angle)
}

pub fn brow_weight(time: f32, cfg: &SynthConfig) -> f32 {
    (cfg.brow_base + cfg.brow_amplitude * (time * 2.3).sin()).clamp(0.0, 1.0)
}

/// Compute this frame's lip and brow targets.
pub fn synthesize(
    time: f32,
    state: AnimationState,
    speaking: bool,
    desc: &CapabilityDescriptor,
    strategy: LipSyncStrategy,
    cfg: &SynthConfig,
) -> ChannelTargets {
    if !speech_active(state, speaking) {
        return ChannelTargets::default();
    }
    let mut out = ChannelTargets {
        brow: Some(brow_weight(time, cfg)),
        ..ChannelTargets::default()
    };
    match strategy {
        LipSyncStrategy::Visemes => {
            let n = desc.viseme_slots.len();
            out.visemes = (0..n).map(|i| viseme_weight(time, i, n, cfg)).collect();
        }
        LipSyncStrategy::MouthOpen => out.mouth_open = Some(mouth_open_weight(time, cfg)),
        LipSyncStrategy::JawBone => out.jaw_angle = Some(jaw_angle(time, cfg)),
        LipSyncStrategy::None => {}
    }
    out
}

/// Next value of a decaying channel: multiplied toward zero, snapped below epsilon.
#[inline]
pub fn decay_weight(current: f32, cfg: &SynthConfig) -> f32 {
    let next = current * cfg.decay_factor;
    if next.abs() < cfg.decay_epsilon {
        0.0
    } else {
        next
    }
}

/// Interpolation factor toward the base pose for a frame of length `dt`.
#[inline]
pub fn joint_return_factor(dt: f32, cfg: &SynthConfig) -> f32 {
    (1.0 - (-cfg.joint_return_rate * dt.max(0.0)).exp()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> impl Iterator<Item = f32> {
        (0..2000).map(|i| i as f32 / 60.0)
    }

    #[test]
    fn viseme_weights_are_bounded_and_not_degenerate() {
        let cfg = SynthConfig::default();
        let n = 5;
        let mut peak = vec![0.0f32; n];
        for t in frames() {
            for (i, p) in peak.iter_mut().enumerate() {
                let w = viseme_weight(t, i, n, &cfg);
                assert!((0.0..=1.0).contains(&w));
                *p = p.max(w);
            }
        }
        assert!(peak.iter().all(|p| *p > 0.2), "{peak:?}");
    }

    #[test]
    fn visemes_do_not_fire_in_lockstep() {
        let cfg = SynthConfig::default();
        let differs = frames().any(|t| (viseme_weight(t, 0, 4, &cfg) - viseme_weight(t, 1, 4, &cfg)).abs() > 0.1);
        assert!(differs);
    }

    #[test]
    fn mouth_open_respects_ceiling() {
        let cfg = SynthConfig::default();
        let mut max = 0.0f32;
        for t in frames() {
            let w = mouth_open_weight(t, &cfg);
            assert!((0.0..=cfg.mouth_open_ceiling).contains(&w));
            max = max.max(w);
        }
        assert!(max > 0.3);
    }

    #[test]
    fn jaw_angle_is_bounded() {
        let cfg = SynthConfig::default();
        for t in frames() {
            let a = jaw_angle(t, &cfg);
            assert!(a >= 0.0 && a <= cfg.jaw_max_angle);
        }
    }

    #[test]
    fn decay_reaches_zero() {
        let cfg = SynthConfig::default();
        let mut w = 1.0;
        let mut frames = 0;
        while w > 0.0 {
            let next = decay_weight(w, &cfg);
            assert!(next < w);
            w = next;
            frames += 1;
            assert!(frames < 100);
        }
    }

    #[test]
    fn speech_requires_state_and_flag() {
        assert!(speech_active(AnimationState::Speaking, true));
        assert!(!speech_active(AnimationState::Speaking, false));
        assert!(!speech_active(AnimationState::Listening, true));
    }
}
