//! Idle and state motion: head sway/tilt/nod, breathing bob and idle smile.
//!
//! Every function is a pure function of time and state. Offsets are Euler XYZ
//! radians to be composed on top of a captured base pose; nothing carries over
//! between frames, so a state switch changes the formula on the next frame.

use crate::config::MotionConfig;
use crate::state::AnimationState;
use crate::synth::speech_active;

/// Head offset (pitch, yaw, roll) for the given state. Negative pitch looks up.
pub fn head_offset(time: f32, state: AnimationState, speaking: bool, cfg: &MotionConfig) -> [f32; 3] {
    match state {
        AnimationState::Listening => [
            cfg.attentive_tilt + 0.02 * (time * 0.8).sin(),
            0.03 * (time * 0.6).sin(),
            0.0,
        ],
        AnimationState::Thinking => [
            cfg.attentive_tilt + 0.01 * (time * 0.3).sin(),
            0.02 * (time * 0.25).sin(),
            0.06 * (time * 0.4).sin(),
        ],
        AnimationState::Speaking if speech_active(state, speaking) => [
            0.03 * (time * 3.2).sin(),
            0.008 * (time * 0.45).sin(),
            0.0,
        ],
        // idle, and speaking state while the audio flag is still off
        _ => idle_offset(time),
    }
}

/// Sub-degree sway on two axes at distinct low frequencies.
fn idle_offset(time: f32) -> [f32; 3] {
    [0.01 * (time * 0.5).sin(), 0.012 * (time * 0.37).sin(), 0.0]
}

/// The same formulas at reduced amplitude, for assets without a head or neck joint.
pub fn whole_asset_offset(time: f32, state: AnimationState, speaking: bool, cfg: &MotionConfig) -> [f32; 3] {
    let o = head_offset(time, state, speaking, cfg);
    let k = cfg.whole_asset_scale;
    [o[0] * k, o[1] * k, o[2] * k]
}

/// Vertical bob added to the root translation; independent of state.
pub fn breathing_offset(time: f32, cfg: &MotionConfig) -> f32 {
    cfg.breathing_amplitude * (time * cfg.breathing_speed).sin()
}

/// Subtle smile held while not speaking.
pub fn idle_smile(time: f32, cfg: &MotionConfig) -> f32 {
    (cfg.idle_smile_base + cfg.idle_smile_amplitude * (time * 0.8).sin()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_DEGREE: f32 = std::f32::consts::PI / 180.0;

    #[test]
    fn idle_sway_is_sub_degree() {
        let cfg = MotionConfig::default();
        for i in 0..3000 {
            let o = head_offset(i as f32 / 30.0, AnimationState::Idle, false, &cfg);
            assert!(o.iter().all(|v| v.abs() < ONE_DEGREE), "{o:?}");
        }
    }

    #[test]
    fn attentive_states_tilt_up() {
        let cfg = MotionConfig::default();
        for state in [AnimationState::Listening, AnimationState::Thinking] {
            let mean: f32 = (0..600)
                .map(|i| head_offset(i as f32 / 30.0, state, false, &cfg)[0])
                .sum::<f32>()
                / 600.0;
            assert!(mean < -0.03, "{state:?} mean pitch {mean}");
        }
    }

    #[test]
    fn thinking_sways_on_roll() {
        let cfg = MotionConfig::default();
        let max_roll = (0..600)
            .map(|i| head_offset(i as f32 / 30.0, AnimationState::Thinking, false, &cfg)[2].abs())
            .fold(0.0f32, f32::max);
        assert!(max_roll > 0.04);
        let listening_roll = head_offset(3.0, AnimationState::Listening, false, &cfg)[2];
        assert_eq!(listening_roll, 0.0);
    }

    #[test]
    fn speaking_without_flag_uses_idle_formula() {
        let cfg = MotionConfig::default();
        let t = 1.234;
        assert_eq!(
            head_offset(t, AnimationState::Speaking, false, &cfg),
            head_offset(t, AnimationState::Idle, false, &cfg)
        );
        assert_ne!(
            head_offset(t, AnimationState::Speaking, true, &cfg),
            head_offset(t, AnimationState::Idle, false, &cfg)
        );
    }

    #[test]
    fn whole_asset_is_smaller() {
        let cfg = MotionConfig::default();
        let t = 0.7;
        let h = head_offset(t, AnimationState::Speaking, true, &cfg);
        let w = whole_asset_offset(t, AnimationState::Speaking, true, &cfg);
        assert!(w[0].abs() < h[0].abs());
    }
}
