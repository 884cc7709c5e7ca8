//! Engine configuration.
//!
//! All constants of the procedural formulas live here. They are tuning
//! parameters: tests assert bounds and qualitative behavior, never exact values.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::roles::Role;

/// Top-level configuration passed to `AvatarEngine::new`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub probe: ProbeConfig,
    pub synth: SynthConfig,
    pub motion: MotionConfig,
    pub blink: BlinkConfig,
}

impl Config {
    /// Parse a (possibly partial) JSON config; missing fields take defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.blink;
        if b.min_interval >= b.max_interval {
            return Err(ConfigError::BlinkRange {
                min: b.min_interval,
                max: b.max_interval,
            });
        }
        if b.duration <= 0.0 {
            return Err(ConfigError::BlinkDuration(b.duration));
        }
        let s = &self.synth;
        if !(s.mouth_open_ceiling > 0.0 && s.mouth_open_ceiling <= 0.7) {
            return Err(ConfigError::MouthCeiling(s.mouth_open_ceiling));
        }
        if !(s.decay_factor > 0.0 && s.decay_factor < 1.0) {
            return Err(ConfigError::DecayFactor(s.decay_factor));
        }
        if s.jaw_max_angle <= 0.0 {
            return Err(ConfigError::JawMaxAngle(s.jaw_max_angle));
        }
        Ok(())
    }
}

/// Capability probing options.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Retry alias matching ignoring ASCII case when the exact pass finds nothing.
    pub case_insensitive: bool,
    /// Host-supplied aliases tried before the built-in tables.
    pub extra_aliases: Vec<(Role, String)>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            extra_aliases: Vec::new(),
        }
    }
}

/// Lip-sync and brow synthesis constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Angular speed (rad/s) of the primary viseme wave.
    pub viseme_cycle_speed: f32,
    /// Frequency (rad/s) of the amplitude modulation wave; higher than the cycle speed.
    pub viseme_amp_speed: f32,
    /// Peak viseme weight.
    pub viseme_peak: f32,
    /// Upper clamp of the mouth-open fallback.
    pub mouth_open_ceiling: f32,
    /// Maximum jaw opening (radians about X).
    pub jaw_max_angle: f32,
    pub brow_base: f32,
    pub brow_amplitude: f32,
    /// Per-frame multiplier applied to lip channels while not speaking.
    pub decay_factor: f32,
    /// Weights below this snap to zero during decay.
    pub decay_epsilon: f32,
    /// Exponential rate (1/s) at which joints return to their base pose.
    pub joint_return_rate: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            viseme_cycle_speed: 8.0,
            viseme_amp_speed: 13.0,
            viseme_peak: 0.8,
            mouth_open_ceiling: 0.7,
            jaw_max_angle: 0.25,
            brow_base: 0.15,
            brow_amplitude: 0.1,
            decay_factor: 0.85,
            decay_epsilon: 1e-3,
            joint_return_rate: 10.0,
        }
    }
}

/// Head, whole-asset, breathing and idle smile constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Scale applied to head formulas when they drive the asset root instead.
    pub whole_asset_scale: f32,
    /// Constant pitch (radians, negative looks up) used by listening and thinking.
    pub attentive_tilt: f32,
    pub breathing_amplitude: f32,
    pub breathing_speed: f32,
    pub idle_smile_base: f32,
    pub idle_smile_amplitude: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            whole_asset_scale: 0.5,
            attentive_tilt: -0.05,
            breathing_amplitude: 0.005,
            breathing_speed: 1.5,
            idle_smile_base: 0.1,
            idle_smile_amplitude: 0.05,
        }
    }
}

/// Blink scheduling constants (seconds).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    pub min_interval: f32,
    pub max_interval: f32,
    pub duration: f32,
    /// Fixed RNG seed for reproducible runs; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            min_interval: 2.0,
            max_interval: 7.0,
            duration: 0.15,
            seed: None,
        }
    }
}
