//! Error types for asset loading and configuration.
//!
//! Missing channels or joints are not errors; they are capability gaps handled by
//! the prober and the lip-sync priority chain. Errors here only cover inputs that
//! cannot be turned into a `CharacterAsset` or a usable `Config`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AssetError {
    #[error("asset not found: {path}")]
    NotFound { path: String },

    #[error("unsupported asset format '{extension}' for {path}")]
    UnsupportedFormat { path: String, extension: String },

    #[error("failed to parse asset {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid scene graph: {reason}")]
    InvalidGraph { reason: String },

    #[error("io error reading {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("3D renderer unavailable")]
    RendererUnavailable,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("config json parse error: {0}")]
    Parse(String),

    #[error("blink interval range is empty: min {min} >= max {max}")]
    BlinkRange { min: f32, max: f32 },

    #[error("blink duration must be positive, got {0}")]
    BlinkDuration(f32),

    #[error("mouth-open ceiling must be within (0, 0.7], got {0}")]
    MouthCeiling(f32),

    #[error("decay factor must be within (0, 1), got {0}")]
    DecayFactor(f32),

    #[error("jaw max angle must be positive, got {0}")]
    JawMaxAngle(f32),
}
