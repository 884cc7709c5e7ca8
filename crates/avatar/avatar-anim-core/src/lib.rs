//! Avatar Animation Core (engine-agnostic)
//!
//! Procedural animation for character assets of unknown rig: probes what an
//! asset offers (morph channels, joints), synthesizes lip-sync, blink and idle
//! motion from time and conversation state, and writes the result back with
//! bounds-checked blends and decays. Without a usable asset or renderer the
//! engine produces a 2D fallback view with the same four-state contract.
//!
//! Adapters (Bevy, wasm) drive `AvatarEngine::render` once per frame and mirror
//! `FrameOutputs::writes` onto their own scene.

pub mod apply;
pub mod asset;
pub mod blink;
pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
#[cfg(feature = "gltf")]
pub mod gltf_loader;
pub mod ids;
pub mod math;
pub mod motion;
pub mod outputs;
pub mod probe;
pub mod roles;
pub mod source;
pub mod state;
pub mod synth;

// Re-exports for consumers (adapters)
pub use apply::{Applier, BasePose};
pub use asset::{
    parse_character_asset_json, AssetDocument, CharacterAsset, DeformableSurface, NodeDocument,
    NodeTransform, SceneNode, SurfaceDocument,
};
pub use blink::{BlinkPhase, BlinkScheduler, BlinkTimer};
pub use config::{BlinkConfig, Config, MotionConfig, ProbeConfig, SynthConfig};
pub use engine::AvatarEngine;
pub use error::{AssetError, ConfigError};
pub use fallback::{FallbackRenderer, FallbackView, Gaze, MouthShape, RingStyle, FALLBACK_STYLESHEET};
#[cfg(feature = "gltf")]
pub use gltf_loader::load_gltf_asset;
pub use ids::{AssetToken, NodeId};
pub use outputs::{ChannelWrite, EngineEvent, FrameOutputs, RenderMode};
pub use probe::{probe, CapabilityCache, CapabilityDescriptor, JointRefs, SurfaceCapabilities};
pub use roles::{Role, VisemeKey};
pub use source::{AssetPoll, AssetSource, DirAssetSource, MemoryAssetSource, MissingPolicy};
pub use state::{AnimationState, BadgeColor, RenderProps, StateBadge};
pub use synth::{synthesize, ChannelTargets, LipSyncStrategy};
