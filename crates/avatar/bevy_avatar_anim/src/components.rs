use avatar_anim_core::{AnimationState, FallbackView, LipSyncStrategy, RenderMode, StateBadge};
use bevy::prelude::*;

/// Marks the root of a character hierarchy driven by the avatar engine.
/// The snapshot system walks descendants of any entity with this component.
/// An empty `asset_ref` renders the fallback avatar.
#[derive(Component, Debug, Clone, Default)]
pub struct AvatarRoot {
    pub asset_ref: String,
}

/// Per-avatar conversation state supplied by the host each frame.
/// Missing means idle and silent.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct AvatarState {
    pub state: AnimationState,
    pub is_speaking: bool,
}

/// Optional per-entity override of morph target names, for meshes whose asset
/// does not carry them.
#[derive(Component, Debug, Clone)]
pub struct MorphChannelNames(pub Vec<String>);

/// Inserted by the host on the root when the character asset failed to load.
#[derive(Component, Debug, Clone)]
pub struct AvatarLoadFailed {
    pub reason: String,
}

/// Latest frame summary written back onto the root for UI systems.
#[derive(Component, Debug, Clone)]
pub struct AvatarFrame {
    pub mode: RenderMode,
    pub badge: StateBadge,
    pub strategy: Option<LipSyncStrategy>,
    pub fallback: Option<FallbackView>,
}
