//! Host-facing per-frame inputs and the state badge.

use serde::{Deserialize, Serialize};

/// Discrete affect requested by the host. Exactly one is active per frame and
/// transitions are instantaneous.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationState {
    #[default]
    Idle,
    Speaking,
    Listening,
    Thinking,
}

impl AnimationState {
    pub const ALL: [AnimationState; 4] = [
        AnimationState::Idle,
        AnimationState::Speaking,
        AnimationState::Listening,
        AnimationState::Thinking,
    ];
}

/// Props supplied by the host on every `render` call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderProps {
    #[serde(default)]
    pub animation_state: AnimationState,
    /// Audio is playing right now. May disagree with `animation_state`.
    #[serde(default)]
    pub is_speaking: bool,
    /// Path of the character asset; empty means no asset.
    #[serde(default)]
    pub asset_ref: String,
}

impl RenderProps {
    pub fn new(animation_state: AnimationState, is_speaking: bool, asset_ref: impl Into<String>) -> Self {
        Self {
            animation_state,
            is_speaking,
            asset_ref: asset_ref.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeColor {
    Gray,
    Blue,
    Green,
    Yellow,
}

impl BadgeColor {
    pub fn css_class(self) -> &'static str {
        match self {
            BadgeColor::Gray => "bg-gray-500",
            BadgeColor::Blue => "bg-blue-500",
            BadgeColor::Green => "bg-green-500",
            BadgeColor::Yellow => "bg-yellow-500",
        }
    }
}

/// Small indicator shown next to the avatar. The label/color mapping is fixed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StateBadge {
    pub label: &'static str,
    pub color: BadgeColor,
}

impl StateBadge {
    pub fn for_state(state: AnimationState) -> Self {
        let (label, color) = match state {
            AnimationState::Idle => ("Ready", BadgeColor::Gray),
            AnimationState::Speaking => ("Speaking", BadgeColor::Blue),
            AnimationState::Listening => ("Listening", BadgeColor::Green),
            AnimationState::Thinking => ("Thinking", BadgeColor::Yellow),
        };
        Self { label, color }
    }
}
