//! Output contracts of `AvatarEngine::render`.
//!
//! Outputs carry the writes applied to the asset this frame, keyed by node, so a
//! host renderer can mirror them onto its own scene, plus the badge, the active
//! render mode, the fallback view when relevant, and semantic events.

use serde::Serialize;

use crate::fallback::FallbackView;
use crate::ids::NodeId;
use crate::state::StateBadge;
use crate::synth::LipSyncStrategy;

/// Which pipeline presented this frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Asset requested but not ready yet.
    Loading,
    /// 3D asset animated procedurally.
    Scene,
    /// 2D substitute.
    Fallback,
}

/// One value written into the asset.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelWrite {
    Weight { node: NodeId, index: usize, value: f32 },
    Rotation { node: NodeId, value: [f32; 4] },
    Translation { node: NodeId, value: [f32; 3] },
}

impl ChannelWrite {
    pub fn node(&self) -> NodeId {
        match self {
            ChannelWrite::Weight { node, .. }
            | ChannelWrite::Rotation { node, .. }
            | ChannelWrite::Translation { node, .. } => *node,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum EngineEvent {
    AssetLoaded {
        asset_ref: String,
        strategy: LipSyncStrategy,
    },
    AssetReleased {
        asset_ref: String,
    },
    FallbackActivated {
        reason: String,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct FrameOutputs {
    pub time: f32,
    pub mode: RenderMode,
    pub badge: StateBadge,
    /// Active lip-sync technique while in `Scene` mode.
    pub strategy: Option<LipSyncStrategy>,
    pub writes: Vec<ChannelWrite>,
    pub fallback: Option<FallbackView>,
    pub events: Vec<EngineEvent>,
}

impl Default for FrameOutputs {
    fn default() -> Self {
        Self {
            time: 0.0,
            mode: RenderMode::Loading,
            badge: StateBadge::for_state(Default::default()),
            strategy: None,
            writes: Vec::new(),
            fallback: None,
            events: Vec::new(),
        }
    }
}

impl FrameOutputs {
    #[inline]
    pub fn clear(&mut self) {
        self.strategy = None;
        self.writes.clear();
        self.fallback = None;
        self.events.clear();
    }

    #[inline]
    pub fn push_write(&mut self, write: ChannelWrite) {
        self.writes.push(write);
    }

    #[inline]
    pub fn push_event(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    /// Last weight written this frame for a channel, if any.
    pub fn weight(&self, node: NodeId, index: usize) -> Option<f32> {
        self.writes.iter().rev().find_map(|w| match w {
            ChannelWrite::Weight { node: n, index: i, value } if *n == node && *i == index => Some(*value),
            _ => None,
        })
    }

    /// Last rotation written this frame for a node, if any.
    pub fn rotation(&self, node: NodeId) -> Option<[f32; 4]> {
        self.writes.iter().rev().find_map(|w| match w {
            ChannelWrite::Rotation { node: n, value } if *n == node => Some(*value),
            _ => None,
        })
    }
}
