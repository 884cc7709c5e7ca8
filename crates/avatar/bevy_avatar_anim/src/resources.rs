use avatar_anim_core::{AvatarEngine, Config, FrameOutputs, MemoryAssetSource, MissingPolicy};
use bevy::prelude::*;
use std::collections::HashMap;

/// One engine per avatar root plus the entity behind every snapshot node.
#[derive(Debug)]
pub struct AvatarBinding {
    pub engine: AvatarEngine,
    /// `NodeId` index → entity, from the last hierarchy snapshot. The avatar
    /// root itself maps to `None`.
    pub entities: Vec<Option<Entity>>,
    /// Asset reference the source currently holds an entry for.
    pub snapshot: Option<String>,
    /// Whether that entry was a host-reported load failure.
    pub failed: bool,
}

impl AvatarBinding {
    pub fn new(config: Config) -> Self {
        Self {
            engine: AvatarEngine::new(
                config,
                MemoryAssetSource::with_missing_policy(MissingPolicy::Pending),
            ),
            entities: Vec::new(),
            snapshot: None,
            failed: false,
        }
    }
}

/// Engines keyed by avatar root entity.
#[derive(Resource, Default)]
pub struct AvatarEngines {
    pub map: HashMap<Entity, AvatarBinding>,
}

/// Engine configuration applied to newly bound avatars.
#[derive(Resource, Default, Clone)]
pub struct AvatarSettings(pub Config);

/// Outputs staged by the tick system to be applied in a separate system
/// (keeps ordering explicit: Compute -> Apply).
#[derive(Resource, Default)]
pub struct PendingOutputs {
    pub frames: Vec<(Entity, FrameOutputs)>,
}

/// Fixed timestep configuration (seconds per tick).
#[derive(Resource)]
pub struct FixedDt(pub f32);

impl Default for FixedDt {
    fn default() -> Self {
        Self(1.0 / 60.0)
    }
}
