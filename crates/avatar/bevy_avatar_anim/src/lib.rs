//! Bevy adapter for the avatar animation core.
//!
//! Mark a character hierarchy with `AvatarRoot`; the plugin snapshots it into a
//! `CharacterAsset` in `Update`, renders every avatar on `FixedUpdate` with
//! `FixedDt`, and writes the results back onto `Transform` and `MorphWeights`.

use avatar_anim_core::Config;
use bevy::prelude::*;

pub mod components;
pub mod resources;
pub mod systems;

pub use components::{AvatarFrame, AvatarLoadFailed, AvatarRoot, AvatarState, MorphChannelNames};
pub use resources::{AvatarBinding, AvatarEngines, AvatarSettings, FixedDt, PendingOutputs};

#[derive(Default)]
pub struct AvatarAnimPlugin {
    pub config: Config,
}

impl Plugin for AvatarAnimPlugin {
    fn build(&self, app: &mut App) {
        let config = match self.config.validate() {
            Ok(()) => self.config.clone(),
            Err(e) => {
                warn!("invalid avatar config ({e}); using defaults");
                Config::default()
            }
        };
        app.insert_resource(AvatarSettings(config))
            .init_resource::<AvatarEngines>()
            .init_resource::<PendingOutputs>()
            .init_resource::<FixedDt>()
            .add_systems(Update, systems::snapshot_avatars_system)
            .add_systems(
                FixedUpdate,
                (systems::tick_avatars_system, systems::apply_outputs_system).chain(),
            );
    }
}
