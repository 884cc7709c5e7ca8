//! AvatarEngine: owns the loaded asset and every per-asset capture, and turns
//! `RenderProps` into one frame of procedural animation.
//!
//! Per frame: resolve the asset reference (request, poll, swap), pick the render
//! mode, then either run the scene pipeline (synthesize → lip/jaw → smile →
//! blink → head or whole-asset motion → breathing) or produce the fallback view.

use crate::apply::{Applier, BasePose};
use crate::asset::CharacterAsset;
use crate::blink::BlinkScheduler;
use crate::config::Config;
use crate::error::AssetError;
use crate::fallback::FallbackRenderer;
use crate::motion::{breathing_offset, head_offset, idle_smile, whole_asset_offset};
use crate::outputs::{EngineEvent, FrameOutputs, RenderMode};
use crate::probe::{CapabilityCache, CapabilityDescriptor};
use crate::source::{AssetPoll, AssetSource, MemoryAssetSource};
use crate::state::{RenderProps, StateBadge};
use crate::synth::{speech_active, synthesize, LipSyncStrategy};

/// Everything captured for one loaded asset. Dropped as a unit on swap.
#[derive(Debug)]
struct LoadedAvatar {
    asset_ref: String,
    asset: CharacterAsset,
    base: BasePose,
    strategy: LipSyncStrategy,
}

#[derive(Debug, Default)]
enum AssetSlot {
    #[default]
    Empty,
    Requested(String),
    Loaded(Box<LoadedAvatar>),
    Failed {
        asset_ref: String,
        error: AssetError,
    },
}

impl AssetSlot {
    fn asset_ref(&self) -> &str {
        match self {
            AssetSlot::Empty => "",
            AssetSlot::Requested(r) => r,
            AssetSlot::Loaded(l) => &l.asset_ref,
            AssetSlot::Failed { asset_ref, .. } => asset_ref,
        }
    }
}

#[derive(Debug)]
pub struct AvatarEngine<S: AssetSource = MemoryAssetSource> {
    cfg: Config,
    source: S,
    // seconds since creation; f64 so long sessions keep frame-sized steps
    time: f64,
    slot: AssetSlot,
    caps: CapabilityCache,
    blink: BlinkScheduler,
    fallback: FallbackRenderer,
    renderer_available: bool,
    // set while the fallback is showing, so activation is reported once
    fallback_active: bool,
    // events raised outside `render` wait here for the next frame
    pending_events: Vec<EngineEvent>,
    outputs: FrameOutputs,
}

impl Default for AvatarEngine<MemoryAssetSource> {
    fn default() -> Self {
        Self::new(Config::default(), MemoryAssetSource::default())
    }
}

impl<S: AssetSource> AvatarEngine<S> {
    /// Create an engine. `cfg` is taken as is; hosts that accept user config
    /// should run `Config::validate` first.
    pub fn new(cfg: Config, source: S) -> Self {
        let blink = BlinkScheduler::new(cfg.blink.clone());
        Self {
            cfg,
            source,
            time: 0.0,
            slot: AssetSlot::Empty,
            caps: CapabilityCache::new(),
            blink,
            fallback: FallbackRenderer::new(),
            renderer_available: true,
            fallback_active: false,
            pending_events: Vec::new(),
            outputs: FrameOutputs::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Outputs of the most recent `render` call.
    pub fn outputs(&self) -> &FrameOutputs {
        &self.outputs
    }

    pub fn asset(&self) -> Option<&CharacterAsset> {
        match &self.slot {
            AssetSlot::Loaded(l) => Some(&l.asset),
            _ => None,
        }
    }

    pub fn descriptor(&self) -> Option<&CapabilityDescriptor> {
        self.asset().and_then(|_| self.caps.get())
    }

    pub fn strategy(&self) -> Option<LipSyncStrategy> {
        match &self.slot {
            AssetSlot::Loaded(l) => Some(l.strategy),
            _ => None,
        }
    }

    pub fn blink(&self) -> &BlinkScheduler {
        &self.blink
    }

    /// Last load error for the current asset reference, if loading failed.
    pub fn load_error(&self) -> Option<&AssetError> {
        match &self.slot {
            AssetSlot::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Host reports whether a 3D renderer exists. While unavailable, every
    /// frame renders the fallback regardless of the asset.
    pub fn set_renderer_available(&mut self, available: bool) {
        if self.renderer_available != available {
            log::info!("3D renderer available: {available}");
        }
        self.renderer_available = available;
    }

    pub fn renderer_available(&self) -> bool {
        self.renderer_available
    }

    /// Drop the current asset and all captures. The next `render` with a
    /// non-empty reference starts a fresh request, and reports `AssetReleased`.
    pub fn release(&mut self) {
        if let AssetSlot::Loaded(l) = std::mem::take(&mut self.slot) {
            log::info!("releasing asset '{}'", l.asset_ref);
            self.source.release(&l.asset_ref);
            self.pending_events.push(EngineEvent::AssetReleased {
                asset_ref: l.asset_ref,
            });
        }
        self.caps.clear();
    }

    /// Sole per-frame entry point.
    pub fn render(&mut self, dt: f32, props: &RenderProps) -> &FrameOutputs {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.outputs.clear();
        self.time += f64::from(dt);
        self.outputs.time = self.time as f32;
        self.outputs.badge = StateBadge::for_state(props.animation_state);

        self.sync_asset(&props.asset_ref);
        for ev in self.pending_events.drain(..) {
            self.outputs.push_event(ev);
        }

        let blink = self.blink.advance(dt);
        let mode = if !self.renderer_available {
            RenderMode::Fallback
        } else {
            match &self.slot {
                AssetSlot::Loaded(_) => RenderMode::Scene,
                AssetSlot::Requested(_) => RenderMode::Loading,
                AssetSlot::Empty | AssetSlot::Failed { .. } => RenderMode::Fallback,
            }
        };
        self.outputs.mode = mode;

        match mode {
            RenderMode::Scene => {
                self.fallback_active = false;
                self.fallback.reset();
                self.render_scene(dt, blink, props);
            }
            RenderMode::Loading => {
                self.outputs.fallback =
                    Some(self.fallback.advance(dt, props.animation_state, props.is_speaking));
            }
            RenderMode::Fallback => {
                if !self.fallback_active {
                    self.fallback_active = true;
                    let reason = self.fallback_reason();
                    log::warn!("showing fallback avatar: {reason}");
                    self.outputs
                        .push_event(EngineEvent::FallbackActivated { reason });
                }
                self.outputs.fallback =
                    Some(self.fallback.advance(dt, props.animation_state, props.is_speaking));
            }
        }
        &self.outputs
    }

    fn fallback_reason(&self) -> String {
        if !self.renderer_available {
            return AssetError::RendererUnavailable.to_string();
        }
        match &self.slot {
            AssetSlot::Failed { error, .. } => error.to_string(),
            _ => "no asset reference".to_string(),
        }
    }

    fn sync_asset(&mut self, asset_ref: &str) {
        if self.slot.asset_ref() != asset_ref {
            self.release();
            self.slot = if asset_ref.is_empty() {
                AssetSlot::Empty
            } else {
                log::debug!("requesting asset '{asset_ref}'");
                AssetSlot::Requested(asset_ref.to_string())
            };
        }
        let AssetSlot::Requested(path) = &self.slot else {
            return;
        };
        let path = path.clone();
        match self.source.poll(&path) {
            AssetPoll::Pending => {}
            AssetPoll::Ready(asset) => self.install(path, asset),
            AssetPoll::Failed(error) => {
                log::warn!("failed to load asset '{path}': {error}");
                self.slot = AssetSlot::Failed {
                    asset_ref: path,
                    error,
                };
            }
        }
    }

    fn install(&mut self, asset_ref: String, asset: CharacterAsset) {
        let desc = self.caps.get_or_probe(&asset, &self.cfg.probe);
        let strategy = LipSyncStrategy::select(desc);
        let base = BasePose::capture(&asset, desc);
        log::info!(
            "asset '{}' ready ({} nodes), lip-sync strategy {:?}",
            asset_ref,
            asset.len(),
            strategy
        );
        self.pending_events.push(EngineEvent::AssetLoaded {
            asset_ref: asset_ref.clone(),
            strategy,
        });
        self.slot = AssetSlot::Loaded(Box::new(LoadedAvatar {
            asset_ref,
            asset,
            base,
            strategy,
        }));
    }

    fn render_scene(&mut self, dt: f32, blink: f32, props: &RenderProps) {
        let AssetSlot::Loaded(loaded) = &mut self.slot else {
            return;
        };
        let Some(desc) = self.caps.get() else {
            return;
        };
        let LoadedAvatar {
            asset,
            base,
            strategy,
            ..
        } = loaded.as_mut();
        let (state, speaking) = (props.animation_state, props.is_speaking);
        let time = self.outputs.time;
        let talking = speech_active(state, speaking);
        self.outputs.strategy = Some(*strategy);

        let targets = synthesize(time, state, speaking, desc, *strategy, &self.cfg.synth);
        let motion = &self.cfg.motion;
        let mut writes = std::mem::take(&mut self.outputs.writes);
        if let Some(mut ap) = Applier::new(asset, desc, base, &self.cfg.synth, &mut writes) {
            ap.apply_lip(&targets);
            ap.apply_jaw(targets.jaw_angle, dt);
            ap.apply_smile((!talking).then(|| idle_smile(time, motion)));
            ap.apply_blink(blink);
            let bob = breathing_offset(time, motion);
            match desc.joints.look_joint() {
                Some(joint) => {
                    ap.apply_look(joint, head_offset(time, state, speaking, motion));
                    ap.apply_root(None, bob);
                }
                None => {
                    ap.apply_root(Some(whole_asset_offset(time, state, speaking, motion)), bob);
                }
            }
        }
        self.outputs.writes = writes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AnimationState;

    const FACE: &str = r#"{ "nodes": [
        { "name": "Root", "children": [1] },
        { "name": "Head", "children": [2] },
        { "name": "Face", "surface": { "channels": ["mouthOpen", "eyeBlinkLeft", "eyeBlinkRight", "mouthSmile"] } }
    ] }"#;

    fn engine() -> AvatarEngine {
        let mut e = AvatarEngine::default();
        e.source_mut().insert_json("face.json", FACE).unwrap();
        e
    }

    #[test]
    fn loads_on_first_frame() {
        let mut e = engine();
        let out = e.render(1.0 / 60.0, &RenderProps::new(AnimationState::Idle, false, "face.json"));
        assert_eq!(out.mode, RenderMode::Scene);
        assert_eq!(out.strategy, Some(LipSyncStrategy::MouthOpen));
        assert!(out
            .events
            .iter()
            .any(|ev| matches!(ev, EngineEvent::AssetLoaded { .. })));
    }

    #[test]
    fn empty_ref_falls_back_once() {
        let mut e = engine();
        let props = RenderProps::new(AnimationState::Idle, false, "");
        assert_eq!(e.render(0.016, &props).events.len(), 1);
        assert!(e.render(0.016, &props).events.is_empty());
        assert!(e.outputs().fallback.is_some());
    }

    #[test]
    fn renderer_unavailable_overrides_scene() {
        let mut e = engine();
        e.set_renderer_available(false);
        let out = e.render(0.016, &RenderProps::new(AnimationState::Speaking, true, "face.json"));
        assert_eq!(out.mode, RenderMode::Fallback);
        assert!(out.writes.is_empty());
        assert!(matches!(
            out.events.last(),
            Some(EngineEvent::FallbackActivated { reason }) if reason.contains("unavailable")
        ));
    }

    #[test]
    fn negative_dt_does_not_rewind() {
        let mut e = engine();
        let props = RenderProps::new(AnimationState::Idle, false, "face.json");
        e.render(0.5, &props);
        e.render(-1.0, &props);
        assert_eq!(e.time(), 0.5);
    }

    /// it should report a host-initiated release on the following frame
    #[test]
    fn direct_release_is_reported_next_frame() {
        let mut e = engine();
        let props = RenderProps::new(AnimationState::Idle, false, "face.json");
        e.render(0.016, &props);
        e.release();
        let out = e.render(0.016, &props);
        assert!(matches!(
            &out.events[0],
            EngineEvent::AssetReleased { asset_ref } if asset_ref == "face.json"
        ));
        assert!(matches!(&out.events[1], EngineEvent::AssetLoaded { .. }));
        assert!(e.render(0.016, &props).events.is_empty());
    }

    /// it should keep frame-sized steps exact over long sessions
    #[test]
    fn clock_does_not_drift() {
        let mut e = engine();
        let props = RenderProps::new(AnimationState::Idle, false, "");
        let frames = 360_000;
        for _ in 0..frames {
            e.render(1.0 / 60.0, &props);
        }
        let expected = frames as f64 * f64::from(1.0f32 / 60.0);
        assert!((e.time() - expected).abs() < 1e-6, "time {}", e.time());
        assert!((e.time() - 6000.0).abs() < 1e-3);
    }
}
