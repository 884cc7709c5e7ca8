use avatar_anim_core::{
    config::Config,
    math::{mul_quat, quat_angle_between, quat_from_euler_xyz},
    motion::head_offset,
    outputs::{ChannelWrite, EngineEvent, RenderMode},
    source::{AssetPoll, AssetSource, MemoryAssetSource, MissingPolicy},
    AnimationState, AvatarEngine, CharacterAsset, DirAssetSource, LipSyncStrategy, MouthShape,
    NodeId, RenderProps,
};

const DT: f32 = 1.0 / 60.0;

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn engine_with(keys: &[&str], cfg: Config) -> AvatarEngine {
    let mut source = MemoryAssetSource::new();
    for key in keys {
        let json = avatar_test_fixtures::assets::json(key).expect("fixture");
        source.insert_json(*key, &json).expect("parse fixture");
    }
    AvatarEngine::new(cfg, source)
}

fn seeded_config() -> Config {
    let json = avatar_test_fixtures::configs::json("seeded").expect("config fixture");
    Config::from_json_str(&json).expect("config")
}

fn props(state: AnimationState, speaking: bool, asset: &str) -> RenderProps {
    RenderProps::new(state, speaking, asset)
}

fn weight(engine: &AvatarEngine, node: NodeId, index: usize) -> f32 {
    engine
        .asset()
        .and_then(|a| a.surface(node))
        .and_then(|s| s.weight(index))
        .unwrap_or(0.0)
}

/// Lip-related channels (visemes, mouth-open, brow) of every probed surface.
fn lip_channels(engine: &AvatarEngine) -> Vec<(NodeId, usize)> {
    let desc = engine.descriptor().expect("descriptor");
    let mut out = Vec::new();
    for s in &desc.surfaces {
        out.extend(s.visemes.iter().map(|(_, ch)| (s.node, *ch)));
        out.extend(s.mouth_open.map(|ch| (s.node, ch)));
        out.extend(s.brow.map(|ch| (s.node, ch)));
    }
    out
}

/// it should keep every written weight in [0, 1] and the jaw within its limit
#[test]
fn writes_stay_in_bounds() {
    let keys = ["full-face", "mouth-open-only", "mouth-open-jaw", "jaw-only", "bare", "multi-surface", "combined-blink"];
    let cfg = Config::default();
    let jaw_max = cfg.synth.jaw_max_angle;
    let mut engine = engine_with(&keys, cfg);
    for key in keys {
        let base_jaw = {
            engine.render(DT, &props(AnimationState::Idle, false, key));
            engine
                .descriptor()
                .and_then(|d| d.joints.jaw)
                .and_then(|j| engine.asset().and_then(|a| a.node(j)).map(|n| (j, n.transform.rotation)))
        };
        for frame in 0..900 {
            let state = AnimationState::ALL[(frame / 120) % 4];
            let speaking = (frame / 45) % 3 != 0;
            let out = engine.render(DT, &props(state, speaking, key));
            assert_eq!(out.mode, RenderMode::Scene, "{key}");
            for w in &out.writes {
                if let ChannelWrite::Weight { value, .. } = w {
                    assert!((0.0..=1.0).contains(value), "{key}: {w:?}");
                }
            }
            if let Some((jaw, base)) = base_jaw {
                if let Some(rot) = out.rotation(jaw) {
                    assert!(quat_angle_between(base, rot) <= jaw_max + 1e-3, "{key}");
                }
            }
        }
    }
}

/// it should decay every active lip channel strictly to zero after speech stops
#[test]
fn lip_channels_decay_after_speech() {
    for key in ["full-face", "mouth-open-only", "multi-surface"] {
        let mut engine = engine_with(&[key], Config::default());
        for _ in 0..60 {
            engine.render(DT, &props(AnimationState::Speaking, true, key));
        }
        let channels = lip_channels(&engine);
        let mut prev: Vec<f32> = channels.iter().map(|(n, i)| weight(&engine, *n, *i)).collect();
        assert!(prev.iter().any(|w| *w > 0.0), "{key}: nothing active while speaking");

        let mut frames = 0;
        while prev.iter().any(|w| *w > 0.0) {
            frames += 1;
            assert!(frames <= 90, "{key}: lip channels did not settle");
            engine.render(DT, &props(AnimationState::Speaking, false, key));
            let next: Vec<f32> = channels.iter().map(|(n, i)| weight(&engine, *n, *i)).collect();
            for (p, n) in prev.iter().zip(&next) {
                if *p > 0.0 {
                    assert!(*n < *p, "{key}: {n} !< {p}");
                } else {
                    assert_eq!(*n, 0.0);
                }
            }
            prev = next;
        }
    }
}

/// it should ease the jaw back to its rest pose once speech stops
#[test]
fn jaw_returns_to_rest() {
    let mut engine = engine_with(&["jaw-only"], Config::default());
    engine.render(DT, &props(AnimationState::Idle, false, "jaw-only"));
    let jaw = engine.descriptor().and_then(|d| d.joints.jaw).expect("jaw");
    let rest = engine.asset().and_then(|a| a.node(jaw)).map(|n| n.transform.rotation).expect("rest");
    for _ in 0..30 {
        engine.render(DT, &props(AnimationState::Speaking, true, "jaw-only"));
    }
    let open = engine.asset().and_then(|a| a.node(jaw)).map(|n| n.transform.rotation).expect("open");
    assert!(quat_angle_between(rest, open) > 0.01);
    for _ in 0..240 {
        engine.render(DT, &props(AnimationState::Speaking, false, "jaw-only"));
    }
    let settled = engine.asset().and_then(|a| a.node(jaw)).map(|n| n.transform.rotation).expect("settled");
    assert_eq!(settled, rest);
}

/// it should blink at an average interval inside the configured range, one pulse at a time
#[test]
fn blink_cadence() {
    let cfg = seeded_config();
    let (min, max, duration) = (cfg.blink.min_interval, cfg.blink.max_interval, cfg.blink.duration);
    let mut engine = engine_with(&["full-face"], cfg);
    let seconds = 120.0;
    let frames = (seconds / DT) as usize;
    let mut rising_edges = 0u64;
    let mut last = 0.0f32;
    for _ in 0..frames {
        engine.render(DT, &props(AnimationState::Idle, false, "full-face"));
        let face = &engine.descriptor().expect("descriptor").surfaces[0];
        let (l, r) = (face.blink_left.expect("left"), face.blink_right.expect("right"));
        let node = face.node;
        let left = weight(&engine, node, l);
        assert_eq!(left, weight(&engine, node, r));
        if last == 0.0 && left > 0.0 {
            rising_edges += 1;
        }
        last = left;
    }
    let completed = engine.blink().completed_pulses();
    assert!(completed > 0);
    assert!(rising_edges == completed || rising_edges == completed + 1);
    let avg = seconds / completed as f32;
    assert!(avg >= min && avg <= max + duration + 0.5, "average interval {avg}");
}

/// it should switch head formula on the very next frame when thinking turns into listening
#[test]
fn state_switch_has_no_carry_over() {
    let cfg = Config::default();
    let motion = cfg.motion.clone();
    let mut engine = engine_with(&["full-face"], cfg);
    for _ in 0..90 {
        engine.render(DT, &props(AnimationState::Thinking, false, "full-face"));
    }
    let head = engine.descriptor().and_then(|d| d.joints.head).expect("head");
    let out = engine.render(DT, &props(AnimationState::Listening, false, "full-face"));
    let expected = mul_quat(
        [0.0, 0.0, 0.0, 1.0],
        quat_from_euler_xyz(head_offset(out.time, AnimationState::Listening, false, &motion)),
    );
    let got = out.rotation(head).expect("head rotation written");
    for i in 0..4 {
        approx(got[i], expected[i], 1e-6);
    }
}

/// it should rotate the whole asset while speaking when no mouth or head exists
#[test]
fn bare_asset_moves_as_a_whole() {
    let mut engine = engine_with(&["bare"], Config::default());
    let out = engine.render(DT, &props(AnimationState::Speaking, true, "bare"));
    assert_eq!(out.strategy, Some(LipSyncStrategy::None));
    let root = engine.asset().expect("asset").root();
    let mut angles = Vec::new();
    for _ in 0..60 {
        let out = engine.render(DT, &props(AnimationState::Speaking, true, "bare"));
        assert!(out.writes.iter().all(|w| !matches!(w, ChannelWrite::Weight { .. })));
        let rot = out.rotation(root).expect("root rotation");
        angles.push(quat_angle_between([0.0, 0.0, 0.0, 1.0], rot));
    }
    assert!(angles.iter().cloned().fold(0.0f32, f32::max) > 1e-3);
}

/// it should show the talking mouth in fallback on the same frame the scene path would move lips
#[test]
fn fallback_parity() {
    let mut engine = engine_with(&["full-face"], Config::default());
    let out = engine.render(DT, &props(AnimationState::Speaking, true, ""));
    assert_eq!(out.mode, RenderMode::Fallback);
    let view = out.fallback.as_ref().expect("fallback view");
    assert!(matches!(view.mouth, MouthShape::Talking { .. }));
    assert!(view.ring.pulsing);

    let out = engine.render(DT, &props(AnimationState::Speaking, true, "full-face"));
    assert_eq!(out.mode, RenderMode::Scene);
    assert!(out.writes.iter().any(|w| matches!(w, ChannelWrite::Weight { value, .. } if *value > 0.0)));

    let out = engine.render(DT, &props(AnimationState::Speaking, false, ""));
    let view = out.fallback.as_ref().expect("fallback view");
    assert_eq!(view.mouth, MouthShape::Neutral);
}

/// it should drive only the selected lip-sync technique and leave the lower-priority rigs alone
#[test]
fn one_lip_sync_technique_at_a_time() {
    let cases = [
        ("full-face", LipSyncStrategy::Visemes),
        ("mouth-open-jaw", LipSyncStrategy::MouthOpen),
    ];
    for (key, expected) in cases {
        let mut engine = engine_with(&[key], Config::default());
        engine.render(DT, &props(AnimationState::Idle, false, key));
        assert_eq!(engine.strategy(), Some(expected), "{key}");
        let desc = engine.descriptor().expect("descriptor").clone();
        let jaw = desc.joints.jaw.expect("jaw joint");
        let rest = engine.asset().and_then(|a| a.node(jaw)).map(|n| n.transform.rotation).expect("jaw");
        let face = &desc.surfaces[0];

        let (mut viseme_peak, mut mouth_peak) = (0.0f32, 0.0f32);
        for _ in 0..300 {
            let out = engine.render(DT, &props(AnimationState::Speaking, true, key));
            for w in &out.writes {
                match w {
                    ChannelWrite::Rotation { node, .. } => assert_ne!(*node, jaw, "{key}: jaw written"),
                    ChannelWrite::Weight { node, index, value } if *node == face.node => {
                        if face.mouth_open == Some(*index) {
                            mouth_peak = mouth_peak.max(*value);
                        }
                        if face.visemes.iter().any(|(_, ch)| ch == index) {
                            viseme_peak = viseme_peak.max(*value);
                        }
                    }
                    _ => {}
                }
            }
        }
        let settled = engine.asset().and_then(|a| a.node(jaw)).map(|n| n.transform.rotation).expect("jaw");
        assert_eq!(settled, rest, "{key}");
        match expected {
            LipSyncStrategy::Visemes => {
                assert!(viseme_peak > 0.1, "{key}: visemes {viseme_peak}");
                assert_eq!(mouth_peak, 0.0, "{key}: mouth-open driven alongside visemes");
            }
            _ => {
                assert!(face.visemes.is_empty());
                assert!(mouth_peak > 0.1, "{key}: mouth-open {mouth_peak}");
            }
        }
    }
}

/// it should report the badge for every state regardless of render mode
#[test]
fn badge_follows_state() {
    let mut engine = engine_with(&["full-face"], Config::default());
    for asset in ["", "full-face"] {
        for (state, label) in [
            (AnimationState::Idle, "Ready"),
            (AnimationState::Speaking, "Speaking"),
            (AnimationState::Listening, "Listening"),
            (AnimationState::Thinking, "Thinking"),
        ] {
            assert_eq!(engine.render(DT, &props(state, false, asset)).badge.label, label);
        }
    }
}

/// it should release the old asset and probe the new one on swap
#[test]
fn asset_swap_recaptures() {
    let mut engine = engine_with(&["full-face", "jaw-only"], Config::default());
    engine.render(DT, &props(AnimationState::Speaking, true, "full-face"));
    let first_token = engine.asset().expect("asset").token();

    let out = engine.render(DT, &props(AnimationState::Speaking, true, "jaw-only"));
    assert!(matches!(&out.events[0], EngineEvent::AssetReleased { asset_ref } if asset_ref == "full-face"));
    assert!(matches!(
        &out.events[1],
        EngineEvent::AssetLoaded { asset_ref, strategy: LipSyncStrategy::JawBone } if asset_ref == "jaw-only"
    ));
    let asset = engine.asset().expect("asset");
    assert_ne!(asset.token(), first_token);
    assert_eq!(engine.descriptor().expect("descriptor").token, asset.token());
    assert_eq!(engine.strategy(), Some(LipSyncStrategy::JawBone));
}

/// it should fall back once on a failed load and never poll again
#[test]
fn failed_load_falls_back_without_retry() {
    #[derive(Debug, Default)]
    struct CountingSource {
        polls: usize,
    }
    impl AssetSource for CountingSource {
        fn poll(&mut self, path: &str) -> AssetPoll {
            self.polls += 1;
            AssetPoll::Failed(avatar_anim_core::AssetError::NotFound { path: path.into() })
        }
    }

    let mut engine = AvatarEngine::new(Config::default(), CountingSource::default());
    let p = props(AnimationState::Idle, false, "missing.glb");
    let out = engine.render(DT, &p);
    assert_eq!(out.mode, RenderMode::Fallback);
    assert!(matches!(
        out.events.as_slice(),
        [EngineEvent::FallbackActivated { reason }] if reason.contains("missing.glb")
    ));
    for _ in 0..10 {
        assert!(engine.render(DT, &p).events.is_empty());
    }
    assert_eq!(engine.source().polls, 1);
    assert!(engine.load_error().is_some());
}

/// it should render a loading frame while the asset is pending and switch once provided
#[test]
fn pending_then_ready() {
    let mut engine = AvatarEngine::new(
        Config::default(),
        MemoryAssetSource::with_missing_policy(MissingPolicy::Pending),
    );
    let p = props(AnimationState::Listening, false, "late");
    let out = engine.render(DT, &p);
    assert_eq!(out.mode, RenderMode::Loading);
    assert!(out.events.is_empty());
    assert!(out.fallback.is_some());

    let json = avatar_test_fixtures::assets::json("mouth-open-only").expect("fixture");
    engine.source_mut().insert_json("late", &json).expect("parse");
    let out = engine.render(DT, &p);
    assert_eq!(out.mode, RenderMode::Scene);
    assert_eq!(out.strategy, Some(LipSyncStrategy::MouthOpen));
}

/// it should load fixtures from disk through the directory source
#[test]
fn directory_source_loads_fixture() {
    let rel = avatar_test_fixtures::assets::rel_path("full-face").expect("path");
    let mut engine = AvatarEngine::new(Config::default(), DirAssetSource::new(avatar_test_fixtures::root()));
    let out = engine.render(DT, &props(AnimationState::Idle, false, &rel));
    assert_eq!(out.mode, RenderMode::Scene);
    assert_eq!(out.strategy, Some(LipSyncStrategy::Visemes));
    let asset: &CharacterAsset = engine.asset().expect("asset");
    assert_eq!(asset.name(), "full-face");
}
