//! Blend/decay application: write synthesized values into the channels and joints
//! the prober found, or decay them toward rest.
//!
//! Every write goes through a bounds check; an index outside the surface's
//! channel list is skipped silently. Nothing here assumes a role exists.

use hashbrown::HashMap;

use crate::asset::CharacterAsset;
use crate::config::SynthConfig;
use crate::ids::NodeId;
use crate::math::{mul_quat, nlerp_quat, quat_distance, quat_from_euler_xyz, quat_from_rotation_x};
use crate::outputs::ChannelWrite;
use crate::probe::CapabilityDescriptor;
use crate::synth::{decay_weight, joint_return_factor, ChannelTargets};

/// Component distance below which an easing joint is considered back at its base pose.
const JOINT_REST_EPSILON: f32 = 1e-4;

/// Load-time transforms used as the zero point of every procedural offset.
/// Captured once per asset; never written afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct BasePose {
    joints: HashMap<NodeId, [f32; 4]>,
    root: NodeId,
    root_rotation: [f32; 4],
    root_translation: [f32; 3],
}

impl BasePose {
    /// Capture the head, jaw and neck joints named by `desc` plus the asset root.
    pub fn capture(asset: &CharacterAsset, desc: &CapabilityDescriptor) -> Self {
        let mut joints = HashMap::new();
        for id in [desc.joints.head, desc.joints.jaw, desc.joints.neck]
            .into_iter()
            .flatten()
        {
            if let Some(n) = asset.node(id) {
                joints.entry(id).or_insert(n.transform.rotation);
            }
        }
        let root = asset.root();
        let root_tf = asset.node(root).map(|n| n.transform).unwrap_or_default();
        Self {
            joints,
            root,
            root_rotation: root_tf.rotation,
            root_translation: root_tf.translation,
        }
    }

    pub fn joint(&self, id: NodeId) -> Option<[f32; 4]> {
        self.joints.get(&id).copied()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_rotation(&self) -> [f32; 4] {
        self.root_rotation
    }

    pub fn root_translation(&self) -> [f32; 3] {
        self.root_translation
    }
}

/// Per-frame writer over one asset and its descriptor.
pub struct Applier<'a> {
    asset: &'a mut CharacterAsset,
    desc: &'a CapabilityDescriptor,
    base: &'a BasePose,
    cfg: &'a SynthConfig,
    out: &'a mut Vec<ChannelWrite>,
}

impl<'a> Applier<'a> {
    /// Returns `None` when the descriptor was computed for a different asset.
    pub fn new(
        asset: &'a mut CharacterAsset,
        desc: &'a CapabilityDescriptor,
        base: &'a BasePose,
        cfg: &'a SynthConfig,
        out: &'a mut Vec<ChannelWrite>,
    ) -> Option<Self> {
        if desc.token != asset.token() {
            log::warn!(
                "descriptor for {:?} does not match asset '{}' ({:?}); skipping writes",
                desc.token,
                asset.name(),
                asset.token()
            );
            return None;
        }
        Some(Self {
            asset,
            desc,
            base,
            cfg,
            out,
        })
    }

    fn write_weight(&mut self, node: NodeId, index: usize, value: f32) {
        let value = value.clamp(0.0, 1.0);
        let Some(surface) = self.asset.surface_mut(node) else {
            log::trace!("skip weight write: node {} has no surface", node.0);
            return;
        };
        if surface.weight(index) == Some(value) {
            return;
        }
        if surface.set_weight(index, value) {
            self.out.push(ChannelWrite::Weight { node, index, value });
        } else {
            log::trace!("skip weight write: index {index} out of range on node {}", node.0);
        }
    }

    fn decay(&mut self, node: NodeId, index: usize) {
        let Some(current) = self.asset.surface(node).and_then(|s| s.weight(index)) else {
            return;
        };
        if current != 0.0 {
            self.write_weight(node, index, decay_weight(current, self.cfg));
        }
    }

    fn target_or_decay(&mut self, node: NodeId, index: usize, target: Option<f32>) {
        match target {
            Some(v) => self.write_weight(node, index, v),
            None => self.decay(node, index),
        }
    }

    fn set_rotation(&mut self, node: NodeId, value: [f32; 4]) {
        if let Some(n) = self.asset.node_mut(node) {
            n.transform.rotation = value;
            self.out.push(ChannelWrite::Rotation { node, value });
        }
    }

    fn set_translation(&mut self, node: NodeId, value: [f32; 3]) {
        if let Some(n) = self.asset.node_mut(node) {
            n.transform.translation = value;
            self.out.push(ChannelWrite::Translation { node, value });
        }
    }

    /// Viseme, mouth-open and brow channels on every surface.
    pub fn apply_lip(&mut self, targets: &ChannelTargets) {
        let desc = self.desc;
        for caps in &desc.surfaces {
            for &(slot, ch) in &caps.visemes {
                self.target_or_decay(caps.node, ch, targets.visemes.get(slot).copied());
            }
            if let Some(ch) = caps.mouth_open {
                self.target_or_decay(caps.node, ch, targets.mouth_open);
            }
            if let Some(ch) = caps.brow {
                self.target_or_decay(caps.node, ch, targets.brow);
            }
        }
    }

    /// Jaw joint: additive opening while active, exponential return otherwise.
    pub fn apply_jaw(&mut self, angle: Option<f32>, dt: f32) {
        let Some(jaw) = self.desc.joints.jaw else {
            return;
        };
        let Some(base) = self.base.joint(jaw) else {
            return;
        };
        match angle {
            Some(a) => {
                let a = a.clamp(0.0, self.cfg.jaw_max_angle);
                self.set_rotation(jaw, mul_quat(base, quat_from_rotation_x(a)));
            }
            None => {
                let Some(current) = self.asset.node(jaw).map(|n| n.transform.rotation) else {
                    return;
                };
                if current == base {
                    return;
                }
                let next = nlerp_quat(current, base, joint_return_factor(dt, self.cfg));
                let next = if quat_distance(next, base) < JOINT_REST_EPSILON {
                    base
                } else {
                    next
                };
                self.set_rotation(jaw, next);
            }
        }
    }

    /// Smile channels: held at `value` when given, decayed otherwise.
    pub fn apply_smile(&mut self, value: Option<f32>) {
        let desc = self.desc;
        for caps in &desc.surfaces {
            for &ch in &caps.smile {
                self.target_or_decay(caps.node, ch, value);
            }
        }
    }

    /// Same value into both blink channels of every surface.
    pub fn apply_blink(&mut self, value: f32) {
        let desc = self.desc;
        for caps in &desc.surfaces {
            if let Some(ch) = caps.blink_left {
                self.write_weight(caps.node, ch, value);
            }
            if let Some(ch) = caps.blink_right {
                self.write_weight(caps.node, ch, value);
            }
        }
    }

    /// Head (or neck) rotation: base pose composed with the Euler offset.
    pub fn apply_look(&mut self, joint: NodeId, offset: [f32; 3]) {
        if let Some(base) = self.base.joint(joint) {
            self.set_rotation(joint, mul_quat(base, quat_from_euler_xyz(offset)));
        }
    }

    /// Asset root: optional whole-asset rotation plus the breathing bob.
    pub fn apply_root(&mut self, rotation_offset: Option<[f32; 3]>, bob: f32) {
        let root = self.base.root();
        if let Some(offset) = rotation_offset {
            let q = mul_quat(self.base.root_rotation(), quat_from_euler_xyz(offset));
            self.set_rotation(root, q);
        }
        let mut t = self.base.root_translation();
        t[1] += bob;
        self.set_translation(root, t);
    }
}
