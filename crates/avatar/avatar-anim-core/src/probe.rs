//! Capability probing: classify an asset's channels and joints into semantic roles.
//!
//! `probe` is pure and idempotent; apart from log output it has no side effects.
//! Missing roles are capability gaps, never errors. `CapabilityCache` keeps the
//! descriptor keyed by `AssetToken` so it is computed once per loaded asset and
//! can never be reused for a different one.

use serde::{Deserialize, Serialize};

use crate::asset::{CharacterAsset, DeformableSurface};
use crate::config::ProbeConfig;
use crate::ids::{AssetToken, NodeId};
use crate::roles::{Role, VisemeKey};

/// Channels resolved on one deformable surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceCapabilities {
    pub node: NodeId,
    /// (slot into `CapabilityDescriptor::viseme_slots`, channel index)
    pub visemes: Vec<(usize, usize)>,
    pub mouth_open: Option<usize>,
    pub blink_left: Option<usize>,
    pub blink_right: Option<usize>,
    pub smile: Vec<usize>,
    pub brow: Option<usize>,
}

impl SurfaceCapabilities {
    fn is_empty(&self) -> bool {
        self.visemes.is_empty()
            && self.mouth_open.is_none()
            && self.blink_left.is_none()
            && self.blink_right.is_none()
            && self.smile.is_empty()
            && self.brow.is_none()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointRefs {
    pub head: Option<NodeId>,
    pub jaw: Option<NodeId>,
    pub neck: Option<NodeId>,
}

impl JointRefs {
    /// Joint driven by the motion controller: head, else neck.
    pub fn look_joint(&self) -> Option<NodeId> {
        self.head.or(self.neck)
    }
}

/// Resolved mapping from semantic roles to concrete channels and joints of one asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub token: AssetToken,
    /// Viseme categories found on at least one surface, in canonical order.
    pub viseme_slots: Vec<VisemeKey>,
    pub surfaces: Vec<SurfaceCapabilities>,
    pub joints: JointRefs,
    pub has_visemes: bool,
    pub has_mouth_open: bool,
    pub has_blink: bool,
}

impl CapabilityDescriptor {
    /// Short human-readable summary for diagnostics.
    pub fn summary(&self) -> String {
        format!(
            "{} surface(s), {} viseme slot(s), mouth_open={}, blink={}, head={:?}, jaw={:?}, neck={:?}",
            self.surfaces.len(),
            self.viseme_slots.len(),
            self.has_mouth_open,
            self.has_blink,
            self.joints.head.map(|n| n.0),
            self.joints.jaw.map(|n| n.0),
            self.joints.neck.map(|n| n.0),
        )
    }
}

fn aliases_for<'a>(role: Role, cfg: &'a ProbeConfig) -> Vec<&'a str> {
    cfg.extra_aliases
        .iter()
        .filter(|(r, _)| *r == role)
        .map(|(_, a)| a.as_str())
        .chain(role.aliases().iter().copied())
        .collect()
}

fn find_channel(surface: &DeformableSurface, role: Role, cfg: &ProbeConfig) -> Option<usize> {
    let aliases = aliases_for(role, cfg);
    surface.index_of(&aliases).or_else(|| {
        if cfg.case_insensitive {
            surface.index_of_ignore_case(&aliases)
        } else {
            None
        }
    })
}

fn find_smiles(surface: &DeformableSurface, cfg: &ProbeConfig) -> Vec<usize> {
    let aliases = aliases_for(Role::Smile, cfg);
    let mut found: Vec<usize> = surface
        .names()
        .iter()
        .enumerate()
        .filter(|(_, n)| {
            aliases.iter().any(|a| {
                if cfg.case_insensitive {
                    n.eq_ignore_ascii_case(a)
                } else {
                    n.as_str() == *a
                }
            })
        })
        .map(|(i, _)| i)
        .collect();
    found.dedup();
    found
}

fn find_joint(asset: &CharacterAsset, order: &[NodeId], role: Role, cfg: &ProbeConfig) -> Option<NodeId> {
    let aliases = aliases_for(role, cfg);
    let by = |cmp: &dyn Fn(&str, &str) -> bool| {
        aliases.iter().copied().find_map(|alias| {
            order
                .iter()
                .copied()
                .find(|id| asset.node(*id).is_some_and(|n| cmp(n.name.as_str(), alias)))
        })
    };
    by(&|a, b| a == b).or_else(|| {
        if cfg.case_insensitive {
            by(&|a, b| a.eq_ignore_ascii_case(b))
        } else {
            None
        }
    })
}

/// Inspect an asset and resolve every role the engine can drive.
pub fn probe(asset: &CharacterAsset, cfg: &ProbeConfig) -> CapabilityDescriptor {
    let order = asset.walk();

    let mut raw: Vec<(NodeId, Vec<(VisemeKey, usize)>, SurfaceCapabilities)> = Vec::new();
    for id in order.iter().copied() {
        let Some(surface) = asset.surface(id) else {
            continue;
        };
        let visemes: Vec<(VisemeKey, usize)> = VisemeKey::ALL
            .iter()
            .filter_map(|v| find_channel(surface, Role::Viseme(*v), cfg).map(|i| (*v, i)))
            .collect();
        let both = find_channel(surface, Role::BlinkBoth, cfg);
        let caps = SurfaceCapabilities {
            node: id,
            visemes: Vec::new(),
            mouth_open: find_channel(surface, Role::MouthOpen, cfg),
            blink_left: find_channel(surface, Role::BlinkLeft, cfg).or(both),
            blink_right: find_channel(surface, Role::BlinkRight, cfg).or(both),
            smile: find_smiles(surface, cfg),
            brow: find_channel(surface, Role::Brow, cfg),
        };
        log::debug!(
            "probe: surface '{}' ({} channels): {} viseme(s), mouth_open={:?}, blink=({:?}, {:?}), smile={:?}, brow={:?}",
            asset.node(id).map(|n| n.name.as_str()).unwrap_or(""),
            surface.len(),
            visemes.len(),
            caps.mouth_open,
            caps.blink_left,
            caps.blink_right,
            caps.smile,
            caps.brow,
        );
        raw.push((id, visemes, caps));
    }

    let mut viseme_slots: Vec<VisemeKey> = raw
        .iter()
        .flat_map(|(_, v, _)| v.iter().map(|(k, _)| *k))
        .collect();
    viseme_slots.sort();
    viseme_slots.dedup();

    let surfaces: Vec<SurfaceCapabilities> = raw
        .into_iter()
        .map(|(_, visemes, mut caps)| {
            caps.visemes = visemes
                .into_iter()
                .filter_map(|(k, ch)| viseme_slots.iter().position(|s| *s == k).map(|slot| (slot, ch)))
                .collect();
            caps
        })
        .filter(|c| !c.is_empty())
        .collect();

    let joints = JointRefs {
        head: find_joint(asset, &order, Role::HeadJoint, cfg),
        jaw: find_joint(asset, &order, Role::JawJoint, cfg),
        neck: find_joint(asset, &order, Role::NeckJoint, cfg),
    };

    let desc = CapabilityDescriptor {
        token: asset.token(),
        has_visemes: surfaces.iter().any(|s| !s.visemes.is_empty()),
        has_mouth_open: surfaces.iter().any(|s| s.mouth_open.is_some()),
        has_blink: surfaces
            .iter()
            .any(|s| s.blink_left.is_some() || s.blink_right.is_some()),
        viseme_slots,
        surfaces,
        joints,
    };
    log::info!("probe '{}': {}", asset.name(), desc.summary());
    desc
}

/// Memoizes one descriptor per asset identity.
#[derive(Debug, Default)]
pub struct CapabilityCache {
    entry: Option<CapabilityDescriptor>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached descriptor for `asset`, probing only when the asset
    /// identity differs from the cached one.
    pub fn get_or_probe(&mut self, asset: &CharacterAsset, cfg: &ProbeConfig) -> &CapabilityDescriptor {
        let desc = match self.entry.take() {
            Some(d) if d.token == asset.token() => d,
            _ => probe(asset, cfg),
        };
        self.entry.insert(desc)
    }

    pub fn get(&self) -> Option<&CapabilityDescriptor> {
        self.entry.as_ref()
    }

    /// Drop the cached descriptor (asset swapped or torn down).
    pub fn clear(&mut self) {
        self.entry = None;
    }
}
