use avatar_anim_core::{
    AssetError, CharacterAsset, ChannelWrite, DeformableSurface, EngineEvent, NodeId,
    NodeTransform, RenderProps, SceneNode,
};
use bevy::prelude::*;
use bevy::render::mesh::morph::MorphWeights;
use std::collections::HashMap;

use crate::components::{AvatarFrame, AvatarLoadFailed, AvatarRoot, AvatarState, MorphChannelNames};
use crate::resources::{AvatarBinding, AvatarEngines, AvatarSettings, FixedDt, PendingOutputs};

type NodeQuery<'w, 's> = Query<
    'w,
    's,
    (
        Option<&'static Name>,
        Option<&'static Transform>,
        Option<&'static MorphWeights>,
        Option<&'static MorphChannelNames>,
    ),
>;

fn morph_names(
    weights: &MorphWeights,
    hint: Option<&MorphChannelNames>,
    meshes: Option<&Assets<Mesh>>,
) -> Vec<String> {
    let mut names = hint
        .map(|h| h.0.clone())
        .or_else(|| {
            let mesh = meshes?.get(weights.first_mesh()?)?;
            mesh.morph_target_names().map(<[String]>::to_vec)
        })
        .unwrap_or_default();
    while names.len() < weights.weights().len() {
        names.push(format!("morph_{}", names.len()));
    }
    names
}

/// Depth-first snapshot of the hierarchy under `root` into a `CharacterAsset`.
///
/// The root entity belongs to the host (it places the avatar), so it enters the
/// snapshot as an identity node without a surface and maps to no entity. The
/// returned vector holds the entity of every node, indexed by `NodeId`.
pub fn snapshot_hierarchy(
    root: Entity,
    asset_ref: &str,
    children: &Query<&Children>,
    nodes: &NodeQuery,
    meshes: Option<&Assets<Mesh>>,
) -> Result<(CharacterAsset, Vec<Option<Entity>>), AssetError> {
    let mut order = Vec::new();
    let mut stack = vec![root];
    while let Some(e) = stack.pop() {
        order.push(e);
        if let Ok(cs) = children.get(e) {
            stack.extend(cs.iter().rev().copied());
        }
    }
    let index: HashMap<Entity, u32> = order
        .iter()
        .enumerate()
        .map(|(i, e)| (*e, i as u32))
        .collect();

    let scene_nodes = order
        .iter()
        .map(|&e| {
            let (name, tf, morph, hint) = nodes.get(e).unwrap_or((None, None, None, None));
            let placement = e == root;
            let tf = if placement {
                Transform::IDENTITY
            } else {
                tf.copied().unwrap_or_default()
            };
            SceneNode {
                name: name.map(|n| n.as_str().to_string()).unwrap_or_default(),
                parent: None,
                children: children
                    .get(e)
                    .map(|cs| cs.iter().filter_map(|c| index.get(c).copied().map(NodeId)).collect())
                    .unwrap_or_default(),
                transform: to_node_transform(&tf),
                surface: morph.filter(|_| !placement).map(|w| {
                    DeformableSurface::new(morph_names(w, hint, meshes), w.weights().to_vec())
                }),
            }
        })
        .collect();

    let asset = CharacterAsset::from_nodes(asset_ref, NodeId(0), scene_nodes)?;
    let entities = order
        .into_iter()
        .map(|e| (e != root).then_some(e))
        .collect();
    Ok((asset, entities))
}

fn to_node_transform(tf: &Transform) -> NodeTransform {
    NodeTransform {
        translation: tf.translation.to_array(),
        rotation: tf.rotation.to_array(),
        scale: tf.scale.to_array(),
    }
}

fn to_transform(tf: &NodeTransform) -> Transform {
    Transform {
        translation: Vec3::from_array(tf.translation),
        rotation: Quat::from_array(tf.rotation).normalize(),
        scale: Vec3::from_array(tf.scale),
    }
}

/// Keeps one engine per `AvatarRoot` and feeds its asset source with hierarchy
/// snapshots. A root whose children are not spawned yet stays pending.
pub fn snapshot_avatars_system(
    mut engines: ResMut<AvatarEngines>,
    settings: Res<AvatarSettings>,
    roots: Query<(Entity, &AvatarRoot, Option<&AvatarLoadFailed>)>,
    children: Query<&Children>,
    nodes: NodeQuery,
    meshes: Option<Res<Assets<Mesh>>>,
) {
    engines.map.retain(|e, _| roots.contains(*e));

    for (entity, root, failed) in roots.iter() {
        let binding = engines
            .map
            .entry(entity)
            .or_insert_with(|| AvatarBinding::new(settings.0.clone()));
        let asset_ref = root.asset_ref.as_str();

        let is_failed = failed.is_some();
        if binding.snapshot.as_deref() == Some(asset_ref) && binding.failed == is_failed {
            continue;
        }
        if let Some(old) = binding.snapshot.take() {
            binding.engine.source_mut().remove(&old);
            if old == asset_ref {
                // same reference, load outcome changed: start the request over
                binding.engine.release();
            }
        }
        binding.failed = false;
        binding.entities.clear();
        if asset_ref.is_empty() {
            continue;
        }
        if let Some(failed) = failed {
            binding.engine.source_mut().mark_failed(
                asset_ref,
                AssetError::Io {
                    path: asset_ref.to_string(),
                    reason: failed.reason.clone(),
                },
            );
            binding.snapshot = Some(asset_ref.to_string());
            binding.failed = true;
            continue;
        }
        if children.get(entity).map_or(true, |cs| cs.is_empty()) {
            continue;
        }
        match snapshot_hierarchy(entity, asset_ref, &children, &nodes, meshes.as_deref()) {
            Ok((asset, entities)) => {
                debug!("avatar {entity:?}: snapshot of '{asset_ref}' with {} nodes", entities.len());
                binding.engine.source_mut().insert(asset_ref, asset);
                binding.entities = entities;
            }
            Err(e) => {
                warn!("avatar {entity:?}: hierarchy snapshot failed: {e}");
                binding.engine.source_mut().mark_failed(asset_ref, e);
            }
        }
        binding.snapshot = Some(asset_ref.to_string());
    }
}

/// Fixed timestep compute: render each avatar with the fixed dt and stash its
/// outputs into `PendingOutputs`.
pub fn tick_avatars_system(
    mut engines: ResMut<AvatarEngines>,
    dt: Res<FixedDt>,
    roots: Query<(Entity, &AvatarRoot, Option<&AvatarState>)>,
    mut pending: ResMut<PendingOutputs>,
) {
    pending.frames.clear();
    for (entity, root, state) in roots.iter() {
        let Some(binding) = engines.map.get_mut(&entity) else {
            continue;
        };
        let state = state.copied().unwrap_or_default();
        let props = RenderProps::new(state.state, state.is_speaking, root.asset_ref.clone());
        let out = binding.engine.render(dt.0, &props);
        for ev in &out.events {
            match ev {
                EngineEvent::FallbackActivated { reason } => {
                    warn!("avatar {entity:?}: fallback ({reason})")
                }
                other => info!("avatar {entity:?}: {other:?}"),
            }
        }
        pending.frames.push((entity, out.clone()));
    }
}

/// Apply staged writes onto `Transform` and `MorphWeights`, then publish the
/// frame summary on the root.
///
/// Motion of the snapshot root (breathing, whole-asset rotation) is composed
/// into the root's direct children, so the host stays free to move the root.
pub fn apply_outputs_system(
    mut commands: Commands,
    mut pending: ResMut<PendingOutputs>,
    engines: Res<AvatarEngines>,
    mut transforms: Query<&mut Transform>,
    mut morphs: Query<&mut MorphWeights>,
) {
    for (root, out) in pending.frames.drain(..) {
        let Some(binding) = engines.map.get(&root) else {
            continue;
        };
        let asset = binding.engine.asset();
        let top: &[NodeId] = asset
            .and_then(|a| a.node(a.root()))
            .map(|n| n.children.as_slice())
            .unwrap_or_default();
        let mut recompose = false;
        for write in &out.writes {
            let node = write.node();
            let composed = asset.is_some_and(|a| a.root() == node) || top.contains(&node);
            if composed && !matches!(write, ChannelWrite::Weight { .. }) {
                recompose = true;
                continue;
            }
            let Some(&Some(entity)) = binding.entities.get(node.index()) else {
                continue;
            };
            match write {
                ChannelWrite::Weight { index, value, .. } => {
                    if let Ok(mut mw) = morphs.get_mut(entity) {
                        if let Some(w) = mw.weights_mut().get_mut(*index) {
                            *w = *value;
                        }
                    }
                }
                ChannelWrite::Rotation { value, .. } => {
                    if let Ok(mut tf) = transforms.get_mut(entity) {
                        tf.rotation = Quat::from_array(*value).normalize();
                    }
                }
                ChannelWrite::Translation { value, .. } => {
                    if let Ok(mut tf) = transforms.get_mut(entity) {
                        tf.translation = Vec3::from_array(*value);
                    }
                }
            }
        }
        if let (true, Some(asset)) = (recompose, asset) {
            let offset = asset
                .node(asset.root())
                .map(|n| to_transform(&n.transform))
                .unwrap_or_default();
            for &child in top {
                let (Some(node), Some(&Some(entity))) =
                    (asset.node(child), binding.entities.get(child.index()))
                else {
                    continue;
                };
                if let Ok(mut tf) = transforms.get_mut(entity) {
                    *tf = offset.mul_transform(to_transform(&node.transform));
                }
            }
        }
        if let Some(mut e) = commands.get_entity(root) {
            e.insert(AvatarFrame {
                mode: out.mode,
                badge: out.badge,
                strategy: out.strategy,
                fallback: out.fallback,
            });
        }
    }
}
