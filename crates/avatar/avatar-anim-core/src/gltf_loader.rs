//! glTF / GLB import of the parts the engine animates: node names, local TRS,
//! and morph target names and default weights.
//!
//! Target names come from the mesh `extras.targetNames` array, which is where
//! common exporters put them. Meshes without it get positional names
//! (`target_0`, ...), which the prober will not match.

use serde::Deserialize;

use crate::asset::{CharacterAsset, DeformableSurface, NodeTransform, SceneNode};
use crate::error::AssetError;
use crate::ids::NodeId;

#[derive(Deserialize)]
struct MeshExtras {
    #[serde(rename = "targetNames", default)]
    target_names: Vec<String>,
}

fn surface_of(mesh: &gltf::Mesh<'_>) -> Option<DeformableSurface> {
    let count = mesh
        .primitives()
        .map(|p| p.morph_targets().count())
        .max()
        .unwrap_or(0);
    let mut names = mesh
        .extras()
        .as_ref()
        .and_then(|raw| serde_json::from_str::<MeshExtras>(raw.get()).ok())
        .map(|e| e.target_names)
        .unwrap_or_default();
    if names.is_empty() && count == 0 {
        return None;
    }
    // names and actual targets may disagree; keep the longer list addressable
    while names.len() < count {
        names.push(format!("target_{}", names.len()));
    }
    let weights = mesh.weights().map(<[f32]>::to_vec).unwrap_or_default();
    Some(DeformableSurface::new(names, weights))
}

/// Build a `CharacterAsset` from glTF JSON or GLB bytes. Buffers are not read.
pub fn load_gltf_asset(bytes: &[u8], path: &str) -> Result<CharacterAsset, AssetError> {
    let gltf = gltf::Gltf::from_slice(bytes).map_err(|e| AssetError::Parse {
        path: path.into(),
        reason: e.to_string(),
    })?;
    let doc = &gltf.document;

    let mut nodes: Vec<SceneNode> = doc
        .nodes()
        .map(|n| {
            let (translation, rotation, scale) = n.transform().decomposed();
            SceneNode {
                name: n.name().unwrap_or_default().to_string(),
                parent: None,
                children: n.children().map(|c| NodeId(c.index() as u32)).collect(),
                transform: NodeTransform {
                    translation,
                    rotation,
                    scale,
                },
                surface: n.mesh().as_ref().and_then(surface_of),
            }
        })
        .collect();

    let scene = doc
        .default_scene()
        .or_else(|| doc.scenes().next())
        .ok_or_else(|| AssetError::InvalidGraph {
            reason: format!("{path} has no scene"),
        })?;
    let roots: Vec<NodeId> = scene.nodes().map(|n| NodeId(n.index() as u32)).collect();
    let root = match roots.as_slice() {
        [single] => *single,
        _ => {
            let id = NodeId(nodes.len() as u32);
            nodes.push(SceneNode {
                name: scene.name().unwrap_or("Scene").to_string(),
                parent: None,
                children: roots,
                transform: NodeTransform::default(),
                surface: None,
            });
            id
        }
    };

    let asset = CharacterAsset::from_nodes(path, root, nodes)?;
    log::info!(
        "loaded glTF '{}': {} nodes, {} surfaces",
        path,
        asset.len(),
        asset.surfaces().len()
    );
    Ok(asset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "nodes": [0] } ],
        "nodes": [
            { "name": "Armature", "children": [1, 2] },
            { "name": "Head", "rotation": [0, 0, 0, 1] },
            { "name": "Face", "mesh": 0 }
        ],
        "buffers": [
            { "byteLength": 12, "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAA" }
        ],
        "bufferViews": [ { "buffer": 0, "byteLength": 12 } ],
        "accessors": [ {
            "bufferView": 0, "componentType": 5126, "count": 1, "type": "VEC3",
            "min": [0, 0, 0], "max": [0, 0, 0]
        } ],
        "meshes": [ {
            "primitives": [ {
                "attributes": { "POSITION": 0 },
                "targets": [ { "POSITION": 0 }, { "POSITION": 0 } ]
            } ],
            "weights": [0.0, 0.25],
            "extras": { "targetNames": ["mouthOpen", "eyeBlinkLeft"] }
        } ]
    }"#;

    #[test]
    fn reads_names_and_morph_targets() {
        let asset = load_gltf_asset(FACE_GLTF.as_bytes(), "face.gltf").unwrap();
        assert_eq!(asset.name(), "face.gltf");
        assert_eq!(asset.len(), 3);
        let face = asset.find_by_name("Face").unwrap();
        let surface = asset.surface(face).unwrap();
        assert_eq!(surface.names(), &["mouthOpen", "eyeBlinkLeft"]);
        assert_eq!(surface.weights(), &[0.0, 0.25]);
        assert_eq!(asset.node(asset.root()).unwrap().name, "Armature");
    }

    fn glb_of(json: &str) -> Vec<u8> {
        let mut chunk = json.as_bytes().to_vec();
        while chunk.len() % 4 != 0 {
            chunk.push(b' ');
        }
        let total = 12 + 8 + chunk.len() as u32;
        let mut out = Vec::with_capacity(total as usize);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&total.to_le_bytes());
        out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&chunk);
        out
    }

    /// it should read the same document from a binary container
    #[test]
    fn reads_glb_container() {
        let asset = load_gltf_asset(&glb_of(FACE_GLTF), "face.glb").unwrap();
        let face = asset.find_by_name("Face").unwrap();
        assert_eq!(asset.surface(face).unwrap().names(), &["mouthOpen", "eyeBlinkLeft"]);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = load_gltf_asset(b"not gltf", "x.glb").unwrap_err();
        assert!(matches!(err, AssetError::Parse { .. }));
    }
}
