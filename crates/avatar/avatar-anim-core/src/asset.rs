//! Character asset model: a scene graph arena of named nodes, some carrying a
//! deformable surface (morph target weights).
//!
//! The engine only ever changes channel weights and node-local rotation and
//! translation. Topology (nodes, parents, channel lists) is fixed at load.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::AssetError;
use crate::ids::{AssetToken, NodeId};
use crate::math::IDENTITY;

/// Node-local transform. Rotation is a quaternion (x, y, z, w).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeTransform {
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
}

fn identity_rotation() -> [f32; 4] {
    IDENTITY
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: IDENTITY,
            scale: unit_scale(),
        }
    }
}

/// Named scalar channels blended into one mesh.
#[derive(Clone, Debug)]
pub struct DeformableSurface {
    names: Vec<String>,
    weights: Vec<f32>,
    lookup: HashMap<String, usize>,
}

impl DeformableSurface {
    /// Build a surface. Missing weights default to 0; extra weights are dropped.
    pub fn new(names: Vec<String>, mut weights: Vec<f32>) -> Self {
        weights.resize(names.len(), 0.0);
        let mut lookup = HashMap::with_capacity(names.len());
        for (i, n) in names.iter().enumerate() {
            // first spelling wins on duplicate names
            lookup.entry(n.clone()).or_insert(i);
        }
        Self {
            names,
            weights,
            lookup,
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Index of the first key in `keys` present on this surface.
    pub fn index_of(&self, keys: &[&str]) -> Option<usize> {
        keys.iter().find_map(|k| self.lookup.get(*k).copied())
    }

    /// Like `index_of` but compares ignoring ASCII case.
    pub fn index_of_ignore_case(&self, keys: &[&str]) -> Option<usize> {
        keys.iter().find_map(|k| {
            self.names
                .iter()
                .position(|n| n.eq_ignore_ascii_case(k))
        })
    }

    pub fn weight(&self, index: usize) -> Option<f32> {
        self.weights.get(index).copied()
    }

    /// Bounds-checked write. Returns `false` (and writes nothing) when out of range.
    pub fn set_weight(&mut self, index: usize, value: f32) -> bool {
        match self.weights.get_mut(index) {
            Some(w) => {
                *w = value;
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: NodeTransform,
    pub surface: Option<DeformableSurface>,
}

/// A loaded character: nodes in an arena plus the root node.
#[derive(Clone, Debug)]
pub struct CharacterAsset {
    token: AssetToken,
    name: String,
    root: NodeId,
    nodes: Vec<SceneNode>,
}

impl CharacterAsset {
    /// Build an asset from nodes whose `children` lists are already filled in.
    /// Parent links are derived and the graph is validated (in-range children,
    /// at most one parent per node, root has no parent).
    pub fn from_nodes(
        name: impl Into<String>,
        root: NodeId,
        mut nodes: Vec<SceneNode>,
    ) -> Result<Self, AssetError> {
        if nodes.is_empty() {
            return Err(AssetError::InvalidGraph {
                reason: "asset has no nodes".into(),
            });
        }
        if root.index() >= nodes.len() {
            return Err(AssetError::InvalidGraph {
                reason: format!("root {} out of range ({} nodes)", root.0, nodes.len()),
            });
        }
        for n in nodes.iter_mut() {
            n.parent = None;
        }
        for i in 0..nodes.len() {
            let children = nodes[i].children.clone();
            for c in children {
                let Some(child) = nodes.get_mut(c.index()) else {
                    return Err(AssetError::InvalidGraph {
                        reason: format!("node {i} references missing child {}", c.0),
                    });
                };
                if c == root || child.parent.is_some() || c.index() == i {
                    return Err(AssetError::InvalidGraph {
                        reason: format!("node {} has more than one parent", c.0),
                    });
                }
                child.parent = Some(NodeId(i as u32));
            }
        }
        Ok(Self {
            token: AssetToken::new(),
            name: name.into(),
            root,
            nodes,
        })
    }

    pub fn token(&self) -> AssetToken {
        self.token
    }

    /// A copy with a fresh token, as if loaded again.
    pub fn instantiate(&self) -> Self {
        Self {
            token: AssetToken::new(),
            ..self.clone()
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.index())
    }

    pub fn surface(&self, id: NodeId) -> Option<&DeformableSurface> {
        self.node(id).and_then(|n| n.surface.as_ref())
    }

    pub fn surface_mut(&mut self, id: NodeId) -> Option<&mut DeformableSurface> {
        self.node_mut(id).and_then(|n| n.surface.as_mut())
    }

    /// Depth-first order from the root, followed by any node not reachable from it.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            order.push(id);
            if let Some(n) = self.node(id) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        for (i, s) in seen.iter().enumerate() {
            if !s {
                order.push(NodeId(i as u32));
            }
        }
        order
    }

    /// Nodes carrying a deformable surface, in walk order.
    pub fn surfaces(&self) -> Vec<NodeId> {
        self.walk()
            .into_iter()
            .filter(|id| self.surface(*id).is_some())
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.walk()
            .into_iter()
            .find(|id| self.node(*id).is_some_and(|n| n.name == name))
    }
}

// ---------------------------------------------------------------------------
// JSON scene document
// ---------------------------------------------------------------------------

/// Serialized scene document accepted by `parse_character_asset_json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub root: u32,
    pub nodes: Vec<NodeDocument>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub children: Vec<u32>,
    #[serde(flatten)]
    pub transform: NodeTransform,
    #[serde(default)]
    pub surface: Option<SurfaceDocument>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SurfaceDocument {
    pub channels: Vec<String>,
    #[serde(default)]
    pub weights: Vec<f32>,
}

impl CharacterAsset {
    pub fn from_document(doc: AssetDocument) -> Result<Self, AssetError> {
        let nodes = doc
            .nodes
            .into_iter()
            .map(|n| SceneNode {
                name: n.name,
                parent: None,
                children: n.children.into_iter().map(NodeId).collect(),
                transform: n.transform,
                surface: n
                    .surface
                    .map(|s| DeformableSurface::new(s.channels, s.weights)),
            })
            .collect();
        Self::from_nodes(doc.name, NodeId(doc.root), nodes)
    }
}

/// Parse a JSON scene document into a `CharacterAsset`.
pub fn parse_character_asset_json(json: &str) -> Result<CharacterAsset, AssetError> {
    let doc: AssetDocument = serde_json::from_str(json).map_err(|e| AssetError::Parse {
        path: "<json>".into(),
        reason: e.to_string(),
    })?;
    CharacterAsset::from_document(doc)
}
