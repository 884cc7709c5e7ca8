//! Identifiers for loaded assets and their scene nodes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Index of a node inside a `CharacterAsset` arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of one loaded asset.
///
/// Every call that produces a `CharacterAsset` mints a fresh token, so two loads
/// of the same path are distinct assets. Clones share the token.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct AssetToken(pub Uuid);

impl AssetToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetToken {
    fn default() -> Self {
        Self::new()
    }
}
