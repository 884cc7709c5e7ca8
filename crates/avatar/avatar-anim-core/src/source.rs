//! Asset sources: where `AvatarEngine` gets a `CharacterAsset` for an asset reference.
//!
//! Loading is modelled as polling. A source answers `Pending` until it can hand
//! over a parsed asset or a final error; the engine polls once per frame while a
//! request is outstanding and never retries after `Failed`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;

use crate::asset::{parse_character_asset_json, CharacterAsset};
use crate::error::AssetError;

#[derive(Debug)]
pub enum AssetPoll {
    Pending,
    Ready(CharacterAsset),
    Failed(AssetError),
}

pub trait AssetSource {
    fn poll(&mut self, path: &str) -> AssetPoll;

    /// Called when the engine drops the asset loaded from `path`.
    fn release(&mut self, _path: &str) {}
}

/// What `MemoryAssetSource` answers for a path nobody provided.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MissingPolicy {
    #[default]
    Fail,
    /// Keep answering `Pending`, for hosts that push assets asynchronously.
    Pending,
}

#[derive(Debug)]
enum Slot {
    Ready(CharacterAsset),
    Failed(AssetError),
}

/// Assets pushed in by the host, keyed by asset reference.
#[derive(Debug, Default)]
pub struct MemoryAssetSource {
    slots: HashMap<String, Slot>,
    missing: MissingPolicy,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing_policy(missing: MissingPolicy) -> Self {
        Self {
            slots: HashMap::new(),
            missing,
        }
    }

    pub fn set_missing_policy(&mut self, missing: MissingPolicy) {
        self.missing = missing;
    }

    pub fn insert(&mut self, path: impl Into<String>, asset: CharacterAsset) {
        self.slots.insert(path.into(), Slot::Ready(asset));
    }

    /// Parse and store a JSON scene document.
    pub fn insert_json(&mut self, path: impl Into<String>, json: &str) -> Result<(), AssetError> {
        let path = path.into();
        let mut asset = parse_character_asset_json(json).map_err(|e| with_path(e, &path))?;
        if asset.name().is_empty() {
            asset.set_name(path.clone());
        }
        self.insert(path, asset);
        Ok(())
    }

    /// Make every poll of `path` fail with `error`.
    pub fn mark_failed(&mut self, path: impl Into<String>, error: AssetError) {
        self.slots.insert(path.into(), Slot::Failed(error));
    }

    pub fn remove(&mut self, path: &str) -> bool {
        self.slots.remove(path).is_some()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.slots.contains_key(path)
    }
}

impl AssetSource for MemoryAssetSource {
    fn poll(&mut self, path: &str) -> AssetPoll {
        match self.slots.get(path) {
            // every load gets its own token
            Some(Slot::Ready(asset)) => AssetPoll::Ready(asset.instantiate()),
            Some(Slot::Failed(e)) => AssetPoll::Failed(e.clone()),
            None => match self.missing {
                MissingPolicy::Fail => AssetPoll::Failed(AssetError::NotFound { path: path.into() }),
                MissingPolicy::Pending => AssetPoll::Pending,
            },
        }
    }
}

/// Reads `.json` scene documents and, with the `gltf` feature, `.glb`/`.gltf`
/// files relative to a root directory. Reads are synchronous, so polls never
/// return `Pending`.
#[derive(Clone, Debug)]
pub struct DirAssetSource {
    root: PathBuf,
}

impl DirAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load(&self, path: &str) -> Result<CharacterAsset, AssetError> {
        let full = self.root.join(path);
        let extension = full
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let mut asset = match extension.as_str() {
            "json" => {
                let text = fs::read_to_string(&full).map_err(|e| io_error(e, path))?;
                parse_character_asset_json(&text).map_err(|e| with_path(e, path))?
            }
            #[cfg(feature = "gltf")]
            "glb" | "gltf" => {
                let bytes = fs::read(&full).map_err(|e| io_error(e, path))?;
                crate::gltf_loader::load_gltf_asset(&bytes, path)?
            }
            _ => {
                return Err(AssetError::UnsupportedFormat {
                    path: path.into(),
                    extension,
                })
            }
        };
        if asset.name().is_empty() {
            asset.set_name(path);
        }
        Ok(asset)
    }
}

impl AssetSource for DirAssetSource {
    fn poll(&mut self, path: &str) -> AssetPoll {
        match self.load(path) {
            Ok(asset) => AssetPoll::Ready(asset),
            Err(e) => AssetPoll::Failed(e),
        }
    }
}

fn io_error(e: std::io::Error, path: &str) -> AssetError {
    match e.kind() {
        ErrorKind::NotFound => AssetError::NotFound { path: path.into() },
        _ => AssetError::Io {
            path: path.into(),
            reason: e.to_string(),
        },
    }
}

fn with_path(e: AssetError, path: &str) -> AssetError {
    match e {
        AssetError::Parse { reason, .. } => AssetError::Parse {
            path: path.into(),
            reason,
        },
        other => other,
    }
}
