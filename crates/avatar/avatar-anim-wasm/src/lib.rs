use js_sys::JSON;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;

use avatar_anim_core::{
    load_gltf_asset, AssetError, AvatarEngine, Config, MemoryAssetSource, MissingPolicy,
    RenderProps, FALLBACK_STYLESHEET,
};

/// Avatar engine for web hosts. The host fetches assets itself and hands them
/// over with `provide_asset_*`; until then a requested asset renders as loading.
#[wasm_bindgen]
pub struct AvatarHost {
    core: AvatarEngine,
}

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn stringify(value: &JsValue, what: &str) -> Result<String, JsError> {
    JSON::stringify(value)
        .map_err(|e| JsError::new(&format!("{what} stringify error: {:?}", e)))?
        .as_string()
        .ok_or_else(|| JsError::new(&format!("{what}: stringify produced non-string")))
}

#[wasm_bindgen]
impl AvatarHost {
    /// Create a host. Pass a config object or undefined/null for defaults.
    /// Example:
    ///   new AvatarHost({ blink: { min_interval: 3, max_interval: 6 } })
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<AvatarHost, JsError> {
        console_error_panic_hook::set_once();

        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };
        cfg.validate()
            .map_err(|e| JsError::new(&format!("config error: {e}")))?;

        Ok(AvatarHost {
            core: AvatarEngine::new(
                cfg,
                MemoryAssetSource::with_missing_policy(MissingPolicy::Pending),
            ),
        })
    }

    /// Provide a JSON scene document for `asset_ref`.
    #[wasm_bindgen(js_name = provide_asset_json)]
    pub fn provide_asset_json(&mut self, asset_ref: String, doc: JsValue) -> Result<(), JsError> {
        if jsvalue_is_undefined_or_null(&doc) {
            return Err(JsError::new("provide_asset_json: doc is null/undefined"));
        }
        let s = match doc.as_string() {
            Some(s) => s,
            None => stringify(&doc, "provide_asset_json")?,
        };
        let source = self.core.source_mut();
        source.insert_json(asset_ref.clone(), &s).map_err(|e| {
            source.mark_failed(asset_ref, e.clone());
            JsError::new(&format!("provide_asset_json: {e}"))
        })
    }

    /// Provide glTF/GLB bytes for `asset_ref`. A parse failure also marks the
    /// asset failed so the next frame falls back.
    #[wasm_bindgen(js_name = provide_asset_glb)]
    pub fn provide_asset_glb(&mut self, asset_ref: String, bytes: &[u8]) -> Result<(), JsError> {
        let source = self.core.source_mut();
        match load_gltf_asset(bytes, &asset_ref) {
            Ok(asset) => {
                source.insert(asset_ref, asset);
                Ok(())
            }
            Err(e) => {
                let msg = format!("provide_asset_glb: {e}");
                source.mark_failed(asset_ref, e);
                Err(JsError::new(&msg))
            }
        }
    }

    /// Report that fetching `asset_ref` failed.
    #[wasm_bindgen(js_name = fail_asset)]
    pub fn fail_asset(&mut self, asset_ref: String, reason: String) {
        let error = AssetError::Io {
            path: asset_ref.clone(),
            reason,
        };
        self.core.source_mut().mark_failed(asset_ref, error);
    }

    /// Report that no 3D renderer is available; every later frame is a fallback frame.
    #[wasm_bindgen(js_name = renderer_unavailable)]
    pub fn renderer_unavailable(&mut self) {
        self.core.set_renderer_available(false);
    }

    /// Drop the current asset and its captures.
    #[wasm_bindgen]
    pub fn release(&mut self) {
        self.core.release();
    }

    /// Advance by dt (seconds) with `{ animationState, isSpeaking, assetRef }`.
    /// Returns FrameOutputs JSON.
    #[wasm_bindgen]
    pub fn render(&mut self, dt: f32, props: JsValue) -> Result<JsValue, JsError> {
        let props: RenderProps = if jsvalue_is_undefined_or_null(&props) {
            RenderProps::default()
        } else {
            swb::from_value(props).map_err(|e| JsError::new(&format!("props error: {e}")))?
        };
        let out = self.core.render(dt, &props);
        swb::to_value(out).map_err(|e| JsError::new(&format!("outputs error: {e}")))
    }
}

/// Stylesheet backing the fallback view's CSS classes.
#[wasm_bindgen]
pub fn fallback_stylesheet() -> String {
    FALLBACK_STYLESHEET.to_string()
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
