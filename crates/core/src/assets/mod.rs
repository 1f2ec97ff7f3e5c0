use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{view::Aabb, Result};

/// One pickable piece of a loaded model, in model-local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPart {
    pub name: String,
    pub bounds: Aabb,
}

/// Renderable scene graph returned by the asset loader. Placing an object
/// clones it, so the same asset can be instanced any number of times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneAsset {
    pub url: String,
    #[serde(default)]
    pub parts: Vec<AssetPart>,
}

impl SceneAsset {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parts: Vec::new(),
        }
    }

    pub fn with_part(mut self, name: impl Into<String>, bounds: Aabb) -> Self {
        self.parts.push(AssetPart {
            name: name.into(),
            bounds,
        });
        self
    }

    /// Parts used for picking. Models without explicit parts get a single
    /// unit-sized footprint (nominal asset size is about one metre).
    pub fn pick_parts(&self) -> Vec<AssetPart> {
        if self.parts.is_empty() {
            vec![AssetPart {
                name: "root".to_string(),
                bounds: Aabb::unit_footprint(),
            }]
        } else {
            self.parts.clone()
        }
    }
}

/// Fetches and decodes 3D models. Hosts backed by a network loader usually
/// resolve loads out of band and report them through
/// [`crate::ArPlanner::complete_load`] instead.
pub trait AssetLoader {
    fn load(&mut self, url: &str) -> Result<SceneAsset>;
}

/// Cache of every asset loaded during the session, keyed by URL.
#[derive(Debug, Default)]
pub struct AssetStore {
    assets: HashMap<String, SceneAsset>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
        }
    }

    pub fn register(&mut self, asset: SceneAsset) {
        self.assets.insert(asset.url.clone(), asset);
    }

    pub fn get(&self, url: &str) -> Option<&SceneAsset> {
        self.assets.get(url)
    }

    /// Returns the cached asset or asks `loader` for it, caching the result.
    pub fn get_or_load(&mut self, loader: &mut dyn AssetLoader, url: &str) -> Result<SceneAsset> {
        if let Some(asset) = self.assets.get(url) {
            return Ok(asset.clone());
        }
        let asset = loader.load(url)?;
        tracing::debug!(url, parts = asset.parts.len(), "asset loaded");
        self.register(asset.clone());
        Ok(asset)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
