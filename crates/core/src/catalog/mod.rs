//! Catalog selection bridge.
//!
//! Turns a plant picked in the surrounding UI into the "current selection":
//! care metadata for the overlay is published synchronously, while the 3D
//! model (if any) arrives later through a [`LoadTicket`]. Every selection
//! bumps a generation counter so that a load finishing after a newer pick is
//! recognised as stale and dropped.

use serde::{Deserialize, Serialize};

use crate::{assets::AssetStore, config::PlacementConfig, GardenArError, SceneAsset};

/// Catalog entry descriptor as handed over by the plant list UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogEntry {
    pub name: String,
    pub model_url: Option<String>,
    pub height_cm: Option<f32>,
    pub width_cm: Option<f32>,
    pub sunlight: String,
    pub spacing_cm: String,
    pub watering: String,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Trimmed model URL; blank values and the literal `none` mean no model.
    pub fn normalized_model_url(&self) -> Option<String> {
        let raw = self.model_url.as_deref()?.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(raw.to_string())
        }
    }
}

/// Care metadata shown next to the selection and placed objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareInfo {
    pub sunlight: String,
    pub spacing_cm: String,
    pub watering: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetState {
    /// The entry has no model reference at all.
    Missing,
    Pending { url: String },
    Loaded(SceneAsset),
    Failed { url: String },
}

/// The currently selected plant.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub name: String,
    pub asset: AssetState,
    pub care: CareInfo,
    pub height_cm: Option<f32>,
    pub width_cm: Option<f32>,
    pub placement_scale: f32,
    /// Generation of the selection that produced this item.
    pub generation: u64,
}

impl CatalogItem {
    pub fn from_entry(entry: &CatalogEntry, config: &PlacementConfig, generation: u64) -> Self {
        let asset = match entry.normalized_model_url() {
            Some(url) => AssetState::Pending { url },
            None => AssetState::Missing,
        };
        Self {
            name: entry.name.clone(),
            asset,
            care: CareInfo {
                sunlight: entry.sunlight.clone(),
                spacing_cm: entry.spacing_cm.clone(),
                watering: entry.watering.clone(),
            },
            height_cm: entry.height_cm,
            width_cm: entry.width_cm,
            placement_scale: placement_scale(entry.width_cm, entry.height_cm, config),
            generation,
        }
    }

    pub fn loaded_asset(&self) -> Option<&SceneAsset> {
        match &self.asset {
            AssetState::Loaded(asset) => Some(asset),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.asset, AssetState::Pending { .. })
    }
}

/// Converts nominal growth dimensions into a uniform model scale.
///
/// Models are authored at roughly one metre, so centimetres map to scale by
/// dividing by 100. Width wins over height; with neither present the
/// configured default is used.
pub fn placement_scale(width_cm: Option<f32>, height_cm: Option<f32>, config: &PlacementConfig) -> f32 {
    let clamp = |cm: f32| (cm / 100.0).clamp(config.min_scale, config.max_scale);
    match (width_cm, height_cm) {
        (Some(w), _) if w > 0.0 => clamp(w),
        (_, Some(h)) if h > 0.0 => clamp(h),
        _ => config.default_scale,
    }
}

/// Text lines for the plant overlay and the top banner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub name: String,
    pub sunlight: String,
    pub spacing: String,
    pub watering: String,
    pub banner: String,
}

impl Overlay {
    pub fn for_plant(name: &str, care: &CareInfo) -> Self {
        let line = |label: &str, value: &str, suffix: &str| {
            if value.is_empty() {
                String::new()
            } else {
                format!("{label}: {value}{suffix}")
            }
        };
        Self {
            name: name.to_string(),
            sunlight: line("Sunlight", &care.sunlight, ""),
            spacing: line("Spacing", &care.spacing_cm, " cm"),
            watering: line("Watering", &care.watering, ""),
            banner: name.to_string(),
        }
    }

    pub fn for_item(item: &CatalogItem) -> Self {
        Self::for_plant(&item.name, &item.care)
    }
}

/// Handle for an in-flight model load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub url: String,
}

#[derive(Debug)]
pub enum LoadOutcome {
    /// A newer selection exists; the result was discarded.
    Stale,
    Loaded,
    Failed(GardenArError),
}

/// Holds the single current selection and its generation counter.
#[derive(Debug, Default)]
pub struct CatalogSelection {
    generation: u64,
    current: Option<CatalogItem>,
}

impl CatalogSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&CatalogItem> {
        self.current.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Makes `entry` the current selection. Models already in `store` are
    /// attached immediately; otherwise a ticket is returned for the host to
    /// load out of band.
    pub fn select(
        &mut self,
        entry: &CatalogEntry,
        config: &PlacementConfig,
        store: &AssetStore,
    ) -> Option<LoadTicket> {
        self.generation += 1;
        let mut item = CatalogItem::from_entry(entry, config, self.generation);

        let ticket = match &item.asset {
            AssetState::Pending { url } => match store.get(url) {
                Some(asset) => {
                    item.asset = AssetState::Loaded(asset.clone());
                    None
                }
                None => Some(LoadTicket {
                    generation: self.generation,
                    url: url.clone(),
                }),
            },
            _ => None,
        };

        tracing::info!(
            plant = %item.name,
            generation = self.generation,
            scale = item.placement_scale,
            loading = ticket.is_some(),
            "catalog selection changed"
        );
        self.current = Some(item);
        ticket
    }

    /// Applies the result of a model load if `ticket` still belongs to the
    /// current selection and that selection is still waiting for it. A
    /// ticket is used up by its first completion.
    pub fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        result: crate::Result<SceneAsset>,
    ) -> LoadOutcome {
        let generation = self.generation;
        let item = match self.current.as_mut() {
            Some(item)
                if ticket.generation == generation
                    && matches!(&item.asset, AssetState::Pending { url } if *url == ticket.url) =>
            {
                item
            }
            _ => {
                tracing::debug!(
                    url = %ticket.url,
                    ticket = ticket.generation,
                    current = self.generation,
                    "dropping stale model load"
                );
                return LoadOutcome::Stale;
            }
        };

        match result {
            Ok(asset) => {
                item.asset = AssetState::Loaded(asset);
                LoadOutcome::Loaded
            }
            Err(err) => {
                tracing::warn!(url = %ticket.url, error = %err, "model load failed");
                item.asset = AssetState::Failed {
                    url: ticket.url.clone(),
                };
                LoadOutcome::Failed(err)
            }
        }
    }

}
