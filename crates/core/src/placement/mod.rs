//! Placement engine: spawns plant objects at reticle poses.

use crate::{
    catalog::{AssetState, CatalogItem},
    config::PlacementConfig,
    scene::{ObjectId, PlacedObject, SceneGraph},
    tracking::PlacementPose,
    GardenArError, Result,
};

/// Result of an explicit "select" input in the immersive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Placed(ObjectId),
    /// Nothing selected; the active object jumped to the reticle.
    MovedActive(ObjectId),
    /// The model is still loading; placement waits for the next valid pose.
    Deferred,
    /// The selection has no usable model.
    NoModel,
    /// No valid reticle this frame, or nothing to act on.
    Ignored,
}

#[derive(Debug, Default)]
pub struct PlacementEngine {
    place_on_valid_pose: bool,
}

impl PlacementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clones the item's model into the scene at `pose` and makes it active.
    pub fn place_at(
        &self,
        scene: &mut SceneGraph,
        pose: &PlacementPose,
        item: &CatalogItem,
        config: &PlacementConfig,
    ) -> Result<ObjectId> {
        if !pose.valid {
            return Err(GardenArError::Placement("no valid surface under the reticle"));
        }
        let asset = item
            .loaded_asset()
            .ok_or(GardenArError::Placement("model is not loaded"))?;

        let object = PlacedObject {
            id: scene.next_id(),
            plant: item.name.clone(),
            care: item.care.clone(),
            position: pose.position(),
            orientation: pose.orientation(),
            yaw: 0.0,
            scale: item.placement_scale,
            parts: asset.pick_parts(),
        };
        let id = object.id;
        let position = object.position;

        let evicted = scene.insert(object, config.max_objects);
        tracing::info!(object = id.0, plant = %item.name, ?position, scale = item.placement_scale, "plant placed");
        if !evicted.is_empty() {
            tracing::info!(?evicted, cap = config.max_objects, "evicted oldest placed objects");
        }
        Ok(id)
    }

    /// Handles a select input given the reticle pose of the current frame.
    pub fn on_select(
        &mut self,
        scene: &mut SceneGraph,
        pose: &PlacementPose,
        selection: Option<&CatalogItem>,
        config: &PlacementConfig,
    ) -> SelectOutcome {
        if !pose.valid {
            return SelectOutcome::Ignored;
        }

        let Some(item) = selection else {
            return match scene.active() {
                Some(id) => {
                    if let Some(object) = scene.get_mut(id) {
                        object.position = pose.position();
                    }
                    SelectOutcome::MovedActive(id)
                }
                None => SelectOutcome::Ignored,
            };
        };

        match &item.asset {
            AssetState::Loaded(_) => match self.place_at(scene, pose, item, config) {
                Ok(id) => SelectOutcome::Placed(id),
                Err(_) => SelectOutcome::NoModel,
            },
            AssetState::Pending { .. } => {
                self.arm();
                SelectOutcome::Deferred
            }
            AssetState::Missing | AssetState::Failed { .. } => SelectOutcome::NoModel,
        }
    }

    /// Requests placement on the next frame with a valid pose.
    pub fn arm(&mut self) {
        if !self.place_on_valid_pose {
            tracing::debug!("placement deferred until the reticle is valid");
        }
        self.place_on_valid_pose = true;
    }

    pub fn disarm(&mut self) {
        self.place_on_valid_pose = false;
    }

    pub fn is_armed(&self) -> bool {
        self.place_on_valid_pose
    }

    /// Called once per tracked frame. Consumes the pending placement when
    /// the pose is valid and the model is ready; keeps it while the model is
    /// still loading.
    pub fn on_valid_pose(
        &mut self,
        scene: &mut SceneGraph,
        pose: &PlacementPose,
        selection: Option<&CatalogItem>,
        config: &PlacementConfig,
    ) -> Option<ObjectId> {
        if !self.place_on_valid_pose || !pose.valid {
            return None;
        }
        let item = selection?;
        if item.is_loading() {
            return None;
        }
        self.place_on_valid_pose = false;
        self.place_at(scene, pose, item, config).ok()
    }
}
