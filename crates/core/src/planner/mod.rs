//! The AR planner controller.
//!
//! [`ArPlanner`] owns all session state (mode, reticle, selection, placed
//! objects, gesture tracking) and exposes one method per host event. Host
//! events are expected to arrive one at a time from a single UI thread.
//! Failures never escape a handler: they are turned into [`Notice`]s that the
//! UI drains and shows to the user.

use glam::Vec2;
use serde::Serialize;

use crate::{
    assets::{AssetLoader, AssetStore},
    capture::{CaptureService, FrameSource, Snapshot},
    catalog::{AssetState, CatalogEntry, CatalogItem, CatalogSelection, LoadOutcome, LoadTicket, Overlay},
    config::ArConfig,
    gesture::{GestureController, GestureEffect},
    placement::{PlacementEngine, SelectOutcome},
    scene::{ObjectId, SceneGraph},
    session::{CameraDevice, FacingMode, SessionMode, SessionModeSelector, SessionStart, XrRuntime},
    tips::{TipsTicket, TIPS_LOADING},
    tracking::{PlacementPose, ReticleTracker},
    view::{ViewCamera, Viewport},
    GardenArError, Result, SceneAsset,
};

pub const NO_MODEL_MESSAGE: &str = "This plant has no 3D model set. Ask admin to add a GLB model URL.";
pub const MODEL_LOAD_FAILED_MESSAGE: &str = "Could not load 3D model.";
pub const MODEL_LOADING_MESSAGE: &str =
    "The 3D model is still loading. It will be placed on the next detected surface.";
pub const CAMERA_UNSUPPORTED_MESSAGE: &str = "Camera preview is not supported in this browser.";
pub const CAMERA_PERMISSION_MESSAGE: &str = "Camera permission is required to start AR preview.";
pub const SNAPSHOT_UNSUPPORTED_MESSAGE: &str = "Snapshot not supported on this device.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    /// Blocking message (the web host shows an alert).
    Alert,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// What a catalog pick asks the host to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    /// Model to load, reported back through [`ArPlanner::complete_load`].
    pub load: Option<LoadTicket>,
    /// Tips to fetch, reported back through [`ArPlanner::complete_tips`].
    pub tips: TipsTicket,
}

/// Per-frame result of [`ArPlanner::on_frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub reticle: PlacementPose,
    pub placed: Option<ObjectId>,
}

#[derive(Debug)]
pub struct ArPlanner {
    config: ArConfig,
    session: SessionModeSelector,
    tracker: ReticleTracker,
    selection: CatalogSelection,
    assets: AssetStore,
    placement: PlacementEngine,
    scene: SceneGraph,
    gestures: GestureController,
    camera: ViewCamera,
    capture: CaptureService,
    overlay: Overlay,
    tips_panel: String,
    notices: Vec<Notice>,
}

impl ArPlanner {
    pub fn new(config: ArConfig, viewport: Viewport) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            session: SessionModeSelector::new(config.camera.default_facing),
            tracker: ReticleTracker::new(),
            selection: CatalogSelection::new(),
            assets: AssetStore::new(),
            placement: PlacementEngine::new(),
            scene: SceneGraph::new(),
            gestures: GestureController::new(config.gesture.clone()),
            camera: ViewCamera::new(viewport),
            capture: CaptureService::new(config.capture.clone()),
            overlay: Overlay::default(),
            tips_panel: String::new(),
            notices: Vec::new(),
            config,
        })
    }


    /// User pressed "start". Returns `None` when neither immersive AR nor
    /// the camera preview could be started.
    pub fn start(&mut self, xr: &mut dyn XrRuntime, camera: &mut dyn CameraDevice) -> Option<SessionStart> {
        if self.session.mode() != SessionMode::Unset {
            self.end(xr, camera);
        }
        match self.session.start(xr, camera) {
            Ok(start) => Some(start),
            Err(err) => {
                self.report_camera_error(&err);
                None
            }
        }
    }

    /// Ends the running session. Placed objects do not outlive it.
    pub fn end(&mut self, xr: &mut dyn XrRuntime, camera: &mut dyn CameraDevice) {
        if self.session.mode() == SessionMode::ImmersiveAr {
            self.tracker.on_session_end(xr);
        }
        self.session.end(xr, camera);
        self.placement.disarm();
        self.gestures.touch_end();
        if !self.scene.is_empty() {
            tracing::info!(objects = self.scene.len(), "session ended, clearing placed objects");
        }
        self.scene.clear();
    }

    pub fn swap_camera(&mut self, camera: &mut dyn CameraDevice) -> FacingMode {
        if let Err(err) = self.session.swap_camera(camera) {
            self.report_camera_error(&err);
        }
        self.session.facing()
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.camera.resize(width, height);
    }

    /// Drives one rendered frame of the immersive session.
    pub fn on_frame(&mut self, xr: &mut dyn XrRuntime) -> FrameReport {
        if self.session.mode() != SessionMode::ImmersiveAr {
            return FrameReport {
                reticle: PlacementPose::invalid(),
                placed: None,
            };
        }
        if let Some(viewer) = xr.viewer_pose() {
            self.camera.set_pose(viewer);
        }

        let reticle = self.tracker.on_frame(xr);
        let placed = self.placement.on_valid_pose(
            &mut self.scene,
            &reticle,
            self.selection.current(),
            &self.config.placement,
        );
        if placed.is_some() {
            self.refresh_overlay();
        }
        FrameReport { reticle, placed }
    }


    /// User picked a plant in the catalog list.
    pub fn select_entry(&mut self, entry: &CatalogEntry) -> SelectionRequest {
        self.placement.disarm();
        let load = self.selection.select(entry, &self.config.placement, &self.assets);
        self.refresh_overlay();
        self.tips_panel = TIPS_LOADING.to_string();

        let tips = TipsTicket {
            generation: self.selection.generation(),
            plant: entry.name.clone(),
        };

        let asset = self.selection.current().map(|item| &item.asset);
        let missing = matches!(asset, Some(AssetState::Missing));
        let cached = matches!(asset, Some(AssetState::Loaded(_)));
        if missing {
            self.alert(NO_MODEL_MESSAGE);
        } else if cached {
            self.after_model_ready();
        }
        SelectionRequest { load, tips }
    }

    /// Reports the result of a model load started by [`Self::select_entry`].
    /// Results for superseded selections are ignored.
    pub fn complete_load(&mut self, ticket: &LoadTicket, result: Result<SceneAsset>) {
        if let Ok(asset) = &result {
            self.assets.register(asset.clone());
        }
        match self.selection.complete_load(ticket, result) {
            LoadOutcome::Stale => {}
            LoadOutcome::Loaded => {
                self.refresh_overlay();
                self.after_model_ready();
            }
            LoadOutcome::Failed(_) => {
                self.placement.disarm();
                self.alert(MODEL_LOAD_FAILED_MESSAGE);
            }
        }
    }

    /// Resolves a load in place through `loader`, for hosts whose loader
    /// does not need to leave the event loop.
    pub fn load_with(&mut self, ticket: &LoadTicket, loader: &mut dyn AssetLoader) {
        let result = self.assets.get_or_load(loader, &ticket.url);
        self.complete_load(ticket, result);
    }

    /// Reports tips text for a selection; replies for older selections are
    /// dropped.
    pub fn complete_tips(&mut self, ticket: &TipsTicket, text: String) {
        if ticket.generation == self.selection.generation() {
            self.tips_panel = text;
        } else {
            tracing::debug!(plant = %ticket.plant, "dropping stale AI tips");
        }
    }


    /// XR controller "select" (screen tap in handheld AR).
    pub fn select_input(&mut self) -> SelectOutcome {
        if self.session.mode() != SessionMode::ImmersiveAr {
            return SelectOutcome::Ignored;
        }
        let outcome = self.placement.on_select(
            &mut self.scene,
            &self.tracker.pose(),
            self.selection.current(),
            &self.config.placement,
        );
        match outcome {
            SelectOutcome::Placed(_) => self.refresh_overlay(),
            SelectOutcome::Deferred => self.warn(MODEL_LOADING_MESSAGE),
            SelectOutcome::NoModel => {
                let message = match self.selection.current().map(|item| &item.asset) {
                    Some(AssetState::Failed { .. }) => MODEL_LOAD_FAILED_MESSAGE,
                    _ => NO_MODEL_MESSAGE,
                };
                self.warn(message);
            }
            SelectOutcome::MovedActive(_) | SelectOutcome::Ignored => {}
        }
        outcome
    }

    pub fn touch_start(&mut self, touches: &[Vec2]) -> GestureEffect {
        if self.session.mode() != SessionMode::ImmersiveAr {
            return GestureEffect::None;
        }
        self.gestures.touch_start(touches, &self.camera, &mut self.scene)
    }

    pub fn touch_move(&mut self, touches: &[Vec2]) -> GestureEffect {
        if self.session.mode() != SessionMode::ImmersiveAr {
            return GestureEffect::None;
        }
        self.gestures.touch_move(touches, &self.camera, &mut self.scene)
    }

    pub fn touch_end(&mut self) {
        self.gestures.touch_end();
    }

    pub fn click(&mut self, point: Vec2) -> GestureEffect {
        if self.session.mode() != SessionMode::ImmersiveAr {
            return GestureEffect::None;
        }
        self.gestures.click(point, &self.camera, &mut self.scene)
    }


    pub fn snapshot(&mut self, source: &mut dyn FrameSource) -> Option<Snapshot> {
        let viewport = self.camera.viewport;
        let container = (viewport.width.max(0.0) as u32, viewport.height.max(0.0) as u32);
        match self.capture.snapshot(self.session.mode(), source, container) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(error = %err, "snapshot failed");
                self.alert(SNAPSHOT_UNSUPPORTED_MESSAGE);
                None
            }
        }
    }


    pub fn mode(&self) -> SessionMode {
        self.session.mode()
    }

    pub fn reticle(&self) -> PlacementPose {
        self.tracker.pose()
    }

    pub fn current_selection(&self) -> Option<&CatalogItem> {
        self.selection.current()
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn tips_panel(&self) -> &str {
        &self.tips_panel
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn is_placement_armed(&self) -> bool {
        self.placement.is_armed()
    }

    pub fn clear_objects(&mut self) {
        self.scene.clear();
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }


    /// The current selection's model just became available: place it right
    /// away when the reticle is valid, otherwise on the next valid frame.
    fn after_model_ready(&mut self) {
        if self.session.mode() != SessionMode::ImmersiveAr {
            return;
        }
        let Some(item) = self.selection.current() else {
            return;
        };
        match self.tracker.latest_valid() {
            Some(pose) => {
                let placed = self
                    .placement
                    .place_at(&mut self.scene, &pose, item, &self.config.placement)
                    .is_ok();
                // A tap made while loading is satisfied by this placement.
                self.placement.disarm();
                if placed {
                    self.refresh_overlay();
                }
            }
            None => self.placement.arm(),
        }
    }

    fn refresh_overlay(&mut self) {
        if let Some(item) = self.selection.current() {
            self.overlay = Overlay::for_item(item);
        }
    }

    fn report_camera_error(&mut self, err: &GardenArError) {
        tracing::warn!(error = %err, "camera preview unavailable");
        match err {
            GardenArError::CapabilityUnsupported(_) => self.alert(CAMERA_UNSUPPORTED_MESSAGE),
            _ => self.alert(CAMERA_PERMISSION_MESSAGE),
        }
    }

    fn alert(&mut self, message: &str) {
        self.notices.push(Notice {
            level: NoticeLevel::Alert,
            message: message.to_string(),
        });
    }

    fn warn(&mut self, message: &str) {
        self.notices.push(Notice {
            level: NoticeLevel::Warning,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::session::fakes::{FakeCamera, FakeXr};

    fn planner() -> ArPlanner {
        ArPlanner::new(ArConfig::default(), Viewport::new(400.0, 400.0)).unwrap()
    }

    fn immersive() -> FakeXr {
        FakeXr {
            supported: true,
            ..Default::default()
        }
    }

    fn entry(name: &str, url: Option<&str>) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            model_url: url.map(str::to_string),
            sunlight: "Full sun".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn camera_denial_alerts_and_stays_unset() {
        let mut planner = planner();
        let mut camera = FakeCamera {
            deny: true,
            ..Default::default()
        };
        assert!(planner.start(&mut FakeXr::default(), &mut camera).is_none());
        assert_eq!(planner.mode(), SessionMode::Unset);
        let notices = planner.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, CAMERA_PERMISSION_MESSAGE);
    }

    #[test]
    fn missing_camera_alerts_unsupported() {
        let mut planner = planner();
        let mut camera = FakeCamera {
            available: false,
            ..Default::default()
        };
        assert!(planner.start(&mut FakeXr::default(), &mut camera).is_none());
        assert_eq!(planner.mode(), SessionMode::Unset);
        let notices = planner.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Alert);
        assert_eq!(notices[0].message, CAMERA_UNSUPPORTED_MESSAGE);
    }

    #[test]
    fn unsupported_immersive_is_silent() {
        let mut planner = planner();
        let start = planner
            .start(&mut FakeXr::default(), &mut FakeCamera::default())
            .unwrap();
        assert_eq!(start.mode, SessionMode::CameraPreviewFallback);
        assert!(planner.drain_notices().is_empty());
    }

    #[test]
    fn input_is_ignored_outside_immersive_mode() {
        let mut planner = planner();
        planner.start(&mut FakeXr::default(), &mut FakeCamera::default());
        assert_eq!(planner.select_input(), SelectOutcome::Ignored);
        assert_eq!(planner.touch_move(&[Vec2::ZERO]), GestureEffect::None);
    }

    #[test]
    fn load_completion_places_immediately_on_valid_reticle() {
        let mut planner = planner();
        let mut xr = immersive();
        planner.start(&mut xr, &mut FakeCamera::default());

        let request = planner.select_entry(&entry("Basil", Some("basil.glb")));
        xr.hits = vec![Mat4::from_translation(Vec3::new(0.0, 0.0, -1.5))];
        planner.on_frame(&mut xr);

        planner.complete_load(&request.load.unwrap(), Ok(SceneAsset::new("basil.glb")));
        assert_eq!(planner.scene().len(), 1);
        assert!(!planner.is_placement_armed());

        planner.on_frame(&mut xr);
        assert_eq!(planner.scene().len(), 1);
    }

    #[test]
    fn cached_model_skips_loading_on_reselect() {
        let mut planner = planner();
        let first = planner.select_entry(&entry("Basil", Some("basil.glb")));
        planner.complete_load(&first.load.unwrap(), Ok(SceneAsset::new("basil.glb")));

        let second = planner.select_entry(&entry("Basil", Some("basil.glb")));
        assert!(second.load.is_none());
        assert!(planner.current_selection().unwrap().loaded_asset().is_some());
    }

    #[test]
    fn failed_load_alerts_and_disables_placement() {
        let mut planner = planner();
        let mut xr = immersive();
        planner.start(&mut xr, &mut FakeCamera::default());
        xr.hits = vec![Mat4::IDENTITY];
        planner.on_frame(&mut xr);

        let request = planner.select_entry(&entry("Fig", Some("fig.glb")));
        planner.complete_load(&request.load.unwrap(), Err(GardenArError::asset_load("fig.glb", "404")));
        assert_eq!(planner.drain_notices()[0].message, MODEL_LOAD_FAILED_MESSAGE);
        assert_eq!(planner.overlay().name, "Fig");

        assert_eq!(planner.select_input(), SelectOutcome::NoModel);
        assert!(planner.scene().is_empty());
    }

    #[test]
    fn stale_tips_are_dropped() {
        let mut planner = planner();
        let a = planner.select_entry(&entry("A", None));
        let b = planner.select_entry(&entry("B", None));
        assert_eq!(planner.tips_panel(), TIPS_LOADING);

        planner.complete_tips(&a.tips, "tips for A".to_string());
        assert_eq!(planner.tips_panel(), TIPS_LOADING);
        planner.complete_tips(&b.tips, "tips for B".to_string());
        assert_eq!(planner.tips_panel(), "tips for B");
    }

    #[test]
    fn ending_session_clears_objects_and_releases_tracking() {
        let mut planner = planner();
        let mut xr = immersive();
        let mut camera = FakeCamera::default();
        planner.start(&mut xr, &mut camera);
        xr.hits = vec![Mat4::IDENTITY];
        planner.on_frame(&mut xr);
        let request = planner.select_entry(&entry("Basil", Some("basil.glb")));
        planner.complete_load(&request.load.unwrap(), Ok(SceneAsset::new("basil.glb")));
        assert_eq!(planner.scene().len(), 1);

        planner.end(&mut xr, &mut camera);
        assert_eq!(planner.mode(), SessionMode::Unset);
        assert!(planner.scene().is_empty());
        assert_eq!(xr.hit_sources_released, 1);
    }

    #[test]
    fn completing_the_same_load_twice_places_once() {
        let mut planner = planner();
        let mut xr = immersive();
        planner.start(&mut xr, &mut FakeCamera::default());
        xr.hits = vec![Mat4::from_translation(Vec3::new(0.0, 0.0, -1.5))];
        planner.on_frame(&mut xr);

        let ticket = planner.select_entry(&entry("Basil", Some("basil.glb"))).load.unwrap();
        planner.complete_load(&ticket, Ok(SceneAsset::new("basil.glb")));
        planner.complete_load(&ticket, Ok(SceneAsset::new("basil.glb")));
        planner.on_frame(&mut xr);

        assert_eq!(planner.scene().len(), 1);
    }

    /// Immersive session whose viewer sits a little above the ground so a
    /// centred ray crosses a plant's footprint.
    fn placed_basil(planner: &mut ArPlanner) -> (FakeXr, ObjectId) {
        let mut xr = FakeXr {
            supported: true,
            viewer: Some(Mat4::from_translation(Vec3::new(0.0, 0.25, 0.0))),
            ..Default::default()
        };
        planner.start(&mut xr, &mut FakeCamera::default());
        xr.hits = vec![Mat4::from_translation(Vec3::new(0.0, 0.0, -1.5))];
        planner.on_frame(&mut xr);

        let ticket = planner.select_entry(&entry("Basil", Some("basil.glb"))).load.unwrap();
        let asset = SceneAsset::new("basil.glb").with_part("pot", crate::view::Aabb::unit_footprint());
        planner.complete_load(&ticket, Ok(asset));
        let id = planner.scene().latest().unwrap();
        (xr, id)
    }

    #[test]
    fn click_picks_the_plant_under_the_pointer() {
        let mut planner = planner();
        let (mut xr, basil) = placed_basil(&mut planner);

        xr.hits = vec![Mat4::from_translation(Vec3::new(3.0, 0.0, -1.5))];
        planner.on_frame(&mut xr);
        let SelectOutcome::Placed(other) = planner.select_input() else {
            panic!("second plant was not placed");
        };
        assert_eq!(planner.scene().active(), Some(other));

        assert_eq!(planner.click(Vec2::new(200.0, 200.0)), GestureEffect::Picked(basil));
        assert_eq!(planner.scene().active(), Some(basil));
        assert_eq!(planner.click(Vec2::new(5.0, 5.0)), GestureEffect::None);
    }

    #[test]
    fn resize_moves_picking_rays() {
        let mut planner = planner();
        let (_xr, basil) = placed_basil(&mut planner);
        assert_eq!(planner.click(Vec2::new(200.0, 200.0)), GestureEffect::Picked(basil));

        planner.resize(800.0, 800.0);
        assert_eq!(planner.click(Vec2::new(200.0, 200.0)), GestureEffect::None);
        assert_eq!(planner.click(Vec2::new(400.0, 400.0)), GestureEffect::Picked(basil));
    }

    #[test]
    fn placing_past_the_cap_evicts_the_oldest() {
        let mut config = ArConfig::default();
        config.placement.max_objects = 2;
        let mut planner = ArPlanner::new(config, Viewport::new(400.0, 400.0)).unwrap();
        let (mut xr, first) = placed_basil(&mut planner);

        let mut placed = Vec::new();
        for x in [1.0, 2.0] {
            xr.hits = vec![Mat4::from_translation(Vec3::new(x, 0.0, -1.5))];
            planner.on_frame(&mut xr);
            if let SelectOutcome::Placed(id) = planner.select_input() {
                placed.push(id);
            }
        }

        assert_eq!(placed.len(), 2);
        assert_eq!(planner.scene().len(), 2);
        assert!(planner.scene().get(first).is_none());
        assert_eq!(planner.scene().active(), Some(placed[1]));
    }

    struct OneModelLoader {
        calls: usize,
    }

    impl AssetLoader for OneModelLoader {
        fn load(&mut self, url: &str) -> Result<SceneAsset> {
            self.calls += 1;
            Ok(SceneAsset::new(url))
        }
    }

    #[test]
    fn load_with_caches_through_the_store() {
        let mut planner = planner();
        let mut loader = OneModelLoader { calls: 0 };

        let first = planner.select_entry(&entry("Basil", Some("basil.glb")));
        planner.load_with(&first.load.unwrap(), &mut loader);
        assert!(planner.current_selection().unwrap().loaded_asset().is_some());

        let second = planner.select_entry(&entry("Basil", Some("basil.glb")));
        assert!(second.load.is_none());
        assert_eq!(loader.calls, 1);
    }
}
