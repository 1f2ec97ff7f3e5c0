//! Core library for the Garden AR plant placement planner.
//!
//! The crate models the interactive part of the AR garden view: choosing
//! between an immersive AR session and a camera preview, tracking the
//! placement reticle, turning catalog picks into placed plant models and
//! manipulating them with touch gestures. Rendering, model decoding and
//! device access stay with the host, which plugs in through the
//! [`XrRuntime`], [`CameraDevice`], [`AssetLoader`] and [`FrameSource`]
//! traits and forwards its events to [`ArPlanner`].

pub mod assets;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gesture;
pub mod placement;
pub mod planner;
pub mod scene;
pub mod session;
pub mod tips;
pub mod tracking;
pub mod view;

pub use assets::{AssetLoader, AssetPart, AssetStore, SceneAsset};
pub use capture::{CaptureService, FrameSource, Snapshot};
pub use catalog::{
    placement_scale, AssetState, CareInfo, CatalogEntry, CatalogItem, CatalogSelection,
    LoadOutcome, LoadTicket, Overlay,
};
pub use config::{ArConfig, CaptureConfig, GestureConfig, PlacementConfig, TipsConfig};
pub use error::{GardenArError, Result};
pub use gesture::{GestureController, GestureEffect, GestureState};
pub use placement::{PlacementEngine, SelectOutcome};
pub use planner::{ArPlanner, FrameReport, Notice, NoticeLevel, SelectionRequest};
pub use scene::{ObjectId, PlacedObject, SceneGraph};
pub use session::{
    CameraDevice, FacingMode, SessionKind, SessionMode, SessionModeSelector, SessionStart,
    Surface, VideoStream, XrFeature, XrRuntime,
};
pub use tips::{tips_prompt, TipsClient, TipsRequest, TipsResponse, TipsTicket};
pub use tracking::{HitTestSource, PlacementPose, ReticleTracker};
pub use view::{Aabb, Ray, ViewCamera, Viewport};
