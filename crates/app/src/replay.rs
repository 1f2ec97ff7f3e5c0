//! Headless replay of recorded AR sessions.
//!
//! A session file lists the device capabilities, the models the loader can
//! serve and a timeline of host events. Each event is fed to the planner in
//! order, which makes it easy to reproduce placement and gesture bugs
//! without a headset or phone.

use std::collections::HashMap;

use garden_ar_core::{
    ArPlanner, AssetLoader, AssetPart, CameraDevice, CatalogEntry, FacingMode, FrameSource,
    GardenArError, HitTestSource, LoadTicket, Notice, PlacedObject, Result, SceneAsset,
    SessionKind, SessionMode, Snapshot, TipsTicket, VideoStream, XrFeature, XrRuntime,
};
use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct SessionScript {
    #[serde(default = "default_viewport")]
    pub viewport: [f32; 2],
    #[serde(default)]
    pub device: DeviceProfile,
    /// Models the loader can serve, keyed by URL.
    #[serde(default)]
    pub models: HashMap<String, ModelSpec>,
    pub events: Vec<ScriptEvent>,
}

fn default_viewport() -> [f32; 2] {
    [390.0, 844.0]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub immersive_ar: bool,
    pub camera: bool,
    pub camera_permission: bool,
    /// Native resolution of the camera stream.
    pub video_size: Option<[u32; 2]>,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            immersive_ar: true,
            camera: true,
            camera_permission: true,
            video_size: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSpec {
    #[serde(default)]
    pub parts: Vec<AssetPart>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
    Start,
    End,
    SwapCamera,
    Resize { width: f32, height: f32 },
    Select { entry: CatalogEntry },
    /// Finishes the oldest pending load of `url`.
    LoadComplete { url: String },
    Frame {
        #[serde(default)]
        hits: Vec<[f32; 3]>,
        viewer: Option<[f32; 3]>,
    },
    Tap,
    TouchStart { touches: Vec<[f32; 2]> },
    TouchMove { touches: Vec<[f32; 2]> },
    TouchEnd,
    Click { point: [f32; 2] },
    Snapshot,
}

/// Summary printed once the script has run.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub mode: SessionMode,
    pub notices: Vec<Notice>,
    pub objects: Vec<PlacedObject>,
    pub overlay_banner: String,
    pub tips_panel: String,
    pub snapshots: Vec<String>,
}

pub struct HeadlessXr {
    supported: bool,
    active: bool,
    hits: Vec<Mat4>,
    viewer: Option<Mat4>,
    next_source: u64,
}

impl XrRuntime for HeadlessXr {
    fn is_session_supported(&mut self, _kind: SessionKind) -> Result<bool> {
        Ok(self.supported)
    }

    fn request_session(&mut self, _kind: SessionKind, _required: &[XrFeature]) -> Result<()> {
        if !self.supported {
            return Err(GardenArError::CapabilityUnsupported("immersive-ar"));
        }
        self.active = true;
        Ok(())
    }

    fn end_session(&mut self) {
        self.active = false;
    }

    fn viewer_pose(&self) -> Option<Mat4> {
        self.viewer
    }

    fn request_hit_test_source(&mut self) -> Result<HitTestSource> {
        self.next_source += 1;
        Ok(HitTestSource::new(self.next_source))
    }

    fn hit_test_results(&self, _source: &HitTestSource) -> Vec<Mat4> {
        if self.active {
            self.hits.clone()
        } else {
            Vec::new()
        }
    }

    fn release_hit_test_source(&mut self, source: HitTestSource) {
        tracing::debug!(source = source.id(), "headless hit-test source released");
    }
}

pub struct HeadlessCamera {
    available: bool,
    permitted: bool,
    next_stream: u64,
}

impl CameraDevice for HeadlessCamera {
    fn is_available(&self) -> bool {
        self.available
    }

    fn open(&mut self, facing: FacingMode) -> Result<VideoStream> {
        if !self.permitted {
            return Err(GardenArError::PermissionDenied(format!("{facing:?} camera")));
        }
        self.next_stream += 1;
        Ok(VideoStream {
            id: self.next_stream,
            facing,
        })
    }

    fn close(&mut self, stream: VideoStream) {
        tracing::debug!(stream = stream.id, "headless camera stream closed");
    }
}

pub struct ScriptedLoader {
    models: HashMap<String, ModelSpec>,
}

impl AssetLoader for ScriptedLoader {
    fn load(&mut self, url: &str) -> Result<SceneAsset> {
        let model = self
            .models
            .get(url)
            .ok_or_else(|| GardenArError::asset_load(url, "404 Not Found"))?;
        Ok(SceneAsset {
            url: url.to_string(),
            parts: model.parts.clone(),
        })
    }
}

/// Synthetic frame: a vertical gradient so exported images are not blank.
pub struct GradientFrame {
    size: Option<(u32, u32)>,
}

impl FrameSource for GradientFrame {
    fn native_size(&self) -> Option<(u32, u32)> {
        self.size
    }

    fn read_rgba(&mut self, width: u32, height: u32) -> Result<Vec<u8>> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| GardenArError::CaptureUnsupported(format!("frame {width}x{height} is too large")))?;
        let mut pixels = Vec::with_capacity(len);
        for y in 0..height {
            let shade = (u64::from(y) * 255 / u64::from(height.max(1))) as u8;
            for _ in 0..width {
                pixels.extend_from_slice(&[40, shade, 60, 255]);
            }
        }
        Ok(pixels)
    }
}

pub struct Replay {
    planner: ArPlanner,
    xr: HeadlessXr,
    camera: HeadlessCamera,
    loader: ScriptedLoader,
    video_size: Option<(u32, u32)>,
    pending_loads: Vec<LoadTicket>,
    pending_tips: Vec<TipsTicket>,
    snapshots: Vec<Snapshot>,
}

impl Replay {
    pub fn new(planner: ArPlanner, script: &SessionScript) -> Self {
        Self {
            planner,
            xr: HeadlessXr {
                supported: script.device.immersive_ar,
                active: false,
                hits: Vec::new(),
                viewer: None,
                next_source: 0,
            },
            camera: HeadlessCamera {
                available: script.device.camera,
                permitted: script.device.camera_permission,
                next_stream: 0,
            },
            loader: ScriptedLoader {
                models: script.models.clone(),
            },
            video_size: script.device.video_size.map(|[w, h]| (w, h)),
            pending_loads: Vec::new(),
            pending_tips: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn run(&mut self, events: &[ScriptEvent]) {
        for (index, event) in events.iter().enumerate() {
            tracing::debug!(index, ?event, "replaying event");
            self.apply(event);
        }
    }

    /// Tips requested during the replay, oldest first.
    pub fn take_tips_requests(&mut self) -> Vec<TipsTicket> {
        std::mem::take(&mut self.pending_tips)
    }

    pub fn complete_tips(&mut self, ticket: &TipsTicket, text: String) {
        self.planner.complete_tips(ticket, text);
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn report(&mut self, snapshot_paths: Vec<String>) -> ReplayReport {
        ReplayReport {
            mode: self.planner.mode(),
            notices: self.planner.drain_notices(),
            objects: self.planner.scene().objects().cloned().collect(),
            overlay_banner: self.planner.overlay().banner.clone(),
            tips_panel: self.planner.tips_panel().to_string(),
            snapshots: snapshot_paths,
        }
    }

    fn apply(&mut self, event: &ScriptEvent) {
        match event {
            ScriptEvent::Start => {
                if let Some(start) = self.planner.start(&mut self.xr, &mut self.camera) {
                    tracing::info!(mode = ?start.mode, listeners = start.register_listeners, "session started");
                }
            }
            ScriptEvent::End => self.planner.end(&mut self.xr, &mut self.camera),
            ScriptEvent::SwapCamera => {
                self.planner.swap_camera(&mut self.camera);
            }
            ScriptEvent::Resize { width, height } => self.planner.resize(*width, *height),
            ScriptEvent::Select { entry } => {
                let request = self.planner.select_entry(entry);
                self.pending_loads.extend(request.load);
                self.pending_tips.push(request.tips);
            }
            ScriptEvent::LoadComplete { url } => {
                match self.pending_loads.iter().position(|t| &t.url == url) {
                    Some(index) => {
                        let ticket = self.pending_loads.remove(index);
                        self.planner.load_with(&ticket, &mut self.loader);
                    }
                    None => tracing::warn!(%url, "no pending load for url"),
                }
            }
            ScriptEvent::Frame { hits, viewer } => {
                self.xr.hits = hits
                    .iter()
                    .map(|p| Mat4::from_rotation_translation(Quat::IDENTITY, Vec3::from_array(*p)))
                    .collect();
                if let Some(viewer) = viewer {
                    self.xr.viewer = Some(Mat4::from_translation(Vec3::from_array(*viewer)));
                }
                self.planner.on_frame(&mut self.xr);
            }
            ScriptEvent::Tap => {
                let outcome = self.planner.select_input();
                tracing::info!(?outcome, "select input");
            }
            ScriptEvent::TouchStart { touches } => {
                self.planner.touch_start(&points(touches));
            }
            ScriptEvent::TouchMove { touches } => {
                self.planner.touch_move(&points(touches));
            }
            ScriptEvent::TouchEnd => self.planner.touch_end(),
            ScriptEvent::Click { point } => {
                self.planner.click(Vec2::from_array(*point));
            }
            ScriptEvent::Snapshot => {
                let size = match self.planner.mode() {
                    SessionMode::CameraPreviewFallback => self.video_size,
                    _ => None,
                };
                let mut frame = GradientFrame { size };
                if let Some(snapshot) = self.planner.snapshot(&mut frame) {
                    self.snapshots.push(snapshot);
                }
            }
        }
    }
}

fn points(touches: &[[f32; 2]]) -> Vec<Vec2> {
    touches.iter().map(|t| Vec2::from_array(*t)).collect()
}
