//! Session mode selection.
//!
//! A start request first tries an immersive AR session with hit-testing and
//! falls back to a plain camera preview when the runtime cannot provide one.
//! The mode only ever moves away from [`SessionMode::Unset`]; switching
//! between immersive and preview goes through [`SessionModeSelector::end`].

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::{tracking::HitTestSource, GardenArError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionMode {
    #[default]
    Unset,
    ImmersiveAr,
    CameraPreviewFallback,
}

/// Which physical camera feeds the fallback preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera.
    #[default]
    Environment,
    /// Front camera.
    User,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Environment => Self::User,
            Self::User => Self::Environment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    ImmersiveAr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrFeature {
    HitTest,
}

/// Live camera stream handed out by a [`CameraDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoStream {
    pub id: u64,
    pub facing: FacingMode,
}

/// What currently occupies the AR view container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Surface {
    #[default]
    Empty,
    /// The 3D canvas driven by the immersive session.
    Canvas,
    /// The fallback camera preview.
    Video(VideoStream),
}

/// Immersive session lifecycle, per-frame viewer pose and hit-testing.
pub trait XrRuntime {
    fn is_session_supported(&mut self, kind: SessionKind) -> Result<bool>;
    fn request_session(&mut self, kind: SessionKind, required: &[XrFeature]) -> Result<()>;
    fn end_session(&mut self);
    /// Camera-to-world transform of the viewer for the current frame.
    fn viewer_pose(&self) -> Option<Mat4>;
    /// Viewer-relative hit-test source.
    fn request_hit_test_source(&mut self) -> Result<HitTestSource>;
    /// Surface hits for the current frame, closest first.
    fn hit_test_results(&self, source: &HitTestSource) -> Vec<Mat4>;
    fn release_hit_test_source(&mut self, source: HitTestSource);
}

/// Camera/media access for the fallback preview.
pub trait CameraDevice {
    /// `false` when the platform has no media capture API at all.
    fn is_available(&self) -> bool;
    fn open(&mut self, facing: FacingMode) -> Result<VideoStream>;
    fn close(&mut self, stream: VideoStream);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStart {
    pub mode: SessionMode,
    /// Set the first time an immersive session is entered; touch and click
    /// handlers should be attached to the canvas exactly then.
    pub register_listeners: bool,
}

#[derive(Debug, Default)]
pub struct SessionModeSelector {
    mode: SessionMode,
    facing: FacingMode,
    surface: Surface,
    listeners_registered: bool,
}

impl SessionModeSelector {
    pub fn new(facing: FacingMode) -> Self {
        Self {
            facing,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Starts a session, preferring immersive AR. A running session is torn
    /// down first so the mode always passes through `Unset`.
    pub fn start(
        &mut self,
        xr: &mut dyn XrRuntime,
        camera: &mut dyn CameraDevice,
    ) -> Result<SessionStart> {
        if self.mode != SessionMode::Unset {
            self.end(xr, camera);
        }

        let supported = match xr.is_session_supported(SessionKind::ImmersiveAr) {
            Ok(supported) => supported,
            Err(err) => {
                tracing::debug!(error = %err, "immersive capability query failed");
                false
            }
        };

        if supported {
            match xr.request_session(SessionKind::ImmersiveAr, &[XrFeature::HitTest]) {
                Ok(()) => {
                    let register_listeners = !self.listeners_registered;
                    self.listeners_registered = true;
                    self.surface = Surface::Canvas;
                    self.set_mode(SessionMode::ImmersiveAr);
                    return Ok(SessionStart {
                        mode: self.mode,
                        register_listeners,
                    });
                }
                Err(err) => {
                    tracing::warn!(error = %err, "immersive session request failed, using camera preview");
                }
            }
        } else {
            tracing::info!("immersive AR unsupported, using camera preview");
        }

        self.start_camera_preview(camera)?;
        Ok(SessionStart {
            mode: self.mode,
            register_listeners: false,
        })
    }

    /// Flips between front and rear camera. A running preview is restarted
    /// with the new facing mode.
    pub fn swap_camera(&mut self, camera: &mut dyn CameraDevice) -> Result<FacingMode> {
        self.facing = self.facing.toggled();
        tracing::info!(facing = ?self.facing, "camera facing toggled");

        if self.mode == SessionMode::CameraPreviewFallback {
            self.stop_camera_preview(camera);
            self.start_camera_preview(camera)?;
        }
        Ok(self.facing)
    }

    /// Tears down whatever session is running and returns to `Unset`.
    pub fn end(&mut self, xr: &mut dyn XrRuntime, camera: &mut dyn CameraDevice) {
        match self.mode {
            SessionMode::ImmersiveAr => {
                xr.end_session();
                self.surface = Surface::Empty;
                self.set_mode(SessionMode::Unset);
            }
            SessionMode::CameraPreviewFallback => self.stop_camera_preview(camera),
            SessionMode::Unset => {}
        }
    }

    fn start_camera_preview(&mut self, camera: &mut dyn CameraDevice) -> Result<()> {
        if !camera.is_available() {
            return Err(GardenArError::CapabilityUnsupported("camera preview"));
        }
        let stream = camera.open(self.facing)?;
        tracing::debug!(stream = stream.id, facing = ?stream.facing, "camera stream attached");
        self.surface = Surface::Video(stream);
        self.set_mode(SessionMode::CameraPreviewFallback);
        Ok(())
    }

    fn stop_camera_preview(&mut self, camera: &mut dyn CameraDevice) {
        if let Surface::Video(stream) = std::mem::take(&mut self.surface) {
            camera.close(stream);
        }
        self.set_mode(SessionMode::Unset);
    }

    fn set_mode(&mut self, mode: SessionMode) {
        if self.mode != mode {
            tracing::info!(from = ?self.mode, to = ?mode, "session mode changed");
            self.mode = mode;
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;

    #[derive(Debug, Default)]
    pub struct FakeXr {
        pub supported: bool,
        pub fail_request: bool,
        pub sessions: usize,
        pub ended: usize,
        pub viewer: Option<Mat4>,
        pub hits: Vec<Mat4>,
        pub hit_sources_requested: usize,
        pub hit_sources_released: usize,
    }

    impl XrRuntime for FakeXr {
        fn is_session_supported(&mut self, _kind: SessionKind) -> Result<bool> {
            Ok(self.supported)
        }

        fn request_session(&mut self, _kind: SessionKind, required: &[XrFeature]) -> Result<()> {
            assert!(required.contains(&XrFeature::HitTest));
            if self.fail_request {
                return Err(GardenArError::msg("session request rejected"));
            }
            self.sessions += 1;
            Ok(())
        }

        fn end_session(&mut self) {
            self.ended += 1;
        }

        fn viewer_pose(&self) -> Option<Mat4> {
            self.viewer
        }

        fn request_hit_test_source(&mut self) -> Result<HitTestSource> {
            self.hit_sources_requested += 1;
            Ok(HitTestSource::new(self.hit_sources_requested as u64))
        }

        fn hit_test_results(&self, _source: &HitTestSource) -> Vec<Mat4> {
            self.hits.clone()
        }

        fn release_hit_test_source(&mut self, _source: HitTestSource) {
            self.hit_sources_released += 1;
        }
    }

    #[derive(Debug)]
    pub struct FakeCamera {
        pub available: bool,
        pub deny: bool,
        pub next_id: u64,
        pub open: Vec<VideoStream>,
    }

    impl Default for FakeCamera {
        fn default() -> Self {
            Self {
                available: true,
                deny: false,
                next_id: 0,
                open: Vec::new(),
            }
        }
    }

    impl CameraDevice for FakeCamera {
        fn is_available(&self) -> bool {
            self.available
        }

        fn open(&mut self, facing: FacingMode) -> Result<VideoStream> {
            if self.deny {
                return Err(GardenArError::PermissionDenied("camera".to_string()));
            }
            self.next_id += 1;
            let stream = VideoStream {
                id: self.next_id,
                facing,
            };
            self.open.push(stream.clone());
            Ok(stream)
        }

        fn close(&mut self, stream: VideoStream) {
            self.open.retain(|s| s.id != stream.id);
        }
    }
}
