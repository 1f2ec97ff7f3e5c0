use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use image::{ImageFormat, RgbaImage};

use crate::{config::CaptureConfig, session::SessionMode, GardenArError, Result};

/// Pixel readback from whatever the view currently shows: the 3D canvas in
/// an immersive session or the video element in the camera preview.
pub trait FrameSource {
    /// Native pixel size, when the source knows it.
    fn native_size(&self) -> Option<(u32, u32)>;
    /// Tightly packed RGBA8 pixels, `width * height * 4` bytes.
    fn read_rgba(&mut self, width: u32, height: u32) -> Result<Vec<u8>>;
}

/// Encoded PNG ready to be offered as a download.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl Snapshot {
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        std::fs::write(&path, &self.png)?;
        Ok(path)
    }
}

#[derive(Debug, Default)]
pub struct CaptureService {
    settings: CaptureConfig,
}

impl CaptureService {
    pub fn new(settings: CaptureConfig) -> Self {
        Self { settings }
    }

    /// Grabs the current frame. Video frames are drawn at the stream's
    /// native resolution, falling back to the container size; the immersive
    /// canvas is read back directly.
    pub fn snapshot(
        &self,
        mode: SessionMode,
        source: &mut dyn FrameSource,
        container: (u32, u32),
    ) -> Result<Snapshot> {
        let (width, height) = match mode {
            SessionMode::CameraPreviewFallback => source
                .native_size()
                .filter(|(w, h)| *w > 0 && *h > 0)
                .unwrap_or(container),
            SessionMode::ImmersiveAr => source.native_size().unwrap_or(container),
            SessionMode::Unset => {
                return Err(GardenArError::CaptureUnsupported(
                    "no active view to capture".to_string(),
                ))
            }
        };
        if width == 0 || height == 0 {
            return Err(GardenArError::CaptureUnsupported(format!(
                "empty surface {width}x{height}"
            )));
        }

        let pixels = source.read_rgba(width, height)?;
        let image = RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
            GardenArError::CaptureUnsupported(format!("pixel buffer does not match {width}x{height}"))
        })?;

        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        tracing::info!(?mode, width, height, bytes = png.len(), "snapshot captured");

        Ok(Snapshot {
            file_name: self.settings.file_name.clone(),
            width,
            height,
            png,
        })
    }
}
