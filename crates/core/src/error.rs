/// Result alias that carries the custom [`GardenArError`] type.
pub type Result<T> = std::result::Result<T, GardenArError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum GardenArError {
    /// The device cannot run the requested capability (immersive AR, camera
    /// preview). Immersive AR being unavailable triggers the camera fallback
    /// and is never shown to the user.
    #[error("{0} is not supported on this device")]
    CapabilityUnsupported(&'static str),
    /// The user (or the platform) refused camera access.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// A 3D model could not be fetched or decoded.
    #[error("could not load asset `{url}`: {reason}")]
    AssetLoad { url: String, reason: String },
    /// Pixel readback is unavailable for the current surface.
    #[error("capture unsupported: {0}")]
    CaptureUnsupported(String),
    /// Placement preconditions were not met.
    #[error("placement rejected: {0}")]
    Placement(&'static str),
    /// Invalid or inconsistent configuration values.
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Image(#[from] image::ImageError),
}

impl GardenArError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Shorthand for an [`GardenArError::AssetLoad`] failure.
    pub fn asset_load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AssetLoad {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

impl From<&str> for GardenArError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for GardenArError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
