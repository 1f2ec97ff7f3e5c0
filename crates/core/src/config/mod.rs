use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{session::FacingMode, GardenArError, Result};

/// Top-level configuration structure for the planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArConfig {
    pub placement: PlacementConfig,
    pub gesture: GestureConfig,
    pub capture: CaptureConfig,
    pub tips: TipsConfig,
    pub camera: CameraConfig,
}

impl ArConfig {
    /// Parses a JSON document. Missing sections fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.placement;
        if !(p.min_scale > 0.0 && p.min_scale <= p.max_scale) {
            return Err(GardenArError::Config(format!(
                "placement scale range [{}, {}] is empty or non-positive",
                p.min_scale, p.max_scale
            )));
        }
        if p.default_scale <= 0.0 {
            return Err(GardenArError::Config(
                "placement default_scale must be positive".to_string(),
            ));
        }
        if p.max_objects == 0 {
            return Err(GardenArError::Config(
                "placement max_objects must be at least 1".to_string(),
            ));
        }

        let g = &self.gesture;
        if !(g.pinch_min_ratio > 0.0 && g.pinch_min_ratio <= 1.0 && g.pinch_max_ratio >= 1.0) {
            return Err(GardenArError::Config(format!(
                "pinch ratio range [{}, {}] must bracket 1.0",
                g.pinch_min_ratio, g.pinch_max_ratio
            )));
        }
        if !(g.drag_follow > 0.0 && g.drag_follow <= 1.0) {
            return Err(GardenArError::Config(format!(
                "drag_follow {} must be in (0, 1]",
                g.drag_follow
            )));
        }

        if self.capture.file_name.trim().is_empty() {
            return Err(GardenArError::Config(
                "capture file_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scale bounds applied when a catalog item is turned into a placed object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    pub default_scale: f32,
    /// Oldest objects are evicted once this many are placed.
    pub max_objects: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 2.5,
            default_scale: 0.5,
            max_objects: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub pinch_min_ratio: f32,
    pub pinch_max_ratio: f32,
    /// Fraction of the remaining distance covered by each drag event.
    pub drag_follow: f32,
    /// Height of the horizontal plane single-finger drags are projected on.
    pub ground_height: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pinch_min_ratio: 0.8,
            pinch_max_ratio: 1.25,
            drag_follow: 0.4,
            ground_height: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub file_name: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            file_name: "ar-garden.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TipsConfig {
    pub base_url: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for TipsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            endpoint: "/api/ai/chat".to_string(),
            timeout_secs: 20,
        }
    }
}

impl TipsConfig {
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub default_facing: FacingMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ArConfig::from_json_str(r#"{ "placement": { "max_objects": 8 } }"#).unwrap();
        assert_eq!(config.placement.max_objects, 8);
        assert_eq!(config.placement.max_scale, 2.5);
        assert_eq!(config.gesture.drag_follow, 0.4);
        assert_eq!(config.capture.file_name, "ar-garden.png");
        assert_eq!(config.camera.default_facing, FacingMode::Environment);
    }

    #[test]
    fn rejects_inverted_scale_range() {
        let err = ArConfig::from_json_str(
            r#"{ "placement": { "min_scale": 3.0, "max_scale": 1.0 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, GardenArError::Config(_)));
    }

    #[test]
    fn rejects_pinch_range_that_excludes_identity() {
        let mut config = ArConfig::default();
        config.gesture.pinch_max_ratio = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn joins_tips_url() {
        let tips = TipsConfig {
            base_url: "http://garden.local/".to_string(),
            ..Default::default()
        };
        assert_eq!(tips.url(), "http://garden.local/api/ai/chat");
    }
}
