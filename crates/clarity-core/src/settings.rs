//! Renderer start-up settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capture::CapturePreferences;
use crate::error::ConfigError;
use crate::geometry::Orientation;
use crate::params::Rgba;
use crate::quality::QualityPreference;
use crate::yuv::{YuvRange, YuvStandard};

/// Everything the renderer needs before the first frame.
///
/// Every field has a default, so a partial (or empty) JSON document is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Maximum frames submitted but not yet completed by the GPU.
    pub frames_in_flight: usize,
    pub yuv_standard: YuvStandard,
    pub yuv_range: YuvRange,
    /// Physical pixels per logical output pixel.
    pub display_scale: f32,
    pub quality: QualityPreference,
    pub primary_color: Rgba,
    pub secondary_color: Rgba,
    pub blur_enabled: bool,
    pub invert_screen: bool,
    pub orientation: Orientation,
    /// Initial video filter; the first catalog entry when unset or unknown.
    pub video_filter: Option<String>,
    /// Initial input filter; the first catalog entry when unset or unknown.
    pub input_filter: Option<String>,
    pub capture: CapturePreferences,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            frames_in_flight: 3,
            yuv_standard: YuvStandard::default(),
            yuv_range: YuvRange::default(),
            display_scale: 1.0,
            quality: QualityPreference::default(),
            primary_color: Rgba::DEFAULT_PRIMARY,
            secondary_color: Rgba::DEFAULT_SECONDARY,
            blur_enabled: false,
            invert_screen: false,
            orientation: Orientation::default(),
            video_filter: None,
            input_filter: None,
            capture: CapturePreferences::default(),
        }
    }
}

impl RendererSettings {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_json(&text)
    }

    /// Frames-in-flight bound, at least one.
    pub fn max_frames_in_flight(&self) -> usize {
        self.frames_in_flight.max(1)
    }

    /// Parameter ring length: one more slot than frames in flight.
    pub fn ring_size(&self) -> usize {
        self.max_frames_in_flight() + 1
    }
}
