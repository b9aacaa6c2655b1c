//! Rendering quality tiers and how they are chosen.

use serde::{Deserialize, Serialize};

/// Coarse class of the rendering adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuClass {
    Discrete,
    Integrated,
    Virtual,
    Cpu,
    Other,
}

/// Blur kernel and edge threshold variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    #[default]
    Standard,
    High,
}

/// User preference: force a tier or detect it from the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreference {
    #[default]
    Auto,
    Standard,
    High,
}

impl QualityTier {
    /// Pick a tier from adapter capabilities.
    ///
    /// Hardware adapters that pass the full WebGPU downlevel checks get the
    /// high tier; software rasterizers and limited adapters get standard.
    pub fn detect(class: GpuClass, webgpu_compliant: bool) -> Self {
        match class {
            GpuClass::Discrete | GpuClass::Integrated if webgpu_compliant => Self::High,
            _ => Self::Standard,
        }
    }

    pub fn from_high_quality(enabled: bool) -> Self {
        if enabled { Self::High } else { Self::Standard }
    }

    pub fn is_high(self) -> bool {
        self == Self::High
    }

    /// `(low, high)` edge detection thresholds.
    pub fn thresholds(self) -> (f32, f32) {
        match self {
            Self::High => (0.05, 0.10),
            Self::Standard => (0.15, 0.25),
        }
    }

    /// Horizontal and vertical blur pipeline names.
    pub fn blur_pipelines(self) -> [&'static str; 2] {
        match self {
            Self::High => ["blur_x_hq", "blur_y_hq"],
            Self::Standard => ["blur_x", "blur_y"],
        }
    }
}

impl QualityPreference {
    pub fn resolve(self, detected: QualityTier) -> QualityTier {
        match self {
            Self::Auto => detected,
            Self::Standard => QualityTier::Standard,
            Self::High => QualityTier::High,
        }
    }
}
