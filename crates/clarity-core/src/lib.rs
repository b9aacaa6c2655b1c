//! Clarity Core: domain layer for the live accessibility video filter.
//!
//! This crate contains filter definitions, GPU parameter schemas, YUV
//! conversion math, viewport geometry, and camera device selection.
//! No GPU or windowing dependencies.

pub mod capture;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod params;
pub mod quality;
pub mod settings;
pub mod shader_map;
pub mod yuv;

// Re-exports for convenience.
pub use error::ConfigError;
pub use filters::{FilterCatalog, FilterModel, InputFilter, VideoFilter};
pub use geometry::{Extent, Orientation, Viewport, target_extent};
pub use params::{BlurParams, ColorParams, FilterParams, ParamKind, Rgba};
pub use quality::{GpuClass, QualityPreference, QualityTier};
pub use settings::RendererSettings;
pub use shader_map::{ShaderMap, ShaderPair};
pub use yuv::{YuvRange, YuvStandard};
