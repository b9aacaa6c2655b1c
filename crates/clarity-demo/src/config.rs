//! Command-line configuration for the demo.

use std::path::{Path, PathBuf};

use clap::Parser;
use clarity_core::{ConfigError, FilterModel, RendererSettings, ShaderMap};

/// Default output width.
const DEFAULT_WIDTH: u32 = 1280;
/// Default output height.
const DEFAULT_HEIGHT: u32 = 720;
/// Default number of frames to render.
const DEFAULT_FRAMES: u64 = 120;

/// Runs the filter pipeline headless against a synthetic camera.
#[derive(Parser, Debug, Clone)]
#[command(name = "clarity-demo", version, about)]
pub struct DemoArgs {
    /// Renderer settings JSON; defaults apply when omitted.
    #[arg(long)]
    pub settings: Option<PathBuf>,
    /// Filter definitions JSON; the built-in catalog when omitted.
    #[arg(long)]
    pub filters: Option<PathBuf>,
    /// Pipeline-to-shader mapping JSON; the built-in map when omitted.
    #[arg(long)]
    pub shader_map: Option<PathBuf>,

    /// Output width in physical pixels.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,
    /// Output height in physical pixels.
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    pub frames: u64,
    /// Frame pacing in frames per second.
    #[arg(long, default_value_t = 60.0)]
    pub fps: f64,

    #[arg(long)]
    pub video_filter: Option<String>,
    #[arg(long)]
    pub input_filter: Option<String>,
    #[arg(long)]
    pub blur: bool,
    #[arg(long)]
    pub invert: bool,
    /// Start on the front camera.
    #[arg(long)]
    pub front: bool,
    /// Advance to the next video filter every N frames.
    #[arg(long)]
    pub cycle: Option<u64>,

    /// Write the last frame here as PNG.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Everything loaded from disk before the renderer starts.
pub struct LoadedConfig {
    pub settings: RendererSettings,
    pub filters: FilterModel,
    pub shader_map: ShaderMap,
}

impl DemoArgs {
    /// Read the configured documents and apply command-line overrides.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut settings = load_or(self.settings.as_deref(), RendererSettings::load, RendererSettings::default)?;
        let filters = load_or(self.filters.as_deref(), FilterModel::load, FilterModel::builtin)?;
        let shader_map = load_or(self.shader_map.as_deref(), ShaderMap::load, ShaderMap::builtin)?;

        if self.video_filter.is_some() {
            settings.video_filter.clone_from(&self.video_filter);
        }
        if self.input_filter.is_some() {
            settings.input_filter.clone_from(&self.input_filter);
        }
        settings.blur_enabled |= self.blur;
        settings.invert_screen |= self.invert;

        Ok(LoadedConfig {
            settings,
            filters,
            shader_map,
        })
    }
}

fn load_or<T>(
    path: Option<&Path>,
    load: fn(&Path) -> Result<T, ConfigError>,
    fallback: fn() -> T,
) -> Result<T, ConfigError> {
    match path {
        Some(path) => load(path),
        None => Ok(fallback()),
    }
}
