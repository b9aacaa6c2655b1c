//! Offscreen render targets sized to the output.
//!
//! A [`TargetSet`] holds the two ping-pong targets, the RGB conversion
//! target, and the blur target. Sets are never resized in place: a size
//! change builds a new set and swaps it in whole, so a frame that already
//! took a snapshot keeps rendering into the old one.

use std::sync::Arc;

use clarity_core::{Extent, target_extent};
use parking_lot::Mutex;

use crate::TARGET_FORMAT;
use crate::device::GpuContext;

/// What a pass does with a target's previous contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Contents are fully overwritten. wgpu has no don't-care load, so this
    /// clears.
    DontCare,
    Clear,
    Load,
}

impl LoadPolicy {
    pub fn load_op(self) -> wgpu::LoadOp<wgpu::Color> {
        match self {
            Self::DontCare | Self::Clear => wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            Self::Load => wgpu::LoadOp::Load,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePolicy {
    Store,
    Discard,
}

impl StorePolicy {
    pub fn store_op(self) -> wgpu::StoreOp {
        match self {
            Self::Store => wgpu::StoreOp::Store,
            Self::Discard => wgpu::StoreOp::Discard,
        }
    }
}

/// One offscreen color target and its pass policy.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub extent: Extent,
    pub load: LoadPolicy,
    pub store: StorePolicy,
}

impl RenderTarget {
    pub fn new(device: &wgpu::Device, label: &str, extent: Extent) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            extent,
            load: LoadPolicy::DontCare,
            store: StorePolicy::Store,
        }
    }
}

/// Every offscreen target for one output size.
pub struct TargetSet {
    pub extent: Extent,
    /// Increments on every recreation.
    pub generation: u64,
    pub ping_pong: [RenderTarget; 2],
    pub rgb: RenderTarget,
    pub blur: RenderTarget,
}

impl TargetSet {
    pub fn new(device: &wgpu::Device, extent: Extent, generation: u64) -> Self {
        Self {
            extent,
            generation,
            ping_pong: [
                RenderTarget::new(device, "clarity_ping_target", extent),
                RenderTarget::new(device, "clarity_pong_target", extent),
            ],
            rgb: RenderTarget::new(device, "clarity_rgb_target", extent),
            blur: RenderTarget::new(device, "clarity_blur_target", extent),
        }
    }
}

/// A GPU resource that may not exist yet.
#[derive(Debug, Clone, Default)]
pub enum ResourceState<T> {
    #[default]
    Uninitialized,
    Ready(T),
}

impl<T> ResourceState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Uninitialized => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct Sizing {
    output: Extent,
    display_scale: f32,
    capture: Extent,
    extent: Extent,
    generation: u64,
}

/// Owns the current [`TargetSet`] and rebuilds it when sizing inputs change.
///
/// Any thread may change the output size, display scale, or capture
/// resolution. Recreation runs under one lock; readers take an `Arc` snapshot
/// and never observe a partial set.
pub struct TargetManager {
    gpu: Option<Arc<GpuContext>>,
    sizing: Mutex<Sizing>,
    current: Mutex<ResourceState<Arc<TargetSet>>>,
    /// Largest 2D texture side the device accepts.
    max_dimension: u32,
}

/// Shrink `extent` uniformly until neither side exceeds `max`.
fn fit_texture_limit(extent: Extent, max: u32) -> Extent {
    let longest = extent.width.max(extent.height);
    if longest <= max {
        return extent;
    }
    let scale = max as f64 / longest as f64;
    let side = |v: u32| ((v as f64 * scale).round() as u32).clamp(1, max);
    Extent::new(side(extent.width), side(extent.height))
}

impl TargetManager {
    pub fn new(gpu: Arc<GpuContext>, display_scale: f32) -> Self {
        Self::with_gpu(Some(gpu), display_scale)
    }

    /// Manager that tracks sizing but never allocates textures.
    pub fn detached(display_scale: f32) -> Self {
        Self::with_gpu(None, display_scale)
    }

    fn with_gpu(gpu: Option<Arc<GpuContext>>, display_scale: f32) -> Self {
        let max_dimension = gpu
            .as_ref()
            .map_or(u32::MAX, |gpu| gpu.device.limits().max_texture_dimension_2d);
        Self {
            max_dimension,
            gpu,
            sizing: Mutex::new(Sizing {
                output: Extent::default(),
                display_scale,
                capture: Extent::default(),
                extent: Extent::default(),
                generation: 0,
            }),
            current: Mutex::new(ResourceState::Uninitialized),
        }
    }

    /// Cap target sides at `max` in addition to the device limit.
    pub fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = self.max_dimension.min(max.max(1));
        self
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Output surface size in logical pixels.
    pub fn set_output_size(&self, output: Extent) -> Option<Extent> {
        self.sizing.lock().output = output;
        self.resize()
    }

    pub fn set_display_scale(&self, scale: f32) -> Option<Extent> {
        self.sizing.lock().display_scale = scale;
        self.resize()
    }

    /// Resolution announced by the capture device.
    pub fn set_capture_resolution(&self, capture: Extent) -> Option<Extent> {
        self.sizing.lock().capture = capture;
        self.resize()
    }

    /// Recompute the target size and rebuild the set if it changed.
    ///
    /// Returns the new extent when a rebuild happened. Nothing is built until
    /// the output size is known, and no side exceeds the device texture limit.
    pub fn resize(&self) -> Option<Extent> {
        let mut sizing = self.sizing.lock();
        if sizing.output.is_empty() {
            return None;
        }
        let wanted = target_extent(sizing.output, sizing.display_scale, sizing.capture);
        let extent = fit_texture_limit(wanted, self.max_dimension);
        if extent != wanted {
            tracing::debug!(%wanted, %extent, limit = self.max_dimension, "Target size capped");
        }
        if extent.is_empty() || extent == sizing.extent {
            return None;
        }

        sizing.generation += 1;
        sizing.extent = extent;
        tracing::info!(
            %extent,
            output = %sizing.output,
            capture = %sizing.capture,
            generation = sizing.generation,
            "Render targets resized"
        );

        if let Some(gpu) = &self.gpu {
            let set = TargetSet::new(&gpu.device, extent, sizing.generation);
            *self.current.lock() = ResourceState::Ready(Arc::new(set));
        }
        Some(extent)
    }

    /// Current target set, or `Uninitialized` before the first resize.
    pub fn snapshot(&self) -> ResourceState<Arc<TargetSet>> {
        self.current.lock().clone()
    }

    pub fn output_size(&self) -> Extent {
        self.sizing.lock().output
    }

    pub fn capture_resolution(&self) -> Extent {
        self.sizing.lock().capture
    }

    /// Target extent and generation of the most recent resize.
    pub fn extent(&self) -> (Extent, u64) {
        let sizing = self.sizing.lock();
        (sizing.extent, sizing.generation)
    }
}
