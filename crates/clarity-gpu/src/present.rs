//! Where the final pass draws: a window surface or an offscreen texture.

use std::sync::Arc;

use clarity_core::Extent;

use crate::device::GpuContext;

/// Texture view for one frame's present pass.
pub struct Drawable {
    pub view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl Drawable {
    /// Show the frame. A no-op for offscreen targets.
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

pub trait PresentTarget {
    /// Drawable size in physical pixels.
    fn size(&self) -> Extent;

    fn format(&self) -> wgpu::TextureFormat;

    /// Next drawable, or `None` when none is available this tick.
    fn acquire(&mut self) -> Option<Drawable>;
}

/// A configured window surface.
pub struct SurfaceTarget<'w> {
    surface: wgpu::Surface<'w>,
    config: wgpu::SurfaceConfiguration,
    gpu: Arc<GpuContext>,
}

impl<'w> SurfaceTarget<'w> {
    /// Configure `surface` with its preferred format at `size`.
    pub fn new(gpu: Arc<GpuContext>, surface: wgpu::Surface<'w>, size: Extent) -> Option<Self> {
        let mut config =
            surface.get_default_config(&gpu.adapter, size.width.max(1), size.height.max(1))?;
        config.present_mode = wgpu::PresentMode::Fifo;
        surface.configure(&gpu.device, &config);
        tracing::info!(format = ?config.format, %size, "Surface configured");
        Some(Self {
            surface,
            config,
            gpu,
        })
    }

    pub fn resize(&mut self, size: Extent) {
        if size.is_empty() {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.gpu.device, &self.config);
    }
}

impl PresentTarget for SurfaceTarget<'_> {
    fn size(&self) -> Extent {
        Extent::new(self.config.width, self.config.height)
    }

    fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn acquire(&mut self) -> Option<Drawable> {
        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.gpu.device, &self.config);
                return None;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::trace!("Surface acquire timed out");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Surface texture unavailable");
                return None;
            }
        };
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Some(Drawable {
            view,
            surface_texture: Some(texture),
        })
    }
}

/// Renders into a texture that can be read back.
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    size: Extent,
    format: wgpu::TextureFormat,
}

impl OffscreenTarget {
    pub fn new(device: &wgpu::Device, size: Extent, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("clarity_offscreen_present"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        Self {
            texture,
            size,
            format,
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

impl PresentTarget for OffscreenTarget {
    fn size(&self) -> Extent {
        self.size
    }

    fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn acquire(&mut self) -> Option<Drawable> {
        Some(Drawable {
            view: self
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            surface_texture: None,
        })
    }
}
