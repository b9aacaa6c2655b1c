//! Adapter and device acquisition.

use clarity_core::{GpuClass, QualityTier};

use crate::error::RendererError;

/// Device, queue, and the capabilities the renderer cares about.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    /// Quality tier the adapter supports.
    pub detected_quality: QualityTier,
}

impl GpuContext {
    /// Request an adapter (compatible with `surface` when given) and a device.
    pub async fn new(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, RendererError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("clarity_device"),
                required_limits: adapter.limits(),
                ..Default::default()
            })
            .await?;

        Ok(Self::from_parts(adapter, device, queue))
    }

    /// Headless device for offscreen rendering and tests.
    pub fn create_blocking() -> Result<Self, RendererError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        pollster::block_on(Self::new(&instance, None))
    }

    /// Wrap an existing device.
    pub fn from_parts(adapter: wgpu::Adapter, device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let adapter_info = adapter.get_info();
        let detected_quality = detect_quality(&adapter);
        tracing::info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            quality = ?detected_quality,
            "GPU device ready"
        );
        Self {
            adapter,
            device,
            queue,
            adapter_info,
            detected_quality,
        }
    }
}

/// Quality tier for an adapter.
pub fn detect_quality(adapter: &wgpu::Adapter) -> QualityTier {
    let class = gpu_class(adapter.get_info().device_type);
    let compliant = adapter.get_downlevel_capabilities().is_webgpu_compliant();
    QualityTier::detect(class, compliant)
}

pub fn gpu_class(device_type: wgpu::DeviceType) -> GpuClass {
    match device_type {
        wgpu::DeviceType::DiscreteGpu => GpuClass::Discrete,
        wgpu::DeviceType::IntegratedGpu => GpuClass::Integrated,
        wgpu::DeviceType::VirtualGpu => GpuClass::Virtual,
        wgpu::DeviceType::Cpu => GpuClass::Cpu,
        wgpu::DeviceType::Other => GpuClass::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_software_adapter_maps_to_cpu_class() {
        assert_eq!(gpu_class(wgpu::DeviceType::Cpu), GpuClass::Cpu);
        assert_eq!(
            QualityTier::detect(gpu_class(wgpu::DeviceType::Cpu), true),
            QualityTier::Standard
        );
    }
}
