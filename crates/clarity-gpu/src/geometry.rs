//! Vertex buffers for the four orientation quads.

use clarity_core::Orientation;
use clarity_core::geometry::QuadVertex;
use wgpu::util::DeviceExt;

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

/// Vertex layout shared by every pipeline: position then texture coordinate.
pub fn quad_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &QUAD_ATTRIBUTES,
    }
}

/// One small vertex buffer per orientation, indexed by [`Orientation::index`].
pub struct QuadBuffers {
    buffers: [wgpu::Buffer; 4],
}

impl QuadBuffers {
    pub const VERTEX_COUNT: u32 = 6;

    pub fn new(device: &wgpu::Device) -> Self {
        let buffers = Orientation::ALL.map(|orientation| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(match orientation {
                    Orientation::LandscapeRight => "clarity_quad_landscape_right",
                    Orientation::LandscapeLeft => "clarity_quad_landscape_left",
                    Orientation::Portrait => "clarity_quad_portrait",
                    Orientation::PortraitUpsideDown => "clarity_quad_portrait_upside_down",
                }),
                contents: bytemuck::cast_slice(&orientation.quad().vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
        Self { buffers }
    }

    pub fn slice(&self, orientation: Orientation) -> wgpu::BufferSlice<'_> {
        self.buffers[orientation.index()].slice(..)
    }
}
