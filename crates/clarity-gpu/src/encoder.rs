//! Encodes a [`FramePlan`](crate::graph::FramePlan) into wgpu render passes.

use clarity_core::{Extent, Viewport};

use crate::bindings::PassBindings;
use crate::buffers::ParameterPool;
use crate::capture_bridge::YuvPlanes;
use crate::geometry::QuadBuffers;
use crate::graph::{PassNode, PassRecorder, TargetSlot, TextureSlot};
use crate::targets::TargetSet;

/// Textures one frame reads and writes.
pub struct FrameResources<'a> {
    pub targets: &'a TargetSet,
    pub planes: &'a YuvPlanes,
    pub surface_view: &'a wgpu::TextureView,
    pub surface_size: Extent,
}

pub struct WgpuPassRecorder<'a> {
    device: &'a wgpu::Device,
    encoder: &'a mut wgpu::CommandEncoder,
    bindings: &'a PassBindings,
    pool: &'a ParameterPool,
    quads: &'a QuadBuffers,
    frame: FrameResources<'a>,
    recorded: usize,
}

impl<'a> WgpuPassRecorder<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        encoder: &'a mut wgpu::CommandEncoder,
        bindings: &'a PassBindings,
        pool: &'a ParameterPool,
        quads: &'a QuadBuffers,
        frame: FrameResources<'a>,
    ) -> Self {
        Self {
            device,
            encoder,
            bindings,
            pool,
            quads,
            frame,
            recorded: 0,
        }
    }

    /// Passes encoded so far.
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    fn source_view(&self, slot: TextureSlot) -> &'a wgpu::TextureView {
        let targets = self.frame.targets;
        match slot {
            TextureSlot::Luma => &self.frame.planes.luma_view,
            TextureSlot::Chroma => &self.frame.planes.chroma_view,
            TextureSlot::Rgb => &targets.rgb.view,
            TextureSlot::Blur => &targets.blur.view,
            TextureSlot::PingPong(i) => &targets.ping_pong[i % 2].view,
        }
    }

    fn attachment(&self, slot: TargetSlot) -> (&'a wgpu::TextureView, wgpu::Operations<wgpu::Color>) {
        let targets = self.frame.targets;
        let target = match slot {
            TargetSlot::Rgb => &targets.rgb,
            TargetSlot::Blur => &targets.blur,
            TargetSlot::PingPong(i) => &targets.ping_pong[i % 2],
            TargetSlot::Surface => {
                return (
                    self.frame.surface_view,
                    wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                );
            }
        };
        (
            &target.view,
            wgpu::Operations {
                load: target.load.load_op(),
                store: target.store.store_op(),
            },
        )
    }
}

/// Keep a viewport inside the attachment.
fn clamp_viewport(vp: Viewport, size: Extent) -> Viewport {
    let (w, h) = (size.width as f32, size.height as f32);
    let x = vp.x.clamp(0.0, w);
    let y = vp.y.clamp(0.0, h);
    Viewport {
        x,
        y,
        width: vp.width.clamp(0.0, w - x),
        height: vp.height.clamp(0.0, h - y),
        ..vp
    }
}

impl PassRecorder<wgpu::RenderPipeline> for WgpuPassRecorder<'_> {
    fn record(&mut self, pass: &PassNode<wgpu::RenderPipeline>) {
        let Some((param_group, offset)) = self.pool.binding(pass.params()) else {
            tracing::warn!(pass = pass.name(), "Parameter ring has no GPU backing, pass skipped");
            return;
        };
        let [a, b, c] = pass.sources.map(|s| self.source_view(s));
        let textures = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("clarity_pass_textures"),
            layout: &self.bindings.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(a),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(b),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(c),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.bindings.nearest_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.bindings.linear_sampler),
                },
            ],
        });
        let (view, ops) = self.attachment(pass.target);
        let size = match pass.target {
            TargetSlot::Surface => self.frame.surface_size,
            _ => self.frame.targets.extent,
        };

        let mut rpass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.name()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops,
            })],
            ..Default::default()
        });
        rpass.set_pipeline(pass.pipeline.handle());
        rpass.set_bind_group(0, &textures, &[]);
        rpass.set_bind_group(1, param_group, &[offset]);
        rpass.set_vertex_buffer(0, self.quads.slice(pass.geometry));
        if let Some(vp) = pass.viewport {
            let vp = clamp_viewport(vp, size);
            if vp.width <= 0.0 || vp.height <= 0.0 {
                return;
            }
            rpass.set_viewport(vp.x, vp.y, vp.width, vp.height, vp.min_depth, vp.max_depth);
        }
        rpass.draw(0..QuadBuffers::VERTEX_COUNT, 0..1);
        self.recorded += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_viewport_keeps_inside_attachment() {
        let vp = Viewport {
            x: -10.0,
            y: 50.0,
            width: 500.0,
            height: 100.0,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let out = clamp_viewport(vp, Extent::new(400, 120));
        assert_eq!((out.x, out.y, out.width, out.height), (0.0, 50.0, 400.0, 70.0));
    }
}
