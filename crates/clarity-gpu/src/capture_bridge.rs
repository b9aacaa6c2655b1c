//! Hands camera frames to the render thread.
//!
//! Frames arrive on a single delivery thread in capture order. Each frame's
//! planes are uploaded into an R8 luma texture and an RG8 chroma texture,
//! and the pair is published under a mutex as one `Arc`. The render thread
//! clones that `Arc` and releases the lock before encoding, so it always
//! sees a matching luma/chroma pair.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use clarity_core::Extent;
use clarity_core::capture::{Plane, YuvFrame};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::device::GpuContext;

/// Maximum number of idle plane pairs kept for reuse.
const POOL_LIMIT: usize = 3;

/// Luma and chroma textures for one frame.
pub struct YuvPlanes {
    pub luma: wgpu::Texture,
    pub luma_view: wgpu::TextureView,
    pub chroma: wgpu::Texture,
    pub chroma_view: wgpu::TextureView,
    /// Luma resolution; chroma is half in each dimension.
    pub extent: Extent,
    pub sequence: u64,
}

impl YuvPlanes {
    fn new(device: &wgpu::Device, extent: Extent) -> Self {
        let (luma, luma_view) = plane_texture(
            device,
            "clarity_luma_plane",
            extent,
            wgpu::TextureFormat::R8Unorm,
        );
        let (chroma, chroma_view) = plane_texture(
            device,
            "clarity_chroma_plane",
            Extent::new(extent.width / 2, extent.height / 2),
            wgpu::TextureFormat::Rg8Unorm,
        );
        Self {
            luma,
            luma_view,
            chroma,
            chroma_view,
            extent,
            sequence: 0,
        }
    }
}

fn plane_texture(
    device: &wgpu::Device,
    label: &str,
    extent: Extent,
    format: wgpu::TextureFormat,
) -> (wgpu::Texture, wgpu::TextureView) {
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
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn upload_plane(queue: &wgpu::Queue, texture: &wgpu::Texture, plane: &Plane) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &plane.data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(plane.stride as u32),
            rows_per_image: Some(plane.height),
        },
        wgpu::Extent3d {
            width: plane.width,
            height: plane.height,
            depth_or_array_layers: 1,
        },
    );
}

/// Take an entry nobody else holds, preferring ones that satisfy `fits`.
/// Entries still shared stay in the pool.
fn reclaim<T>(pool: &mut Vec<Arc<T>>, fits: impl Fn(&T) -> bool) -> Option<Arc<T>> {
    let index = pool
        .iter()
        .position(|p| Arc::strong_count(p) == 1 && fits(p))?;
    Some(pool.swap_remove(index))
}

/// Shared latest-frame slot plus the texture pool behind it.
pub struct CaptureBridge {
    gpu: Arc<GpuContext>,
    latest: Mutex<Option<Arc<YuvPlanes>>>,
    pool: Mutex<Vec<Arc<YuvPlanes>>>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl CaptureBridge {
    pub fn new(gpu: Arc<GpuContext>) -> Self {
        Self {
            gpu,
            latest: Mutex::new(None),
            pool: Mutex::new(Vec::new()),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Upload `frame` and publish it as the latest pair.
    ///
    /// Called from the delivery thread only.
    pub fn deliver(&self, frame: &YuvFrame) {
        let extent = frame.resolution();
        if extent.is_empty() {
            tracing::warn!(sequence = frame.sequence, "Ignoring empty camera frame");
            return;
        }

        let reused = reclaim(&mut self.pool.lock(), |p| p.extent == extent);
        let mut planes = match reused.and_then(|p| Arc::try_unwrap(p).ok()) {
            Some(planes) => planes,
            None => {
                tracing::debug!(%extent, "Allocating camera plane textures");
                YuvPlanes::new(&self.gpu.device, extent)
            }
        };
        upload_plane(&self.gpu.queue, &planes.luma, &frame.luma);
        upload_plane(&self.gpu.queue, &planes.chroma, &frame.chroma);
        planes.sequence = frame.sequence;

        let previous = self.latest.lock().replace(Arc::new(planes));
        if let Some(previous) = previous {
            let mut pool = self.pool.lock();
            pool.push(previous);
            if pool.len() > POOL_LIMIT {
                pool.remove(0);
            }
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(sequence = frame.sequence, "Camera frame published");
    }

    /// Latest published pair, if any frame has arrived.
    pub fn snapshot(&self) -> Option<Arc<YuvPlanes>> {
        self.latest.lock().clone()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Frames discarded because the delivery queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Start the serial delivery thread. Frames submitted while `capacity`
    /// frames are already queued are dropped.
    pub fn spawn_delivery_queue(self: &Arc<Self>, capacity: usize) -> std::io::Result<DeliveryQueue> {
        let (tx, mut rx) = mpsc::channel::<YuvFrame>(capacity.max(1));
        let bridge = Arc::clone(self);
        let thread = std::thread::Builder::new()
            .name("capture-delivery".into())
            .spawn(move || {
                while let Some(frame) = rx.blocking_recv() {
                    bridge.deliver(&frame);
                }
                tracing::debug!("Capture delivery queue closed");
            })?;
        Ok(DeliveryQueue {
            tx: Some(tx),
            thread: Some(thread),
            bridge: Arc::clone(self),
        })
    }
}

/// Producer side of the delivery thread.
pub struct DeliveryQueue {
    tx: Option<mpsc::Sender<YuvFrame>>,
    thread: Option<JoinHandle<()>>,
    bridge: Arc<CaptureBridge>,
}

impl DeliveryQueue {
    /// Queue a frame. Returns `false` if it was dropped.
    pub fn submit(&self, frame: YuvFrame) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                self.bridge.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(sequence = frame.sequence, "Dropped late camera frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Deliver everything already queued, then stop the thread.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Capture delivery thread panicked");
            }
        }
    }
}

impl Drop for DeliveryQueue {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reclaim_skips_shared_entries() {
        let held = Arc::new(Extent::new(4, 4));
        let mut pool = vec![Arc::clone(&held), Arc::new(Extent::new(4, 4))];
        let got = reclaim(&mut pool, |e| *e == Extent::new(4, 4));
        assert!(got.is_some_and(|g| !Arc::ptr_eq(&g, &held)));
        assert_eq!(pool.len(), 1);
        assert!(reclaim(&mut pool, |_| true).is_none());
    }

    #[test]
    fn test_reclaim_requires_matching_size() {
        let mut pool = vec![Arc::new(Extent::new(8, 8))];
        assert!(reclaim(&mut pool, |e| *e == Extent::new(4, 4)).is_none());
        assert_eq!(pool.len(), 1);
    }
}
