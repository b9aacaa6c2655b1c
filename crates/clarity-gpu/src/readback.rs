//! GPU-to-CPU texture download.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ReadbackError;

/// Row pitch wgpu requires for texture-to-buffer copies.
const COPY_ROW_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

fn padded_row(width: u32) -> u32 {
    (width * 4).div_ceil(COPY_ROW_ALIGNMENT) * COPY_ROW_ALIGNMENT
}

/// Copy a 4-byte-per-pixel color texture into tightly packed rows. Blocks
/// until the GPU has finished all submitted work.
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<Vec<u8>, ReadbackError> {
    let format = texture.format();
    if !matches!(
        format,
        wgpu::TextureFormat::Bgra8Unorm
            | wgpu::TextureFormat::Bgra8UnormSrgb
            | wgpu::TextureFormat::Rgba8Unorm
            | wgpu::TextureFormat::Rgba8UnormSrgb
    ) {
        return Err(ReadbackError::UnsupportedFormat(format));
    }

    let (width, height) = (texture.width(), texture.height());
    let padded = padded_row(width);
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("clarity_readback_staging"),
        size: padded as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("clarity_readback"),
    });
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    queue.submit(std::iter::once(encoder.finish()));

    let mapped = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&mapped);
    staging
        .slice(..)
        .map_async(wgpu::MapMode::Read, move |result| *slot.lock() = Some(result));
    device.poll(wgpu::PollType::wait_indefinitely())?;
    mapped.lock().take().ok_or(ReadbackError::NotMapped)??;

    let row = width as usize * 4;
    let mut pixels = Vec::with_capacity(row * height as usize);
    {
        let data = staging.slice(..).get_mapped_range();
        for chunk in data.chunks(padded as usize) {
            pixels.extend_from_slice(&chunk[..row]);
        }
    }
    staging.unmap();
    Ok(pixels)
}

/// Swap the red and blue channels of packed 4-byte pixels in place.
pub fn bgra_to_rgba(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}
