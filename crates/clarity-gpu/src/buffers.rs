//! Multi-buffered shader parameter blocks.
//!
//! A [`BufferRing`] keeps `N` copies of one parameter block in a single
//! uniform buffer. Updates go to the slot after the current one, so the GPU
//! never reads a slot the CPU is rewriting as long as fewer than `N` frames
//! are in flight. A ring always has at least two slots.

use std::num::NonZeroU64;

use clarity_core::params::GpuStruct;
use clarity_core::{BlurParams, ColorParams, FilterParams, ParamKind};

/// GPU side of a ring: one buffer holding every slot, bound with a dynamic offset.
struct RingBacking {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
}

/// Fixed-size rotation of one parameter block.
pub struct BufferRing<T: GpuStruct> {
    label: &'static str,
    slots: Vec<T>,
    dirty: Vec<bool>,
    /// Total number of slot advances; the current slot is `cursor % N`.
    cursor: u64,
    current: usize,
    backing: Option<RingBacking>,
}

impl<T: GpuStruct> BufferRing<T> {
    /// CPU-only ring, for planning without a device.
    pub fn detached(label: &'static str, count: usize, initial: T) -> Self {
        let count = count.max(2);
        Self {
            label,
            slots: vec![initial; count],
            dirty: vec![true; count],
            cursor: 0,
            current: 0,
            backing: None,
        }
    }

    /// Ring backed by one uniform buffer of `count` aligned slots.
    pub fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &'static str,
        count: usize,
        initial: T,
    ) -> Self {
        let mut ring = Self::detached(label, count, initial);
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let size = std::mem::size_of::<T>() as u64;
        let stride = size.div_ceil(alignment) * alignment;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride * ring.slots.len() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(size),
                }),
            }],
        });
        ring.backing = Some(RingBacking {
            buffer,
            bind_group,
            stride,
        });
        tracing::debug!(label, slots = ring.slots.len(), stride, "Allocated parameter ring");
        ring
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Advance the cursor and make the following slot current.
    ///
    /// A fresh ring starts on slot 0 and yields `1, 2, ..., N-1, 0, ...`.
    /// Contents are not carried forward; [`update`](Self::update) does that.
    pub fn next_slot(&mut self) -> usize {
        self.cursor += 1;
        self.current = (self.cursor % self.slots.len() as u64) as usize;
        self.current
    }

    /// Slot the next frame will bind.
    pub fn current_slot(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    pub fn get(&self, slot: usize) -> &T {
        &self.slots[slot]
    }

    /// Mutate one slot in place. Panics if `slot` is out of range.
    pub fn write(&mut self, slot: usize, f: impl FnOnce(&mut T)) {
        f(&mut self.slots[slot]);
        self.dirty[slot] = true;
    }

    /// Copy the current block into the next slot, apply `f`, and make that
    /// slot current. Returns the slot written.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) -> usize {
        let previous = self.current;
        let slot = self.next_slot();
        self.slots[slot] = self.slots[previous];
        self.write(slot, f);
        slot
    }

    pub fn is_dirty(&self, slot: usize) -> bool {
        self.dirty[slot]
    }

    /// Upload every dirty slot. Returns the number of slots written.
    pub fn flush(&mut self, queue: &wgpu::Queue) -> usize {
        let Some(backing) = &self.backing else {
            return 0;
        };
        let mut written = 0;
        for (slot, dirty) in self.dirty.iter_mut().enumerate() {
            if !*dirty {
                continue;
            }
            queue.write_buffer(
                &backing.buffer,
                slot as u64 * backing.stride,
                bytemuck::bytes_of(&self.slots[slot]),
            );
            *dirty = false;
            written += 1;
        }
        if written > 0 {
            tracing::trace!(label = self.label, written, "Flushed parameter ring");
        }
        written
    }

    /// Bind group and dynamic offset of the current slot.
    pub fn binding(&self) -> Option<(&wgpu::BindGroup, u32)> {
        self.backing
            .as_ref()
            .map(|b| (&b.bind_group, (self.current as u64 * b.stride) as u32))
    }
}

/// One ring per parameter kind.
pub struct ParameterPool {
    pub color: BufferRing<ColorParams>,
    pub blur: BufferRing<BlurParams>,
    pub filter: BufferRing<FilterParams>,
}

impl ParameterPool {
    pub fn detached(count: usize, color: ColorParams, filter: FilterParams) -> Self {
        Self {
            color: BufferRing::detached("clarity_color_params", count, color),
            blur: BufferRing::detached("clarity_blur_params", count, BlurParams::default()),
            filter: BufferRing::detached("clarity_filter_params", count, filter),
        }
    }

    pub fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        count: usize,
        color: ColorParams,
        filter: FilterParams,
    ) -> Self {
        Self {
            color: BufferRing::allocate(device, layout, "clarity_color_params", count, color),
            blur: BufferRing::allocate(
                device,
                layout,
                "clarity_blur_params",
                count,
                BlurParams::default(),
            ),
            filter: BufferRing::allocate(device, layout, "clarity_filter_params", count, filter),
        }
    }

    pub fn current_slot(&self, kind: ParamKind) -> usize {
        match kind {
            ParamKind::Color => self.color.current_slot(),
            ParamKind::Blur => self.blur.current_slot(),
            ParamKind::Filter => self.filter.current_slot(),
        }
    }

    pub fn binding(&self, kind: ParamKind) -> Option<(&wgpu::BindGroup, u32)> {
        match kind {
            ParamKind::Color => self.color.binding(),
            ParamKind::Blur => self.blur.binding(),
            ParamKind::Filter => self.filter.binding(),
        }
    }

    pub fn flush(&mut self, queue: &wgpu::Queue) -> usize {
        self.color.flush(queue) + self.blur.flush(queue) + self.filter.flush(queue)
    }
}
