//! Clarity GPU: wgpu render core for the live accessibility video filter.
//!
//! Camera frames arrive as bi-planar YUV through the [`CaptureBridge`], are
//! converted to RGB, optionally blurred, run through the active video
//! filter's passes, and presented with orientation-aware geometry. Parameter
//! blocks live in per-kind [`BufferRing`]s, and a [`FrameLimiter`] bounds the
//! number of frames the GPU may have queued.

pub mod bindings;
pub mod buffers;
pub mod capture_bridge;
pub mod control;
pub mod device;
pub mod encoder;
pub mod error;
pub mod frame_limiter;
pub mod geometry;
pub mod graph;
pub mod pipeline_cache;
pub mod present;
pub mod readback;
pub mod renderer;
pub mod scheduler;
pub mod shader_library;
pub mod targets;

pub use buffers::{BufferRing, ParameterPool};
pub use capture_bridge::{CaptureBridge, DeliveryQueue, YuvPlanes};
pub use control::{ControlCommand, ControlHandle};
pub use device::GpuContext;
pub use error::{ControlError, PipelineError, ReadbackError, RendererError};
pub use frame_limiter::{FrameLimiter, FramePermit};
pub use graph::{FramePlan, PassRecorder};
pub use pipeline_cache::{Pipeline, PipelineCache, PipelineCompiler, WgpuPipelineCompiler};
pub use present::{Drawable, OffscreenTarget, PresentTarget, SurfaceTarget};
pub use renderer::{FrameOutcome, Renderer, RendererBuilder};
pub use scheduler::{FrameScheduler, SkipReason};
pub use targets::{ResourceState, TargetManager, TargetSet};

/// Pixel format of every offscreen render target.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;
