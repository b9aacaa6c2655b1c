//! Error types for the render core.

use clarity_core::ParamKind;
use thiserror::Error;

/// A named pipeline could not be built.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("pipeline {pipeline}: no {stage} entry point named {entry}")]
    MissingEntryPoint {
        pipeline: String,
        stage: &'static str,
        entry: String,
    },
    #[error("pipeline {pipeline} reads {found:?} parameters, expected {expected:?}")]
    ParamKindMismatch {
        pipeline: String,
        expected: ParamKind,
        found: ParamKind,
    },
    #[error("pipeline {pipeline} failed validation: {message}")]
    Validation { pipeline: String, message: String },
}

/// Renderer construction failed. No partial renderer is produced.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no GPU adapter available: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("shader module {module} failed to compile: {message}")]
    ShaderModule {
        module: &'static str,
        message: String,
    },
    #[error("required pipeline {name} is unavailable: {source}")]
    RequiredPipeline {
        name: String,
        #[source]
        source: PipelineError,
    },
}

/// A control command could not be queued.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    #[error("control queue is full")]
    QueueFull,
    #[error("renderer has shut down")]
    Disconnected,
}

/// A texture could not be copied back to the CPU.
#[derive(Debug, Error)]
pub enum ReadbackError {
    #[error("readback needs a 4-byte BGRA or RGBA texture, got {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),
    #[error("device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("staging buffer could not be mapped: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    #[error("staging buffer map callback never ran")]
    NotMapped,
}
