//! The renderer: owns the GPU resources and runs one frame per call.

use std::sync::Arc;

use clarity_core::{
    ColorParams, FilterModel, FilterParams, QualityTier, RendererSettings, ShaderMap,
};
use tokio::sync::mpsc;

use crate::TARGET_FORMAT;
use crate::bindings::PassBindings;
use crate::buffers::ParameterPool;
use crate::capture_bridge::CaptureBridge;
use crate::control::ControlHandle;
use crate::device::GpuContext;
use crate::encoder::{FrameResources, WgpuPassRecorder};
use crate::error::RendererError;
use crate::frame_limiter::FrameLimiter;
use crate::geometry::QuadBuffers;
use crate::pipeline_cache::{PipelineCache, WgpuPipelineCompiler};
use crate::present::PresentTarget;
use crate::scheduler::{FrameScheduler, SkipReason};
use crate::targets::TargetManager;

const DEFAULT_CONTROL_CAPACITY: usize = 64;

/// Result of one [`Renderer::render_frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Submitted { passes: usize },
    Skipped(SkipReason),
}

/// Collects start-up inputs. [`build`](Self::build) yields a renderer only
/// when every required resource was created.
pub struct RendererBuilder {
    settings: RendererSettings,
    filters: Option<FilterModel>,
    shader_map: Option<ShaderMap>,
    control_capacity: usize,
}

impl RendererBuilder {
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            filters: None,
            shader_map: None,
            control_capacity: DEFAULT_CONTROL_CAPACITY,
        }
    }

    /// Filter catalogs; the built-in definitions when unset.
    pub fn filters(mut self, filters: FilterModel) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Pipeline name mapping; the built-in map when unset.
    pub fn shader_map(mut self, shader_map: ShaderMap) -> Self {
        self.shader_map = Some(shader_map);
        self
    }

    pub fn control_capacity(mut self, capacity: usize) -> Self {
        self.control_capacity = capacity.max(1);
        self
    }

    pub fn build(self, gpu: Arc<GpuContext>) -> Result<Renderer, RendererError> {
        let settings = self.settings;
        let filters = self.filters.unwrap_or_else(FilterModel::builtin);
        let shader_map = self.shader_map.unwrap_or_else(ShaderMap::builtin);

        let bindings = Arc::new(PassBindings::new(&gpu.device));
        let compiler = WgpuPipelineCompiler::new(Arc::clone(&gpu), Arc::clone(&bindings))?;
        let cache = PipelineCache::new(compiler, shader_map, TARGET_FORMAT);
        let pool = ParameterPool::allocate(
            &gpu.device,
            &bindings.param_layout,
            settings.ring_size(),
            ColorParams::for_standard(settings.yuv_standard, settings.yuv_range),
            FilterParams::default(),
        );

        let (tx, rx) = mpsc::channel(self.control_capacity);
        let scheduler = FrameScheduler::new(
            cache,
            rx,
            pool,
            &settings,
            &filters,
            gpu.detected_quality,
        )?;
        let targets = Arc::new(TargetManager::new(Arc::clone(&gpu), settings.display_scale));
        let control = ControlHandle::new(tx, Arc::clone(&targets));

        tracing::info!(
            frames_in_flight = settings.max_frames_in_flight(),
            ring_size = settings.ring_size(),
            "Renderer ready"
        );
        Ok(Renderer {
            quads: QuadBuffers::new(&gpu.device),
            bridge: Arc::new(CaptureBridge::new(Arc::clone(&gpu))),
            limiter: FrameLimiter::new(settings.max_frames_in_flight()),
            gpu,
            bindings,
            scheduler,
            targets,
            control,
            frames: 0,
        })
    }
}

pub struct Renderer {
    gpu: Arc<GpuContext>,
    bindings: Arc<PassBindings>,
    quads: QuadBuffers,
    scheduler: FrameScheduler<WgpuPipelineCompiler>,
    targets: Arc<TargetManager>,
    bridge: Arc<CaptureBridge>,
    limiter: FrameLimiter,
    control: ControlHandle,
    frames: u64,
}

impl Renderer {
    /// Handle for the UI thread.
    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Where camera frames are delivered.
    pub fn bridge(&self) -> &Arc<CaptureBridge> {
        &self.bridge
    }

    pub fn targets(&self) -> &Arc<TargetManager> {
        &self.targets
    }

    pub fn limiter(&self) -> &FrameLimiter {
        &self.limiter
    }

    pub fn gpu(&self) -> &Arc<GpuContext> {
        &self.gpu
    }

    pub fn quality(&self) -> QualityTier {
        self.scheduler.quality()
    }

    pub fn scheduler(&self) -> &FrameScheduler<WgpuPipelineCompiler> {
        &self.scheduler
    }

    /// Frames submitted so far.
    pub fn frames_submitted(&self) -> u64 {
        self.frames
    }

    /// Draw one frame into `target`.
    ///
    /// Blocks while the frames-in-flight bound is reached. Missing inputs skip
    /// the frame without touching the GPU.
    pub fn render_frame(&mut self, target: &mut dyn PresentTarget) -> FrameOutcome {
        // Fires completion callbacks, releasing permits.
        if let Err(e) = self.gpu.device.poll(wgpu::PollType::Poll) {
            tracing::warn!(error = %e, "Device poll failed");
        }
        self.scheduler.drain_commands();

        let planes = self.bridge.snapshot();
        let targets = self.targets.snapshot();
        if let Err(reason) = self.scheduler.check_ready(
            planes.is_some(),
            self.targets.output_size(),
            targets.is_ready(),
        ) {
            return skipped(reason);
        }
        let (Some(planes), Some(targets)) = (planes, targets.ready().cloned()) else {
            return skipped(SkipReason::TargetsUninitialized);
        };
        let surface_size = target.size();
        if surface_size.is_empty() {
            return skipped(SkipReason::NoDrawable);
        }

        let permit = match self.limiter.try_acquire() {
            Some(permit) => permit,
            None => {
                tracing::trace!(in_flight = self.limiter.in_flight(), "Waiting for GPU");
                if let Err(e) = self.gpu.device.poll(wgpu::PollType::wait_indefinitely()) {
                    tracing::warn!(error = %e, "Device poll failed");
                }
                self.limiter.acquire()
            }
        };

        self.scheduler
            .commit_parameters(targets.extent, targets.generation);
        let plan = match self
            .scheduler
            .build_plan(target.format(), surface_size, planes.extent)
        {
            Ok(plan) => plan,
            Err(reason) => return skipped(reason),
        };
        let Some(drawable) = target.acquire() else {
            return skipped(SkipReason::NoDrawable);
        };
        self.scheduler.pool_mut().flush(&self.gpu.queue);

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clarity_frame"),
            });
        let passes = {
            let mut recorder = WgpuPassRecorder::new(
                &self.gpu.device,
                &mut encoder,
                &self.bindings,
                self.scheduler.pool(),
                &self.quads,
                FrameResources {
                    targets: &targets,
                    planes: &planes,
                    surface_view: &drawable.view,
                    surface_size,
                },
            );
            plan.record(&mut recorder);
            recorder.recorded()
        };

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.gpu.queue.on_submitted_work_done(move || drop(permit));
        drawable.present();

        self.frames += 1;
        tracing::trace!(
            frame = self.frames,
            passes,
            sequence = planes.sequence,
            "Frame submitted"
        );
        FrameOutcome::Submitted { passes }
    }

    /// Block until all submitted frames have completed.
    pub fn wait_idle(&self) {
        if let Err(e) = self.gpu.device.poll(wgpu::PollType::wait_indefinitely()) {
            tracing::warn!(error = %e, "Device poll failed");
        }
    }
}

fn skipped(reason: SkipReason) -> FrameOutcome {
    tracing::trace!(?reason, "Frame skipped");
    FrameOutcome::Skipped(reason)
}
