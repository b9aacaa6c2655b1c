//! Frame scheduling: control commands, parameter commits, and graph building.
//!
//! The scheduler owns everything that decides *what* a frame draws. It never
//! touches the device directly, so it runs unchanged against a counting
//! pipeline compiler in tests.

use std::sync::Arc;

use clarity_core::filters::definition::DEFAULT_COLOR_SHADER;
use clarity_core::{
    ColorParams, Extent, FilterModel, InputFilter, Orientation, ParamKind, QualityTier,
    RendererSettings, Rgba, VideoFilter, Viewport, YuvRange, YuvStandard,
};
use tokio::sync::mpsc;

use crate::buffers::ParameterPool;
use crate::control::ControlCommand;
use crate::error::{PipelineError, RendererError};
use crate::graph::{FramePlan, GraphInputs};
use crate::pipeline_cache::{Pipeline, PipelineCache, PipelineCompiler};

const BLIT_PIPELINE: &str = "blit";
const INVERT_PIPELINE: &str = "invert";

/// Why a frame was not rendered. Expected during startup and backgrounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoCameraFrame,
    NoOutputSize,
    TargetsUninitialized,
    NoDrawable,
    PresentPipelineUnavailable,
}

/// What the UI has asked for.
#[derive(Debug, Clone)]
struct DesiredState {
    video_filter: VideoFilter,
    input_filter: InputFilter,
    blur_enabled: bool,
    invert_screen: bool,
    primary: Rgba,
    secondary: Rgba,
    orientation: Orientation,
    standard: YuvStandard,
    range: YuvRange,
}

/// Parameter rings that need a new slot before the next frame.
#[derive(Debug, Clone, Copy)]
struct Dirty {
    color: bool,
    filter: bool,
}

struct ActivePipelines<H> {
    color: Arc<Pipeline<H>>,
    blur: Option<[Arc<Pipeline<H>>; 2]>,
    filter_passes: Vec<Arc<Pipeline<H>>>,
}

pub struct FrameScheduler<C: PipelineCompiler> {
    cache: PipelineCache<C>,
    commands: mpsc::Receiver<ControlCommand>,
    pool: ParameterPool,
    state: DesiredState,
    dirty: Dirty,
    active: ActivePipelines<C::Handle>,
    quality: QualityTier,
    /// Target generation the blur offsets were computed for.
    blur_generation: Option<u64>,
}

impl<C: PipelineCompiler> FrameScheduler<C> {
    /// Resolve the initial filters and compile the pipelines every frame
    /// needs. The color conversion, blit, and invert pipelines are required.
    pub fn new(
        mut cache: PipelineCache<C>,
        commands: mpsc::Receiver<ControlCommand>,
        pool: ParameterPool,
        settings: &RendererSettings,
        filters: &FilterModel,
        detected_quality: QualityTier,
    ) -> Result<Self, RendererError> {
        let quality = settings.quality.resolve(detected_quality);
        let video_filter = initial(settings.video_filter.as_deref(), |n| filters.video_filter(n))
            .unwrap_or_else(|| filters.video.current())
            .clone();
        let mut input_filter = initial(settings.input_filter.as_deref(), |n| filters.input_filter(n))
            .unwrap_or_else(|| filters.input.current())
            .clone();

        let color = match typed(&mut cache, &input_filter.shader, ParamKind::Color) {
            Ok(p) => p,
            Err(e) if input_filter.shader != DEFAULT_COLOR_SHADER => {
                tracing::error!(
                    filter = %input_filter.name,
                    error = %e,
                    "Input filter shader unavailable, using default conversion"
                );
                input_filter.shader = DEFAULT_COLOR_SHADER.to_owned();
                typed(&mut cache, DEFAULT_COLOR_SHADER, ParamKind::Color).map_err(required)?
            }
            Err(e) => return Err(required(e)),
        };
        for name in [BLIT_PIPELINE, INVERT_PIPELINE] {
            typed(&mut cache, name, ParamKind::Filter).map_err(required)?;
        }

        let blur = load_blur(&mut cache, quality);
        let filter_passes = match resolve_passes(&mut cache, &video_filter) {
            Ok(passes) => passes,
            Err(e) => {
                tracing::error!(
                    filter = %video_filter.name,
                    error = %e,
                    "Video filter unavailable, presenting unfiltered"
                );
                Vec::new()
            }
        };

        tracing::info!(
            video_filter = %video_filter.name,
            input_filter = %input_filter.name,
            ?quality,
            blur_available = blur.is_some(),
            "Frame scheduler ready"
        );

        Ok(Self {
            cache,
            commands,
            pool,
            state: DesiredState {
                video_filter,
                input_filter,
                blur_enabled: settings.blur_enabled,
                invert_screen: settings.invert_screen,
                primary: settings.primary_color.clamped(),
                secondary: settings.secondary_color.clamped(),
                orientation: settings.orientation,
                standard: settings.yuv_standard,
                range: settings.yuv_range,
            },
            dirty: Dirty {
                color: true,
                filter: true,
            },
            active: ActivePipelines {
                color,
                blur,
                filter_passes,
            },
            quality,
            blur_generation: None,
        })
    }

    /// Apply every queued control command. Returns how many were applied.
    pub fn drain_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, command: ControlCommand) {
        tracing::debug!(?command, "Applying control command");
        match command {
            ControlCommand::SetVideoFilter(filter) => {
                match resolve_passes(&mut self.cache, &filter) {
                    Ok(passes) => {
                        self.active.filter_passes = passes;
                        self.state.video_filter = filter;
                    }
                    Err(e) => tracing::error!(
                        filter = %filter.name,
                        error = %e,
                        kept = %self.state.video_filter.name,
                        "Video filter unavailable"
                    ),
                }
            }
            ControlCommand::SetColorFilter(filter) => {
                match typed(&mut self.cache, &filter.shader, ParamKind::Color) {
                    Ok(pipeline) => {
                        self.active.color = pipeline;
                        self.state.input_filter = filter;
                        self.dirty.color = true;
                    }
                    Err(e) => tracing::error!(
                        filter = %filter.name,
                        error = %e,
                        kept = %self.state.input_filter.name,
                        "Input filter unavailable"
                    ),
                }
            }
            ControlCommand::SetBlurEnabled(enabled) => {
                if enabled && self.active.blur.is_none() {
                    tracing::warn!("Blur requested but blur pipelines are unavailable");
                }
                self.state.blur_enabled = enabled;
            }
            ControlCommand::SetInvertScreen(enabled) => {
                self.state.invert_screen = enabled;
                self.dirty.filter = true;
            }
            ControlCommand::SetPrimaryColor(color) => {
                self.state.primary = color.clamped();
                self.dirty.filter = true;
            }
            ControlCommand::SetSecondaryColor(color) => {
                self.state.secondary = color.clamped();
                self.dirty.filter = true;
            }
            ControlCommand::SetHighQuality(enabled) => {
                let tier = QualityTier::from_high_quality(enabled);
                if tier != self.quality {
                    self.quality = tier;
                    self.active.blur = load_blur(&mut self.cache, tier);
                    self.dirty.filter = true;
                }
            }
            ControlCommand::SetOrientation(orientation) => {
                self.state.orientation = orientation;
            }
        }
    }

    /// Preconditions for drawing anything this tick.
    pub fn check_ready(
        &self,
        has_camera_frame: bool,
        output: Extent,
        targets_ready: bool,
    ) -> Result<(), SkipReason> {
        if !has_camera_frame {
            return Err(SkipReason::NoCameraFrame);
        }
        if output.is_empty() {
            return Err(SkipReason::NoOutputSize);
        }
        if !targets_ready {
            return Err(SkipReason::TargetsUninitialized);
        }
        Ok(())
    }

    /// Write pending parameter changes, each into a fresh ring slot, so this
    /// frame binds the new values. Blur offsets follow the target size.
    pub fn commit_parameters(&mut self, target: Extent, generation: u64) {
        if self.dirty.color {
            let (standard, range) = (self.state.standard, self.state.range);
            let convolution = self.state.input_filter.convolution;
            let slot = self.pool.color.update(|p| {
                *p = ColorParams::for_standard(standard, range);
                p.set_convolution(&convolution);
            });
            tracing::trace!(slot, "Color parameters committed");
        }

        if self.dirty.filter {
            let (primary, secondary) = if self.state.invert_screen {
                (self.state.primary.inverse(), self.state.secondary.inverse())
            } else {
                (self.state.primary, self.state.secondary)
            };
            let (low, high) = self.quality.thresholds();
            let slot = self.pool.filter.update(|p| {
                p.set_primary(primary);
                p.set_secondary(secondary);
                p.set_thresholds(low, high);
            });
            tracing::trace!(slot, "Filter parameters committed");
        }

        if self.blur_generation != Some(generation) {
            let slot = self
                .pool
                .blur
                .update(|p| p.set_texel_size(target.width, target.height));
            self.blur_generation = Some(generation);
            tracing::debug!(%target, generation, slot, "Blur offsets recomputed");
        }

        self.dirty = Dirty {
            color: false,
            filter: false,
        };
    }

    /// Lay out this frame's passes.
    ///
    /// `surface` is the drawable's size and `source` the camera resolution;
    /// together they give the letterbox viewport.
    pub fn build_plan(
        &mut self,
        surface_format: wgpu::TextureFormat,
        surface: Extent,
        source: Extent,
    ) -> Result<FramePlan<C::Handle>, SkipReason> {
        let present_name = if self.state.invert_screen {
            INVERT_PIPELINE
        } else {
            BLIT_PIPELINE
        };
        let present = self
            .cache
            .get_with_format(present_name, surface_format)
            .map_err(|_| SkipReason::PresentPipelineUnavailable)?;

        let blur = match &self.active.blur {
            Some([x, y]) if self.blur_active() => Some([x, y]),
            _ => None,
        };
        Ok(FramePlan::build(&GraphInputs {
            color: &self.active.color,
            blur,
            filter_passes: &self.active.filter_passes,
            present: &present,
            orientation: self.state.orientation,
            viewport: Viewport::fit(surface, source),
        }))
    }

    /// Whether the blur pre-pass runs: enabled, wanted by the current filter,
    /// and compiled.
    pub fn blur_active(&self) -> bool {
        self.state.blur_enabled && self.state.video_filter.can_blur && self.active.blur.is_some()
    }

    pub fn pool(&self) -> &ParameterPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut ParameterPool {
        &mut self.pool
    }

    pub fn cache(&self) -> &PipelineCache<C> {
        &self.cache
    }

    pub fn quality(&self) -> QualityTier {
        self.quality
    }

    pub fn video_filter(&self) -> &VideoFilter {
        &self.state.video_filter
    }

    pub fn input_filter(&self) -> &InputFilter {
        &self.state.input_filter
    }

    pub fn orientation(&self) -> Orientation {
        self.state.orientation
    }

    pub fn invert_screen(&self) -> bool {
        self.state.invert_screen
    }
}

fn initial<'a, T>(name: Option<&str>, lookup: impl Fn(&str) -> Option<&'a T>) -> Option<&'a T> {
    let name = name?;
    let found = lookup(name);
    if found.is_none() {
        tracing::warn!(name, "Configured filter not found, using catalog default");
    }
    found
}

fn required(source: PipelineError) -> RendererError {
    let name = match &source {
        PipelineError::MissingEntryPoint { pipeline, .. }
        | PipelineError::ParamKindMismatch { pipeline, .. }
        | PipelineError::Validation { pipeline, .. } => pipeline.clone(),
    };
    RendererError::RequiredPipeline { name, source }
}

/// Fetch a pipeline and check which parameter block it reads.
fn typed<C: PipelineCompiler>(
    cache: &mut PipelineCache<C>,
    name: &str,
    expected: ParamKind,
) -> Result<Arc<Pipeline<C::Handle>>, PipelineError> {
    let pipeline = cache.get(name)?;
    if pipeline.params() != expected {
        return Err(PipelineError::ParamKindMismatch {
            pipeline: name.to_owned(),
            expected,
            found: pipeline.params(),
        });
    }
    Ok(pipeline)
}

fn resolve_passes<C: PipelineCompiler>(
    cache: &mut PipelineCache<C>,
    filter: &VideoFilter,
) -> Result<Vec<Arc<Pipeline<C::Handle>>>, PipelineError> {
    filter
        .passes
        .iter()
        .map(|pass| typed(cache, pass, ParamKind::Filter))
        .collect()
}

fn load_blur<C: PipelineCompiler>(
    cache: &mut PipelineCache<C>,
    quality: QualityTier,
) -> Option<[Arc<Pipeline<C::Handle>>; 2]> {
    let [x, y] = quality.blur_pipelines();
    let load = |cache: &mut PipelineCache<C>, name| typed(cache, name, ParamKind::Blur);
    match (load(cache, x), load(cache, y)) {
        (Ok(x), Ok(y)) => Some([x, y]),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(?quality, error = %e, "Blur pipelines unavailable, blur disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TARGET_FORMAT;
    use crate::pipeline_cache::fake::CountingCompiler;
    use clarity_core::ShaderMap;

    const SURFACE: Extent = Extent::new(1280, 720);

    struct Harness {
        scheduler: FrameScheduler<CountingCompiler>,
        tx: mpsc::Sender<ControlCommand>,
        filters: FilterModel,
    }

    fn harness_with(
        compiler: CountingCompiler,
        settings: RendererSettings,
    ) -> Result<Harness, RendererError> {
        let filters = FilterModel::builtin();
        let (tx, rx) = mpsc::channel(16);
        let cache = PipelineCache::new(compiler, ShaderMap::builtin(), TARGET_FORMAT);
        let pool = ParameterPool::detached(
            settings.ring_size(),
            ColorParams::default(),
            Default::default(),
        );
        let scheduler = FrameScheduler::new(
            cache,
            rx,
            pool,
            &settings,
            &filters,
            QualityTier::Standard,
        )?;
        Ok(Harness {
            scheduler,
            tx,
            filters,
        })
    }

    fn harness() -> Harness {
        harness_with(CountingCompiler::new(), RendererSettings::default())
            .expect("builtin pipelines compile")
    }

    impl Harness {
        fn send(&mut self, command: ControlCommand) {
            self.tx.try_send(command).expect("queue has room");
            self.scheduler.drain_commands();
        }

        fn video(&self, name: &str) -> VideoFilter {
            self.filters.video_filter(name).cloned().expect("builtin filter")
        }

        fn frame(&mut self) -> Vec<String> {
            self.scheduler.commit_parameters(SURFACE, 1);
            self.scheduler
                .build_plan(TARGET_FORMAT, SURFACE, SURFACE)
                .map(|plan| plan.pass_names().into_iter().map(str::to_owned).collect())
                .expect("plan builds")
        }
    }

    #[test]
    fn test_blur_disabled_skips_blur_passes_for_blurrable_filter() {
        let mut h = harness();
        let filter = h.video("Edge Highlight");
        assert!(filter.can_blur);
        h.send(ControlCommand::SetVideoFilter(filter));
        h.send(ControlCommand::SetBlurEnabled(false));
        let passes = h.frame();
        assert_eq!(passes, ["yuv_rgb", "sobel", "blit"]);
    }

    #[test]
    fn test_blur_enabled_runs_both_blur_passes() {
        let mut h = harness();
        h.send(ControlCommand::SetVideoFilter(h.video("Edge Highlight")));
        h.send(ControlCommand::SetBlurEnabled(true));
        let passes = h.frame();
        assert_eq!(passes, ["yuv_rgb", "blur_x", "blur_y", "sobel", "blit"]);
    }

    #[test]
    fn test_blur_ignored_for_filter_without_blur() {
        let mut h = harness();
        h.send(ControlCommand::SetVideoFilter(h.video("Grayscale")));
        h.send(ControlCommand::SetBlurEnabled(true));
        assert!(!h.scheduler.blur_active());
        assert_eq!(h.frame(), ["yuv_rgb", "grayscale", "blit"]);
    }

    #[test]
    fn test_high_quality_swaps_blur_kernel_and_thresholds() {
        let mut h = harness();
        h.send(ControlCommand::SetVideoFilter(h.video("Comic")));
        h.send(ControlCommand::SetBlurEnabled(true));
        h.send(ControlCommand::SetHighQuality(true));
        assert_eq!(h.frame(), ["yuv_rgb", "blur_x_hq", "blur_y_hq", "comic", "blit"]);
        let params = h.scheduler.pool().filter.current();
        assert_eq!((params.low_threshold, params.high_threshold), (0.05, 0.10));
    }

    #[test]
    fn test_parameter_change_is_bound_on_next_frame() {
        let mut h = harness();
        h.frame();
        let before = h.scheduler.pool().current_slot(ParamKind::Filter);

        let red = Rgba::new(1.0, 0.0, 0.0, 1.0);
        h.send(ControlCommand::SetPrimaryColor(red));
        h.frame();

        let pool = h.scheduler.pool();
        assert_ne!(pool.current_slot(ParamKind::Filter), before);
        assert_eq!(pool.filter.current().primary(), red);
        assert_eq!(pool.filter.get(before).primary(), Rgba::DEFAULT_PRIMARY);
    }

    #[test]
    fn test_unchanged_parameters_keep_their_slot() {
        let mut h = harness();
        h.frame();
        let slots: Vec<usize> = ParamKind::ALL
            .iter()
            .map(|k| h.scheduler.pool().current_slot(*k))
            .collect();
        h.frame();
        let again: Vec<usize> = ParamKind::ALL
            .iter()
            .map(|k| h.scheduler.pool().current_slot(*k))
            .collect();
        assert_eq!(slots, again);
    }

    #[test]
    fn test_blur_offsets_follow_target_generation() {
        let mut h = harness();
        h.scheduler.commit_parameters(Extent::new(100, 50), 1);
        let first = h.scheduler.pool().blur.current().x_offsets();
        assert!((first[1][0] - 1.3846153846 / 100.0).abs() < 1e-6);

        let slot = h.scheduler.pool().current_slot(ParamKind::Blur);
        h.scheduler.commit_parameters(Extent::new(100, 50), 1);
        assert_eq!(h.scheduler.pool().current_slot(ParamKind::Blur), slot);

        h.scheduler.commit_parameters(Extent::new(200, 100), 2);
        let second = h.scheduler.pool().blur.current().x_offsets();
        assert!((second[1][0] - 1.3846153846 / 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_invert_presents_inverse_colors() {
        let mut h = harness();
        h.send(ControlCommand::SetInvertScreen(true));
        let passes = h.frame();
        assert_eq!(passes.last().map(String::as_str), Some("invert"));
        let params = h.scheduler.pool().filter.current();
        assert_eq!(params.primary(), Rgba::DEFAULT_PRIMARY.inverse());
        assert_eq!(params.secondary(), Rgba::DEFAULT_SECONDARY.inverse());
    }

    #[test]
    fn test_failed_filter_keeps_previous() {
        let mut h = harness_with(
            CountingCompiler::failing(&["comic"]),
            RendererSettings::default(),
        )
        .expect("required pipelines compile");
        h.send(ControlCommand::SetVideoFilter(h.video("Edge Highlight")));
        h.send(ControlCommand::SetVideoFilter(h.video("Comic")));
        assert_eq!(h.scheduler.video_filter().name, "Edge Highlight");
        assert_eq!(h.frame(), ["yuv_rgb", "sobel", "blit"]);
    }

    #[test]
    fn test_pass_with_wrong_parameter_block_is_rejected() {
        let mut h = harness();
        let mut filter = h.video("Grayscale");
        filter.passes = vec!["blur_x".into()];
        h.send(ControlCommand::SetVideoFilter(filter));
        assert_eq!(h.scheduler.video_filter().name, "Normal");
    }

    #[test]
    fn test_missing_blit_is_fatal() {
        let result = harness_with(
            CountingCompiler::failing(&["blit"]),
            RendererSettings::default(),
        );
        assert!(matches!(
            result,
            Err(RendererError::RequiredPipeline { ref name, .. }) if name == "blit"
        ));
    }

    #[test]
    fn test_failed_blur_disables_blur() {
        let mut h = harness_with(
            CountingCompiler::failing(&["blur_y"]),
            RendererSettings::default(),
        )
        .expect("required pipelines compile");
        h.send(ControlCommand::SetVideoFilter(h.video("Comic")));
        h.send(ControlCommand::SetBlurEnabled(true));
        assert!(!h.scheduler.blur_active());
        assert_eq!(h.frame(), ["yuv_rgb", "comic", "blit"]);
    }

    #[test]
    fn test_settings_choose_initial_filters() {
        let settings = RendererSettings {
            video_filter: Some("Edges Only".into()),
            input_filter: Some("Deuteranopia".into()),
            ..Default::default()
        };
        let mut h = harness_with(CountingCompiler::new(), settings).expect("compiles");
        assert_eq!(h.scheduler.video_filter().name, "Edges Only");
        assert_eq!(h.scheduler.input_filter().name, "Deuteranopia");
        h.frame();
        let color = h.scheduler.pool().color.current();
        assert!((color.convolution[0][0] - 0.367322).abs() < 1e-6);
    }

    #[test]
    fn test_check_ready_reports_first_missing_precondition() {
        let h = harness();
        let s = &h.scheduler;
        assert_eq!(s.check_ready(false, SURFACE, true), Err(SkipReason::NoCameraFrame));
        assert_eq!(
            s.check_ready(true, Extent::default(), true),
            Err(SkipReason::NoOutputSize)
        );
        assert_eq!(
            s.check_ready(true, SURFACE, false),
            Err(SkipReason::TargetsUninitialized)
        );
        assert_eq!(s.check_ready(true, SURFACE, true), Ok(()));
    }

    #[test]
    fn test_orientation_reaches_present_pass() {
        let mut h = harness();
        h.send(ControlCommand::SetOrientation(Orientation::PortraitUpsideDown));
        h.scheduler.commit_parameters(SURFACE, 1);
        let plan = h
            .scheduler
            .build_plan(TARGET_FORMAT, Extent::new(720, 1280), SURFACE)
            .expect("plan builds");
        let present = plan.passes().last().expect("present pass");
        assert_eq!(present.geometry, Orientation::PortraitUpsideDown);
    }
}
