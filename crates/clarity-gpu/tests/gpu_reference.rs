//! End-to-end checks against a real device. Each test returns early when the
//! machine has no usable adapter.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use clarity_core::yuv::yuv_to_rgb;
use clarity_core::{
    ColorParams, Extent, FilterModel, QualityTier, RendererSettings, ShaderMap, YuvRange,
    YuvStandard,
};
use clarity_core::capture::YuvFrame;
use clarity_gpu::bindings::PassBindings;
use clarity_gpu::readback::{bgra_to_rgba, read_texture};
use clarity_gpu::{
    FrameOutcome, GpuContext, OffscreenTarget, PipelineCache, RendererBuilder, TARGET_FORMAT,
    TargetManager, WgpuPipelineCompiler,
};

/// Tests share one adapter; run them one at a time.
fn gpu_test_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn gpu() -> Option<Arc<GpuContext>> {
    match GpuContext::create_blocking() {
        Ok(gpu) => Some(Arc::new(gpu)),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

fn nv12_2x2(luma: [u8; 4], cb: u8, cr: u8) -> YuvFrame {
    let mut bytes = luma.to_vec();
    bytes.extend_from_slice(&[cb, cr]);
    YuvFrame::from_nv12(2, 2, &bytes, 1).expect("valid 2x2 frame")
}

fn render_2x2(standard: YuvStandard) {
    let _lock = gpu_test_lock();
    let Some(gpu) = gpu() else { return };

    let settings = RendererSettings {
        yuv_standard: standard,
        yuv_range: YuvRange::Video,
        ..Default::default()
    };
    let mut renderer = RendererBuilder::new(settings)
        .build(Arc::clone(&gpu))
        .expect("renderer builds");

    let luma = [16, 100, 180, 235];
    let (cb, cr) = (90, 160);
    let frame = nv12_2x2(luma, cb, cr);
    renderer.bridge().deliver(&frame);

    let size = Extent::new(2, 2);
    renderer.targets().set_capture_resolution(size);
    renderer.control().set_output_size(size.width, size.height);

    let mut target = OffscreenTarget::new(&gpu.device, size, TARGET_FORMAT);
    let outcome = renderer.render_frame(&mut target);
    assert!(matches!(outcome, FrameOutcome::Submitted { .. }), "{outcome:?}");
    renderer.wait_idle();

    let mut pixels = read_texture(&gpu.device, &gpu.queue, target.texture()).expect("readback");
    bgra_to_rgba(&mut pixels);

    let params = ColorParams::for_standard(standard, YuvRange::Video);
    for (i, px) in pixels.chunks_exact(4).enumerate() {
        let (x, y) = ((i % 2) as u32, (i / 2) as u32);
        let (ly, lcb, lcr) = frame.sample(x, y);
        let expected = yuv_to_rgb(ly, lcb, lcr, &params);
        for c in 0..3 {
            let got = px[c] as f32 / 255.0;
            assert!(
                (got - expected[c]).abs() <= 2.0 / 255.0,
                "pixel ({x}, {y}) channel {c}: got {got}, expected {}",
                expected[c]
            );
        }
    }
}

#[test]
fn test_bt601_frame_matches_reference() {
    render_2x2(YuvStandard::Bt601);
}

#[test]
fn test_bt709_frame_matches_reference() {
    render_2x2(YuvStandard::Bt709);
}

#[test]
fn test_frame_without_camera_is_skipped() {
    let _lock = gpu_test_lock();
    let Some(gpu) = gpu() else { return };
    let mut renderer = RendererBuilder::new(RendererSettings::default())
        .build(Arc::clone(&gpu))
        .expect("renderer builds");
    renderer.control().set_output_size(4, 4);
    let mut target = OffscreenTarget::new(&gpu.device, Extent::new(4, 4), TARGET_FORMAT);
    assert_eq!(
        renderer.render_frame(&mut target),
        FrameOutcome::Skipped(clarity_gpu::SkipReason::NoCameraFrame)
    );
    assert_eq!(renderer.frames_submitted(), 0);
}

#[test]
fn test_every_builtin_pipeline_compiles() {
    let _lock = gpu_test_lock();
    let Some(gpu) = gpu() else { return };
    let bindings = Arc::new(PassBindings::new(&gpu.device));
    let compiler =
        WgpuPipelineCompiler::new(Arc::clone(&gpu), bindings).expect("shader modules compile");
    let mut cache = PipelineCache::new(compiler, ShaderMap::builtin(), TARGET_FORMAT);

    let filters = FilterModel::builtin();
    let mut names: Vec<String> = vec!["blit".into(), "invert".into()];
    for filter in filters.video.entries() {
        names.extend(filter.passes.iter().cloned());
    }
    for filter in filters.input.entries() {
        names.push(filter.shader.clone());
    }
    for tier in [QualityTier::Standard, QualityTier::High] {
        names.extend(tier.blur_pipelines().map(str::to_owned));
    }

    for name in names {
        if let Err(e) = cache.get(&name) {
            panic!("{name}: {e}");
        }
    }
}

#[test]
fn test_oversized_output_stays_within_texture_limit() {
    let _lock = gpu_test_lock();
    let Some(gpu) = gpu() else { return };
    let limit = gpu.device.limits().max_texture_dimension_2d;
    let targets = TargetManager::new(Arc::clone(&gpu), 3.0);
    assert_eq!(targets.max_dimension(), limit);

    let targets = targets.with_max_dimension(256);
    gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let extent = targets.set_output_size(Extent::new(8192, 4096));
    let error = pollster::block_on(gpu.device.pop_error_scope());
    assert!(error.is_none(), "{error:?}");
    assert_eq!(extent, Some(Extent::new(256, 128)));
    assert!(targets.snapshot().is_ready());
}
