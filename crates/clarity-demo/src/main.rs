//! Clarity Demo: headless driver for the accessibility video filter.
//!
//! Feeds a synthetic camera through the renderer at a fixed frame rate and
//! optionally writes the final frame to a PNG.

mod config;
mod synthetic;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use clarity_core::Extent;
use clarity_core::capture::{CameraController, CameraError, CameraPosition, CaptureDevice};
use clarity_gpu::readback::{bgra_to_rgba, read_texture};
use clarity_gpu::{
    ControlError, FrameOutcome, GpuContext, OffscreenTarget, PresentTarget, ReadbackError, RendererBuilder,
    RendererError, TARGET_FORMAT,
};
use thiserror::Error;

use crate::config::DemoArgs;
use crate::synthetic::{CameraFeed, FrameSource, SyntheticDevice, SyntheticSession};

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] clarity_core::ConfigError),
    #[error(transparent)]
    Renderer(#[from] RendererError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error(transparent)]
    Readback(#[from] ReadbackError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("readback does not fill a {0} image")]
    FrameSize(Extent),
    #[error("failed to write {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,naga=warn,wgpu_core=warn,wgpu_hal=warn")
            }),
        )
        .init();

    let args = DemoArgs::parse();
    if let Err(e) = run(&args) {
        tracing::error!(error = %e, "Demo failed");
        std::process::exit(1);
    }
}

fn run(args: &DemoArgs) -> Result<(), DemoError> {
    let config = args.load()?;
    let mut filters = config.filters.clone();
    let capture_prefs = config.settings.capture.clone();

    let gpu = Arc::new(GpuContext::create_blocking()?);
    let mut renderer = RendererBuilder::new(config.settings)
        .filters(config.filters)
        .shader_map(config.shader_map)
        .build(Arc::clone(&gpu))?;
    let control = renderer.control();

    let feed = Arc::new(CameraFeed::default());
    let queue = renderer.bridge().spawn_delivery_queue(2)?;
    let source = FrameSource::spawn(Arc::clone(&feed), queue, args.fps)?;

    let devices: Vec<Box<dyn CaptureDevice>> = vec![
        Box::new(SyntheticDevice::new("Synthetic Back", CameraPosition::Back, true)),
        Box::new(SyntheticDevice::new("Synthetic Front", CameraPosition::Front, false)),
    ];
    let mut camera = CameraController::new(SyntheticSession::new(Arc::clone(&feed)), devices, capture_prefs);
    {
        let targets = Arc::clone(renderer.targets());
        let feed = Arc::clone(&feed);
        camera.set_resolution_listener(Box::new(move |resolution| {
            feed.set_resolution(resolution);
            targets.set_capture_resolution(resolution);
        }));
    }
    let position = if args.front {
        CameraPosition::Front
    } else {
        CameraPosition::Back
    };
    camera.set_device(position)?;
    camera.set_running(true);

    control.set_output_size(args.width, args.height);
    let mut target = OffscreenTarget::new(&gpu.device, Extent::new(args.width, args.height), TARGET_FORMAT);

    let period = Duration::from_secs_f64(1.0 / args.fps.max(1.0));
    let started = Instant::now();
    let mut skipped = 0u64;
    for frame in 0..args.frames {
        let tick = Instant::now();
        if let Some(every) = args.cycle.filter(|n| *n > 0) {
            if frame > 0 && frame % every == 0 {
                let next = filters.next_video_filter().clone();
                tracing::info!(filter = %next.name, frame, "Switching video filter");
                control.set_video_filter(next)?;
            }
        }
        match renderer.render_frame(&mut target) {
            FrameOutcome::Submitted { .. } => {}
            FrameOutcome::Skipped(reason) => {
                skipped += 1;
                tracing::debug!(?reason, frame, "Frame skipped");
            }
        }
        if let Some(wait) = period.checked_sub(tick.elapsed()) {
            std::thread::sleep(wait);
        }
    }
    renderer.wait_idle();

    camera.set_running(false);
    let generated = source.stop();
    let bridge = renderer.bridge();
    tracing::info!(
        submitted = renderer.frames_submitted(),
        skipped,
        generated,
        delivered = bridge.delivered(),
        dropped = bridge.dropped(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        quality = ?renderer.quality(),
        "Run complete"
    );

    if let Some(path) = &args.output {
        save_png(&gpu, &target, path)?;
        tracing::info!(path = %path.display(), "Last frame written");
    }
    Ok(())
}

fn save_png(gpu: &GpuContext, target: &OffscreenTarget, path: &Path) -> Result<(), DemoError> {
    let texture = target.texture();
    let mut pixels = read_texture(&gpu.device, &gpu.queue, texture)?;
    bgra_to_rgba(&mut pixels);
    let image = image::RgbaImage::from_raw(texture.width(), texture.height(), pixels)
        .ok_or(DemoError::FrameSize(target.size()))?;
    image.save(path).map_err(|source| DemoError::Image {
        path: path.to_path_buf(),
        source,
    })
}
