//! In-process stand-ins for a camera: devices, a session, and a frame source.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use clarity_core::Extent;
use clarity_core::capture::{
    CameraError, CameraPosition, CaptureDevice, CaptureFormat, CaptureSession, ConnectionSettings,
    FourCc, FrameRateRange, YuvFrame,
};
use clarity_gpu::DeliveryQueue;
use parking_lot::Mutex;

/// State the session shares with the frame source.
#[derive(Default)]
pub struct CameraFeed {
    running: AtomicBool,
    mirrored: AtomicBool,
    resolution: Mutex<Extent>,
}

impl CameraFeed {
    pub fn set_resolution(&self, resolution: Extent) {
        *self.resolution.lock() = resolution;
    }
}

pub struct SyntheticDevice {
    name: String,
    position: CameraPosition,
    formats: Vec<CaptureFormat>,
    torch: Option<bool>,
    locked: bool,
}

impl SyntheticDevice {
    pub fn new(name: &str, position: CameraPosition, has_torch: bool) -> Self {
        let format = |w, h, fps| CaptureFormat {
            fourcc: FourCc::VIDEO_RANGE_NV12,
            resolution: Extent::new(w, h),
            frame_rates: vec![FrameRateRange { min: 1.0, max: fps }],
        };
        Self {
            name: name.to_owned(),
            position,
            formats: vec![
                format(640, 480, 60.0),
                format(1280, 720, 60.0),
                format(1920, 1080, 30.0),
            ],
            torch: has_torch.then_some(false),
            locked: false,
        }
    }
}

impl CaptureDevice for SyntheticDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> CameraPosition {
        self.position
    }

    fn formats(&self) -> &[CaptureFormat] {
        &self.formats
    }

    fn has_torch(&self) -> bool {
        self.torch.is_some()
    }

    fn torch_enabled(&self) -> bool {
        self.torch.unwrap_or(false)
    }

    fn lock_for_configuration(&mut self) -> Result<(), CameraError> {
        if self.locked {
            return Err(CameraError::ConfigurationLock {
                device: self.name.clone(),
                reason: "already locked".into(),
            });
        }
        self.locked = true;
        Ok(())
    }

    fn unlock_for_configuration(&mut self) {
        self.locked = false;
    }

    fn set_active_format(&mut self, format: &CaptureFormat, frame_rate: f64) {
        tracing::debug!(
            device = %self.name,
            resolution = %format.resolution,
            frame_rate,
            "Synthetic format applied"
        );
    }

    fn set_torch(&mut self, enabled: bool) {
        if let Some(torch) = self.torch.as_mut() {
            *torch = enabled;
        }
    }
}

pub struct SyntheticSession {
    feed: Arc<CameraFeed>,
}

impl SyntheticSession {
    pub fn new(feed: Arc<CameraFeed>) -> Self {
        Self { feed }
    }
}

impl CaptureSession for SyntheticSession {
    type Input = String;

    fn create_input(&mut self, device: &dyn CaptureDevice) -> Result<String, CameraError> {
        Ok(device.name().to_owned())
    }

    fn begin_configuration(&mut self) {}

    fn commit_configuration(&mut self) {}

    fn remove_input(&mut self, input: String) {
        tracing::debug!(%input, "Input removed");
    }

    fn add_input(&mut self, input: String, connection: ConnectionSettings) {
        tracing::debug!(%input, ?connection, "Input added");
        self.feed.mirrored.store(connection.mirrored, Ordering::Relaxed);
    }

    fn start_running(&mut self) {
        self.feed.running.store(true, Ordering::Release);
    }

    fn stop_running(&mut self) {
        self.feed.running.store(false, Ordering::Release);
    }
}

/// NV12 test pattern: a luma ramp crossed by a moving bar, with chroma
/// varying across the frame.
pub fn pattern(size: Extent, tick: u64, mirrored: bool) -> Vec<u8> {
    let (w, h) = (size.width as usize, size.height as usize);
    let mut bytes = vec![0u8; w * h + w * (h / 2)];
    let bar = (tick as usize * 4) % w.max(1);

    let (luma, chroma) = bytes.split_at_mut(w * h);
    for y in 0..h {
        for x in 0..w {
            let sx = if mirrored { w - 1 - x } else { x };
            let ramp = 16 + (sx * 219 / w.max(1)) as u8;
            let on_bar = sx.abs_diff(bar) < w / 32 + 1;
            luma[y * w + x] = if on_bar { 235 } else { ramp };
        }
    }
    for cy in 0..h / 2 {
        for cx in 0..w / 2 {
            let i = cy * w + cx * 2;
            chroma[i] = 64 + (cx * 128 / (w / 2).max(1)) as u8;
            chroma[i + 1] = 64 + (cy * 128 / (h / 2).max(1)) as u8;
        }
    }
    bytes
}

/// Produces frames at a fixed rate while the session is running.
pub struct FrameSource {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<u64>>,
}

impl FrameSource {
    pub fn spawn(feed: Arc<CameraFeed>, queue: DeliveryQueue, fps: f64) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let period = Duration::from_secs_f64(1.0 / fps.max(1.0));
        let thread = std::thread::Builder::new()
            .name("synthetic-camera".into())
            .spawn(move || {
                let mut sequence = 0u64;
                let mut next = Instant::now();
                while !stop_flag.load(Ordering::Acquire) {
                    let size = *feed.resolution.lock();
                    if feed.running.load(Ordering::Acquire) && !size.is_empty() {
                        let bytes = pattern(size, sequence, feed.mirrored.load(Ordering::Relaxed));
                        match YuvFrame::from_nv12(size.width, size.height, &bytes, sequence) {
                            Ok(frame) => {
                                queue.submit(frame);
                                sequence += 1;
                            }
                            Err(e) => tracing::error!(error = %e, "Synthetic frame rejected"),
                        }
                    }
                    next += period;
                    if let Some(wait) = next.checked_duration_since(Instant::now()) {
                        std::thread::sleep(wait);
                    } else {
                        next = Instant::now();
                    }
                }
                queue.shutdown();
                sequence
            })?;
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Stop producing frames. Returns how many were generated.
    pub fn stop(mut self) -> u64 {
        self.stop.store(true, Ordering::Release);
        self.thread
            .take()
            .and_then(|t| t.join().ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_valid_nv12() {
        let size = Extent::new(64, 48);
        let bytes = pattern(size, 3, false);
        let frame = YuvFrame::from_nv12(64, 48, &bytes, 0).expect("valid frame");
        let (y, cb, cr) = frame.sample(63, 47);
        assert!((16..=235).contains(&y));
        assert!(cb >= 64 && cr >= 64);
    }

    #[test]
    fn test_mirroring_flips_the_ramp() {
        let size = Extent::new(64, 2);
        let plain = pattern(size, 0, false);
        let mirrored = pattern(size, 0, true);
        assert!(plain[40] > plain[30]);
        assert_eq!(plain[40], mirrored[63 - 40]);
    }

    #[test]
    fn test_session_drives_feed_state() {
        let feed = Arc::new(CameraFeed::default());
        let mut session = SyntheticSession::new(Arc::clone(&feed));
        session.start_running();
        assert!(feed.running.load(Ordering::Acquire));
        session.stop_running();
        assert!(!feed.running.load(Ordering::Acquire));
    }
}
