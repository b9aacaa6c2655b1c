//! Camera format selection and device switching.

use serde::{Deserialize, Serialize};

use crate::geometry::{Extent, Orientation};

use super::device::{
    CameraError, CameraPosition, CaptureDevice, CaptureFormat, CaptureSession, ConfigurationLock,
    ConnectionSettings,
};
use super::FourCc;

/// Requirements a capture format must meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapturePreferences {
    pub fourcc: FourCc,
    pub min_frame_rate: f64,
    /// Exact resolution to pick when offered.
    pub preferred_resolution: Option<Extent>,
    pub min_resolution: Extent,
}

impl Default for CapturePreferences {
    fn default() -> Self {
        Self {
            fourcc: FourCc::VIDEO_RANGE_NV12,
            min_frame_rate: 60.0,
            preferred_resolution: Some(Extent::new(1280, 720)),
            min_resolution: Extent::new(640, 480),
        }
    }
}

impl CapturePreferences {
    pub fn accepts(&self, format: &CaptureFormat) -> bool {
        format.fourcc == self.fourcc
            && format.max_frame_rate() >= self.min_frame_rate
            && format.resolution.width >= self.min_resolution.width
            && format.resolution.height >= self.min_resolution.height
    }

    /// The preferred resolution when offered, otherwise the smallest
    /// acceptable format.
    pub fn choose<'a>(&self, formats: &'a [CaptureFormat]) -> Option<&'a CaptureFormat> {
        let accepted = formats.iter().filter(|f| self.accepts(f));
        if let Some(preferred) = self.preferred_resolution {
            if let Some(exact) = accepted.clone().find(|f| f.resolution == preferred) {
                return Some(exact);
            }
        }
        accepted.min_by_key(|f| f.resolution.area())
    }
}

/// Called with the capture resolution whenever a format is selected.
pub type ResolutionListener = Box<dyn FnMut(Extent) + Send>;

/// Owns the capture session and the active camera.
pub struct CameraController<S: CaptureSession> {
    session: S,
    devices: Vec<Box<dyn CaptureDevice>>,
    preferences: CapturePreferences,
    active: Option<usize>,
    input: Option<S::Input>,
    format: Option<CaptureFormat>,
    running: bool,
    listener: Option<ResolutionListener>,
}

impl<S: CaptureSession> CameraController<S> {
    /// Keep the devices that offer at least one acceptable format.
    pub fn new(
        session: S,
        devices: Vec<Box<dyn CaptureDevice>>,
        preferences: CapturePreferences,
    ) -> Self {
        let devices: Vec<_> = devices
            .into_iter()
            .filter(|device| {
                let usable = device.formats().iter().filter(|f| preferences.accepts(f));
                let mut count = 0;
                for format in usable {
                    count += 1;
                    tracing::debug!(
                        device = device.name(),
                        fourcc = %format.fourcc,
                        resolution = %format.resolution,
                        max_fps = format.max_frame_rate(),
                        "Found capture format"
                    );
                }
                tracing::info!(
                    device = device.name(),
                    position = ?device.position(),
                    torch = device.has_torch(),
                    formats = count,
                    "Capture device found"
                );
                count > 0
            })
            .collect();

        Self {
            session,
            devices,
            preferences,
            active: None,
            input: None,
            format: None,
            running: false,
            listener: None,
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn preferences(&self) -> &CapturePreferences {
        &self.preferences
    }

    pub fn active_format(&self) -> Option<&CaptureFormat> {
        self.format.as_ref()
    }

    pub fn active_position(&self) -> Option<CameraPosition> {
        self.active_device().map(|d| d.position())
    }

    fn active_device(&self) -> Option<&dyn CaptureDevice> {
        self.active.map(|i| self.devices[i].as_ref())
    }

    pub fn supports_front_camera(&self) -> bool {
        self.devices
            .iter()
            .any(|d| d.position() == CameraPosition::Front)
    }

    pub fn supports_torch(&self) -> bool {
        self.active_device().is_some_and(|d| d.has_torch())
    }

    pub fn torch_enabled(&self) -> bool {
        self.active_device().is_some_and(|d| d.torch_enabled())
    }

    pub fn set_torch(&mut self, enabled: bool) -> Result<(), CameraError> {
        let index = self.active.ok_or(CameraError::TorchUnavailable)?;
        let device = self.devices[index].as_mut();
        if !device.has_torch() {
            return Err(CameraError::TorchUnavailable);
        }
        let mut lock = ConfigurationLock::acquire(device)?;
        lock.set_torch(enabled);
        Ok(())
    }

    pub fn use_front_camera(&self) -> bool {
        self.active_position() == Some(CameraPosition::Front)
    }

    pub fn set_use_front_camera(&mut self, front: bool) -> Result<(), CameraError> {
        let position = if front {
            CameraPosition::Front
        } else {
            CameraPosition::Back
        };
        self.set_device(position)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        if self.running == running {
            return;
        }
        if running {
            self.session.start_running();
        } else {
            self.session.stop_running();
        }
        self.running = running;
    }

    /// Resolutions of the active device's acceptable formats.
    pub fn supported_resolutions(&self) -> Vec<Extent> {
        let Some(device) = self.active_device() else {
            return Vec::new();
        };
        let mut out: Vec<Extent> = Vec::new();
        for format in device.formats().iter().filter(|f| self.preferences.accepts(f)) {
            if !out.contains(&format.resolution) {
                out.push(format.resolution);
            }
        }
        out
    }

    /// Install the resolution listener. If a format is already active it is
    /// announced immediately.
    pub fn set_resolution_listener(&mut self, listener: ResolutionListener) {
        self.listener = Some(listener);
        self.announce_resolution();
    }

    fn announce_resolution(&mut self) {
        if let (Some(format), Some(listener)) = (&self.format, self.listener.as_mut()) {
            listener(format.resolution);
        }
    }

    /// Switch to the camera at `position`.
    ///
    /// Selecting the already active position is a no-op. On any error the
    /// previous device, format, and running state stay in effect.
    pub fn set_device(&mut self, position: CameraPosition) -> Result<(), CameraError> {
        if self.active_position() == Some(position) {
            return Ok(());
        }
        let index = self
            .devices
            .iter()
            .position(|d| d.position() == position)
            .ok_or(CameraError::NoDevice(position))?;

        let format = self
            .preferences
            .choose(self.devices[index].formats())
            .cloned()
            .ok_or_else(|| CameraError::NoMatchingFormat {
                device: self.devices[index].name().to_owned(),
                fourcc: self.preferences.fourcc,
            })?;

        let input = self.session.create_input(self.devices[index].as_ref())?;

        {
            let mut lock = ConfigurationLock::acquire(self.devices[index].as_mut())?;
            lock.set_active_format(&format, self.preferences.min_frame_rate);
        }

        let was_running = self.running;
        if was_running {
            self.session.stop_running();
        }

        self.session.begin_configuration();
        if let Some(old) = self.input.take() {
            self.session.remove_input(old);
        }
        let mirrored = position == CameraPosition::Front;
        self.session.add_input(
            input.clone(),
            ConnectionSettings {
                mirrored,
                orientation: Orientation::LandscapeRight,
            },
        );
        self.session.commit_configuration();

        tracing::info!(
            device = self.devices[index].name(),
            resolution = %format.resolution,
            fps = self.preferences.min_frame_rate,
            mirrored,
            "Capture device selected"
        );

        self.active = Some(index);
        self.input = Some(input);
        self.format = Some(format);
        self.announce_resolution();

        if was_running {
            self.session.start_running();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::FrameRateRange;
    use std::sync::{Arc, Mutex};

    struct FakeDevice {
        name: String,
        position: CameraPosition,
        formats: Vec<CaptureFormat>,
        torch: Option<bool>,
        locked: bool,
        lock_fails: bool,
        active: Arc<Mutex<Option<Extent>>>,
    }

    impl FakeDevice {
        fn new(name: &str, position: CameraPosition, sizes: &[(u32, u32, f64)]) -> Self {
            Self {
                name: name.to_owned(),
                position,
                formats: sizes
                    .iter()
                    .map(|&(w, h, fps)| CaptureFormat {
                        fourcc: FourCc::VIDEO_RANGE_NV12,
                        resolution: Extent::new(w, h),
                        frame_rates: vec![FrameRateRange { min: 1.0, max: fps }],
                    })
                    .collect(),
                torch: None,
                locked: false,
                lock_fails: false,
                active: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl CaptureDevice for FakeDevice {
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
            if self.lock_fails {
                return Err(CameraError::ConfigurationLock {
                    device: self.name.clone(),
                    reason: "busy".into(),
                });
            }
            self.locked = true;
            Ok(())
        }
        fn unlock_for_configuration(&mut self) {
            self.locked = false;
        }
        fn set_active_format(&mut self, format: &CaptureFormat, _frame_rate: f64) {
            assert!(self.locked);
            *self.active.lock().unwrap() = Some(format.resolution);
        }
        fn set_torch(&mut self, enabled: bool) {
            assert!(self.locked);
            self.torch = Some(enabled);
        }
    }

    #[derive(Default)]
    struct FakeSession {
        events: Vec<String>,
        fail_inputs: bool,
    }

    impl CaptureSession for FakeSession {
        type Input = String;

        fn create_input(&mut self, device: &dyn CaptureDevice) -> Result<String, CameraError> {
            if self.fail_inputs {
                return Err(CameraError::InputCreation {
                    device: device.name().to_owned(),
                    reason: "denied".into(),
                });
            }
            Ok(device.name().to_owned())
        }
        fn begin_configuration(&mut self) {
            self.events.push("begin".into());
        }
        fn commit_configuration(&mut self) {
            self.events.push("commit".into());
        }
        fn remove_input(&mut self, input: String) {
            self.events.push(format!("remove {input}"));
        }
        fn add_input(&mut self, input: String, connection: ConnectionSettings) {
            self.events
                .push(format!("add {input} mirrored={}", connection.mirrored));
        }
        fn start_running(&mut self) {
            self.events.push("start".into());
        }
        fn stop_running(&mut self) {
            self.events.push("stop".into());
        }
    }

    fn controller() -> CameraController<FakeSession> {
        let back = FakeDevice::new(
            "back",
            CameraPosition::Back,
            &[(640, 480, 60.0), (1280, 720, 60.0), (1920, 1080, 30.0)],
        );
        let front = FakeDevice::new("front", CameraPosition::Front, &[(960, 540, 60.0)]);
        CameraController::new(
            FakeSession::default(),
            vec![Box::new(back), Box::new(front)],
            CapturePreferences::default(),
        )
    }

    #[test]
    fn test_prefers_exact_resolution() {
        let mut cam = controller();
        cam.set_device(CameraPosition::Back).unwrap();
        assert_eq!(
            cam.active_format().map(|f| f.resolution),
            Some(Extent::new(1280, 720))
        );
    }

    #[test]
    fn test_falls_back_to_smallest_acceptable() {
        let mut cam = controller();
        cam.set_device(CameraPosition::Front).unwrap();
        assert_eq!(
            cam.active_format().map(|f| f.resolution),
            Some(Extent::new(960, 540))
        );
    }

    #[test]
    fn test_slow_formats_are_excluded() {
        let cam = {
            let mut c = controller();
            c.set_device(CameraPosition::Back).unwrap();
            c
        };
        let sizes = cam.supported_resolutions();
        assert!(!sizes.contains(&Extent::new(1920, 1080)));
        assert_eq!(sizes.len(), 2);
    }

    #[test]
    fn test_devices_without_usable_formats_are_dropped() {
        let slow = FakeDevice::new("slow", CameraPosition::Front, &[(1280, 720, 30.0)]);
        let cam = CameraController::new(
            FakeSession::default(),
            vec![Box::new(slow)],
            CapturePreferences::default(),
        );
        assert!(!cam.supports_front_camera());
    }

    #[test]
    fn test_switch_preserves_running_state() {
        let mut cam = controller();
        cam.set_device(CameraPosition::Back).unwrap();
        cam.set_running(true);
        cam.set_use_front_camera(true).unwrap();
        assert!(cam.is_running());
        assert!(cam.use_front_camera());
        let events = &cam.session().events;
        let tail: Vec<&str> = events.iter().rev().take(6).rev().map(String::as_str).collect();
        assert_eq!(
            tail,
            ["stop", "begin", "remove back", "add front mirrored=true", "commit", "start"]
        );
    }

    #[test]
    fn test_each_switch_removes_the_previous_input() {
        let mut cam = controller();
        cam.set_device(CameraPosition::Back).unwrap();
        cam.set_device(CameraPosition::Front).unwrap();
        cam.set_device(CameraPosition::Back).unwrap();
        let events = &cam.session().events;
        let removed: Vec<&str> = events
            .iter()
            .filter(|e| e.starts_with("remove"))
            .map(String::as_str)
            .collect();
        assert_eq!(removed, ["remove back", "remove front"]);
        let added = events.iter().filter(|e| e.starts_with("add")).count();
        assert_eq!(added - removed.len(), 1);
    }

    #[test]
    fn test_input_failure_keeps_previous_configuration() {
        let mut cam = controller();
        cam.set_device(CameraPosition::Back).unwrap();
        cam.set_running(true);
        cam.session.fail_inputs = true;
        let before = cam.session().events.len();
        assert!(matches!(
            cam.set_device(CameraPosition::Front),
            Err(CameraError::InputCreation { .. })
        ));
        assert_eq!(cam.active_position(), Some(CameraPosition::Back));
        assert!(cam.is_running());
        assert_eq!(cam.session().events.len(), before);
    }

    #[test]
    fn test_missing_position_is_error() {
        let back = FakeDevice::new("back", CameraPosition::Back, &[(1280, 720, 60.0)]);
        let mut cam = CameraController::new(
            FakeSession::default(),
            vec![Box::new(back)],
            CapturePreferences::default(),
        );
        assert!(matches!(
            cam.set_device(CameraPosition::Front),
            Err(CameraError::NoDevice(CameraPosition::Front))
        ));
    }

    #[test]
    fn test_same_position_is_noop() {
        let mut cam = controller();
        cam.set_device(CameraPosition::Back).unwrap();
        let before = cam.session().events.len();
        cam.set_device(CameraPosition::Back).unwrap();
        assert_eq!(cam.session().events.len(), before);
    }

    #[test]
    fn test_listener_announced_on_attach_and_switch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut cam = controller();
        cam.set_device(CameraPosition::Back).unwrap();
        let sink = Arc::clone(&seen);
        cam.set_resolution_listener(Box::new(move |size| sink.lock().unwrap().push(size)));
        cam.set_device(CameraPosition::Front).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Extent::new(1280, 720), Extent::new(960, 540)]
        );
    }

    #[test]
    fn test_active_format_is_applied_to_device() {
        let back = FakeDevice::new("back", CameraPosition::Back, &[(1280, 720, 60.0)]);
        let applied = Arc::clone(&back.active);
        let mut cam = CameraController::new(
            FakeSession::default(),
            vec![Box::new(back)],
            CapturePreferences::default(),
        );
        cam.set_device(CameraPosition::Back).unwrap();
        assert_eq!(*applied.lock().unwrap(), Some(Extent::new(1280, 720)));
    }

    #[test]
    fn test_lock_failure_keeps_previous_device() {
        let back = FakeDevice::new("back", CameraPosition::Back, &[(1280, 720, 60.0)]);
        let mut front = FakeDevice::new("front", CameraPosition::Front, &[(1280, 720, 60.0)]);
        front.lock_fails = true;
        let mut cam = CameraController::new(
            FakeSession::default(),
            vec![Box::new(back), Box::new(front)],
            CapturePreferences::default(),
        );
        cam.set_device(CameraPosition::Back).unwrap();
        assert!(cam.set_device(CameraPosition::Front).is_err());
        assert_eq!(cam.active_position(), Some(CameraPosition::Back));
    }

    #[test]
    fn test_torch_requires_capable_device() {
        let mut back = FakeDevice::new("back", CameraPosition::Back, &[(1280, 720, 60.0)]);
        back.torch = Some(false);
        let mut cam = CameraController::new(
            FakeSession::default(),
            vec![Box::new(back)],
            CapturePreferences::default(),
        );
        assert!(matches!(cam.set_torch(true), Err(CameraError::TorchUnavailable)));
        cam.set_device(CameraPosition::Back).unwrap();
        assert!(cam.supports_torch());
        cam.set_torch(true).unwrap();
        assert!(cam.torch_enabled());
    }

    #[test]
    fn test_set_running_is_idempotent() {
        let mut cam = controller();
        cam.set_running(true);
        cam.set_running(true);
        cam.set_running(false);
        assert_eq!(cam.session().events, ["start", "stop"]);
    }
}
