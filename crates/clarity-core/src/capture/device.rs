//! Traits over the platform camera stack.

use std::ops::{Deref, DerefMut};

use crate::geometry::{Extent, Orientation};

use super::FourCc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraPosition {
    Back,
    Front,
    Unspecified,
}

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("no capture device at position {0:?}")]
    NoDevice(CameraPosition),
    #[error("device {device} has no {fourcc} format meeting the capture requirements")]
    NoMatchingFormat { device: String, fourcc: FourCc },
    #[error("failed to create capture input for {device}: {reason}")]
    InputCreation { device: String, reason: String },
    #[error("failed to lock {device} for configuration: {reason}")]
    ConfigurationLock { device: String, reason: String },
    #[error("torch is not available on the active device")]
    TorchUnavailable,
}

/// Supported frame rates of one format, in frames per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRateRange {
    pub min: f64,
    pub max: f64,
}

/// One capture format a device offers.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureFormat {
    pub fourcc: FourCc,
    pub resolution: Extent,
    pub frame_rates: Vec<FrameRateRange>,
}

impl CaptureFormat {
    pub fn max_frame_rate(&self) -> f64 {
        self.frame_rates.iter().map(|r| r.max).fold(0.0, f64::max)
    }
}

/// A physical camera.
pub trait CaptureDevice: Send {
    fn name(&self) -> &str;
    fn position(&self) -> CameraPosition;
    fn formats(&self) -> &[CaptureFormat];
    fn has_torch(&self) -> bool;
    fn torch_enabled(&self) -> bool;

    /// Acquire exclusive configuration access. Prefer [`ConfigurationLock::acquire`].
    fn lock_for_configuration(&mut self) -> Result<(), CameraError>;
    fn unlock_for_configuration(&mut self);

    /// Only valid while locked. Pins the frame duration to `frame_rate`.
    fn set_active_format(&mut self, format: &CaptureFormat, frame_rate: f64);

    /// Only valid while locked.
    fn set_torch(&mut self, enabled: bool);
}

/// Configuration access to a device; unlocks on drop.
pub struct ConfigurationLock<'a, D: CaptureDevice + ?Sized> {
    device: &'a mut D,
}

impl<'a, D: CaptureDevice + ?Sized> ConfigurationLock<'a, D> {
    pub fn acquire(device: &'a mut D) -> Result<Self, CameraError> {
        device.lock_for_configuration()?;
        Ok(Self { device })
    }
}

impl<D: CaptureDevice + ?Sized> Deref for ConfigurationLock<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<D: CaptureDevice + ?Sized> DerefMut for ConfigurationLock<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
    }
}

impl<D: CaptureDevice + ?Sized> Drop for ConfigurationLock<'_, D> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
    }
}

/// How a newly added input is connected to the video output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub mirrored: bool,
    pub orientation: Orientation,
}

/// The capture graph a device input is attached to.
///
/// Changes between `begin_configuration` and `commit_configuration` are
/// applied atomically.
pub trait CaptureSession {
    /// Handle to an attached input. The controller keeps a copy so it can
    /// remove the input on the next switch.
    type Input: Clone;

    fn create_input(&mut self, device: &dyn CaptureDevice) -> Result<Self::Input, CameraError>;
    fn begin_configuration(&mut self);
    fn commit_configuration(&mut self);
    fn remove_input(&mut self, input: Self::Input);
    fn add_input(&mut self, input: Self::Input, connection: ConnectionSettings);
    fn start_running(&mut self);
    fn stop_running(&mut self);
}
