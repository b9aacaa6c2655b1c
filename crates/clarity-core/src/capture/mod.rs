//! Camera device selection and captured frame types.
//!
//! The platform camera stack is reached through the [`CaptureDevice`] and
//! [`CaptureSession`] traits; [`CameraController`] implements format
//! selection and device switching on top of them.

pub mod controller;
pub mod device;
pub mod fourcc;
pub mod frame;

pub use controller::{CameraController, CapturePreferences, ResolutionListener};
pub use device::{
    CameraError, CameraPosition, CaptureDevice, CaptureFormat, CaptureSession, ConfigurationLock,
    ConnectionSettings, FrameRateRange,
};
pub use fourcc::FourCc;
pub use frame::{FrameError, Plane, YuvFrame};
