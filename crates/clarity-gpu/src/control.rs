//! Commands from the UI thread to the renderer.
//!
//! Setters post typed commands into a bounded queue that the render thread
//! drains at the start of each frame. Output size changes go straight to the
//! [`TargetManager`], whose lock already serializes them with rendering.

use std::sync::Arc;

use clarity_core::{Extent, InputFilter, Orientation, Rgba, VideoFilter};
use tokio::sync::mpsc;

use crate::error::ControlError;
use crate::targets::TargetManager;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    SetVideoFilter(VideoFilter),
    SetColorFilter(InputFilter),
    SetBlurEnabled(bool),
    SetInvertScreen(bool),
    SetPrimaryColor(Rgba),
    SetSecondaryColor(Rgba),
    SetHighQuality(bool),
    SetOrientation(Orientation),
}

/// Cloneable handle for the UI layer.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlCommand>,
    targets: Arc<TargetManager>,
}

impl ControlHandle {
    pub(crate) fn new(tx: mpsc::Sender<ControlCommand>, targets: Arc<TargetManager>) -> Self {
        Self { tx, targets }
    }

    /// Queue a command without blocking.
    pub fn send(&self, command: ControlCommand) -> Result<(), ControlError> {
        self.tx.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ControlError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ControlError::Disconnected,
        })
    }

    pub fn set_video_filter(&self, filter: VideoFilter) -> Result<(), ControlError> {
        self.send(ControlCommand::SetVideoFilter(filter))
    }

    pub fn set_color_filter(&self, filter: InputFilter) -> Result<(), ControlError> {
        self.send(ControlCommand::SetColorFilter(filter))
    }

    pub fn set_blur_enabled(&self, enabled: bool) -> Result<(), ControlError> {
        self.send(ControlCommand::SetBlurEnabled(enabled))
    }

    pub fn set_invert_screen(&self, enabled: bool) -> Result<(), ControlError> {
        self.send(ControlCommand::SetInvertScreen(enabled))
    }

    pub fn set_primary_color(&self, color: Rgba) -> Result<(), ControlError> {
        self.send(ControlCommand::SetPrimaryColor(color))
    }

    pub fn set_secondary_color(&self, color: Rgba) -> Result<(), ControlError> {
        self.send(ControlCommand::SetSecondaryColor(color))
    }

    /// Switch between the high and standard quality tiers.
    pub fn set_high_quality_mode(&self, enabled: bool) -> Result<(), ControlError> {
        self.send(ControlCommand::SetHighQuality(enabled))
    }

    pub fn set_orientation(&self, orientation: Orientation) -> Result<(), ControlError> {
        self.send(ControlCommand::SetOrientation(orientation))
    }

    /// Output surface size in logical pixels. Rebuilds targets synchronously
    /// when the target size changes.
    pub fn set_output_size(&self, width: u32, height: u32) {
        self.targets.set_output_size(Extent::new(width, height));
    }

    pub fn targets(&self) -> &Arc<TargetManager> {
        &self.targets
    }
}
