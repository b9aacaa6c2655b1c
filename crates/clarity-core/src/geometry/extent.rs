//! Integer pixel sizes and render target sizing.

use serde::{Deserialize, Serialize};

/// Width × height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    pub fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Multiply by a display scale, rounding to whole pixels.
    pub fn scaled(self, scale: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        Self::new(
            (self.width as f32 * scale).round() as u32,
            (self.height as f32 * scale).round() as u32,
        )
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Size of the offscreen targets for an output surface and capture format.
///
/// The output size is scaled to physical pixels and turned to the capture's
/// orientation. If either side then exceeds the capture resolution the
/// capture resolution is used as-is, since rendering above the source
/// resolution adds no detail.
pub fn target_extent(output: Extent, display_scale: f32, capture: Extent) -> Extent {
    let mut size = output.scaled(display_scale);
    if size.is_portrait() != capture.is_portrait() {
        size = size.transposed();
    }
    if capture.is_empty() {
        return size;
    }
    if size.width > capture.width || size.height > capture.height {
        return capture;
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portrait_output_is_turned_to_landscape_capture() {
        let size = target_extent(Extent::new(360, 640), 1.0, Extent::new(1280, 720));
        assert_eq!(size, Extent::new(640, 360));
    }

    #[test]
    fn test_scaled_output_larger_than_capture_uses_capture() {
        let size = target_extent(Extent::new(1024, 768), 2.0, Extent::new(1280, 720));
        assert_eq!(size, Extent::new(1280, 720));
    }

    #[test]
    fn test_one_side_over_capture_uses_capture() {
        let size = target_extent(Extent::new(1300, 700), 1.0, Extent::new(1280, 720));
        assert_eq!(size, Extent::new(1280, 720));
    }

    #[test]
    fn test_unknown_capture_keeps_scaled_output() {
        let size = target_extent(Extent::new(400, 300), 2.0, Extent::default());
        assert_eq!(size, Extent::new(800, 600));
    }

    #[test]
    fn test_invalid_scale_is_treated_as_one() {
        assert_eq!(Extent::new(10, 20).scaled(f32::NAN), Extent::new(10, 20));
        assert_eq!(Extent::new(10, 20).scaled(-2.0), Extent::new(10, 20));
    }
}
