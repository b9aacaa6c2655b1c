//! Letterbox/pillarbox viewport for the present pass.

use super::Extent;

/// Rectangle plus depth range, in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Whole-output viewport.
    pub fn full(output: Extent) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: output.width as f32,
            height: output.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Fit a `source` image into `output` preserving its aspect ratio.
    ///
    /// With `r = source.height / source.width`: a landscape output spans the
    /// full width with height `W * r`, centered vertically. Otherwise the image
    /// is shown rotated a quarter turn, spanning the full height with width
    /// `H * r`, centered horizontally. The result is clamped to the output.
    pub fn fit(output: Extent, source: Extent) -> Self {
        if source.is_empty() || output.is_empty() {
            return Self::full(output);
        }
        let out_w = output.width as f32;
        let out_h = output.height as f32;
        let ratio = source.height as f32 / source.width as f32;

        let mut vp = if output.width > output.height {
            let height = out_w * ratio;
            Self {
                y: (out_h - height) * 0.5,
                height,
                ..Self::full(output)
            }
        } else {
            let width = out_h * ratio;
            Self {
                x: (out_w - width) * 0.5,
                width,
                ..Self::full(output)
            }
        };

        vp.x = vp.x.max(0.0);
        vp.y = vp.y.max(0.0);
        vp.width = vp.width.min(out_w);
        vp.height = vp.height.min(out_h);
        vp
    }
}
