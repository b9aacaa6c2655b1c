//! YCbCr→RGB conversion constants and a CPU reference for the color pass.

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::params::{ColorParams, mat3_to_columns};

/// Luma/chroma weighting standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YuvStandard {
    /// ITU-R BT.601, used by SD and most phone camera pipelines.
    #[default]
    Bt601,
    /// ITU-R BT.709 (HD).
    Bt709,
}

/// Quantization range of the incoming planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YuvRange {
    /// Luma 16..=235, chroma 16..=240.
    #[default]
    Video,
    /// Luma and chroma 0..=255.
    Full,
}

impl YuvStandard {
    /// Matrix taking `(Y, Cb, Cr)` with centered chroma to RGB.
    pub fn conversion_matrix(self) -> Mat3 {
        let (cr_r, cb_g, cr_g, cb_b) = match self {
            Self::Bt601 => (1.402, 0.344136, 0.714136, 1.772),
            Self::Bt709 => (1.5748, 0.187324, 0.468124, 1.8556),
        };
        Mat3::from_cols(
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, -cb_g, cb_b),
            Vec3::new(cr_r, -cr_g, 0.0),
        )
    }
}

impl YuvRange {
    /// `[luma offset, luma scale, chroma offset, chroma scale]` in normalized units.
    pub fn expansion(self) -> [f32; 4] {
        match self {
            Self::Video => [16.0 / 255.0, 255.0 / 219.0, 128.0 / 255.0, 255.0 / 224.0],
            Self::Full => [0.0, 1.0, 128.0 / 255.0, 1.0],
        }
    }
}

impl ColorParams {
    /// Parameter block for the given standard and range with an identity input filter.
    pub fn for_standard(standard: YuvStandard, range: YuvRange) -> Self {
        Self {
            conversion: mat3_to_columns(standard.conversion_matrix()),
            convolution: mat3_to_columns(Mat3::IDENTITY),
            range: range.expansion(),
        }
    }
}

/// CPU mirror of the `yuv_rgb` fragment shader.
///
/// Expands the 8-bit samples, converts, clamps, applies the input filter
/// matrix and clamps again.
pub fn yuv_to_rgb(y: u8, cb: u8, cr: u8, params: &ColorParams) -> [f32; 3] {
    let [y_off, y_scale, c_off, c_scale] = params.range;
    let ycc = Vec3::new(
        (y as f32 / 255.0 - y_off) * y_scale,
        (cb as f32 / 255.0 - c_off) * c_scale,
        (cr as f32 / 255.0 - c_off) * c_scale,
    );
    let rgb = (params.conversion_matrix() * ycc).clamp(Vec3::ZERO, Vec3::ONE);
    let filtered = (params.convolution_matrix() * rgb).clamp(Vec3::ZERO, Vec3::ONE);
    filtered.to_array()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_rgb(actual: [f32; 3], expected: [f32; 3]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < EPSILON, "expected {expected:?}, got {actual:?}");
        }
    }

    #[test]
    fn test_video_range_black_and_white() {
        let params = ColorParams::for_standard(YuvStandard::Bt601, YuvRange::Video);
        assert_rgb(yuv_to_rgb(16, 128, 128, &params), [0.0, 0.0, 0.0]);
        assert_rgb(yuv_to_rgb(235, 128, 128, &params), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_bt601_full_range_matches_formula() {
        let params = ColorParams::for_standard(YuvStandard::Bt601, YuvRange::Full);
        let y = 120.0 / 255.0;
        let cb = 90.0 / 255.0 - 128.0 / 255.0;
        let cr = 160.0 / 255.0 - 128.0 / 255.0;
        let expected = [
            y + 1.402 * cr,
            y - 0.344136 * cb - 0.714136 * cr,
            y + 1.772 * cb,
        ];
        assert_rgb(yuv_to_rgb(120, 90, 160, &params), expected);
    }

    #[test]
    fn test_bt709_differs_from_bt601() {
        let a = ColorParams::for_standard(YuvStandard::Bt601, YuvRange::Full);
        let b = ColorParams::for_standard(YuvStandard::Bt709, YuvRange::Full);
        let p = yuv_to_rgb(128, 60, 200, &a);
        let q = yuv_to_rgb(128, 60, 200, &b);
        assert!((p[0] - q[0]).abs() > 0.01);
    }

    #[test]
    fn test_convolution_applies_after_conversion() {
        let mut params = ColorParams::for_standard(YuvStandard::Bt601, YuvRange::Full);
        // Swap red and blue.
        params.set_convolution(&[0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
        let plain = ColorParams::for_standard(YuvStandard::Bt601, YuvRange::Full);
        let a = yuv_to_rgb(100, 70, 190, &plain);
        let b = yuv_to_rgb(100, 70, 190, &params);
        assert_rgb(b, [a[2], a[1], a[0]]);
    }

    #[test]
    fn test_output_is_clamped() {
        let params = ColorParams::for_standard(YuvStandard::Bt601, YuvRange::Video);
        let rgb = yuv_to_rgb(255, 255, 255, &params);
        assert!(rgb.iter().all(|c| (0.0..=1.0).contains(c)));
    }
}
