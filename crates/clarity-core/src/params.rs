//! Shader parameter blocks shared between the CPU and the WGSL shaders.
//!
//! Each block is declared once through [`gpu_struct!`], which produces the
//! `#[repr(C)]` Rust struct and the field table used to emit the matching WGSL
//! `struct` declaration. Field offsets are therefore fixed at compile time and
//! verified against the WGSL uniform layout rules in the tests below.

use glam::Mat3;
use serde::{Deserialize, Serialize};

/// Layout of a single field inside a parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: &'static str,
    pub wgsl_type: &'static str,
    pub offset: usize,
    pub size: usize,
}

/// A parameter block that can be uploaded verbatim into a uniform buffer.
pub trait GpuStruct: bytemuck::Pod {
    /// Struct name used in the generated WGSL.
    const WGSL_NAME: &'static str;

    /// Field table in declaration order.
    fn fields() -> &'static [FieldLayout];

    /// WGSL `struct` declaration matching the Rust layout.
    fn wgsl_declaration() -> String {
        let mut out = format!("struct {} {{\n", Self::WGSL_NAME);
        for field in Self::fields() {
            out.push_str(&format!("    {}: {},\n", field.name, field.wgsl_type));
        }
        out.push_str("}\n");
        out
    }
}

macro_rules! gpu_struct {
    (
        $(#[$meta:meta])*
        pub struct $name:ident as $wgsl:literal {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty => $wty:literal ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: $ty ),*
        }

        impl GpuStruct for $name {
            const WGSL_NAME: &'static str = $wgsl;

            fn fields() -> &'static [FieldLayout] {
                const FIELDS: &[FieldLayout] = &[
                    $( FieldLayout {
                        name: stringify!($field),
                        wgsl_type: $wty,
                        offset: std::mem::offset_of!($name, $field),
                        size: std::mem::size_of::<$ty>(),
                    } ),*
                ];
                FIELDS
            }
        }
    };
}

gpu_struct! {
    /// Parameters for the YUV→RGB conversion pass.
    pub struct ColorParams as "ColorParams" {
        /// YCbCr→RGB matrix for the configured standard, column-major.
        conversion: [[f32; 4]; 3] => "mat3x3<f32>",
        /// Input filter matrix applied to the converted RGB, column-major.
        convolution: [[f32; 4]; 3] => "mat3x3<f32>",
        /// `[luma offset, luma scale, chroma offset, chroma scale]`.
        range: [f32; 4] => "vec4<f32>",
    }
}

gpu_struct! {
    /// Parameters shared by the video filter passes and the present pass.
    pub struct FilterParams as "FilterParams" {
        primary_color: [f32; 4] => "vec4<f32>",
        secondary_color: [f32; 4] => "vec4<f32>",
        low_threshold: f32 => "f32",
        high_threshold: f32 => "f32",
        _pad: [f32; 2] => "vec2<f32>",
    }
}

gpu_struct! {
    /// Texel offsets for the separable blur.
    ///
    /// Tap `i` stores the horizontal offset in `.xy` and the vertical offset
    /// in `.zw`, which keeps the array stride at 16 bytes as uniform buffers
    /// require.
    pub struct BlurParams as "BlurParams" {
        taps: [[f32; 4]; 3] => "array<vec4<f32>, 3>",
    }
}

/// Linear-sampled Gaussian tap positions, in texels.
pub const BLUR_TAP_OFFSETS: [f32; 3] = [0.0, 1.3846153846, 3.2307692308];

/// Identity matrix, row-major, as it appears in filter definitions.
pub const IDENTITY_CONVOLUTION: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Pack a matrix into three 16-byte aligned columns.
pub fn mat3_to_columns(m: Mat3) -> [[f32; 4]; 3] {
    let cols = m.to_cols_array_2d();
    [
        [cols[0][0], cols[0][1], cols[0][2], 0.0],
        [cols[1][0], cols[1][1], cols[1][2], 0.0],
        [cols[2][0], cols[2][1], cols[2][2], 0.0],
    ]
}

/// Inverse of [`mat3_to_columns`].
pub fn columns_to_mat3(cols: &[[f32; 4]; 3]) -> Mat3 {
    Mat3::from_cols_array_2d(&[
        [cols[0][0], cols[0][1], cols[0][2]],
        [cols[1][0], cols[1][1], cols[1][2]],
        [cols[2][0], cols[2][1], cols[2][2]],
    ])
}

/// Build a matrix from a row-major 9-element array.
///
/// Anything other than exactly nine entries yields the identity.
pub fn mat3_from_row_major(values: &[f32]) -> Mat3 {
    if values.len() != 9 {
        return Mat3::IDENTITY;
    }
    Mat3::from_cols_slice(values).transpose()
}

impl ColorParams {
    /// Replace the input filter matrix from a row-major array.
    pub fn set_convolution(&mut self, row_major: &[f32]) {
        self.convolution = mat3_to_columns(mat3_from_row_major(row_major));
    }

    pub fn convolution_matrix(&self) -> Mat3 {
        columns_to_mat3(&self.convolution)
    }

    pub fn conversion_matrix(&self) -> Mat3 {
        columns_to_mat3(&self.conversion)
    }
}

impl Default for ColorParams {
    fn default() -> Self {
        Self {
            conversion: mat3_to_columns(Mat3::IDENTITY),
            convolution: mat3_to_columns(Mat3::IDENTITY),
            range: [0.0, 1.0, 0.5, 1.0],
        }
    }
}

impl FilterParams {
    pub fn primary(&self) -> Rgba {
        Rgba::from_array(self.primary_color)
    }

    pub fn secondary(&self) -> Rgba {
        Rgba::from_array(self.secondary_color)
    }

    pub fn set_primary(&mut self, color: Rgba) {
        self.primary_color = color.clamped().to_array();
    }

    pub fn set_secondary(&mut self, color: Rgba) {
        self.secondary_color = color.clamped().to_array();
    }

    pub fn set_thresholds(&mut self, low: f32, high: f32) {
        self.low_threshold = low;
        self.high_threshold = high;
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            primary_color: Rgba::DEFAULT_PRIMARY.to_array(),
            secondary_color: Rgba::DEFAULT_SECONDARY.to_array(),
            low_threshold: 0.15,
            high_threshold: 0.25,
            _pad: [0.0; 2],
        }
    }
}

impl BlurParams {
    /// Horizontal tap offsets in texture coordinates.
    pub fn x_offsets(&self) -> [[f32; 2]; 3] {
        self.taps.map(|t| [t[0], t[1]])
    }

    /// Vertical tap offsets in texture coordinates.
    pub fn y_offsets(&self) -> [[f32; 2]; 3] {
        self.taps.map(|t| [t[2], t[3]])
    }

    pub fn set_x_offsets(&mut self, offsets: [[f32; 2]; 3]) {
        for (tap, off) in self.taps.iter_mut().zip(offsets) {
            tap[0] = off[0];
            tap[1] = off[1];
        }
    }

    pub fn set_y_offsets(&mut self, offsets: [[f32; 2]; 3]) {
        for (tap, off) in self.taps.iter_mut().zip(offsets) {
            tap[2] = off[0];
            tap[3] = off[1];
        }
    }

    /// Recompute the tap offsets for a texture of `width`×`height` texels.
    pub fn set_texel_size(&mut self, width: u32, height: u32) {
        let texel_w = 1.0 / width.max(1) as f32;
        let texel_h = 1.0 / height.max(1) as f32;
        self.set_x_offsets(BLUR_TAP_OFFSETS.map(|o| [o * texel_w, 0.0]));
        self.set_y_offsets(BLUR_TAP_OFFSETS.map(|o| [0.0, o * texel_h]));
    }
}

impl Default for BlurParams {
    fn default() -> Self {
        Self {
            taps: [[0.0; 4]; 3],
        }
    }
}

/// Which parameter block a shader reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Color,
    Blur,
    Filter,
}

/// Compile-time description of a shader's parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamLayout {
    pub kind: ParamKind,
    pub wgsl_name: &'static str,
    pub size: usize,
    pub fields: &'static [FieldLayout],
}

impl ParamKind {
    pub const ALL: [ParamKind; 3] = [ParamKind::Color, ParamKind::Blur, ParamKind::Filter];

    pub fn layout(self) -> ParamLayout {
        match self {
            Self::Color => layout_of::<ColorParams>(self),
            Self::Blur => layout_of::<BlurParams>(self),
            Self::Filter => layout_of::<FilterParams>(self),
        }
    }

    pub fn wgsl_declaration(self) -> String {
        match self {
            Self::Color => ColorParams::wgsl_declaration(),
            Self::Blur => BlurParams::wgsl_declaration(),
            Self::Filter => FilterParams::wgsl_declaration(),
        }
    }
}

fn layout_of<T: GpuStruct>(kind: ParamKind) -> ParamLayout {
    ParamLayout {
        kind,
        wgsl_name: T::WGSL_NAME,
        size: std::mem::size_of::<T>(),
        fields: T::fields(),
    }
}

/// Straight RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const DEFAULT_PRIMARY: Self = Self::new(0.0, 1.0, 1.0, 0.75);
    pub const DEFAULT_SECONDARY: Self = Self::new(1.0, 0.0, 1.0, 0.75);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_array(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// RGB complement; alpha is kept.
    pub fn inverse(self) -> Self {
        Self::new(1.0 - self.r, 1.0 - self.g, 1.0 - self.b, self.a)
    }

    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const EPSILON: f32 = 1e-6;

    fn offset(fields: &[FieldLayout], name: &str) -> usize {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.offset)
            .unwrap_or(usize::MAX)
    }

    #[test]
    fn test_filter_params_matches_wgsl_uniform_layout() {
        let fields = FilterParams::fields();
        assert_eq!(offset(fields, "primary_color"), 0);
        assert_eq!(offset(fields, "secondary_color"), 16);
        assert_eq!(offset(fields, "low_threshold"), 32);
        assert_eq!(offset(fields, "high_threshold"), 36);
        assert_eq!(std::mem::size_of::<FilterParams>(), 48);
    }

    #[test]
    fn test_color_params_uses_padded_columns() {
        let fields = ColorParams::fields();
        assert_eq!(offset(fields, "conversion"), 0);
        assert_eq!(offset(fields, "convolution"), 48);
        assert_eq!(offset(fields, "range"), 96);
        assert_eq!(std::mem::size_of::<ColorParams>(), 112);
    }

    #[test]
    fn test_blur_params_size_is_uniform_aligned() {
        assert_eq!(std::mem::size_of::<BlurParams>() % 16, 0);
    }

    #[test]
    fn test_wgsl_declaration_lists_every_field() {
        let decl = FilterParams::wgsl_declaration();
        assert!(decl.starts_with("struct FilterParams {"));
        assert!(decl.contains("primary_color: vec4<f32>,"));
        assert!(decl.contains("high_threshold: f32,"));
        assert!(decl.trim_end().ends_with('}'));
    }

    #[test]
    fn test_row_major_convolution_is_transposed_into_columns() {
        let mut params = ColorParams::default();
        params.set_convolution(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        // First column holds the first element of each row.
        assert_eq!(params.convolution[0], [1.0, 4.0, 7.0, 0.0]);
        assert_eq!(params.convolution[2], [3.0, 6.0, 9.0, 0.0]);
        let out = params.convolution_matrix() * Vec3::new(1.0, 0.0, 0.0);
        assert!((out - Vec3::new(1.0, 4.0, 7.0)).length() < EPSILON);
    }

    #[test]
    fn test_wrong_length_convolution_falls_back_to_identity() {
        let mut params = ColorParams::default();
        params.set_convolution(&[2.0, 0.0, 0.0]);
        assert_eq!(params.convolution_matrix(), Mat3::IDENTITY);
    }

    #[test]
    fn test_blur_offsets_scale_with_texel_size() {
        let mut blur = BlurParams::default();
        blur.set_texel_size(100, 50);
        let x = blur.x_offsets();
        let y = blur.y_offsets();
        assert!((x[1][0] - 1.3846153846 / 100.0).abs() < EPSILON);
        assert!((x[2][0] - 3.2307692308 / 100.0).abs() < EPSILON);
        assert_eq!(x[1][1], 0.0);
        assert!((y[2][1] - 3.2307692308 / 50.0).abs() < EPSILON);
        assert_eq!(y[2][0], 0.0);
    }

    #[test]
    fn test_inverse_color_keeps_alpha() {
        let inv = Rgba::new(0.0, 1.0, 0.25, 0.75).inverse();
        assert_eq!(inv, Rgba::new(1.0, 0.0, 0.75, 0.75));
    }

    #[test]
    fn test_set_primary_clamps_components() {
        let mut params = FilterParams::default();
        params.set_primary(Rgba::new(1.5, -0.5, 0.5, 2.0));
        assert_eq!(params.primary(), Rgba::new(1.0, 0.0, 0.5, 1.0));
    }
}
