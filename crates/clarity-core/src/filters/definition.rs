//! Individual filter entries and their parsing from loose JSON objects.

use serde_json::Value;

use crate::params::IDENTITY_CONVOLUTION;

/// Name given to the built-in entry used when a catalog would be empty.
pub const INVALID_FILTER_NAME: &str = "Invalid Filter";

/// Conversion shader used when an input filter names none.
pub const DEFAULT_COLOR_SHADER: &str = "yuv_rgb";

/// Pass list used when a video filter names none.
pub const DEFAULT_PASS: &str = "blit";

/// A filter entry that can be read from one element of a definition list.
pub trait FilterDefinition: Clone {
    fn name(&self) -> &str;

    /// Built-in entry for an otherwise empty catalog.
    fn fallback() -> Self;

    /// Parse one entry. Returns `None` when the required `Name` is missing.
    fn from_definition(def: &Value) -> Option<Self>;
}

/// Ordered list of shader passes applied after color conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFilter {
    pub name: String,
    /// Pipeline names, applied in order.
    pub passes: Vec<String>,
    /// Whether the filter reads the blurred texture.
    pub can_blur: bool,
}

/// Color matrix applied to the converted camera image.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFilter {
    pub name: String,
    pub shader: String,
    /// Row-major 3×3 matrix.
    pub convolution: [f32; 9],
}

fn entry_name(def: &Value) -> Option<String> {
    def.get("Name")?.as_str().map(str::to_owned)
}

impl FilterDefinition for VideoFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn fallback() -> Self {
        Self {
            name: INVALID_FILTER_NAME.to_owned(),
            passes: vec![DEFAULT_PASS.to_owned()],
            can_blur: false,
        }
    }

    fn from_definition(def: &Value) -> Option<Self> {
        let name = entry_name(def)?;
        let can_blur = def
            .get("CanUseBlur")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let passes = def
            .get("Passes")
            .and_then(Value::as_array)
            .and_then(|list| {
                list.iter()
                    .map(|p| p.as_str().map(str::to_owned))
                    .collect::<Option<Vec<_>>>()
            })
            .unwrap_or_else(|| vec![DEFAULT_PASS.to_owned()]);
        Some(Self {
            name,
            passes,
            can_blur,
        })
    }
}

impl FilterDefinition for InputFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn fallback() -> Self {
        Self {
            name: INVALID_FILTER_NAME.to_owned(),
            shader: DEFAULT_COLOR_SHADER.to_owned(),
            convolution: IDENTITY_CONVOLUTION,
        }
    }

    fn from_definition(def: &Value) -> Option<Self> {
        let name = entry_name(def)?;
        let shader = def
            .get("Shader")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_COLOR_SHADER)
            .to_owned();
        let convolution = def
            .get("Convolution")
            .and_then(Value::as_array)
            .and_then(|list| parse_matrix(list))
            .unwrap_or(IDENTITY_CONVOLUTION);
        Some(Self {
            name,
            shader,
            convolution,
        })
    }
}

fn parse_matrix(list: &[Value]) -> Option<[f32; 9]> {
    if list.len() != 9 {
        return None;
    }
    let mut out = [0.0; 9];
    for (slot, v) in out.iter_mut().zip(list) {
        *slot = v.as_f64()? as f32;
    }
    Some(out)
}
