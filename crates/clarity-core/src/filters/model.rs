//! Both filter catalogs loaded from a single definition document.

use std::path::Path;

use serde_json::Value;

use super::{FilterCatalog, InputFilter, VideoFilter};
use crate::error::ConfigError;

/// Filter definitions compiled into the binary.
pub const BUILTIN_FILTERS: &str = include_str!("../../assets/filters.json");

/// The video and input filter catalogs.
#[derive(Debug, Clone)]
pub struct FilterModel {
    pub video: FilterCatalog<VideoFilter>,
    pub input: FilterCatalog<InputFilter>,
}

impl FilterModel {
    /// Parse a definition document.
    ///
    /// Invalid JSON is an error. A missing `"Video"` or `"Input"` collection
    /// is treated as empty, leaving that catalog with its fallback entry.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let doc: Value = serde_json::from_str(text)?;
        let video = collection(&doc, "Video");
        let input = collection(&doc, "Input");
        let model = Self {
            video: FilterCatalog::from_definitions(video),
            input: FilterCatalog::from_definitions(input),
        };
        tracing::info!(
            video = model.video.len(),
            input = model.input.len(),
            "Loaded filter definitions"
        );
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_json(&text)
    }

    /// Catalogs built from the embedded definitions.
    pub fn builtin() -> Self {
        match Self::from_json(BUILTIN_FILTERS) {
            Ok(model) => model,
            Err(e) => {
                tracing::error!(%e, "Embedded filter definitions are invalid");
                Self {
                    video: FilterCatalog::new(Vec::new()),
                    input: FilterCatalog::new(Vec::new()),
                }
            }
        }
    }

    pub fn video_filter(&self, name: &str) -> Option<&VideoFilter> {
        self.video.by_name(name)
    }

    pub fn next_video_filter(&mut self) -> &VideoFilter {
        self.video.next()
    }

    pub fn prev_video_filter(&mut self) -> &VideoFilter {
        self.video.prev()
    }

    pub fn input_filter(&self, name: &str) -> Option<&InputFilter> {
        self.input.by_name(name)
    }

    pub fn next_input_filter(&mut self) -> &InputFilter {
        self.input.next()
    }

    pub fn prev_input_filter(&mut self) -> &InputFilter {
        self.input.prev()
    }
}

fn collection<'a>(doc: &'a Value, key: &str) -> &'a [Value] {
    doc.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
