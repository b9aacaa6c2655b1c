//! Mapping from logical pipeline names to shader entry points.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Full-screen quad vertex entry point used when a mapping names none.
pub const DEFAULT_VERTEX: &str = "default_vertex";

/// Shader map compiled into the binary.
pub const BUILTIN_SHADER_MAP: &str = include_str!("../assets/shaders.json");

/// Optional entry point overrides for one pipeline name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderEntry {
    #[serde(default)]
    pub vertex: Option<String>,
    #[serde(default)]
    pub fragment: Option<String>,
}

/// Entry points a pipeline name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPair {
    pub vertex: String,
    pub fragment: String,
}

/// Pipeline name → entry point table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShaderMap {
    entries: HashMap<String, ShaderEntry>,
}

impl ShaderMap {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_SHADER_MAP).unwrap_or_else(|e| {
            tracing::error!(%e, "Embedded shader map is invalid");
            Self::default()
        })
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: ShaderEntry) {
        self.entries.insert(name.into(), entry);
    }

    /// Resolve a pipeline name. Unmapped names use the name itself as the
    /// fragment entry point and the default vertex entry point.
    pub fn resolve(&self, name: &str) -> ShaderPair {
        let entry = self.entries.get(name);
        ShaderPair {
            vertex: entry
                .and_then(|e| e.vertex.clone())
                .unwrap_or_else(|| DEFAULT_VERTEX.to_owned()),
            fragment: entry
                .and_then(|e| e.fragment.clone())
                .unwrap_or_else(|| name.to_owned()),
        }
    }
}
