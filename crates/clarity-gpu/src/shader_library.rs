//! WGSL module assembly and entry point lookup.
//!
//! Each parameter kind gets one module: the shared declarations, the
//! generated parameter struct, its uniform binding, and the kind's fragment
//! entry points. A pipeline's parameter kind is therefore determined by the
//! module its fragment entry point lives in.

use clarity_core::ParamKind;
use clarity_core::params::ParamLayout;

const COMMON_WGSL: &str = include_str!("../shaders/common.wgsl");
const COLOR_WGSL: &str = include_str!("../shaders/color.wgsl");
const BLUR_WGSL: &str = include_str!("../shaders/blur.wgsl");
const FILTER_WGSL: &str = include_str!("../shaders/filter.wgsl");

/// One assembled shader module.
#[derive(Debug, Clone)]
pub struct ShaderModuleSource {
    pub kind: ParamKind,
    pub label: &'static str,
    pub source: String,
    pub vertex_entries: Vec<String>,
    pub fragment_entries: Vec<String>,
}

/// All modules the renderer compiles.
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    modules: Vec<ShaderModuleSource>,
}

impl ShaderLibrary {
    pub fn builtin() -> Self {
        let modules = ParamKind::ALL
            .into_iter()
            .map(|kind| {
                let (label, body) = match kind {
                    ParamKind::Color => ("clarity_color_shader", COLOR_WGSL),
                    ParamKind::Blur => ("clarity_blur_shader", BLUR_WGSL),
                    ParamKind::Filter => ("clarity_filter_shader", FILTER_WGSL),
                };
                let source = assemble(kind.layout(), &kind.wgsl_declaration(), body);
                ShaderModuleSource {
                    kind,
                    label,
                    vertex_entries: entry_points(&source, "@vertex"),
                    fragment_entries: entry_points(&source, "@fragment"),
                    source,
                }
            })
            .collect();
        Self { modules }
    }

    pub fn modules(&self) -> &[ShaderModuleSource] {
        &self.modules
    }

    pub fn module(&self, kind: ParamKind) -> Option<&ShaderModuleSource> {
        self.modules.iter().find(|m| m.kind == kind)
    }

    /// Parameter kind of the module defining fragment entry point `name`.
    pub fn locate(&self, name: &str) -> Option<ParamKind> {
        self.modules
            .iter()
            .find(|m| m.fragment_entries.iter().any(|e| e == name))
            .map(|m| m.kind)
    }

    pub fn has_vertex(&self, kind: ParamKind, name: &str) -> bool {
        self.module(kind)
            .is_some_and(|m| m.vertex_entries.iter().any(|e| e == name))
    }
}

fn assemble(layout: ParamLayout, declaration: &str, body: &str) -> String {
    format!(
        "{COMMON_WGSL}\n{declaration}\n@group(1) @binding(0) var<uniform> params: {};\n\n{body}",
        layout.wgsl_name
    )
}

/// Names of the functions annotated with `attribute`.
fn entry_points(source: &str, attribute: &str) -> Vec<String> {
    source
        .match_indices(attribute)
        .filter_map(|(at, _)| {
            let rest = source[at + attribute.len()..].trim_start();
            let rest = rest.strip_prefix("fn")?;
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            let name: String = rest
                .trim_start()
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            (!name.is_empty()).then_some(name)
        })
        .collect()
}
