//! Named render pipelines, compiled lazily and cached for the session.
//!
//! A pipeline name resolves through the [`ShaderMap`] to a vertex and
//! fragment entry point. The fragment's module determines the parameter
//! block the pipeline reads. Compilation sits behind [`PipelineCompiler`] so
//! the cache and everything built on it can run without a device.

use std::collections::HashMap;
use std::sync::Arc;

use clarity_core::{ParamKind, ShaderMap};

use crate::bindings::PassBindings;
use crate::device::GpuContext;
use crate::error::{PipelineError, RendererError};
use crate::geometry::quad_vertex_layout;
use crate::shader_library::ShaderLibrary;

/// Everything needed to build one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    pub name: String,
    pub vertex: String,
    pub fragment: String,
    pub format: wgpu::TextureFormat,
}

/// Compiler output: a backend handle plus the parameter block it reads.
pub struct CompiledPipeline<H> {
    pub handle: H,
    pub params: ParamKind,
}

/// Turns a [`PipelineRequest`] into a backend pipeline.
pub trait PipelineCompiler {
    type Handle;

    fn compile(
        &mut self,
        request: &PipelineRequest,
    ) -> Result<CompiledPipeline<Self::Handle>, PipelineError>;
}

/// Immutable compiled pipeline.
#[derive(Debug)]
pub struct Pipeline<H> {
    name: String,
    vertex: String,
    fragment: String,
    format: wgpu::TextureFormat,
    params: ParamKind,
    handle: H,
}

impl<H> Pipeline<H> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex(&self) -> &str {
        &self.vertex
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Parameter block bound at group 1.
    pub fn params(&self) -> ParamKind {
        self.params
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }
}

type PipelineKey = (String, wgpu::TextureFormat);

/// Cache of pipelines keyed by name and output format.
///
/// A failed build is remembered per key and returned without recompiling.
pub struct PipelineCache<C: PipelineCompiler> {
    compiler: C,
    shader_map: ShaderMap,
    default_format: wgpu::TextureFormat,
    pipelines: HashMap<PipelineKey, Arc<Pipeline<C::Handle>>>,
    failed: HashMap<PipelineKey, PipelineError>,
}

impl<C: PipelineCompiler> PipelineCache<C> {
    pub fn new(compiler: C, shader_map: ShaderMap, default_format: wgpu::TextureFormat) -> Self {
        Self {
            compiler,
            shader_map,
            default_format,
            pipelines: HashMap::new(),
            failed: HashMap::new(),
        }
    }

    /// Pipeline `name` rendering into the default target format.
    pub fn get(&mut self, name: &str) -> Result<Arc<Pipeline<C::Handle>>, PipelineError> {
        self.get_with_format(name, self.default_format)
    }

    /// Pipeline `name` rendering into `format`. Repeated calls return the same
    /// `Arc`, or the same error without another compile attempt.
    pub fn get_with_format(
        &mut self,
        name: &str,
        format: wgpu::TextureFormat,
    ) -> Result<Arc<Pipeline<C::Handle>>, PipelineError> {
        let key = (name.to_owned(), format);
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(Arc::clone(pipeline));
        }
        if let Some(e) = self.failed.get(&key) {
            tracing::trace!(pipeline = name, ?format, "Pipeline previously failed");
            return Err(e.clone());
        }

        let pair = self.shader_map.resolve(name);
        let request = PipelineRequest {
            name: name.to_owned(),
            vertex: pair.vertex,
            fragment: pair.fragment,
            format,
        };
        let compiled = match self.compiler.compile(&request) {
            Ok(compiled) => compiled,
            Err(e) => {
                tracing::error!(pipeline = name, ?format, error = %e, "Pipeline compilation failed");
                self.failed.insert(key, e.clone());
                return Err(e);
            }
        };

        tracing::debug!(
            pipeline = name,
            vertex = %request.vertex,
            fragment = %request.fragment,
            ?format,
            params = ?compiled.params,
            "Compiled pipeline"
        );
        let pipeline = Arc::new(Pipeline {
            name: request.name,
            vertex: request.vertex,
            fragment: request.fragment,
            format,
            params: compiled.params,
            handle: compiled.handle,
        });
        self.pipelines.insert(key, Arc::clone(&pipeline));
        Ok(pipeline)
    }

    pub fn contains(&self, name: &str, format: wgpu::TextureFormat) -> bool {
        self.pipelines.contains_key(&(name.to_owned(), format))
    }

    /// Whether a build of `name` for `format` has failed.
    pub fn has_failed(&self, name: &str, format: wgpu::TextureFormat) -> bool {
        self.failed.contains_key(&(name.to_owned(), format))
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn default_format(&self) -> wgpu::TextureFormat {
        self.default_format
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }
}

/// Compiles pipelines against the built-in shader modules.
pub struct WgpuPipelineCompiler {
    gpu: Arc<GpuContext>,
    bindings: Arc<PassBindings>,
    library: ShaderLibrary,
    modules: HashMap<ParamKind, wgpu::ShaderModule>,
}

impl WgpuPipelineCompiler {
    /// Compile every shader module up front. A module that fails validation
    /// is fatal.
    pub fn new(gpu: Arc<GpuContext>, bindings: Arc<PassBindings>) -> Result<Self, RendererError> {
        let library = ShaderLibrary::builtin();
        let mut modules = HashMap::new();

        for source in library.modules() {
            gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
            let module = gpu
                .device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(source.label),
                    source: wgpu::ShaderSource::Wgsl(source.source.as_str().into()),
                });
            if let Some(err) = pollster::block_on(gpu.device.pop_error_scope()) {
                return Err(RendererError::ShaderModule {
                    module: source.label,
                    message: err.to_string(),
                });
            }
            tracing::info!(
                module = source.label,
                fragments = ?source.fragment_entries,
                "Loaded shader module"
            );
            modules.insert(source.kind, module);
        }

        Ok(Self {
            gpu,
            bindings,
            library,
            modules,
        })
    }

    pub fn library(&self) -> &ShaderLibrary {
        &self.library
    }
}

impl PipelineCompiler for WgpuPipelineCompiler {
    type Handle = wgpu::RenderPipeline;

    fn compile(
        &mut self,
        request: &PipelineRequest,
    ) -> Result<CompiledPipeline<wgpu::RenderPipeline>, PipelineError> {
        let missing = |stage, entry: &str| PipelineError::MissingEntryPoint {
            pipeline: request.name.clone(),
            stage,
            entry: entry.to_owned(),
        };

        let kind = self
            .library
            .locate(&request.fragment)
            .ok_or_else(|| missing("fragment", &request.fragment))?;
        if !self.library.has_vertex(kind, &request.vertex) {
            return Err(missing("vertex", &request.vertex));
        }
        let module = self
            .modules
            .get(&kind)
            .ok_or_else(|| missing("fragment", &request.fragment))?;

        let device = &self.gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let handle = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&request.name),
            layout: Some(&self.bindings.pipeline_layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some(&request.vertex),
                compilation_options: Default::default(),
                buffers: &[quad_vertex_layout()],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some(&request.fragment),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: request.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(PipelineError::Validation {
                pipeline: request.name.clone(),
                message: err.to_string(),
            });
        }

        Ok(CompiledPipeline {
            handle,
            params: kind,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fake::CountingCompiler;
    use super::*;
    use crate::TARGET_FORMAT;

    fn cache(compiler: CountingCompiler) -> PipelineCache<CountingCompiler> {
        PipelineCache::new(compiler, ShaderMap::builtin(), TARGET_FORMAT)
    }

    #[test]
    fn test_get_is_idempotent() {
        let mut cache = cache(CountingCompiler::new());
        let a = cache.get("blit").expect("blit compiles");
        let b = cache.get("blit").expect("blit compiles");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.compiler().count("blit"), 1);
    }

    #[test]
    fn test_format_is_part_of_the_key() {
        let mut cache = cache(CountingCompiler::new());
        let a = cache.get("invert").expect("compiles");
        let b = cache
            .get_with_format("invert", wgpu::TextureFormat::Rgba8Unorm)
            .expect("compiles");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_default_vertex_and_mapped_fragment() {
        let mut cache = cache(CountingCompiler::new());
        let p = cache.get("edge_highlight").expect("mapped name compiles");
        assert_eq!(p.vertex(), "default_vertex");
        assert_eq!(p.fragment(), "sobel");
        assert_eq!(p.params(), ParamKind::Filter);
    }

    #[test]
    fn test_param_kind_comes_from_fragment_module() {
        let mut cache = cache(CountingCompiler::new());
        assert_eq!(cache.get("yuv_rgb").map(|p| p.params()).ok(), Some(ParamKind::Color));
        assert_eq!(cache.get("blur_y").map(|p| p.params()).ok(), Some(ParamKind::Blur));
    }

    #[test]
    fn test_failure_is_reported_and_not_cached_as_pipeline() {
        let mut cache = cache(CountingCompiler::failing(&["comic"]));
        assert!(matches!(
            cache.get("comic"),
            Err(PipelineError::Validation { .. })
        ));
        assert!(!cache.contains("comic", TARGET_FORMAT));
        assert!(cache.has_failed("comic", TARGET_FORMAT));
        assert!(matches!(
            cache.get("no_such_shader"),
            Err(PipelineError::MissingEntryPoint { stage: "fragment", .. })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failed_pipeline_is_not_recompiled() {
        let mut cache = cache(CountingCompiler::failing(&["invert"]));
        let format = wgpu::TextureFormat::Rgba8Unorm;
        for _ in 0..60 {
            assert!(cache.get_with_format("invert", format).is_err());
        }
        assert_eq!(cache.compiler().attempts, 1);

        assert!(cache.get("invert").is_err());
        assert_eq!(cache.compiler().attempts, 2);
        assert!(cache.has_failed("invert", format));
        assert!(cache.has_failed("invert", TARGET_FORMAT));
    }
}
