//! Render pipeline management
//!
//! Pipelines are registered as [`PipelineConfig`]s against a named shader and
//! created lazily the first time they are requested, or all at once through
//! [`PipelineManager::create_all_pipelines`].

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use crate::gfx::scene::vertex::Vertex3D;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("shader '{0}' not loaded")]
    MissingShader(String),

    #[error("pipeline '{0}' not registered")]
    Unregistered(String),
}

/// Everything needed to build one render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    pub depth_format: Option<TextureFormat>,
    pub depth_write: bool,
    pub sample_count: u32,
    pub color_targets: Vec<Option<ColorTargetState>>,
    /// Fullscreen passes generate their vertices in the shader
    pub no_vertex_buffers: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            shader: "showcase".to_string(),
            bind_group_layouts: Vec::new(),
            primitive_topology: PrimitiveTopology::TriangleList,
            cull_mode: Some(Face::Back),
            depth_format: None,
            depth_write: true,
            sample_count: 1,
            color_targets: vec![Some(ColorTargetState {
                format: TextureFormat::Bgra8Unorm,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            no_vertex_buffers: false,
        }
    }
}

impl PipelineConfig {
    pub fn default_with_shader(shader: &str) -> Self {
        Self {
            shader: shader.to_string(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    /// Enables depth testing against a target of `format`
    pub fn with_depth(mut self, format: TextureFormat, write: bool) -> Self {
        self.depth_format = Some(format);
        self.depth_write = write;
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count.max(1);
        self
    }

    /// Single color target with the given blend mode
    pub fn with_color_target(mut self, format: TextureFormat, blend: Option<BlendState>) -> Self {
        self.color_targets = vec![Some(ColorTargetState {
            format,
            blend,
            write_mask: ColorWrites::ALL,
        })];
        self
    }

    pub fn with_primitive_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.primitive_topology = topology;
        self
    }

    pub fn with_no_vertex_buffers(mut self) -> Self {
        self.no_vertex_buffers = true;
        self
    }

    fn depth_stencil(&self) -> Option<DepthStencilState> {
        self.depth_format.map(|format| DepthStencilState {
            format,
            depth_write_enabled: self.depth_write,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        })
    }

    fn multisample(&self) -> MultisampleState {
        MultisampleState {
            count: self.sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        }
    }
}

/// Caches shader modules and the pipelines built from them
pub struct PipelineManager {
    device: Arc<Device>,
    pipelines: HashMap<String, RenderPipeline>,
    pipeline_configs: HashMap<String, PipelineConfig>,
    shader_modules: HashMap<String, ShaderModule>,
    pending_pipelines: Vec<String>,
}

impl PipelineManager {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            pipelines: HashMap::new(),
            pipeline_configs: HashMap::new(),
            shader_modules: HashMap::new(),
            pending_pipelines: Vec::new(),
        }
    }

    /// Registers a configuration; the pipeline is built on first use
    pub fn register_pipeline(&mut self, name: &str, config: PipelineConfig) {
        self.pipeline_configs.insert(name.to_string(), config);
        self.pipelines.remove(name);
        self.pending_pipelines.push(name.to_string());
    }

    pub fn load_shader(&mut self, name: &str, source: &str) {
        let shader_module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });
        self.shader_modules.insert(name.to_string(), shader_module);
    }

    /// Returns the pipeline, creating it from its configuration if needed
    pub fn get_pipeline(&mut self, name: &str) -> Option<&RenderPipeline> {
        if !self.pipelines.contains_key(name) {
            if let Err(e) = self.build(name) {
                log::error!("Failed to create pipeline '{}': {}", name, e);
                return None;
            }
        }
        self.pipelines.get(name)
    }

    /// Builds every pending pipeline, collecting the failures
    pub fn create_all_pipelines(&mut self) -> Result<(), Vec<PipelineError>> {
        let errors: Vec<PipelineError> = self
            .pending_pipelines
            .clone()
            .iter()
            .filter_map(|name| self.build(name).err())
            .collect();

        if errors.is_empty() {
            log::debug!("Created {} pipelines", self.pipelines.len());
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn build(&mut self, name: &str) -> Result<(), PipelineError> {
        let config = self
            .pipeline_configs
            .get(name)
            .ok_or_else(|| PipelineError::Unregistered(name.to_string()))?;
        let pipeline = self.create_pipeline_from_config(name, config)?;
        self.pipelines.insert(name.to_string(), pipeline);
        self.pending_pipelines.retain(|n| n != name);
        Ok(())
    }

    fn create_pipeline_from_config(
        &self,
        name: &str,
        config: &PipelineConfig,
    ) -> Result<RenderPipeline, PipelineError> {
        let shader = self
            .shader_modules
            .get(&config.shader)
            .ok_or_else(|| PipelineError::MissingShader(config.shader.clone()))?;

        let bind_group_layout_refs: Vec<&BindGroupLayout> =
            config.bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", name)),
                bind_group_layouts: &bind_group_layout_refs,
                push_constant_ranges: &[],
            });

        let vertex_buffers: &[VertexBufferLayout] = if config.no_vertex_buffers {
            &[]
        } else {
            &[Vertex3D::desc()]
        };

        Ok(self
            .device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: vertex_buffers,
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: &config.color_targets,
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: PrimitiveState {
                    topology: config.primitive_topology,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: config.depth_stencil(),
                multisample: config.multisample(),
                multiview: None,
                cache: None,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translucent_config_disables_depth_write() {
        let config = PipelineConfig::default_with_shader("showcase")
            .with_depth(TextureFormat::Depth32Float, false)
            .with_sample_count(4);
        let depth = config.depth_stencil().unwrap();
        assert!(!depth.depth_write_enabled);
        assert_eq!(depth.format, TextureFormat::Depth32Float);
        assert_eq!(config.multisample().count, 4);
    }

    #[test]
    fn test_blit_config_has_no_depth() {
        let config = PipelineConfig::default_with_shader("blit")
            .with_no_vertex_buffers()
            .with_sample_count(0);
        assert!(config.depth_stencil().is_none());
        assert_eq!(config.sample_count, 1);
        assert!(config.no_vertex_buffers);
    }
}
