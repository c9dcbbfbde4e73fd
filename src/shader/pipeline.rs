//! Graphics pipeline assembly

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{RenderError, RenderResult};
use crate::shader::{BindingInfo, ShaderLibrary, ShaderReflection};

/// A created pipeline together with the reflected bindings of both stages
#[derive(Debug, Clone)]
pub struct GraphicsPipeline {
    name: String,
    handle: RenderPipelineHandle,
    reflection: ShaderReflection,
}

impl GraphicsPipeline {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> RenderPipelineHandle {
        self.handle
    }

    pub fn reflection(&self) -> &ShaderReflection {
        &self.reflection
    }

    /// Resolve a binding by name. A missing binding means the shader and the
    /// pass disagree, which is a construction error.
    pub fn binding(&self, name: &str) -> RenderResult<BindingInfo> {
        self.reflection
            .binding(name)
            .cloned()
            .ok_or_else(|| RenderError::MissingBinding {
                pipeline: self.name.clone(),
                name: name.to_string(),
            })
    }
}

/// Builder for graphics pipelines with viewport and scissor left dynamic
pub struct GraphicsPipelineBuilder {
    name: String,
    vertex_shader: String,
    fragment_shader: String,
    vertex_layouts: Vec<VertexBufferLayout>,
    color_targets: Vec<ColorTargetState>,
    depth_stencil: Option<DepthStencilState>,
    cull_mode: CullMode,
}

impl GraphicsPipelineBuilder {
    /// Both stages default to shaders named after the pipeline
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vertex_shader: name.to_string(),
            fragment_shader: name.to_string(),
            vertex_layouts: Vec::new(),
            color_targets: Vec::new(),
            depth_stencil: None,
            cull_mode: CullMode::None,
        }
    }

    pub fn vertex_shader(mut self, name: &str) -> Self {
        self.vertex_shader = name.to_string();
        self
    }

    pub fn fragment_shader(mut self, name: &str) -> Self {
        self.fragment_shader = name.to_string();
        self
    }

    pub fn vertex_layout(mut self, layout: VertexBufferLayout) -> Self {
        self.vertex_layouts.push(layout);
        self
    }

    /// Color target with all channels written
    pub fn color_target(mut self, format: TextureFormat) -> Self {
        self.color_targets.push(ColorTargetState {
            format,
            write_mask: ColorWrites::ALL,
        });
        self
    }

    pub fn depth(
        mut self,
        format: TextureFormat,
        depth_write_enabled: bool,
        depth_compare: CompareFunction,
    ) -> Self {
        self.depth_stencil = Some(DepthStencilState {
            format,
            depth_test_enabled: true,
            depth_write_enabled,
            depth_compare,
        });
        self
    }

    pub fn cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn build<B: GraphicsBackend>(
        self,
        backend: &mut B,
        shaders: &mut ShaderLibrary,
    ) -> RenderResult<GraphicsPipeline> {
        let vertex_shader = shaders.load(&self.vertex_shader, ShaderStage::Vertex)?;
        let fragment_shader = shaders.load(&self.fragment_shader, ShaderStage::Fragment)?;

        let mut reflection = vertex_shader.reflection.clone();
        reflection.merge(&fragment_shader.reflection);

        let push_constant_ranges = if reflection.push_constant_size() > 0 {
            vec![PushConstantRange {
                stages: reflection.push_constant_stages(),
                offset: 0,
                size: reflection.push_constant_size(),
            }]
        } else {
            Vec::new()
        };

        let desc = RenderPipelineDescriptor {
            label: Some(self.name.clone()),
            vertex_shader,
            fragment_shader,
            vertex_layouts: self.vertex_layouts,
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: self.cull_mode,
            depth_stencil: self.depth_stencil,
            color_targets: self.color_targets,
            dynamic_states: vec![DynamicState::Viewport, DynamicState::Scissor],
            push_constant_ranges,
        };

        let handle = backend.create_render_pipeline(&desc)?;
        log::info!("Created pipeline '{}'", self.name);

        Ok(GraphicsPipeline {
            name: self.name,
            handle,
            reflection,
        })
    }
}
