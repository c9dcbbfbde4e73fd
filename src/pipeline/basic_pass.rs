//! Single forward pass drawing every mesh straight into `color_final`

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::RenderResult;
use crate::pipeline::draw_list::record_mesh_draws;
use crate::pipeline::per_frame::MeshBindings;
use crate::pipeline::{PassAttachments, PassContext, RenderPass, COLOR_FINAL, DEPTH};
use crate::render_graph::{ClearValue, GraphPass, LoadOp};
use crate::resources::Attachment;
use crate::shader::{GraphicsPipeline, GraphicsPipelineBuilder, ShaderLibrary};
use crate::RendererConfig;
use std::sync::Arc;

pub const COLOR_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Forward pass with one pipeline, one color target and depth testing
pub struct BasicPass {
    pipeline: GraphicsPipeline,
    bindings: MeshBindings,
    color: Arc<Attachment>,
    depth: Arc<Attachment>,
}

impl BasicPass {
    pub fn new<B: GraphicsBackend>(
        backend: &mut B,
        shaders: &mut ShaderLibrary,
        config: &RendererConfig,
    ) -> RenderResult<Self> {
        let extent = config.render_extent();
        let color = backend.add_color_attachment(COLOR_FINAL, extent, COLOR_FORMAT)?;
        let depth = backend.add_depth_attachment(DEPTH, extent)?;

        let pipeline = GraphicsPipelineBuilder::new("basic")
            .vertex_layout(Vertex::layout())
            .color_target(COLOR_FORMAT)
            .depth(DEPTH_FORMAT, true, CompareFunction::Less)
            .build(backend, shaders)?;
        let bindings = MeshBindings::resolve(&pipeline)?;

        Ok(Self {
            pipeline,
            bindings,
            color,
            depth,
        })
    }

    pub fn pipeline(&self) -> &GraphicsPipeline {
        &self.pipeline
    }
}

impl RenderPass for BasicPass {
    fn name(&self) -> &str {
        "basic"
    }

    fn build(
        &mut self,
        ctx: &mut PassContext<'_>,
        _inputs: &PassAttachments,
    ) -> RenderResult<PassAttachments> {
        let outputs = PassAttachments::new()
            .with(COLOR_FINAL, self.color.clone())
            .with(DEPTH, self.depth.clone());

        let mut pass = GraphPass::new(self.name());
        pass.write(
            &self.color,
            LoadOp::Clear(ClearValue::Color([0.0, 0.0, 0.0, 1.0])),
        )
        .write(
            &self.depth,
            LoadOp::Clear(ClearValue::DepthStencil {
                depth: 1.0,
                stencil: 0,
            }),
        );

        // Dynamic state has to be set even when nothing is drawn
        let cmd = pass.commands_mut();
        cmd.auto_viewport_scissor(self.color.extent());

        if ctx.database.draws().is_empty() {
            ctx.graph.add_pass(pass);
            return Ok(outputs);
        }

        let set = self.bindings.descriptor_set(ctx.scratch, ctx.database)?;
        cmd.bind_pipeline(self.pipeline.handle());
        cmd.bind_descriptor_set(set.group(), set);

        let recorded = record_mesh_draws(
            cmd,
            ctx.database,
            ctx.assets,
            self.pipeline.reflection().push_constant_stages(),
            |index, _| index as u32,
        );
        log::trace!(
            "basic: recorded {recorded} of {} draws",
            ctx.database.draw_count()
        );

        ctx.graph.add_pass(pass);
        Ok(outputs)
    }
}
