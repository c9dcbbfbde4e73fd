//! G-Buffer geometry pass
//!
//! Renders scene geometry to the G-buffer textures:
//! - `albedo_ao`: base color (RGB) + ambient occlusion (A)
//! - `metallic_roughness`: metallic (R) + roughness (G)
//! - `normal`: world-space normal (RGB)
//! - `depth`: 32-bit depth

use crate::backend::command::DescriptorResource;
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::RenderResult;
use crate::pipeline::draw_list::record_mesh_draws;
use crate::pipeline::per_frame::MeshBindings;
use crate::pipeline::{
    PassAttachments, PassContext, RenderPass, ALBEDO_AO, DEPTH, METALLIC_ROUGHNESS, NORMAL,
};
use crate::render_graph::{ClearValue, GraphPass, LoadOp};
use crate::resources::{Attachment, GpuMaterialData, Material};
use crate::shader::{BindingInfo, GraphicsPipeline, GraphicsPipelineBuilder, ShaderLibrary};
use crate::RendererConfig;
use bytemuck::{Pod, Zeroable};
use std::sync::Arc;

/// G-buffer formats
pub mod formats {
    use crate::backend::types::TextureFormat;

    pub const ALBEDO_AO: TextureFormat = TextureFormat::Rgba8Unorm;
    pub const METALLIC_ROUGHNESS: TextureFormat = TextureFormat::Rgba8Unorm;
    pub const NORMAL: TextureFormat = TextureFormat::Rgba16Float;
    pub const DEPTH: TextureFormat = TextureFormat::Depth32Float;
}

/// Per-draw push constant block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct GeometryPushConstants {
    pub transform_index: u32,
    /// Index into the material array; 0 is the default material
    pub material_index: u32,
}

struct GBuffer {
    depth: Arc<Attachment>,
    albedo_ao: Arc<Attachment>,
    metallic_roughness: Arc<Attachment>,
    normal: Arc<Attachment>,
}

pub struct GeometryPass {
    pipeline: GraphicsPipeline,
    bindings: MeshBindings,
    materials_binding: BindingInfo,
    gbuffer: GBuffer,
}

impl GeometryPass {
    pub fn new<B: GraphicsBackend>(
        backend: &mut B,
        shaders: &mut ShaderLibrary,
        config: &RendererConfig,
    ) -> RenderResult<Self> {
        let extent = config.render_extent();
        let gbuffer = GBuffer {
            depth: backend.add_depth_attachment(DEPTH, extent)?,
            albedo_ao: backend.add_color_attachment(ALBEDO_AO, extent, formats::ALBEDO_AO)?,
            metallic_roughness: backend.add_color_attachment(
                METALLIC_ROUGHNESS,
                extent,
                formats::METALLIC_ROUGHNESS,
            )?,
            normal: backend.add_color_attachment(NORMAL, extent, formats::NORMAL)?,
        };

        let pipeline = GraphicsPipelineBuilder::new("geometry")
            .vertex_layout(Vertex::layout())
            .color_target(formats::ALBEDO_AO)
            .color_target(formats::METALLIC_ROUGHNESS)
            .color_target(formats::NORMAL)
            .depth(formats::DEPTH, true, CompareFunction::Less)
            .cull_mode(CullMode::Back)
            .build(backend, shaders)?;
        let bindings = MeshBindings::resolve(&pipeline)?;
        let materials_binding = pipeline.binding("materials")?;

        Ok(Self {
            pipeline,
            bindings,
            materials_binding,
            gbuffer,
        })
    }

    pub fn pipeline(&self) -> &GraphicsPipeline {
        &self.pipeline
    }

    fn outputs(&self) -> PassAttachments {
        PassAttachments::new()
            .with(DEPTH, self.gbuffer.depth.clone())
            .with(ALBEDO_AO, self.gbuffer.albedo_ao.clone())
            .with(METALLIC_ROUGHNESS, self.gbuffer.metallic_roughness.clone())
            .with(NORMAL, self.gbuffer.normal.clone())
    }
}

/// Default material followed by the frame's material set
fn collect_materials(ctx: &PassContext<'_>) -> Vec<GpuMaterialData> {
    let fallback = Material::default().gpu_data();
    std::iter::once(fallback)
        .chain(ctx.database.materials().iter().map(|handle| {
            ctx.assets
                .get(*handle)
                .map_or(fallback, |material| material.gpu_data())
        }))
        .collect()
}

impl RenderPass for GeometryPass {
    fn name(&self) -> &str {
        "geometry"
    }

    fn build(
        &mut self,
        ctx: &mut PassContext<'_>,
        _inputs: &PassAttachments,
    ) -> RenderResult<PassAttachments> {
        let clear_black = LoadOp::Clear(ClearValue::Color([0.0, 0.0, 0.0, 0.0]));

        let mut pass = GraphPass::new(self.name());
        pass.write(
            &self.gbuffer.depth,
            LoadOp::Clear(ClearValue::DepthStencil {
                depth: 1.0,
                stencil: 0,
            }),
        )
        .write(&self.gbuffer.albedo_ao, clear_black)
        .write(&self.gbuffer.metallic_roughness, clear_black)
        .write(&self.gbuffer.normal, clear_black);

        let cmd = pass.commands_mut();
        cmd.auto_viewport_scissor(self.gbuffer.albedo_ao.extent());

        if ctx.database.draws().is_empty() {
            ctx.graph.add_pass(pass);
            return Ok(self.outputs());
        }

        let materials = collect_materials(ctx);
        let materials = ctx.scratch.upload(&materials)?;
        let set = self
            .bindings
            .descriptor_set(ctx.scratch, ctx.database)?
            .with(&self.materials_binding, DescriptorResource::Buffer(materials));
        cmd.bind_pipeline(self.pipeline.handle());
        cmd.bind_descriptor_set(set.group(), set);

        let database = ctx.database;
        record_mesh_draws(
            cmd,
            database,
            ctx.assets,
            self.pipeline.reflection().push_constant_stages(),
            |index, draw| GeometryPushConstants {
                transform_index: index as u32,
                material_index: database
                    .material_index(draw.material)
                    .map_or(0, |i| i as u32 + 1),
            },
        );

        ctx.graph.add_pass(pass);
        Ok(self.outputs())
    }
}
