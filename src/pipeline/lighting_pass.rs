//! Deferred lighting pass
//!
//! Resolves the G-buffer into `scene_color` with a fullscreen triangle,
//! accumulating every point light plus ambient light from the camera's
//! environment map.

use crate::backend::command::{DescriptorResource, DescriptorSet};
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::RenderResult;
use crate::pipeline::per_frame::upload_non_empty;
use crate::pipeline::{
    PassAttachments, PassContext, RenderPass, ALBEDO_AO, DEPTH, METALLIC_ROUGHNESS, NORMAL,
    SCENE_COLOR,
};
use crate::render_graph::{ClearValue, GraphPass, LoadOp};
use crate::scene::GpuPointLight;
use crate::shader::{BindingInfo, GraphicsPipeline, GraphicsPipelineBuilder, ShaderLibrary};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Format of `scene_color`
pub const HDR_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

/// Uniform block read by the lighting shader
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuLightingData {
    /// Reconstructs world positions from depth
    pub inverse_projection_view: Mat4,
    pub camera_position: Vec4,
    pub light_count: u32,
    pub _padding: [u32; 3],
}

struct LightingBindings {
    lighting: BindingInfo,
    lights: BindingInfo,
    albedo_ao: BindingInfo,
    metallic_roughness: BindingInfo,
    normal: BindingInfo,
    depth: BindingInfo,
    environment: BindingInfo,
    environment_sampler: BindingInfo,
}

impl LightingBindings {
    fn resolve(pipeline: &GraphicsPipeline) -> RenderResult<Self> {
        Ok(Self {
            lighting: pipeline.binding("lighting")?,
            lights: pipeline.binding("lights")?,
            albedo_ao: pipeline.binding("albedo_ao_texture")?,
            metallic_roughness: pipeline.binding("metallic_roughness_texture")?,
            normal: pipeline.binding("normal_texture")?,
            depth: pipeline.binding("depth_texture")?,
            environment: pipeline.binding("environment")?,
            environment_sampler: pipeline.binding("environment_sampler")?,
        })
    }
}

pub struct LightingPass {
    pipeline: GraphicsPipeline,
    bindings: LightingBindings,
    sampler: SamplerHandle,
}

impl LightingPass {
    pub fn new<B: GraphicsBackend>(
        backend: &mut B,
        shaders: &mut ShaderLibrary,
    ) -> RenderResult<Self> {
        let pipeline = GraphicsPipelineBuilder::new("lighting")
            .vertex_shader("fullscreen")
            .color_target(HDR_FORMAT)
            .build(backend, shaders)?;
        let bindings = LightingBindings::resolve(&pipeline)?;
        let sampler = backend.create_sampler(&SamplerDescriptor {
            label: Some("environment_sampler".to_string()),
            ..Default::default()
        })?;

        Ok(Self {
            pipeline,
            bindings,
            sampler,
        })
    }

    pub fn pipeline(&self) -> &GraphicsPipeline {
        &self.pipeline
    }
}

impl RenderPass for LightingPass {
    fn name(&self) -> &str {
        "lighting"
    }

    fn build(
        &mut self,
        ctx: &mut PassContext<'_>,
        inputs: &PassAttachments,
    ) -> RenderResult<PassAttachments> {
        let name = self.name();
        let scene_color = inputs.require(name, SCENE_COLOR)?;
        let albedo_ao = inputs.require(name, ALBEDO_AO)?;
        let metallic_roughness = inputs.require(name, METALLIC_ROUGHNESS)?;
        let normal = inputs.require(name, NORMAL)?;
        let depth = inputs.require(name, DEPTH)?;
        let outputs = PassAttachments::new().with(SCENE_COLOR, scene_color.clone());

        let mut pass = GraphPass::new(name);
        pass.sample(&albedo_ao)
            .sample(&metallic_roughness)
            .sample(&normal)
            .sample(&depth)
            .write(&scene_color, LoadOp::Clear(ClearValue::Color([0.0, 0.0, 0.0, 1.0])));

        let cmd = pass.commands_mut();
        cmd.auto_viewport_scissor(scene_color.extent());

        let environment = ctx.assets.get(ctx.database.environment_map());
        let Some(environment) = environment.filter(|_| !ctx.database.draws().is_empty()) else {
            ctx.graph.add_pass(pass);
            return Ok(outputs);
        };

        let camera = ctx.database.camera();
        let lights: Vec<GpuPointLight> = ctx
            .database
            .point_lights()
            .iter()
            .map(|light| light.gpu_data())
            .collect();
        let lighting = ctx.scratch.upload(&[GpuLightingData {
            inverse_projection_view: camera.projection_view.inverse(),
            camera_position: camera.position.extend(1.0),
            light_count: lights.len() as u32,
            _padding: [0; 3],
        }])?;
        let lights = upload_non_empty(ctx.scratch, &lights)?;

        let b = &self.bindings;
        let set = DescriptorSet::new()
            .with(&b.lighting, DescriptorResource::Buffer(lighting))
            .with(&b.lights, DescriptorResource::Buffer(lights))
            .with(&b.albedo_ao, DescriptorResource::Texture(albedo_ao.view()))
            .with(
                &b.metallic_roughness,
                DescriptorResource::Texture(metallic_roughness.view()),
            )
            .with(&b.normal, DescriptorResource::Texture(normal.view()))
            .with(&b.depth, DescriptorResource::Texture(depth.view()))
            .with(&b.environment, DescriptorResource::Texture(environment.view))
            .with(&b.environment_sampler, DescriptorResource::Sampler(self.sampler));

        cmd.bind_pipeline(self.pipeline.handle());
        cmd.bind_descriptor_set(set.group(), set);
        cmd.draw(0..3, 0..1);

        ctx.graph.add_pass(pass);
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lighting_block_size() {
        assert_eq!(std::mem::size_of::<GpuLightingData>(), 96);
    }
}
