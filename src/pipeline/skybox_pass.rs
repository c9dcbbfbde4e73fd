//! Skybox pass
//!
//! Draws the environment cube map on every pixel the geometry pass left at
//! the far plane, on top of the lit `scene_color`.

use crate::backend::command::{DescriptorResource, DescriptorSet};
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::RenderResult;
use crate::pipeline::lighting_pass::HDR_FORMAT;
use crate::pipeline::{PassAttachments, PassContext, RenderPass, DEPTH, SCENE_COLOR};
use crate::render_graph::{GraphPass, LoadOp};
use crate::shader::{BindingInfo, GraphicsPipeline, GraphicsPipelineBuilder, ShaderLibrary};
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

/// Uniform block read by the skybox shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuSkyboxData {
    /// Maps clip space back to a world-space view direction
    pub inverse_projection_rotation: Mat4,
}

impl GpuSkyboxData {
    /// Build the block from the camera matrices; translation is dropped so the
    /// sky stays at infinity.
    pub fn new(projection: Mat4, view: Mat4) -> Self {
        let rotation = Mat4::from_mat3(Mat3::from_mat4(view));
        Self {
            inverse_projection_rotation: (projection * rotation).inverse(),
        }
    }
}

pub struct SkyboxPass {
    pipeline: GraphicsPipeline,
    skybox: BindingInfo,
    environment: BindingInfo,
    environment_sampler: BindingInfo,
    sampler: SamplerHandle,
}

impl SkyboxPass {
    pub fn new<B: GraphicsBackend>(
        backend: &mut B,
        shaders: &mut ShaderLibrary,
    ) -> RenderResult<Self> {
        let pipeline = GraphicsPipelineBuilder::new("skybox")
            .color_target(HDR_FORMAT)
            .depth(TextureFormat::Depth32Float, false, CompareFunction::LessEqual)
            .build(backend, shaders)?;
        let sampler = backend.create_sampler(&SamplerDescriptor {
            label: Some("skybox_sampler".to_string()),
            ..Default::default()
        })?;

        Ok(Self {
            skybox: pipeline.binding("skybox")?,
            environment: pipeline.binding("environment")?,
            environment_sampler: pipeline.binding("environment_sampler")?,
            pipeline,
            sampler,
        })
    }

    pub fn pipeline(&self) -> &GraphicsPipeline {
        &self.pipeline
    }
}

impl RenderPass for SkyboxPass {
    fn name(&self) -> &str {
        "skybox"
    }

    fn build(
        &mut self,
        ctx: &mut PassContext<'_>,
        inputs: &PassAttachments,
    ) -> RenderResult<PassAttachments> {
        let scene_color = inputs.require(self.name(), SCENE_COLOR)?;
        let depth = inputs.require(self.name(), DEPTH)?;
        let outputs = PassAttachments::new().with(SCENE_COLOR, scene_color.clone());

        let mut pass = GraphPass::new(self.name());
        pass.depth_test(&depth).write(&scene_color, LoadOp::Load);

        let cmd = pass.commands_mut();
        cmd.auto_viewport_scissor(scene_color.extent());

        let Some(environment) = ctx.assets.get(ctx.database.environment_map()) else {
            ctx.graph.add_pass(pass);
            return Ok(outputs);
        };

        let camera = ctx.database.camera();
        let skybox = ctx
            .scratch
            .upload(&[GpuSkyboxData::new(camera.projection, camera.view)])?;

        let set = DescriptorSet::new()
            .with(&self.skybox, DescriptorResource::Buffer(skybox))
            .with(&self.environment, DescriptorResource::Texture(environment.view))
            .with(&self.environment_sampler, DescriptorResource::Sampler(self.sampler));

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
    use crate::scene::Camera;
    use glam::{Vec3, Vec4};

    #[test]
    fn test_skybox_ignores_camera_translation() {
        let camera = Camera::perspective_degrees(60.0);
        let projection = camera.projection(1.0, 0.1, 100.0);

        let at_origin = GpuSkyboxData::new(projection, camera.view(Vec3::ZERO));
        let moved = GpuSkyboxData::new(projection, camera.view(Vec3::new(3.0, -2.0, 8.0)));
        assert!(at_origin
            .inverse_projection_rotation
            .abs_diff_eq(moved.inverse_projection_rotation, 1e-5));
    }

    #[test]
    fn test_center_of_screen_looks_forward() {
        let camera = Camera::perspective_degrees(60.0);
        let data = GpuSkyboxData::new(camera.projection(1.0, 0.1, 100.0), camera.view(Vec3::ZERO));

        let far = data.inverse_projection_rotation * Vec4::new(0.0, 0.0, 1.0, 1.0);
        let direction = (far.truncate() / far.w).normalize();
        assert!(direction.abs_diff_eq(camera.front, 1e-3));
    }
}
