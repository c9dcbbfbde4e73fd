//! Tonemapping post-processing

use crate::backend::command::{DescriptorResource, DescriptorSet};
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::RenderResult;
use crate::pipeline::{
    PassAttachments, PassContext, RenderPass, SCENE_COLOR, SCENE_COLOR_TONEMAPPED,
};
use crate::render_graph::{ClearValue, GraphPass, LoadOp};
use crate::shader::{BindingInfo, GraphicsPipeline, GraphicsPipelineBuilder, ShaderLibrary};
use bytemuck::{Pod, Zeroable};

/// Format of `scene_color_tonemapped`
pub const LDR_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// Tonemapping operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TonemapOperator {
    Reinhard,
    #[default]
    Aces,
}

impl TonemapOperator {
    /// Selector value the shader switches on
    pub fn shader_index(&self) -> u32 {
        match self {
            TonemapOperator::Reinhard => 0,
            TonemapOperator::Aces => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TonemapSettings {
    pub operator: TonemapOperator,
    pub exposure: f32,
    pub gamma: f32,
}

impl Default for TonemapSettings {
    fn default() -> Self {
        Self {
            operator: TonemapOperator::Aces,
            exposure: 1.0,
            gamma: 2.2,
        }
    }
}

/// Uniform block read by the tonemap shader
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuTonemapParams {
    pub exposure: f32,
    pub gamma: f32,
    pub operator: u32,
    pub _padding: u32,
}

impl From<TonemapSettings> for GpuTonemapParams {
    fn from(settings: TonemapSettings) -> Self {
        Self {
            exposure: settings.exposure,
            gamma: settings.gamma,
            operator: settings.operator.shader_index(),
            _padding: 0,
        }
    }
}

/// Maps HDR `scene_color` into LDR `scene_color_tonemapped`. Runs every
/// frame, drawn or not, so the final attachment always has fresh contents.
pub struct TonemapPass {
    pub settings: TonemapSettings,
    pipeline: GraphicsPipeline,
    params: BindingInfo,
    hdr: BindingInfo,
    hdr_sampler: BindingInfo,
    sampler: SamplerHandle,
}

impl TonemapPass {
    pub fn new<B: GraphicsBackend>(
        backend: &mut B,
        shaders: &mut ShaderLibrary,
        settings: TonemapSettings,
    ) -> RenderResult<Self> {
        let pipeline = GraphicsPipelineBuilder::new("tonemap")
            .vertex_shader("fullscreen")
            .color_target(LDR_FORMAT)
            .build(backend, shaders)?;
        let sampler = backend.create_sampler(&SamplerDescriptor {
            label: Some("hdr_sampler".to_string()),
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Nearest,
            ..Default::default()
        })?;

        Ok(Self {
            settings,
            params: pipeline.binding("tonemap")?,
            hdr: pipeline.binding("hdr")?,
            hdr_sampler: pipeline.binding("hdr_sampler")?,
            pipeline,
            sampler,
        })
    }

    pub fn pipeline(&self) -> &GraphicsPipeline {
        &self.pipeline
    }
}

impl RenderPass for TonemapPass {
    fn name(&self) -> &str {
        "tonemap"
    }

    fn build(
        &mut self,
        ctx: &mut PassContext<'_>,
        inputs: &PassAttachments,
    ) -> RenderResult<PassAttachments> {
        let hdr = inputs.require(self.name(), SCENE_COLOR)?;
        let ldr = inputs.require(self.name(), SCENE_COLOR_TONEMAPPED)?;

        let mut pass = GraphPass::new(self.name());
        pass.sample(&hdr)
            .write(&ldr, LoadOp::Clear(ClearValue::Color([0.0, 0.0, 0.0, 1.0])));

        let params = ctx
            .scratch
            .upload(&[GpuTonemapParams::from(self.settings)])?;
        let set = DescriptorSet::new()
            .with(&self.params, DescriptorResource::Buffer(params))
            .with(&self.hdr, DescriptorResource::Texture(hdr.view()))
            .with(&self.hdr_sampler, DescriptorResource::Sampler(self.sampler));

        let cmd = pass.commands_mut();
        cmd.auto_viewport_scissor(ldr.extent());
        cmd.bind_pipeline(self.pipeline.handle());
        cmd.bind_descriptor_set(set.group(), set);
        cmd.draw(0..3, 0..1);

        ctx.graph.add_pass(pass);
        Ok(PassAttachments::new().with(SCENE_COLOR_TONEMAPPED, ldr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_settings() {
        let params = GpuTonemapParams::from(TonemapSettings {
            operator: TonemapOperator::Reinhard,
            exposure: 1.5,
            gamma: 2.4,
        });
        assert_eq!(params.operator, 0);
        assert_eq!(params.exposure, 1.5);
        assert_eq!(params.gamma, 2.4);
        assert_eq!(std::mem::size_of::<GpuTonemapParams>(), 16);
    }

    #[test]
    fn test_default_settings() {
        let settings = TonemapSettings::default();
        assert_eq!(settings.operator, TonemapOperator::Aces);
        assert_eq!(settings.exposure, 1.0);
        assert_eq!(settings.gamma, 2.2);
    }
}
