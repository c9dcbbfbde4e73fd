//! Render passes and the pass chains built from them
//!
//! The deferred chain runs, in order:
//! 1. Geometry pass - Renders meshes into the G-buffer
//! 2. Lighting pass - Fullscreen pass resolving the G-buffer into `scene_color`
//! 3. Skybox pass - Fills background pixels of `scene_color` from the environment map
//! 4. Tonemap pass - Maps `scene_color` into the LDR `scene_color_tonemapped`
//!
//! The basic chain is a single forward pass writing `color_final`.
//!
//! Every pass follows the same contract: given the named attachments produced
//! so far, it declares a graph pass, records its commands and returns the
//! attachments it produced for later passes.

pub mod basic_pass;
pub mod draw_list;
pub mod geometry_pass;
pub mod lighting_pass;
pub mod per_frame;
pub mod postprocess;
pub mod skybox_pass;

pub use basic_pass::BasicPass;
pub use geometry_pass::GeometryPass;
pub use lighting_pass::LightingPass;
pub use postprocess::{TonemapOperator, TonemapPass, TonemapSettings};
pub use skybox_pass::SkyboxPass;

use crate::backend::traits::GraphicsBackend;
use crate::backend::types::FrameInfo;
use crate::database::RenderDatabase;
use crate::error::{RenderError, RenderResult};
use crate::render_graph::RenderGraph;
use crate::resources::{Assets, Attachment, ScratchArena};
use crate::shader::ShaderLibrary;
use crate::RendererConfig;
use std::collections::BTreeMap;
use std::sync::Arc;

/// HDR color the lighting and skybox passes accumulate into
pub const SCENE_COLOR: &str = "scene_color";
/// LDR output of the deferred chain
pub const SCENE_COLOR_TONEMAPPED: &str = "scene_color_tonemapped";
/// Output of the basic chain
pub const COLOR_FINAL: &str = "color_final";
pub const DEPTH: &str = "depth";
pub const ALBEDO_AO: &str = "albedo_ao";
pub const METALLIC_ROUGHNESS: &str = "metallic_roughness";
pub const NORMAL: &str = "normal";

/// Which pass chain a renderer runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineKind {
    #[default]
    Deferred,
    Basic,
}

impl PipelineKind {
    /// Attachment holding the finished frame
    pub fn final_attachment(&self) -> &'static str {
        match self {
            PipelineKind::Deferred => SCENE_COLOR_TONEMAPPED,
            PipelineKind::Basic => COLOR_FINAL,
        }
    }
}

/// Named attachments flowing from pass to pass
#[derive(Debug, Clone, Default)]
pub struct PassAttachments {
    attachments: BTreeMap<String, Arc<Attachment>>,
}

impl PassAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, attachment: Arc<Attachment>) -> Self {
        self.insert(name, attachment);
        self
    }

    pub fn insert(&mut self, name: &str, attachment: Arc<Attachment>) {
        self.attachments.insert(name.to_string(), attachment);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Attachment>> {
        self.attachments.get(name)
    }

    /// Look up an attachment `pass` cannot run without
    pub fn require(&self, pass: &str, name: &str) -> RenderResult<Arc<Attachment>> {
        self.attachments
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::MissingAttachment {
                pass: pass.to_string(),
                name: name.to_string(),
            })
    }

    /// Merge `other` in; later producers replace earlier entries of the same name
    pub fn extend(&mut self, other: PassAttachments) {
        self.attachments.extend(other.attachments);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attachments.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}

/// Everything a pass needs while building its part of a frame
pub struct PassContext<'a> {
    pub frame: &'a FrameInfo,
    pub graph: &'a mut RenderGraph,
    pub database: &'a RenderDatabase,
    pub assets: &'a Assets,
    pub scratch: &'a mut ScratchArena,
}

/// A stage of the frame's pass chain
pub trait RenderPass: Send {
    /// Get the pass name for debugging
    fn name(&self) -> &str;

    /// Contribute this pass to the frame graph and return the attachments it
    /// produced. Must not fail because of asset readiness.
    fn build(
        &mut self,
        ctx: &mut PassContext<'_>,
        inputs: &PassAttachments,
    ) -> RenderResult<PassAttachments>;
}

/// Construct the passes of `config.pipeline` in execution order
pub fn build_pass_chain<B: GraphicsBackend>(
    backend: &mut B,
    shaders: &mut ShaderLibrary,
    config: &RendererConfig,
) -> RenderResult<Vec<Box<dyn RenderPass>>> {
    let passes: Vec<Box<dyn RenderPass>> = match config.pipeline {
        PipelineKind::Deferred => vec![
            Box::new(GeometryPass::new(backend, shaders, config)?),
            Box::new(LightingPass::new(backend, shaders)?),
            Box::new(SkyboxPass::new(backend, shaders)?),
            Box::new(TonemapPass::new(backend, shaders, config.tonemap)?),
        ],
        PipelineKind::Basic => vec![Box::new(BasicPass::new(backend, shaders, config)?)],
    };
    Ok(passes)
}
