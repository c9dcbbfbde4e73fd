//! Frame orchestrator
//!
//! [`Renderer`] owns the pass chain, the render database and the scratch
//! memory, and drives one frame per [`Renderer::render`] call:
//! wait for a frame slot, rebuild the database from the scene, let every pass
//! contribute to the frame graph, compile it, submit and present.

use crate::backend::traits::*;
use crate::backend::types::FrameInfo;
use crate::database::{ProjectionSettings, RenderDatabase};
use crate::error::RenderResult;
use crate::pipeline::lighting_pass::HDR_FORMAT;
use crate::pipeline::postprocess::LDR_FORMAT;
use crate::pipeline::{
    build_pass_chain, PassAttachments, PassContext, PipelineKind, RenderPass, SCENE_COLOR,
    SCENE_COLOR_TONEMAPPED,
};
use crate::render_graph::RenderGraph;
use crate::resources::{Assets, Attachment, ScratchAllocator};
use crate::shader::ShaderLibrary;
use crate::RendererConfig;
use bevy_ecs::world::World;
use std::sync::Arc;

pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    config: RendererConfig,
    database: RenderDatabase,
    passes: Vec<Box<dyn RenderPass>>,
    /// Attachments owned by the renderer rather than by a pass
    attachments: PassAttachments,
    /// Every attachment produced during the last frame
    frame_attachments: PassAttachments,
    scratch: ScratchAllocator,
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Create attachments, pipelines and scratch memory. Any shader or
    /// pipeline failure aborts construction.
    pub fn new(mut backend: B, config: RendererConfig) -> RenderResult<Self> {
        let extent = config.render_extent();
        log::info!(
            "Creating {:?} renderer at {}x{} with {} frames in flight",
            config.pipeline,
            extent.width,
            extent.height,
            backend.frames_in_flight()
        );

        let mut attachments = PassAttachments::new();
        if config.pipeline == PipelineKind::Deferred {
            attachments.insert(
                SCENE_COLOR,
                backend.add_color_attachment(SCENE_COLOR, extent, HDR_FORMAT)?,
            );
            attachments.insert(
                SCENE_COLOR_TONEMAPPED,
                backend.add_color_attachment(SCENE_COLOR_TONEMAPPED, extent, LDR_FORMAT)?,
            );
        }

        let mut shaders = ShaderLibrary::new(config.shader_dir.clone(), config.shader_format);
        let passes = build_pass_chain(&mut backend, &mut shaders, &config)?;

        let slots = backend.frames_in_flight();
        let scratch = ScratchAllocator::new(
            &mut backend,
            slots,
            config.scratch_capacity,
            config.scratch_alignment,
        )?;

        log::info!(
            "Renderer ready: passes [{}]",
            passes
                .iter()
                .map(|pass| pass.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            backend,
            config,
            database: RenderDatabase::new(),
            passes,
            frame_attachments: attachments.clone(),
            attachments,
            scratch,
        })
    }

    /// Render exactly one frame of `world`.
    ///
    /// A missing camera or environment map yields an empty frame, and meshes
    /// that are not ready are skipped. An error means the frame was neither
    /// submitted nor presented.
    pub fn render(&mut self, world: &mut World, assets: &Assets) -> RenderResult<FrameInfo> {
        self.backend.wait_for_available_frame()?;
        let frame = self.backend.frame_info();
        let scratch = self.scratch.begin_frame(frame.slot)?;

        self.database.reset();
        let settings = ProjectionSettings {
            aspect: self.config.render_extent().aspect_ratio(),
            near: self.config.near_plane,
            far: self.config.far_plane,
        };
        let state = self.database.populate(world, assets, &settings)?;

        let mut graph = RenderGraph::new();
        let mut available = self.attachments.clone();
        {
            let mut ctx = PassContext {
                frame: &frame,
                graph: &mut graph,
                database: &self.database,
                assets,
                scratch: &mut *scratch,
            };
            for pass in self.passes.iter_mut() {
                let outputs = pass.build(&mut ctx, &available)?;
                available.extend(outputs);
            }
        }

        let compiled = graph.build()?;
        log::debug!(
            "Frame {} (slot {}): {:?}, {} draws, {} lights, {} draw calls, {} scratch bytes",
            frame.index,
            frame.slot,
            state,
            self.database.draw_count(),
            self.database.point_lights().len(),
            compiled.draw_count(),
            scratch.used()
        );

        self.backend.submit(&frame, &compiled, scratch)?;
        self.backend.present_frame(&frame)?;
        self.frame_attachments = available;

        Ok(frame)
    }

    pub fn database(&self) -> &RenderDatabase {
        &self.database
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Pass names in execution order
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Look up an attachment by name among those used by the last frame
    pub fn attachment(&self, name: &str) -> Option<&Arc<Attachment>> {
        self.frame_attachments.get(name)
    }

    /// Attachment holding the finished image of the last frame
    pub fn final_attachment(&self) -> Option<&Arc<Attachment>> {
        self.attachment(self.config.pipeline.final_attachment())
    }
}
