//! Deferred Renderer - the per-frame orchestration core of a render graph-based renderer
//!
//! Every frame the [`Renderer`] rebuilds a [`RenderDatabase`] from a bevy
//! [`World`], runs a fixed chain of passes that each declare their attachments
//! on a [`RenderGraph`](render_graph::RenderGraph), compiles the graph and
//! hands it to a [`GraphicsBackend`].
//!
//! # Features
//! - Deferred chain: geometry, lighting, skybox and tonemap passes
//! - Single-pass basic forward renderer as an alternative chain
//! - Render graph with dependency ordering, layout barriers and lifetimes
//! - WGSL/SPIR-V shader loading with reflection-resolved bindings
//! - Per-frame-slot scratch arenas for transient uniform and storage data
//! - Headless backend for running frames without a GPU
//! - Background task manager

pub mod backend;
pub mod database;
pub mod error;
pub mod pipeline;
pub mod render_graph;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod shader;
pub mod tasks;

// Re-export Bevy ECS prelude for users
pub use bevy_ecs::prelude::*;

pub use backend::{GraphicsBackend, HeadlessBackend};
pub use database::{DatabaseState, RenderDatabase};
pub use error::{RenderError, RenderResult};
pub use pipeline::{PipelineKind, TonemapOperator, TonemapSettings};
pub use renderer::Renderer;
pub use shader::ShaderFormat;
pub use tasks::TaskManager;

use backend::types::Extent2d;
use std::path::PathBuf;

/// Configuration for creating a [`Renderer`]
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Width of every attachment, in pixels
    pub render_width: u32,
    /// Height of every attachment, in pixels
    pub render_height: u32,
    /// Number of frames the CPU may record ahead of the GPU
    pub frames_in_flight: usize,
    /// Directory holding `{name}.{vert|frag}.{spv|wgsl}` shaders
    pub shader_dir: PathBuf,
    pub shader_format: ShaderFormat,
    /// Scratch memory per frame slot, in bytes
    pub scratch_capacity: u64,
    /// Alignment of every scratch allocation
    pub scratch_alignment: u64,
    pub near_plane: f32,
    pub far_plane: f32,
    /// Which pass chain to run
    pub pipeline: PipelineKind,
    pub tonemap: TonemapSettings,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            render_width: 1280,
            render_height: 720,
            frames_in_flight: 2,
            shader_dir: PathBuf::from("data/shaders"),
            shader_format: ShaderFormat::Spirv,
            scratch_capacity: 4 * 1024 * 1024,
            scratch_alignment: resources::ScratchArena::DEFAULT_ALIGNMENT,
            near_plane: 0.1,
            far_plane: 100.0,
            pipeline: PipelineKind::Deferred,
            tonemap: TonemapSettings::default(),
        }
    }
}

impl RendererConfig {
    pub fn render_extent(&self) -> Extent2d {
        Extent2d::new(self.render_width, self.render_height)
    }

    pub fn with_render_extent(mut self, width: u32, height: u32) -> Self {
        self.render_width = width;
        self.render_height = height;
        self
    }

    pub fn with_frames_in_flight(mut self, frames_in_flight: usize) -> Self {
        self.frames_in_flight = frames_in_flight;
        self
    }

    pub fn with_shaders(mut self, dir: impl Into<PathBuf>, format: ShaderFormat) -> Self {
        self.shader_dir = dir.into();
        self.shader_format = format;
        self
    }

    pub fn with_scratch(mut self, capacity: u64, alignment: u64) -> Self {
        self.scratch_capacity = capacity;
        self.scratch_alignment = alignment;
        self
    }

    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near_plane = near;
        self.far_plane = far;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineKind) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_tonemap(mut self, tonemap: TonemapSettings) -> Self {
        self.tonemap = tonemap;
        self
    }

    /// Backend for this configuration that needs no device
    pub fn headless_backend(&self) -> HeadlessBackend {
        HeadlessBackend::new(self.frames_in_flight).with_extent(self.render_extent())
    }
}
