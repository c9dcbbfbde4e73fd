//! Core backend abstraction traits
//!
//! The renderer talks to presentation, device resource creation and command
//! submission exclusively through [`GraphicsBackend`].

use crate::backend::types::*;
use crate::render_graph::CompiledGraph;
use crate::resources::{Attachment, ScratchArena};
use crate::shader::ShaderModule;
use std::sync::Arc;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to acquire frame: {0}")]
    FrameAcquireFailed(String),
    #[error("Failed to submit frame: {0}")]
    SubmitFailed(String),
    #[error("Failed to present: {0}")]
    PresentFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    #[error("Attachment '{name}' already exists with a different extent or format")]
    AttachmentMismatch { name: String },
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u64);

/// Handle to a texture view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureViewHandle(pub(crate) u64);

/// Handle to a sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerHandle(pub(crate) u64);

/// Handle to a render pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPipelineHandle(pub(crate) u64);

/// Render pipeline descriptor
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor {
    pub label: Option<String>,
    pub vertex_shader: Arc<ShaderModule>,
    pub fragment_shader: Arc<ShaderModule>,
    pub vertex_layouts: Vec<VertexBufferLayout>,
    pub primitive_topology: PrimitiveTopology,
    pub front_face: FrontFace,
    pub cull_mode: CullMode,
    pub depth_stencil: Option<DepthStencilState>,
    pub color_targets: Vec<ColorTargetState>,
    pub dynamic_states: Vec<DynamicState>,
    pub push_constant_ranges: Vec<PushConstantRange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilState {
    pub format: TextureFormat,
    pub depth_test_enabled: bool,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorTargetState {
    pub format: TextureFormat,
    pub write_mask: ColorWrites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorWrites(pub u32);

impl ColorWrites {
    pub const ALL: Self = Self(0xF);
}

/// Range of push constant memory visible to a set of stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stages: ShaderStageFlags,
    pub offset: u32,
    pub size: u32,
}

/// Presentation, device resource creation and command submission.
///
/// Every frame follows the same sequence: [`wait_for_available_frame`],
/// [`frame_info`], recording, [`submit`], [`present_frame`].
///
/// [`wait_for_available_frame`]: GraphicsBackend::wait_for_available_frame
/// [`frame_info`]: GraphicsBackend::frame_info
/// [`submit`]: GraphicsBackend::submit
/// [`present_frame`]: GraphicsBackend::present_frame
pub trait GraphicsBackend {
    /// Number of frames the CPU may record ahead of the GPU
    fn frames_in_flight(&self) -> usize;

    /// Block until the slot of the next frame has been retired by the GPU
    fn wait_for_available_frame(&mut self) -> BackendResult<()>;

    /// Identity of the frame that is about to be recorded
    fn frame_info(&mut self) -> FrameInfo;

    /// Create, or return the existing, color attachment with this name
    fn add_color_attachment(
        &mut self,
        name: &str,
        extent: Extent2d,
        format: TextureFormat,
    ) -> BackendResult<Arc<Attachment>>;

    /// Create, or return the existing, depth attachment with this name
    fn add_depth_attachment(&mut self, name: &str, extent: Extent2d)
        -> BackendResult<Arc<Attachment>>;

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        contents: &[u8],
    ) -> BackendResult<BufferHandle>;

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle>;

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle>;

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle>;

    /// Execute a compiled frame graph. `scratch` holds the frame's transient
    /// uniform and storage data referenced by the recorded commands.
    fn submit(
        &mut self,
        frame: &FrameInfo,
        graph: &CompiledGraph,
        scratch: &ScratchArena,
    ) -> BackendResult<()>;

    fn present_frame(&mut self, frame: &FrameInfo) -> BackendResult<()>;
}
