//! Headless backend
//!
//! Implements [`GraphicsBackend`] without a device: resources are plain
//! handles, submitted frames are recorded for inspection, and frames in
//! flight are tracked on a [`FrameTimeline`] so backpressure behaves like a
//! real swapchain.

use crate::backend::command::BufferSlice;
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::{CompiledGraph, GraphPass};
use crate::resources::{Attachment, AttachmentRegistry, ScratchArena};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Default presentation size of a headless backend
pub const DEFAULT_EXTENT: Extent2d = Extent2d::new(1280, 720);
/// Submitted and presented frames retained for inspection by default
pub const DEFAULT_HISTORY: usize = 8;

#[derive(Debug, Clone, Copy)]
struct InFlightFrame {
    index: u64,
    slot: usize,
}

#[derive(Debug, Default)]
struct TimelineState {
    in_flight: VecDeque<InFlightFrame>,
}

/// Frames presented but not yet retired, shared with whoever retires them
#[derive(Debug, Clone, Default)]
pub struct FrameTimeline {
    inner: Arc<(Mutex<TimelineState>, Condvar)>,
}

impl FrameTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, index: u64, slot: usize) {
        let (state, _) = &*self.inner;
        state.lock().in_flight.push_back(InFlightFrame { index, slot });
    }

    /// Block while a frame using `slot` is still in flight
    fn wait_for_slot(&self, slot: usize) {
        let (state, condvar) = &*self.inner;
        let mut guard = state.lock();
        while guard.in_flight.iter().any(|frame| frame.slot == slot) {
            log::trace!("Waiting for frame slot {slot}");
            condvar.wait(&mut guard);
        }
    }

    /// Retire the oldest in-flight frame and return its index
    pub fn complete_oldest(&self) -> Option<u64> {
        let (state, condvar) = &*self.inner;
        let completed = state.lock().in_flight.pop_front();
        if let Some(frame) = completed {
            log::trace!("Frame {} completed", frame.index);
            condvar.notify_all();
        }
        completed.map(|frame| frame.index)
    }

    /// Retire every in-flight frame
    pub fn complete_all(&self) -> usize {
        let (state, condvar) = &*self.inner;
        let count = {
            let mut guard = state.lock();
            let count = guard.in_flight.len();
            guard.in_flight.clear();
            count
        };
        condvar.notify_all();
        count
    }

    pub fn in_flight(&self) -> usize {
        self.inner.0.lock().in_flight.len()
    }
}

/// A frame handed to [`GraphicsBackend::submit`]
#[derive(Debug, Clone)]
pub struct SubmittedFrame {
    pub frame: FrameInfo,
    pub graph: CompiledGraph,
    /// Scratch bytes written during the frame
    pub scratch: Vec<u8>,
}

impl SubmittedFrame {
    pub fn pass(&self, name: &str) -> Option<&GraphPass> {
        self.graph.pass(name).map(|compiled| &compiled.pass)
    }

    pub fn draw_count(&self) -> usize {
        self.graph.draw_count()
    }

    /// Contents of a scratch allocation made during this frame
    pub fn scratch_bytes(&self, slice: &BufferSlice) -> Option<&[u8]> {
        self.scratch
            .get(slice.offset as usize..slice.end() as usize)
    }
}

pub struct HeadlessBackend {
    frames_in_flight: usize,
    extent: Extent2d,
    auto_complete: bool,
    next_frame: u64,
    next_handle: u64,
    timeline: FrameTimeline,
    attachments: AttachmentRegistry,
    textures_created: usize,
    buffers: HashMap<BufferHandle, BufferDescriptor>,
    buffer_contents: HashMap<BufferHandle, Vec<u8>>,
    pipelines: Vec<RenderPipelineDescriptor>,
    /// Most recent submissions, oldest first, at most `history` long
    submissions: VecDeque<SubmittedFrame>,
    presented: VecDeque<u64>,
    presented_count: u64,
    history: usize,
}

fn next_id(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl HeadlessBackend {
    /// Frames complete as soon as they are presented
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            frames_in_flight: frames_in_flight.max(1),
            extent: DEFAULT_EXTENT,
            auto_complete: true,
            next_frame: 0,
            next_handle: 0,
            timeline: FrameTimeline::new(),
            attachments: AttachmentRegistry::new(),
            textures_created: 0,
            buffers: HashMap::new(),
            buffer_contents: HashMap::new(),
            pipelines: Vec::new(),
            submissions: VecDeque::new(),
            presented: VecDeque::new(),
            presented_count: 0,
            history: DEFAULT_HISTORY,
        }
    }

    /// Presented frames stay in flight until retired through [`FrameTimeline`]
    pub fn with_manual_completion(mut self) -> Self {
        self.auto_complete = false;
        self
    }

    pub fn with_extent(mut self, extent: Extent2d) -> Self {
        self.extent = extent;
        self
    }

    /// Keep only the last `frames` submissions and presented indices
    pub fn with_history(mut self, frames: usize) -> Self {
        self.history = frames.max(1);
        self
    }

    pub fn timeline(&self) -> FrameTimeline {
        self.timeline.clone()
    }

    /// Retained submissions, oldest first
    pub fn submissions(&self) -> &VecDeque<SubmittedFrame> {
        &self.submissions
    }

    pub fn last_submission(&self) -> Option<&SubmittedFrame> {
        self.submissions.back()
    }

    /// Hand over every retained submission, leaving the history empty
    pub fn take_submissions(&mut self) -> Vec<SubmittedFrame> {
        self.submissions.drain(..).collect()
    }

    pub fn pipelines(&self) -> &[RenderPipelineDescriptor] {
        &self.pipelines
    }

    /// Indices of the retained presented frames, in presentation order
    pub fn presented(&self) -> Vec<u64> {
        self.presented.iter().copied().collect()
    }

    /// Number of frames presented since creation
    pub fn presented_count(&self) -> u64 {
        self.presented_count
    }

    pub fn attachments(&self) -> &AttachmentRegistry {
        &self.attachments
    }

    /// Number of textures allocated so far, attachments included
    pub fn texture_count(&self) -> usize {
        self.textures_created
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&BufferDescriptor> {
        self.buffers.get(&handle)
    }

    pub fn buffer_contents(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffer_contents.get(&handle).map(Vec::as_slice)
    }

    fn create_attachment(
        &mut self,
        name: &str,
        extent: Extent2d,
        format: TextureFormat,
    ) -> BackendResult<Arc<Attachment>> {
        if extent.width == 0 || extent.height == 0 {
            return Err(BackendError::TextureCreationFailed(format!(
                "attachment '{name}' has an empty extent"
            )));
        }

        let counter = &mut self.next_handle;
        let created = &mut self.textures_created;
        self.attachments.get_or_create(name, extent, format, || {
            *created += 1;
            let texture = TextureHandle(next_id(counter));
            let view = TextureViewHandle(next_id(counter));
            log::trace!("Created attachment '{name}' {extent:?} {format:?}");
            Ok((texture, view))
        })
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    fn wait_for_available_frame(&mut self) -> BackendResult<()> {
        let slot = (self.next_frame % self.frames_in_flight as u64) as usize;
        self.timeline.wait_for_slot(slot);
        Ok(())
    }

    fn frame_info(&mut self) -> FrameInfo {
        FrameInfo {
            index: self.next_frame,
            slot: (self.next_frame % self.frames_in_flight as u64) as usize,
            extent: self.extent,
        }
    }

    fn add_color_attachment(
        &mut self,
        name: &str,
        extent: Extent2d,
        format: TextureFormat,
    ) -> BackendResult<Arc<Attachment>> {
        if format.is_depth() {
            return Err(BackendError::TextureCreationFailed(format!(
                "color attachment '{name}' cannot use depth format {format:?}"
            )));
        }
        self.create_attachment(name, extent, format)
    }

    fn add_depth_attachment(
        &mut self,
        name: &str,
        extent: Extent2d,
    ) -> BackendResult<Arc<Attachment>> {
        self.create_attachment(name, extent, TextureFormat::Depth32Float)
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        if desc.size == 0 {
            return Err(BackendError::BufferCreationFailed(format!(
                "buffer {:?} has zero size",
                desc.label
            )));
        }
        let handle = BufferHandle(next_id(&mut self.next_handle));
        self.buffers.insert(handle, desc.clone());
        log::trace!("Created buffer {handle:?} of {} bytes", desc.size);
        Ok(handle)
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        contents: &[u8],
    ) -> BackendResult<BufferHandle> {
        if contents.len() as u64 > desc.size {
            return Err(BackendError::BufferCreationFailed(format!(
                "{} bytes do not fit buffer {:?} of {} bytes",
                contents.len(),
                desc.label,
                desc.size
            )));
        }
        let handle = self.create_buffer(desc)?;
        self.buffer_contents.insert(handle, contents.to_vec());
        Ok(handle)
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        if desc.extent.width == 0 || desc.extent.height == 0 || desc.array_layers == 0 {
            return Err(BackendError::TextureCreationFailed(format!(
                "texture {:?} is empty",
                desc.label
            )));
        }
        if desc.dimension == TextureDimension::Cube && desc.array_layers % 6 != 0 {
            return Err(BackendError::TextureCreationFailed(format!(
                "cube texture {:?} needs a multiple of 6 layers",
                desc.label
            )));
        }
        self.textures_created += 1;
        Ok(TextureHandle(next_id(&mut self.next_handle)))
    }

    fn create_texture_view(&mut self, _texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        Ok(TextureViewHandle(next_id(&mut self.next_handle)))
    }

    fn create_sampler(&mut self, _desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        Ok(SamplerHandle(next_id(&mut self.next_handle)))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        if desc.vertex_shader.stage != ShaderStage::Vertex
            || desc.fragment_shader.stage != ShaderStage::Fragment
        {
            return Err(BackendError::PipelineCreationFailed(format!(
                "pipeline {:?} has mismatched shader stages",
                desc.label
            )));
        }
        if desc.color_targets.is_empty() && desc.depth_stencil.is_none() {
            return Err(BackendError::PipelineCreationFailed(format!(
                "pipeline {:?} has no render targets",
                desc.label
            )));
        }

        self.pipelines.push(desc.clone());
        Ok(RenderPipelineHandle(next_id(&mut self.next_handle)))
    }

    fn submit(
        &mut self,
        frame: &FrameInfo,
        graph: &CompiledGraph,
        scratch: &ScratchArena,
    ) -> BackendResult<()> {
        if frame.index != self.next_frame {
            return Err(BackendError::SubmitFailed(format!(
                "frame {} submitted while frame {} is current",
                frame.index, self.next_frame
            )));
        }

        log::trace!(
            "Submitted frame {} with {} passes and {} scratch bytes",
            frame.index,
            graph.passes().len(),
            scratch.used()
        );
        if self.submissions.len() == self.history {
            self.submissions.pop_front();
        }
        self.submissions.push_back(SubmittedFrame {
            frame: *frame,
            graph: graph.clone(),
            scratch: scratch.used_bytes().to_vec(),
        });
        Ok(())
    }

    fn present_frame(&mut self, frame: &FrameInfo) -> BackendResult<()> {
        if frame.index != self.next_frame {
            return Err(BackendError::PresentFailed(format!(
                "frame {} presented while frame {} is current",
                frame.index, self.next_frame
            )));
        }

        if !self.auto_complete {
            self.timeline.push(frame.index, frame.slot);
        }
        if self.presented.len() == self.history {
            self.presented.pop_front();
        }
        self.presented.push_back(frame.index);
        self.presented_count += 1;
        self.next_frame += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_attachment_is_idempotent() {
        let mut backend = HeadlessBackend::new(2);
        let extent = Extent2d::new(64, 64);

        let first = backend
            .add_color_attachment("color", extent, TextureFormat::Rgba8Unorm)
            .unwrap();
        let second = backend
            .add_color_attachment("color", extent, TextureFormat::Rgba8Unorm)
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.texture_count(), 1);
    }

    #[test]
    fn test_attachment_mismatch() {
        let mut backend = HeadlessBackend::new(2);
        backend
            .add_depth_attachment("depth", Extent2d::new(64, 64))
            .unwrap();

        let result = backend.add_depth_attachment("depth", Extent2d::new(32, 32));
        assert!(matches!(result, Err(BackendError::AttachmentMismatch { .. })));
        assert!(backend
            .add_color_attachment("color", Extent2d::new(8, 8), TextureFormat::Depth32Float)
            .is_err());
    }

    #[test]
    fn test_frame_slots_cycle() {
        let mut backend = HeadlessBackend::new(2);
        let mut slots = Vec::new();
        for _ in 0..4 {
            backend.wait_for_available_frame().unwrap();
            let frame = backend.frame_info();
            slots.push(frame.slot);
            backend.present_frame(&frame).unwrap();
        }

        assert_eq!(slots, vec![0, 1, 0, 1]);
        assert_eq!(backend.presented(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut backend = HeadlessBackend::new(2).with_history(3);
        let mut scratch = ScratchArena::new(BufferHandle(1), 256, 16).unwrap();

        for _ in 0..10 {
            backend.wait_for_available_frame().unwrap();
            let frame = backend.frame_info();
            scratch.reset();
            scratch.upload(&[frame.index as u32]).unwrap();
            let graph = crate::render_graph::RenderGraph::new().build().unwrap();
            backend.submit(&frame, &graph, &scratch).unwrap();
            backend.present_frame(&frame).unwrap();
        }

        assert_eq!(backend.submissions().len(), 3);
        assert_eq!(backend.presented(), &[7, 8, 9]);
        assert_eq!(backend.presented_count(), 10);

        let last = backend.last_submission().unwrap();
        assert_eq!(last.frame.index, 9);
        assert_eq!(last.scratch, 9u32.to_ne_bytes().to_vec());

        let taken = backend.take_submissions();
        let indices: Vec<u64> = taken.iter().map(|s| s.frame.index).collect();
        assert_eq!(indices, vec![7, 8, 9]);
        assert!(backend.submissions().is_empty());
    }

    #[test]
    fn test_present_out_of_order_fails() {
        let mut backend = HeadlessBackend::new(1);
        let mut frame = backend.frame_info();
        frame.index = 7;
        assert!(backend.present_frame(&frame).is_err());
    }

    #[test]
    fn test_manual_completion_blocks_reused_slot() {
        let mut backend = HeadlessBackend::new(1).with_manual_completion();
        let timeline = backend.timeline();

        let frame = backend.frame_info();
        backend.present_frame(&frame).unwrap();
        assert_eq!(timeline.in_flight(), 1);

        let completer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            timeline.complete_oldest()
        });

        backend.wait_for_available_frame().unwrap();
        assert_eq!(completer.join().unwrap(), Some(0));
        assert_eq!(backend.timeline().in_flight(), 0);
    }

    #[test]
    fn test_complete_all_frees_every_slot() {
        let mut backend = HeadlessBackend::new(2).with_manual_completion();
        for _ in 0..2 {
            backend.wait_for_available_frame().unwrap();
            let frame = backend.frame_info();
            backend.present_frame(&frame).unwrap();
        }

        let timeline = backend.timeline();
        assert_eq!(timeline.in_flight(), 2);
        assert_eq!(timeline.complete_all(), 2);
        assert_eq!(timeline.complete_oldest(), None);
        backend.wait_for_available_frame().unwrap();
        assert_eq!(backend.frame_info().slot, 0);
    }

    #[test]
    fn test_buffer_init_records_contents() {
        let mut backend = HeadlessBackend::new(1);
        let handle = backend
            .create_buffer_init(&BufferDescriptor::new(4, BufferUsage::VERTEX), &[1, 2, 3, 4])
            .unwrap();

        assert_eq!(backend.buffer_contents(handle), Some(&[1u8, 2, 3, 4][..]));
        assert!(backend
            .create_buffer(&BufferDescriptor::new(0, BufferUsage::UNIFORM))
            .is_err());
    }
}
