//! Recorded command sequences
//!
//! Passes record into a [`CommandBuffer`] while the frame graph is being
//! built; the backend replays the commands when the compiled graph is
//! submitted.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::shader::BindingInfo;
use bytemuck::Pod;
use std::ops::Range;

/// A region of a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferSlice {
    pub buffer: BufferHandle,
    pub offset: u64,
    pub size: u64,
}

impl BufferSlice {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// A resource bound into a descriptor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorResource {
    Buffer(BufferSlice),
    Texture(TextureViewHandle),
    Sampler(SamplerHandle),
}

/// One resolved binding slot and the resource written into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorWrite {
    pub binding: BindingInfo,
    pub resource: DescriptorResource,
}

/// Per-draw set of descriptor writes sharing one bind group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorSet {
    writes: Vec<DescriptorWrite>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, binding: &BindingInfo, resource: DescriptorResource) -> Self {
        debug_assert!(
            self.writes.first().map_or(true, |w| w.binding.group == binding.group),
            "descriptor writes must target a single group"
        );
        self.writes.push(DescriptorWrite {
            binding: binding.clone(),
            resource,
        });
        self
    }

    pub fn writes(&self) -> &[DescriptorWrite] {
        &self.writes
    }

    /// Group index the writes target, or 0 for an empty set
    pub fn group(&self) -> u32 {
        self.writes.first().map_or(0, |w| w.binding.group)
    }

    /// The resource written to the binding with this name, if any
    pub fn resource(&self, name: &str) -> Option<DescriptorResource> {
        self.writes
            .iter()
            .find(|w| w.binding.name == name)
            .map(|w| w.resource)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    BindPipeline(RenderPipelineHandle),
    BindDescriptorSet {
        index: u32,
        set: DescriptorSet,
    },
    BindVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
        offset: u64,
    },
    BindIndexBuffer {
        buffer: BufferHandle,
        offset: u64,
        format: IndexFormat,
    },
    PushConstants {
        stages: ShaderStageFlags,
        offset: u32,
        data: Vec<u8>,
    },
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
}

impl Command {
    pub fn is_draw(&self) -> bool {
        matches!(self, Command::Draw { .. } | Command::DrawIndexed { .. })
    }
}

/// Ordered list of commands recorded by one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(Command::SetViewport(viewport));
    }

    pub fn set_scissor(&mut self, scissor: ScissorRect) {
        self.commands.push(Command::SetScissor(scissor));
    }

    /// Viewport and scissor covering the whole target
    pub fn auto_viewport_scissor(&mut self, extent: Extent2d) {
        self.set_viewport(Viewport::from_extent(extent));
        self.set_scissor(ScissorRect::from_extent(extent));
    }

    pub fn bind_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        self.commands.push(Command::BindPipeline(pipeline));
    }

    pub fn bind_descriptor_set(&mut self, index: u32, set: DescriptorSet) {
        self.commands.push(Command::BindDescriptorSet { index, set });
    }

    pub fn bind_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64) {
        self.commands.push(Command::BindVertexBuffer {
            slot,
            buffer,
            offset,
        });
    }

    pub fn bind_index_buffer(&mut self, buffer: BufferHandle, offset: u64, format: IndexFormat) {
        self.commands.push(Command::BindIndexBuffer {
            buffer,
            offset,
            format,
        });
    }

    pub fn push_constants<T: Pod>(&mut self, stages: ShaderStageFlags, offset: u32, value: &T) {
        self.commands.push(Command::PushConstants {
            stages,
            offset,
            data: bytemuck::bytes_of(value).to_vec(),
        });
    }

    pub fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.commands.push(Command::Draw {
            vertices,
            instances,
        });
    }

    pub fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.commands.push(Command::DrawIndexed {
            indices,
            base_vertex,
            instances,
        });
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    /// Push constant payloads decoded as `u32` words, in recording order
    pub fn pushed_words(&self) -> Vec<Vec<u32>> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::PushConstants { data, .. } => Some(
                    data.chunks_exact(4)
                        .map(|word| u32::from_ne_bytes([word[0], word[1], word[2], word[3]]))
                        .collect(),
                ),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_viewport_scissor() {
        let mut cmd = CommandBuffer::new();
        cmd.auto_viewport_scissor(Extent2d::new(640, 480));

        assert_eq!(cmd.commands().len(), 2);
        assert!(matches!(
            cmd.commands()[0],
            Command::SetViewport(Viewport { width, height, .. }) if width == 640.0 && height == 480.0
        ));
        assert_eq!(
            cmd.commands()[1],
            Command::SetScissor(ScissorRect { x: 0, y: 0, width: 640, height: 480 })
        );
        assert_eq!(cmd.draw_count(), 0);
    }

    #[test]
    fn test_push_constant_words() {
        let mut cmd = CommandBuffer::new();
        cmd.push_constants(ShaderStageFlags::VERTEX, 0, &7u32);
        cmd.push_constants(ShaderStageFlags::VERTEX, 0, &[3u32, 9u32]);
        cmd.draw_indexed(0..36, 0, 0..1);
        cmd.draw(0..3, 0..1);

        assert_eq!(cmd.pushed_words(), vec![vec![7], vec![3, 9]]);
        assert_eq!(cmd.draw_count(), 2);
    }
}
