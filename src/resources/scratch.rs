//! Per-frame transient GPU memory
//!
//! Uniform and storage data that only lives for one frame (camera blocks,
//! transform arrays, light lists) is sub-allocated linearly from a
//! [`ScratchArena`]. There is one arena per frame-in-flight slot; an arena is
//! reset when a new frame reclaims its slot, which is only allowed after the
//! backend has retired the frame that last used it.
//!
//! # Example
//!
//! ```ignore
//! let arena = scratch.begin_frame(frame.slot)?;
//! let camera = arena.upload(&[camera_data])?;
//! set = set.with(&bindings.camera, DescriptorResource::Buffer(camera));
//! ```

use crate::backend::command::BufferSlice;
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{RenderError, RenderResult};
use bytemuck::Pod;

/// Linear allocator over one scratch buffer
pub struct ScratchArena {
    buffer: BufferHandle,
    data: Vec<u8>,
    write_offset: u64,
    alignment: u64,
    reset_count: u64,
}

impl ScratchArena {
    /// Default alignment for allocations, the common minimum uniform offset alignment
    pub const DEFAULT_ALIGNMENT: u64 = 256;

    pub fn new(buffer: BufferHandle, capacity: u64, alignment: u64) -> RenderResult<Self> {
        if !alignment.is_power_of_two() {
            return Err(RenderError::InvalidScratchConfig(format!(
                "alignment must be a power of 2, got {alignment}"
            )));
        }
        if capacity == 0 {
            return Err(RenderError::InvalidScratchConfig(
                "scratch capacity cannot be zero".to_string(),
            ));
        }

        Ok(Self {
            buffer,
            data: vec![0; align_up(capacity, alignment) as usize],
            write_offset: 0,
            alignment,
            reset_count: 0,
        })
    }

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    pub fn capacity(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn used(&self) -> u64 {
        self.write_offset
    }

    pub fn remaining(&self) -> u64 {
        self.capacity() - self.write_offset
    }

    pub fn reset_count(&self) -> u64 {
        self.reset_count
    }

    /// Reserve `size` zeroed bytes at the next aligned offset
    pub fn allocate(&mut self, size: u64) -> RenderResult<BufferSlice> {
        let offset = align_up(self.write_offset, self.alignment);
        if offset + size > self.capacity() {
            return Err(RenderError::ScratchExhausted {
                requested: size,
                remaining: self.capacity().saturating_sub(offset),
            });
        }

        self.data[offset as usize..(offset + size) as usize].fill(0);
        self.write_offset = offset + size;
        log::trace!("Scratch allocation of {size} bytes at offset {offset}");

        Ok(BufferSlice {
            buffer: self.buffer,
            offset,
            size,
        })
    }

    /// Copy `bytes` into `slice` starting `offset` bytes into the slice
    pub fn write(&mut self, slice: &BufferSlice, offset: u64, bytes: &[u8]) -> RenderResult<()> {
        let len = bytes.len() as u64;
        let in_range = slice.buffer == self.buffer
            && offset + len <= slice.size
            && slice.end() <= self.write_offset;
        if !in_range {
            return Err(RenderError::ScratchWriteOutOfRange {
                offset,
                len,
                size: slice.size,
            });
        }
        let start = (slice.offset + offset) as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Allocate room for `items` and copy them in
    pub fn upload<T: Pod>(&mut self, items: &[T]) -> RenderResult<BufferSlice> {
        let bytes: &[u8] = bytemuck::cast_slice(items);
        let slice = self.allocate(bytes.len() as u64)?;
        self.write(&slice, 0, bytes)?;
        Ok(slice)
    }

    pub fn read(&self, slice: &BufferSlice) -> &[u8] {
        &self.data[slice.offset as usize..slice.end() as usize]
    }

    /// Bytes written since the last reset
    pub fn used_bytes(&self) -> &[u8] {
        &self.data[..self.write_offset as usize]
    }

    pub fn reset(&mut self) {
        if self.write_offset > 0 {
            self.reset_count += 1;
            self.write_offset = 0;
        }
    }
}

impl std::fmt::Debug for ScratchArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchArena")
            .field("buffer", &self.buffer)
            .field("capacity", &self.capacity())
            .field("write_offset", &self.write_offset)
            .field("alignment", &self.alignment)
            .field("reset_count", &self.reset_count)
            .finish()
    }
}

/// One [`ScratchArena`] per frame-in-flight slot
#[derive(Debug)]
pub struct ScratchAllocator {
    arenas: Vec<ScratchArena>,
}

impl ScratchAllocator {
    pub fn new<B: GraphicsBackend>(
        backend: &mut B,
        slots: usize,
        capacity: u64,
        alignment: u64,
    ) -> RenderResult<Self> {
        let arenas = (0..slots)
            .map(|slot| {
                let desc = BufferDescriptor::new(
                    align_up(capacity, alignment.max(1)),
                    BufferUsage::UNIFORM | BufferUsage::STORAGE | BufferUsage::MAP_WRITE,
                )
                .with_label(format!("scratch_{slot}"));
                let buffer = backend.create_buffer(&desc)?;
                ScratchArena::new(buffer, capacity, alignment)
            })
            .collect::<RenderResult<Vec<_>>>()?;

        Ok(Self { arenas })
    }

    pub fn slots(&self) -> usize {
        self.arenas.len()
    }

    /// Reclaim the arena of `slot` for a new frame
    pub fn begin_frame(&mut self, slot: usize) -> RenderResult<&mut ScratchArena> {
        let slots = self.arenas.len();
        let arena = self
            .arenas
            .get_mut(slot)
            .ok_or(RenderError::InvalidFrameSlot { slot, slots })?;
        arena.reset();
        Ok(arena)
    }

    pub fn arena(&self, slot: usize) -> Option<&ScratchArena> {
        self.arenas.get(slot)
    }
}

#[inline]
fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(capacity: u64, alignment: u64) -> ScratchArena {
        ScratchArena::new(BufferHandle(1), capacity, alignment).unwrap()
    }

    #[test]
    fn test_scratch_creation() {
        let arena = arena(4096, 256);
        assert_eq!(arena.capacity(), 4096);
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.remaining(), 4096);
        assert_eq!(arena.reset_count(), 0);
    }

    #[test]
    fn test_scratch_invalid_config() {
        assert!(ScratchArena::new(BufferHandle(1), 1024, 3).is_err());
        assert!(ScratchArena::new(BufferHandle(1), 0, 256).is_err());
    }

    #[test]
    fn test_scratch_alignment() {
        let mut arena = arena(1024, 256);

        let first = arena.allocate(100).unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(arena.used(), 100);

        let second = arena.allocate(50).unwrap();
        assert_eq!(second.offset, 256);
        assert_eq!(second.size, 50);
    }

    #[test]
    fn test_scratch_exhaustion() {
        let mut arena = arena(512, 64);
        arena.allocate(400).unwrap();

        let result = arena.allocate(200);
        assert!(matches!(
            result,
            Err(RenderError::ScratchExhausted { requested: 200, remaining: 64 })
        ));

        let last = arena.allocate(64).unwrap();
        assert_eq!(last.offset, 448);
        assert!(arena.allocate(1).is_err());
    }

    #[test]
    fn test_scratch_upload_and_read() {
        let mut arena = arena(1024, 64);
        let slice = arena.upload(&[1.0f32, 2.0, 3.0]).unwrap();

        assert_eq!(slice.size, 12);
        let values: Vec<f32> = bytemuck::pod_collect_to_vec(arena.read(&slice));
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_scratch_allocations_are_zeroed() {
        let mut arena = arena(256, 256);
        arena.upload(&[0xFFu8; 32]).unwrap();
        arena.reset();

        let slice = arena.allocate(32).unwrap();
        assert!(arena.read(&slice).iter().all(|b| *b == 0));
        assert_eq!(arena.reset_count(), 1);
    }

    #[test]
    fn test_scratch_partial_write() {
        let mut arena = arena(256, 16);
        let slice = arena.allocate(16).unwrap();
        arena.write(&slice, 8, &[7u8; 4]).unwrap();

        assert_eq!(arena.read(&slice), &[0, 0, 0, 0, 0, 0, 0, 0, 7, 7, 7, 7, 0, 0, 0, 0]);
    }

    #[test]
    fn test_scratch_write_past_allocation_fails() {
        let mut arena = arena(256, 16);
        let slice = arena.allocate(16).unwrap();

        let result = arena.write(&slice, 12, &[1u8; 8]);
        assert!(matches!(
            result,
            Err(RenderError::ScratchWriteOutOfRange { offset: 12, len: 8, size: 16 })
        ));
        assert!(arena.read(&slice).iter().all(|b| *b == 0));
    }
}
