//! Per-frame scratch uploads shared by the mesh-drawing passes

use crate::backend::command::{BufferSlice, DescriptorResource, DescriptorSet};
use crate::database::RenderDatabase;
use crate::error::RenderResult;
use crate::resources::ScratchArena;
use crate::scene::GpuCameraData;
use crate::shader::{BindingInfo, GraphicsPipeline};
use bytemuck::{Pod, Zeroable};

/// Binding slots of the camera block and the transform array
#[derive(Debug, Clone)]
pub struct MeshBindings {
    pub camera: BindingInfo,
    pub transforms: BindingInfo,
}

impl MeshBindings {
    /// Resolve the bindings from a pipeline's reflection
    pub fn resolve(pipeline: &GraphicsPipeline) -> RenderResult<Self> {
        Ok(Self {
            camera: pipeline.binding("camera")?,
            transforms: pipeline.binding("transforms")?,
        })
    }

    /// Upload this frame's camera block and transforms and bind them
    pub fn descriptor_set(
        &self,
        scratch: &mut ScratchArena,
        database: &RenderDatabase,
    ) -> RenderResult<DescriptorSet> {
        let transforms = upload_transforms(scratch, database)?;
        let camera = upload_camera_data(scratch, database)?;
        Ok(DescriptorSet::new()
            .with(&self.camera, DescriptorResource::Buffer(camera))
            .with(&self.transforms, DescriptorResource::Buffer(transforms)))
    }
}

/// Copy every draw transform into a storage allocation, indexed like the draws
pub fn upload_transforms(
    scratch: &mut ScratchArena,
    database: &RenderDatabase,
) -> RenderResult<BufferSlice> {
    scratch.upload(database.transforms())
}

/// Allocate the camera block and write `projection_view` into it. The
/// position slot is left as allocated.
pub fn upload_camera_data(
    scratch: &mut ScratchArena,
    database: &RenderDatabase,
) -> RenderResult<BufferSlice> {
    let slice = scratch.allocate(std::mem::size_of::<GpuCameraData>() as u64)?;
    scratch.write(
        &slice,
        0,
        bytemuck::bytes_of(&database.camera().projection_view),
    )?;
    Ok(slice)
}

/// Upload `items`, or a single zeroed element when there are none, so the
/// storage binding is never empty
pub fn upload_non_empty<T: Pod + Zeroable>(
    scratch: &mut ScratchArena,
    items: &[T],
) -> RenderResult<BufferSlice> {
    if items.is_empty() {
        scratch.upload(&[T::zeroed()])
    } else {
        scratch.upload(items)
    }
}
