//! Environment cube maps used for image based lighting and the skybox

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::resources::Asset;

/// A cube map resident on the device
#[derive(Debug, Clone)]
pub struct EnvMap {
    pub name: String,
    pub texture: TextureHandle,
    pub view: TextureViewHandle,
    pub face_size: u32,
}

impl EnvMap {
    /// Allocate an empty cube map with six `face_size` square faces
    pub fn create<B: GraphicsBackend>(
        backend: &mut B,
        name: &str,
        face_size: u32,
    ) -> BackendResult<Self> {
        let texture = backend.create_texture(&TextureDescriptor {
            label: Some(name.to_string()),
            extent: Extent2d::new(face_size, face_size),
            array_layers: 6,
            mip_levels: 1,
            dimension: TextureDimension::Cube,
            format: TextureFormat::Rgba16Float,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        })?;
        let view = backend.create_texture_view(texture)?;

        Ok(Self {
            name: name.to_string(),
            texture,
            view,
            face_size,
        })
    }
}

impl Asset for EnvMap {
    const KIND: &'static str = "EnvMap";
}
