//! Components that make an entity drawable

use crate::resources::{Handle, Material, Mesh};
use bevy_ecs::prelude::*;

/// Surface material of a drawable entity
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct MeshRenderer {
    pub material: Handle<Material>,
}

impl MeshRenderer {
    pub fn new(material: Handle<Material>) -> Self {
        Self { material }
    }
}

/// Geometry of a drawable entity
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct StaticMesh {
    pub mesh: Handle<Mesh>,
}

impl StaticMesh {
    pub fn new(mesh: Handle<Mesh>) -> Self {
        Self { mesh }
    }
}
