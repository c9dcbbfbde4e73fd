//! Surface materials written into the G-buffer

use crate::resources::Asset;
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// PBR surface parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    pub ambient_occlusion: f32,
    pub emissive: Vec3,
    pub emissive_strength: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_color: Vec4::ONE,
            metallic: 0.0,
            roughness: 0.5,
            ambient_occlusion: 1.0,
            emissive: Vec3::ZERO,
            emissive_strength: 1.0,
        }
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_base_color(mut self, color: Vec4) -> Self {
        self.base_color = color;
        self
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic;
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn with_emissive(mut self, emissive: Vec3, strength: f32) -> Self {
        self.emissive = emissive;
        self.emissive_strength = strength;
        self
    }

    /// Packed representation used by the geometry pass material array
    pub fn gpu_data(&self) -> GpuMaterialData {
        GpuMaterialData {
            base_color: self.base_color,
            metallic_roughness_ao: Vec4::new(
                self.metallic,
                self.roughness,
                self.ambient_occlusion,
                0.0,
            ),
            emissive: self.emissive.extend(self.emissive_strength),
        }
    }

    pub fn plastic(color: Vec3) -> Self {
        Self::new("plastic")
            .with_base_color(color.extend(1.0))
            .with_roughness(0.4)
    }

    pub fn metal(color: Vec3, roughness: f32) -> Self {
        Self::new("metal")
            .with_base_color(color.extend(1.0))
            .with_metallic(1.0)
            .with_roughness(roughness)
    }

    pub fn gold() -> Self {
        Self::metal(Vec3::new(1.0, 0.766, 0.336), 0.3)
    }
}

impl Asset for Material {
    const KIND: &'static str = "Material";
}

/// Material array element for the geometry pass
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuMaterialData {
    pub base_color: Vec4,
    /// x = metallic, y = roughness, z = ambient occlusion
    pub metallic_roughness_ao: Vec4,
    /// xyz = emissive color, w = strength
    pub emissive: Vec4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_data_packing() {
        let data = Material::gold().gpu_data();
        assert_eq!(data.metallic_roughness_ao, Vec4::new(1.0, 0.3, 1.0, 0.0));
        assert_eq!(data.base_color.w, 1.0);
        assert_eq!(std::mem::size_of::<GpuMaterialData>(), 48);
    }

    #[test]
    fn test_emissive_strength_packed_in_w() {
        let data = Material::plastic(Vec3::ONE)
            .with_emissive(Vec3::new(1.0, 0.5, 0.0), 4.0)
            .gpu_data();
        assert_eq!(data.emissive, Vec4::new(1.0, 0.5, 0.0, 4.0));
    }
}
