//! Mesh data and GPU-resident meshes

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::resources::Asset;
use glam::{Vec2, Vec3};

/// CPU-side mesh with vertex and index data
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub name: String,
}

impl MeshData {
    pub fn new(name: &str) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            name: name.to_string(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Get index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Create a unit cube centered at origin, four vertices per face
    pub fn cube() -> Self {
        let mut mesh = MeshData::new("cube");

        // (normal, tangent) per face; bitangent = normal x tangent
        let faces = [
            (Vec3::Z, Vec3::X),
            (-Vec3::Z, -Vec3::X),
            (Vec3::X, -Vec3::Z),
            (-Vec3::X, Vec3::Z),
            (Vec3::Y, Vec3::X),
            (-Vec3::Y, Vec3::X),
        ];
        let corners = [
            Vec2::new(-0.5, -0.5),
            Vec2::new(0.5, -0.5),
            Vec2::new(0.5, 0.5),
            Vec2::new(-0.5, 0.5),
        ];

        for (normal, tangent) in faces {
            let bitangent = normal.cross(tangent);
            let base = mesh.vertices.len() as u32;

            for corner in corners {
                let position = normal * 0.5 + tangent * corner.x + bitangent * corner.y;
                let uv = Vec2::new(corner.x + 0.5, 0.5 - corner.y);
                mesh.vertices
                    .push(Vertex::new(position, normal, tangent, uv));
            }

            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        mesh
    }

    /// Create a flat plane on the XZ axis, facing +Y
    pub fn plane(width: f32, depth: f32, subdivisions: u32) -> Self {
        let mut mesh = MeshData::new("plane");
        let steps = subdivisions.max(1);

        for z in 0..=steps {
            for x in 0..=steps {
                let u = x as f32 / steps as f32;
                let v = z as f32 / steps as f32;
                mesh.vertices.push(Vertex::new(
                    Vec3::new((u - 0.5) * width, 0.0, (v - 0.5) * depth),
                    Vec3::Y,
                    Vec3::X,
                    Vec2::new(u, v),
                ));
            }
        }

        let row = steps + 1;
        for z in 0..steps {
            for x in 0..steps {
                let i = z * row + x;
                mesh.indices
                    .extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
            }
        }

        mesh
    }

    /// Copy the mesh into device buffers
    pub fn upload<B: GraphicsBackend>(&self, backend: &mut B) -> BackendResult<Mesh> {
        let vertex_buffer = backend.create_buffer_init(
            &BufferDescriptor::new(self.vertex_bytes().len() as u64, BufferUsage::VERTEX)
                .with_label(format!("{}_vertices", self.name)),
            self.vertex_bytes(),
        )?;
        let index_buffer = backend.create_buffer_init(
            &BufferDescriptor::new(self.index_bytes().len() as u64, BufferUsage::INDEX)
                .with_label(format!("{}_indices", self.name)),
            self.index_bytes(),
        )?;

        Ok(Mesh {
            name: self.name.clone(),
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        })
    }
}

/// A mesh whose vertex and index data live in device buffers
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
}

impl Mesh {
    pub fn index_format(&self) -> IndexFormat {
        IndexFormat::Uint32
    }
}

impl Asset for Mesh {
    const KIND: &'static str = "Mesh";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_geometry() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.vertex_bytes().len(), 24 * 44);

        for vertex in &cube.vertices {
            // Every corner lies on the face its normal points at
            assert!((vertex.position.dot(vertex.normal) - 0.5).abs() < 1e-6);
            assert!(vertex.normal.dot(vertex.tangent).abs() < 1e-6);
            assert!(vertex.position.abs().max_element() <= 0.5 + 1e-6);
        }
    }

    #[test]
    fn test_plane_geometry() {
        let plane = MeshData::plane(2.0, 2.0, 2);
        assert_eq!(plane.vertex_count(), 9);
        assert_eq!(plane.index_count(), 24);
        assert!(plane.indices.iter().all(|i| (*i as usize) < plane.vertex_count()));
    }
}
