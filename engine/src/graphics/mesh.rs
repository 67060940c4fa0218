//! Vertex data and the shared cube geometry
//!
//! Every spatial entity is drawn with the same textured unit cube, uploaded once per world.

use bytemuck::{Pod, Zeroable};

/// Vertex data structure for GPU rendering
///
/// This struct is tightly packed for efficient GPU transfer using bytemuck.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    /// Position in 3D space
    pub position: [f32; 3],
    /// Surface normal vector (normalized)
    pub normal: [f32; 3],
    /// Texture coordinates (UV mapping)
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a new vertex with the given attributes
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Shader locations: 0 position, 1 normal, 2 uv
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    /// Vertex buffer layout matching [`GpuGeometry`](super::gpu::GpuGeometry) buffers
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex data for the mesh
    pub vertices: Vec<Vertex>,
    /// Index data for triangle assembly
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new mesh from vertices and indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Create a cube mesh with the given size
    ///
    /// The cube is centered at the origin with each side having length `size`.
    pub fn cube(size: f32) -> Self {
        let half = size * 0.5;

        // Define the 8 corner positions
        let positions = [
            [-half, -half, -half], // 0: left bottom back
            [half, -half, -half],  // 1: right bottom back
            [half, half, -half],   // 2: right top back
            [-half, half, -half],  // 3: left top back
            [-half, -half, half],  // 4: left bottom front
            [half, -half, half],   // 5: right bottom front
            [half, half, half],    // 6: right top front
            [-half, half, half],   // 7: left top front
        ];

        // Each face needs 4 unique vertices (for proper normals and UVs)
        let vertices = vec![
            // Front face (positive Z)
            Vertex::new(positions[4], [0.0, 0.0, 1.0], [0.0, 1.0]),
            Vertex::new(positions[5], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex::new(positions[6], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new(positions[7], [0.0, 0.0, 1.0], [0.0, 0.0]),
            // Back face (negative Z)
            Vertex::new(positions[1], [0.0, 0.0, -1.0], [0.0, 1.0]),
            Vertex::new(positions[0], [0.0, 0.0, -1.0], [1.0, 1.0]),
            Vertex::new(positions[3], [0.0, 0.0, -1.0], [1.0, 0.0]),
            Vertex::new(positions[2], [0.0, 0.0, -1.0], [0.0, 0.0]),
            // Top face (positive Y)
            Vertex::new(positions[7], [0.0, 1.0, 0.0], [0.0, 1.0]),
            Vertex::new(positions[6], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex::new(positions[2], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex::new(positions[3], [0.0, 1.0, 0.0], [0.0, 0.0]),
            // Bottom face (negative Y)
            Vertex::new(positions[0], [0.0, -1.0, 0.0], [0.0, 1.0]),
            Vertex::new(positions[1], [0.0, -1.0, 0.0], [1.0, 1.0]),
            Vertex::new(positions[5], [0.0, -1.0, 0.0], [1.0, 0.0]),
            Vertex::new(positions[4], [0.0, -1.0, 0.0], [0.0, 0.0]),
            // Right face (positive X)
            Vertex::new(positions[5], [1.0, 0.0, 0.0], [0.0, 1.0]),
            Vertex::new(positions[1], [1.0, 0.0, 0.0], [1.0, 1.0]),
            Vertex::new(positions[2], [1.0, 0.0, 0.0], [1.0, 0.0]),
            Vertex::new(positions[6], [1.0, 0.0, 0.0], [0.0, 0.0]),
            // Left face (negative X)
            Vertex::new(positions[0], [-1.0, 0.0, 0.0], [0.0, 1.0]),
            Vertex::new(positions[4], [-1.0, 0.0, 0.0], [1.0, 1.0]),
            Vertex::new(positions[7], [-1.0, 0.0, 0.0], [1.0, 0.0]),
            Vertex::new(positions[3], [-1.0, 0.0, 0.0], [0.0, 0.0]),
        ];

        // Create indices for triangles (2 triangles per face, 6 indices per face)
        let mut indices = Vec::with_capacity(36);
        for i in 0..6 {
            let base = i * 4;
            // First triangle
            indices.push(base);
            indices.push(base + 1);
            indices.push(base + 2);
            // Second triangle
            indices.push(base);
            indices.push(base + 2);
            indices.push(base + 3);
        }

        Self { vertices, indices }
    }

    /// Iterate the mesh as triangles, skipping any trailing incomplete index triple
    pub fn triangles(&self) -> impl Iterator<Item = [&Vertex; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(move |tri| {
            Some([
                self.vertices.get(tri[0] as usize)?,
                self.vertices.get(tri[1] as usize)?,
                self.vertices.get(tri[2] as usize)?,
            ])
        })
    }

    /// Number of triangles described by the index buffer
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        use std::mem;
        // Ensure vertex is tightly packed for GPU
        assert_eq!(mem::size_of::<Vertex>(), 32); // 8 floats * 4 bytes
    }

    #[test]
    fn test_vertex_layout_matches_struct() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 32);
        let offsets: Vec<_> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        let locations: Vec<_> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![0, 1, 2]);
        assert_eq!(layout.attributes[2].format, wgpu::VertexFormat::Float32x2);
    }

    #[test]
    fn test_mesh_cube_vertices() {
        let cube = Mesh::cube(1.0);
        assert_eq!(cube.vertices.len(), 24); // 6 faces * 4 vertices
        assert_eq!(cube.indices.len(), 36); // 6 faces * 2 triangles * 3 indices
    }

    #[test]
    fn test_cube_triangles_cover_every_index() {
        let cube = Mesh::cube(1.0);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.triangles().count(), 12);
        for [a, b, c] in cube.triangles() {
            // Every triangle lies on one face and shares its normal
            assert_eq!(a.normal, b.normal);
            assert_eq!(b.normal, c.normal);
        }
    }

    #[test]
    fn test_triangles_skip_out_of_range_indices() {
        let mesh = Mesh::new(
            vec![Vertex::new([0.0; 3], [0.0, 0.0, 1.0], [0.0; 2]); 3],
            vec![0, 1, 2, 0, 1, 7, 0],
        );
        assert_eq!(mesh.triangles().count(), 1);
    }

    #[test]
    fn test_cube_extent() {
        let cube = Mesh::cube(2.0);
        for vertex in &cube.vertices {
            for component in vertex.position {
                assert_eq!(component.abs(), 1.0);
            }
        }
    }

    #[test]
    fn test_cube_normals() {
        let cube = Mesh::cube(2.0);

        // Check that first 4 vertices (front face) have positive Z normal
        for i in 0..4 {
            assert_eq!(cube.vertices[i].normal, [0.0, 0.0, 1.0]);
        }

        // Check that next 4 vertices (back face) have negative Z normal
        for i in 4..8 {
            assert_eq!(cube.vertices[i].normal, [0.0, 0.0, -1.0]);
        }
    }
}
