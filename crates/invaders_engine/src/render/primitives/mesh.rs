//! Mesh representation for 3D models

use bytemuck::{Pod, Zeroable};

/// Vertex with position, normal and texture coordinate
///
/// `#[repr(C)]` keeps the layout identical to the vertex input description
/// the mesh pipeline declares.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Surface normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
}

/// Indexed triangle list
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle indices into `vertices`
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a mesh from vertices and indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Unit cube centred on the origin with per-face normals and UVs.
    ///
    /// Faces wind counter-clockwise when seen from outside.
    pub fn cube() -> Self {
        // (normal, right, up) for each face; corners are built from them.
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];
        const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, right, up) in FACES {
            let base = vertices.len() as u32;
            for (sx, sy) in CORNERS {
                let position = [
                    0.5 * (normal[0] + sx * right[0] + sy * up[0]),
                    0.5 * (normal[1] + sx * right[1] + sy * up[1]),
                    0.5 * (normal[2] + sx * right[2] + sy * up[2]),
                ];
                vertices.push(Vertex {
                    position,
                    normal,
                    tex_coord: [(sx + 1.0) * 0.5, (1.0 - sy) * 0.5],
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }

    /// Number of indices to draw
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_cube_counts() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.index_count(), 36);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.vertices.len()));
    }

    #[test]
    fn test_cube_winding_faces_outwards() {
        let cube = Mesh::cube();
        for tri in cube.indices.chunks_exact(3) {
            let a = Vec3::from(cube.vertices[tri[0] as usize].position);
            let b = Vec3::from(cube.vertices[tri[1] as usize].position);
            let c = Vec3::from(cube.vertices[tri[2] as usize].position);
            let n = Vec3::from(cube.vertices[tri[0] as usize].normal);
            assert!((b - a).cross(&(c - a)).dot(&n) > 0.0);
        }
    }

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }
}
