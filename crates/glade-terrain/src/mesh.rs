//! Triangle-grid mesh built from a [`Terrain`].

use bytemuck::{Pod, Zeroable};

use crate::heightmap::Terrain;

/// Vertex of the terrain mesh, uploaded as-is.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Texture coordinates; one repeat every `UV_TILE_TEXELS` texels.
    pub uv: [f32; 2],
}

/// Texels covered by one repeat of the ground texture.
pub const UV_TILE_TEXELS: f32 = 8.0;

/// Terrain geometry ready for GPU upload.
#[derive(Clone, Debug, Default)]
pub struct TerrainMesh {
    pub vertices: Vec<TerrainVertex>,
    /// Counter-clockwise triangles viewed from above.
    pub indices: Vec<u32>,
}

impl TerrainMesh {
    /// One vertex per heightmap texel, two triangles per grid cell.
    pub fn build(terrain: &Terrain) -> Self {
        let hm = terrain.heightmap();
        let (w, d) = (hm.width(), hm.depth());
        let mut vertices = Vec::with_capacity((w * d) as usize);

        for z in 0..d {
            for x in 0..w {
                // In range by construction.
                let position = terrain.cell_position(x, z).unwrap_or_default();
                vertices.push(TerrainVertex {
                    position: position.to_array(),
                    normal: terrain.normal_at_cell(x, z).to_array(),
                    uv: [x as f32 / UV_TILE_TEXELS, z as f32 / UV_TILE_TEXELS],
                });
            }
        }

        let mut indices = Vec::with_capacity(((w - 1) * (d - 1) * 6) as usize);
        for z in 0..d - 1 {
            for x in 0..w - 1 {
                let i00 = z * w + x;
                let i10 = i00 + 1;
                let i01 = i00 + w;
                let i11 = i01 + 1;
                indices.extend_from_slice(&[i00, i01, i10, i10, i01, i11]);
            }
        }

        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::{Heightmap, HeightmapParams};
    use glam::Vec3;

    fn terrain(w: u32, d: u32) -> Terrain {
        let map = Heightmap::generate(w, d, &HeightmapParams::default()).unwrap();
        Terrain::new(map, 2.0, 8.0)
    }

    #[test]
    fn test_vertex_is_32_bytes() {
        assert_eq!(std::mem::size_of::<TerrainVertex>(), 32);
    }

    #[test]
    fn test_counts() {
        let mesh = TerrainMesh::build(&terrain(6, 4));
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.triangle_count(), 5 * 3 * 2);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_vertices_sit_on_surface() {
        let t = terrain(8, 8);
        let mesh = TerrainMesh::build(&t);
        let v = mesh.vertices[3 * 8 + 5];
        assert_eq!(v.position[1], t.height_at_cell(5, 3).unwrap());
    }

    #[test]
    fn test_triangles_face_up() {
        let flat = Heightmap::from_fn(3, 3, |_, _| 0.0).unwrap();
        let mesh = TerrainMesh::build(&Terrain::new(flat, 1.0, 1.0));
        for tri in mesh.indices.chunks(3) {
            let a = Vec3::from(mesh.vertices[tri[0] as usize].position);
            let b = Vec3::from(mesh.vertices[tri[1] as usize].position);
            let c = Vec3::from(mesh.vertices[tri[2] as usize].position);
            assert!((b - a).cross(c - a).y > 0.0);
        }
    }
}
