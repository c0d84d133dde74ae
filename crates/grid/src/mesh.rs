use blockworld_common::Voxel;
use bytemuck::{Pod, Zeroable};
use glam::{IVec3, Vec3};

/// One terrain vertex as handed to the rendering collaborator.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub material: u32,
}

/// Indexed triangle mesh for a chunk or the placement preview.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

/// Face directions paired with the four corners of the quad on that face,
/// counter-clockwise when viewed from outside.
const FACES: [(IVec3, [Vec3; 4]); 6] = [
    (
        IVec3::X,
        [
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(0.5, 0.5, 0.5),
        ],
    ),
    (
        IVec3::NEG_X,
        [
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, -0.5),
        ],
    ),
    (
        IVec3::Y,
        [
            Vec3::new(-0.5, 0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
        ],
    ),
    (
        IVec3::NEG_Y,
        [
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(-0.5, -0.5, 0.5),
        ],
    ),
    (
        IVec3::Z,
        [
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ],
    ),
    (
        IVec3::NEG_Z,
        [
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
        ],
    ),
];

impl ChunkMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of quads (two triangles each) in the mesh.
    pub fn face_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Append the faces of a unit cube centred on `center` for which
    /// `exposed(direction)` holds.
    pub fn push_cube(&mut self, center: Vec3, voxel: Voxel, mut exposed: impl FnMut(IVec3) -> bool) {
        let material = voxel.id().max(0) as u32;
        for (dir, corners) in FACES.iter() {
            if !exposed(*dir) {
                continue;
            }
            let base = self.vertices.len() as u32;
            let normal = dir.as_vec3().to_array();
            for corner in corners {
                self.vertices.push(TerrainVertex {
                    position: (center + *corner).to_array(),
                    normal,
                    material,
                });
            }
            self.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }

    /// Raw vertex bytes for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}
