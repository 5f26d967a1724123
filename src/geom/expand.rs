//! File mesh back to host geometry.

use crate::schema::MeshBlock;
use crate::space::CoordinateSpace;
use crate::util::{Vec2, Vec3};

/// Vertex and triangle buffers in host space, ready for a scene writer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostMeshData {
    pub positions: Vec<Vec3>,
    /// Empty when the file has no normals.
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec<Vec2>>,
    /// Host winding.
    pub triangles: Vec<[u32; 3]>,
}

impl HostMeshData {
    /// Convert a mesh block: positions and normals through the space, V
    /// flipped, winding reversed. Tangents are not carried; hosts rebuild them.
    pub fn from_block(block: &MeshBlock, space: &CoordinateSpace) -> Self {
        Self {
            positions: block.positions.iter().map(|&p| space.point(p)).collect(),
            normals: block.normals.iter().map(|&n| space.vector(n)).collect(),
            uvs: block
                .uvs
                .iter()
                .map(|channel| channel.iter().map(|&uv| space.uv(uv)).collect())
                .collect(),
            triangles: block
                .triangles
                .chunks_exact(3)
                .map(|t| space.triangle([t[0], t[1], t[2]]))
                .collect(),
        }
    }
}
