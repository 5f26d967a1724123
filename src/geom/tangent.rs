//! Per-vertex tangents from UV channel 0.

use crate::util::{round_vec3, Vec2, Vec3};

/// Accumulates triangle tangents onto a growing vertex buffer.
///
/// Vertices with a host-supplied tangent keep it; the rest get the
/// area-weighted sum of their triangles' tangents, orthonormalized against
/// the vertex normal.
#[derive(Debug, Default)]
pub(crate) struct TangentAccumulator {
    host: Vec<Option<Vec3>>,
    sum: Vec<Vec3>,
}

impl TangentAccumulator {
    /// Register a new vertex at the next index.
    pub fn add_vertex(&mut self, host: Option<Vec3>) {
        self.host.push(host);
        self.sum.push(Vec3::ZERO);
    }

    /// Add one triangle's UV-space tangent to its three vertices.
    pub fn add_triangle(&mut self, idx: [u32; 3], positions: &[Vec3], uvs: &[Vec2]) {
        let [a, b, c] = idx.map(|i| i as usize);
        let (Some(&p0), Some(&p1), Some(&p2)) = (positions.get(a), positions.get(b), positions.get(c)) else {
            return;
        };
        let (Some(&t0), Some(&t1), Some(&t2)) = (uvs.get(a), uvs.get(b), uvs.get(c)) else {
            return;
        };

        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let d1 = t1 - t0;
        let d2 = t2 - t0;
        let r = d1.x * d2.y - d2.x * d1.y;
        if r.abs() < f32::EPSILON {
            return;
        }
        let t = (e1 * d2.y - e2 * d1.y) / r;
        for i in [a, b, c] {
            self.sum[i] += t;
        }
    }

    /// Resolve final tangents. `digits` rounds computed tangents.
    pub fn finish(self, normals: &[Vec3], digits: Option<u32>) -> Vec<Vec3> {
        self.host
            .into_iter()
            .zip(self.sum)
            .enumerate()
            .map(|(i, (host, sum))| {
                if let Some(t) = host {
                    return t;
                }
                let n = normals.get(i).copied().unwrap_or(Vec3::Y).normalize_or(Vec3::Y);
                let t = (sum - n * n.dot(sum)).try_normalize().unwrap_or_else(|| n.any_orthonormal_vector());
                match digits {
                    Some(d) => round_vec3(t, d),
                    None => t,
                }
            })
            .collect()
    }
}
