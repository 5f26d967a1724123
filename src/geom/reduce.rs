//! Face-vertex deduplication.
//!
//! Hosts hand over geometry as faces of face-vertices ("corners"), each with
//! its own normal and UVs. The file wants one vertex buffer and a triangle
//! index list. Corners are merged when their source vertex, position, normal
//! and every UV agree after rounding to the configured decimal precision.

use smallvec::SmallVec;
use std::collections::HashMap;

use super::tangent::TangentAccumulator;
use crate::config::PdxConfig;
use crate::util::{round_vec2, round_vec3, to_fixed, Aabb, Error, Vec2, Vec3, Vec4};

/// Highest number of UV channels the format stores (`u0`..`u3`).
pub const MAX_UV_CHANNELS: usize = 4;

/// One face-vertex, in host space.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceVertex {
    /// Host vertex id shared by every corner of the same source vertex.
    pub vertex_id: u32,
    pub position: Vec3,
    pub normal: Vec3,
    /// Per channel UV; `None` where the corner is unmapped on that channel.
    pub uvs: SmallVec<[Option<Vec2>; MAX_UV_CHANNELS]>,
    /// Host tangent for UV channel 0, if the host provides one.
    pub tangent: Option<Vec3>,
}

impl FaceVertex {
    pub fn new(vertex_id: u32, position: Vec3, normal: Vec3) -> Self {
        Self { vertex_id, position, normal, uvs: SmallVec::new(), tangent: None }
    }

    pub fn with_uv(mut self, uv: Vec2) -> Self {
        self.uvs.push(Some(uv));
        self
    }
}

/// A polygon of corners.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceFace {
    pub corners: Vec<FaceVertex>,
    /// Host triangulation as corner indices. Empty means fan triangulation.
    pub triangles: Vec<[usize; 3]>,
}

impl SourceFace {
    pub fn new(corners: Vec<FaceVertex>) -> Self {
        Self { corners, triangles: Vec::new() }
    }

    /// Triangles as corner indices, host winding.
    pub fn triangulate(&self) -> Vec<[usize; 3]> {
        if !self.triangles.is_empty() {
            return self.triangles.clone();
        }
        (1..self.corners.len().saturating_sub(1)).map(|i| [0, i, i + 1]).collect()
    }
}

/// Host geometry for one material group of one shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceMesh {
    pub faces: Vec<SourceFace>,
    /// Number of UV sets the mesh uses.
    pub uv_channels: usize,
}

/// Deduplicated vertex buffer and triangle list, in file space.
#[derive(Debug, Default)]
pub struct ReducedMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Only filled when the mesh has at least one UV channel. `w` is always 1.
    pub tangents: Vec<Vec4>,
    /// One buffer per UV channel.
    pub uvs: Vec<Vec<Vec2>>,
    /// Triangle indices, file winding.
    pub triangles: Vec<u32>,
    /// Source vertex id of each output vertex, first-seen order. Used to
    /// align skin weights with the vertex buffer.
    pub source_vertex_ids: Vec<u32>,
    pub aabb: Aabb,
    /// Tolerated anomalies (geometry errors), in encounter order.
    pub issues: Vec<Error>,
}

impl ReducedMesh {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }
}

/// Dedup key: the corner's attributes at fixed decimal precision.
#[derive(Clone, PartialEq, Eq, Hash)]
struct VertexKey {
    vertex_id: u32,
    position: [i64; 3],
    normal: [i64; 3],
    uvs: SmallVec<[[i64; 2]; MAX_UV_CHANNELS]>,
}

/// A corner converted to file space, ready to key and store.
struct Corner {
    position: Vec3,
    normal: Vec3,
    uvs: SmallVec<[Vec2; MAX_UV_CHANNELS]>,
    tangent: Option<Vec3>,
}

/// Builds a [`ReducedMesh`] from host faces.
pub struct GeometryReducer<'a> {
    config: &'a PdxConfig,
    merge_vertices: bool,
}

impl<'a> GeometryReducer<'a> {
    pub fn new(config: &'a PdxConfig) -> Self {
        Self { config, merge_vertices: true }
    }

    /// When off, every triangle corner becomes its own vertex.
    pub fn merge_vertices(mut self, merge: bool) -> Self {
        self.merge_vertices = merge;
        self
    }

    /// Reduce one mesh. Never fails: unmapped UVs become `(0, 0)` and host
    /// triangles naming a missing corner are dropped, both reported in
    /// [`ReducedMesh::issues`].
    pub fn reduce(&self, mesh: &SourceMesh) -> ReducedMesh {
        let channels = mesh.uv_channels.min(MAX_UV_CHANNELS);
        if mesh.uv_channels > MAX_UV_CHANNELS {
            tracing::warn!("mesh has {} UV sets, only {} are stored", mesh.uv_channels, MAX_UV_CHANNELS);
        }

        let mut out = ReducedMesh { uvs: vec![Vec::new(); channels], ..Default::default() };
        let mut lookup: HashMap<VertexKey, u32> = HashMap::new();
        let mut tangents = TangentAccumulator::default();

        for face in &mesh.faces {
            let tris = face.triangulate();
            if tris.is_empty() {
                tracing::debug!("skipping degenerate face with {} corners", face.corners.len());
            }

            for tri in tris {
                if let Some(&corner) = tri.iter().find(|&&c| c >= face.corners.len()) {
                    tracing::debug!("skipping triangle {:?} of a face with {} corners", tri, face.corners.len());
                    out.issues.push(Error::InvalidTriangle { corner, corners: face.corners.len() });
                    continue;
                }

                let mut idx = [0u32; 3];
                for (slot, &corner_index) in tri.iter().enumerate() {
                    let src = &face.corners[corner_index];
                    let corner = self.convert(src, channels, &mut out.issues);
                    let key = self.key(src.vertex_id, &corner);

                    let existing = if self.merge_vertices { lookup.get(&key).copied() } else { None };
                    idx[slot] = match existing {
                        Some(i) => i,
                        None => {
                            let i = out.positions.len() as u32;
                            out.positions.push(corner.position);
                            out.normals.push(corner.normal);
                            for (c, uv) in corner.uvs.iter().enumerate() {
                                out.uvs[c].push(*uv);
                            }
                            out.source_vertex_ids.push(src.vertex_id);
                            if channels > 0 {
                                tangents.add_vertex(corner.tangent);
                            }
                            lookup.entry(key).or_insert(i);
                            i
                        }
                    };
                }

                if channels > 0 {
                    tangents.add_triangle(idx, &out.positions, &out.uvs[0]);
                }
                out.triangles.extend(self.config.space.triangle(idx));
            }
        }

        if channels > 0 {
            let digits = self.config.round_data.then_some(self.config.decimal_digits);
            out.tangents = tangents
                .finish(&out.normals, digits)
                .into_iter()
                .map(|t| t.extend(1.0))
                .collect();
        }

        // Bounds come from the final vertex set, not the source vertices.
        out.aabb = Aabb::from_points(&out.positions);

        for issue in &out.issues {
            tracing::warn!("{}", issue);
        }
        out
    }

    fn convert(&self, src: &FaceVertex, channels: usize, issues: &mut Vec<Error>) -> Corner {
        let space = &self.config.space;
        let digits = self.config.decimal_digits;
        let round = self.config.round_data;

        let mut position = space.point(src.position);
        let mut normal = space.vector(src.normal);
        let mut tangent = src.tangent.map(|t| space.vector(t));
        if round {
            position = round_vec3(position, digits);
            normal = round_vec3(normal, digits);
            tangent = tangent.map(|t| round_vec3(t, digits));
        }

        let mut uvs = SmallVec::new();
        for channel in 0..channels {
            let uv = match src.uvs.get(channel).copied().flatten() {
                Some(uv) => {
                    let uv = space.uv(uv);
                    if round { round_vec2(uv, digits) } else { uv }
                }
                None => {
                    issues.push(Error::UnmappedUv { vertex_id: src.vertex_id, channel });
                    Vec2::ZERO
                }
            };
            uvs.push(uv);
        }

        Corner { position, normal, uvs, tangent }
    }

    fn key(&self, vertex_id: u32, c: &Corner) -> VertexKey {
        let d = self.config.decimal_digits;
        let v3 = |v: Vec3| [to_fixed(v.x, d), to_fixed(v.y, d), to_fixed(v.z, d)];
        VertexKey {
            vertex_id,
            position: v3(c.position),
            normal: v3(c.normal),
            uvs: c.uvs.iter().map(|uv| [to_fixed(uv.x, d), to_fixed(uv.y, d)]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ErrorKind;

    /// Unit cube, flat normals, one UV set with a per-face quad layout.
    pub(crate) fn cube() -> SourceMesh {
        let p = [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ];
        let faces: [([u32; 4], Vec3); 6] = [
            ([0, 3, 2, 1], Vec3::NEG_Z),
            ([4, 5, 6, 7], Vec3::Z),
            ([0, 1, 5, 4], Vec3::NEG_Y),
            ([3, 7, 6, 2], Vec3::Y),
            ([0, 4, 7, 3], Vec3::NEG_X),
            ([1, 2, 6, 5], Vec3::X),
        ];
        let quad_uv = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)];
        SourceMesh {
            faces: faces
                .iter()
                .map(|(ids, n)| {
                    SourceFace::new(
                        ids.iter()
                            .zip(quad_uv)
                            .map(|(&id, uv)| FaceVertex::new(id, p[id as usize], *n).with_uv(uv))
                            .collect(),
                    )
                })
                .collect(),
            uv_channels: 1,
        }
    }

    /// Octahedron with smooth (per-vertex) normals and no UVs.
    fn octahedron() -> SourceMesh {
        let p = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        let tris: [[u32; 3]; 8] = [
            [0, 2, 4], [4, 2, 1], [1, 2, 5], [5, 2, 0],
            [4, 3, 0], [1, 3, 4], [5, 3, 1], [0, 3, 5],
        ];
        SourceMesh {
            faces: tris
                .iter()
                .map(|t| SourceFace::new(t.iter().map(|&i| FaceVertex::new(i, p[i as usize], p[i as usize])).collect()))
                .collect(),
            uv_channels: 0,
        }
    }

    #[test]
    fn test_cube_flat_normals() {
        let config = PdxConfig::default();
        let r = GeometryReducer::new(&config).reduce(&cube());
        assert_eq!(r.vertex_count(), 24);
        assert_eq!(r.triangles.len(), 36);
        assert_eq!(r.tangents.len(), 24);
        assert_eq!(r.uvs.len(), 1);
        assert_eq!(r.uvs[0].len(), 24);
        assert!(r.tangents.iter().all(|t| t.w == 1.0));
        assert!(r.issues.is_empty());
    }

    #[test]
    fn test_no_merge_splits_every_corner() {
        let config = PdxConfig::default();
        let r = GeometryReducer::new(&config).merge_vertices(false).reduce(&cube());
        assert_eq!(r.vertex_count(), 36);
        assert_eq!(r.triangles, (0..36).map(|i| [0, 2, 1][i % 3] + (i / 3) * 3).map(|i| i as u32).collect::<Vec<_>>());
    }

    #[test]
    fn test_smooth_mesh_keeps_source_vertex_count() {
        let config = PdxConfig::default();
        let r = GeometryReducer::new(&config).reduce(&octahedron());
        assert_eq!(r.vertex_count(), 6);
        assert_eq!(r.triangle_count(), 8);
        assert!(r.tangents.is_empty());
        assert!(r.uvs.is_empty());
    }

    #[test]
    fn test_source_ids_first_seen() {
        let config = PdxConfig::default();
        let r = GeometryReducer::new(&config).reduce(&octahedron());
        assert_eq!(r.source_vertex_ids, vec![0, 2, 4, 1, 5, 3]);
    }

    #[test]
    fn test_winding_and_space() {
        let config = PdxConfig::default();
        let mesh = SourceMesh {
            faces: vec![SourceFace::new(vec![
                FaceVertex::new(0, Vec3::new(0.0, 0.0, 1.0), Vec3::Z).with_uv(Vec2::new(0.0, 0.25)),
                FaceVertex::new(1, Vec3::new(1.0, 0.0, 1.0), Vec3::Z).with_uv(Vec2::new(1.0, 0.25)),
                FaceVertex::new(2, Vec3::new(0.0, 1.0, 1.0), Vec3::Z).with_uv(Vec2::new(0.0, 1.0)),
            ])],
            uv_channels: 1,
        };
        let r = GeometryReducer::new(&config).reduce(&mesh);
        assert_eq!(r.triangles, vec![0, 2, 1]);
        assert_eq!(r.positions[0], Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(r.normals[0], Vec3::NEG_Z);
        assert_eq!(r.uvs[0][0], Vec2::new(0.0, 0.75));
    }

    #[test]
    fn test_rounding_merges_float_noise() {
        let config = PdxConfig::default();
        let a = FaceVertex::new(0, Vec3::new(0.1 + 0.2, 0.0, 0.0), Vec3::Y);
        let b = FaceVertex::new(0, Vec3::new(0.3, 0.0, 0.0), Vec3::Y);
        let c = FaceVertex::new(1, Vec3::new(1.0, 0.0, 0.0), Vec3::Y);
        let d = FaceVertex::new(2, Vec3::new(0.0, 0.0, 1.0), Vec3::Y);
        let mesh = SourceMesh {
            faces: vec![
                SourceFace::new(vec![a, c.clone(), d.clone()]),
                SourceFace::new(vec![b, c, d]),
            ],
            uv_channels: 0,
        };
        let r = GeometryReducer::new(&config).reduce(&mesh);
        assert_eq!(r.vertex_count(), 3);
        assert_eq!(r.positions[0].x, 0.3);
    }

    #[test]
    fn test_same_position_different_source_id_not_merged() {
        let config = PdxConfig::default();
        let mesh = SourceMesh {
            faces: vec![SourceFace::new(vec![
                FaceVertex::new(0, Vec3::ZERO, Vec3::Y),
                FaceVertex::new(1, Vec3::ZERO, Vec3::Y),
                FaceVertex::new(2, Vec3::X, Vec3::Y),
            ])],
            uv_channels: 0,
        };
        assert_eq!(GeometryReducer::new(&config).reduce(&mesh).vertex_count(), 3);
    }

    #[test]
    fn test_unmapped_uv_substitutes_zero() {
        let config = PdxConfig::default();
        let mut unmapped = FaceVertex::new(2, Vec3::Z, Vec3::Y).with_uv(Vec2::new(0.5, 0.5));
        unmapped.uvs.push(None);
        let mesh = SourceMesh {
            faces: vec![SourceFace::new(vec![
                FaceVertex::new(0, Vec3::ZERO, Vec3::Y).with_uv(Vec2::ZERO).with_uv(Vec2::ONE),
                FaceVertex::new(1, Vec3::X, Vec3::Y).with_uv(Vec2::X).with_uv(Vec2::ONE),
                unmapped,
            ])],
            uv_channels: 2,
        };
        let r = GeometryReducer::new(&config).reduce(&mesh);
        assert_eq!(r.uvs.len(), 2);
        assert_eq!(r.uvs[1][2], Vec2::ZERO);
        assert_eq!(r.issues.len(), 1);
        assert_eq!(r.issues[0].kind(), ErrorKind::Geometry);
        assert!(matches!(r.issues[0], Error::UnmappedUv { vertex_id: 2, channel: 1 }));
    }

    #[test]
    fn test_aabb_after_dedup() {
        let config = PdxConfig::default();
        let mesh = SourceMesh {
            faces: vec![
                SourceFace::new(vec![
                    FaceVertex::new(0, Vec3::new(-1.0, 0.0, 3.0), Vec3::Y),
                    FaceVertex::new(1, Vec3::new(1.0, 2.0, 3.0), Vec3::Y),
                    FaceVertex::new(2, Vec3::new(0.0, 1.0, -3.0), Vec3::Y),
                ]),
            ],
            uv_channels: 0,
        };
        let r = GeometryReducer::new(&config).reduce(&mesh);
        assert_eq!(r.aabb.min, Vec3::new(-1.0, 0.0, -3.0));
        assert_eq!(r.aabb.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_fan_triangulation() {
        let face = SourceFace::new((0..5).map(|i| FaceVertex::new(i, Vec3::ZERO, Vec3::Y)).collect());
        assert_eq!(face.triangulate(), vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
        assert!(SourceFace::new(vec![]).triangulate().is_empty());
    }

    #[test]
    fn test_host_triangulation_used() {
        let config = PdxConfig::default();
        let p = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
        let mut face = SourceFace::new((0..4).map(|i| FaceVertex::new(i as u32, p[i], Vec3::Z)).collect());
        face.triangles = vec![[0, 1, 3], [1, 2, 3]];
        let mesh = SourceMesh { faces: vec![face], uv_channels: 0 };

        let r = GeometryReducer::new(&config).reduce(&mesh);
        assert_eq!(r.source_vertex_ids, vec![0, 1, 3, 2]);
        assert_eq!(r.triangles, vec![0, 2, 1, 1, 2, 3]);
        assert!(r.issues.is_empty());
    }

    #[test]
    fn test_out_of_range_triangle_skipped() {
        let config = PdxConfig::default();
        let p = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let mut face = SourceFace::new((0..3).map(|i| FaceVertex::new(i as u32, p[i], Vec3::Z)).collect());
        face.triangles = vec![[0, 1, 2], [1, 2, 7]];
        let mesh = SourceMesh { faces: vec![face], uv_channels: 0 };

        let r = GeometryReducer::new(&config).reduce(&mesh);
        assert_eq!(r.triangles, vec![0, 2, 1], "bad triangle must not reach the index buffer");
        assert_eq!(r.vertex_count(), 3);
        assert_eq!(r.issues.len(), 1);
        assert!(matches!(r.issues[0], Error::InvalidTriangle { corner: 7, corners: 3 }));
        assert_eq!(r.issues[0].kind(), ErrorKind::Geometry);
    }

    #[test]
    fn test_host_tangent_used() {
        let config = PdxConfig::default();
        let mut a = FaceVertex::new(0, Vec3::ZERO, Vec3::Y).with_uv(Vec2::ZERO);
        a.tangent = Some(Vec3::Z);
        let mesh = SourceMesh {
            faces: vec![SourceFace::new(vec![
                a,
                FaceVertex::new(1, Vec3::X, Vec3::Y).with_uv(Vec2::X),
                FaceVertex::new(2, Vec3::Z, Vec3::Y).with_uv(Vec2::Y),
            ])],
            uv_channels: 1,
        };
        let r = GeometryReducer::new(&config).reduce(&mesh);
        assert_eq!(r.tangents[0], Vec4::new(0.0, 0.0, -1.0, 1.0));
    }
}
