//! In-memory host scene shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::f32::consts::PI;

use pdx_asset::geom::{FaceVertex, HostMeshData, SourceFace, SourceMesh};
use pdx_asset::scene::{
    HostKey, HostLocator, HostShape, HostSkeleton, HostTransform, ImportedMaterial, SceneReader, SceneWriter,
};
use pdx_asset::skeleton::ImportedBone;
use pdx_asset::skin::Influences;
use pdx_asset::util::{Vec2, Vec3};
use pdx_asset::{Error, Result};

/// A mesh as received by the writer.
#[derive(Debug, Clone)]
pub struct CreatedMesh {
    pub shape: String,
    pub mesh_index: usize,
    pub data: HostMeshData,
    pub material: Option<ImportedMaterial>,
    pub skin: Option<(Vec<String>, Vec<Influences>)>,
}

#[derive(Debug, Default)]
pub struct MockScene {
    // Reader side
    pub shapes: Vec<HostShape>,
    pub skeleton: HostSkeleton,
    pub locators: Vec<HostLocator>,
    pub animated: Vec<usize>,
    pub fps: f32,
    pub first_frame: i32,
    /// Per joint, one local transform per frame from `first_frame`.
    pub tracks: HashMap<usize, Vec<HostTransform>>,

    // Writer side
    pub joints: Vec<String>,
    pub skeletons: Vec<(String, Vec<ImportedBone>)>,
    pub meshes: Vec<CreatedMesh>,
    pub created_locators: Vec<HostLocator>,
    pub playback: Option<(f32, i32, i32)>,
    pub poses: HashMap<String, HostTransform>,
    pub keys: HashMap<String, Vec<(i32, HostKey)>>,
    pub clip_attrs: HashMap<String, String>,
}

impl MockScene {
    /// Writer scene that already contains the given joints.
    pub fn with_joints(names: &[&str]) -> Self {
        Self { joints: names.iter().map(|s| s.to_string()).collect(), ..Default::default() }
    }
}

impl SceneReader for MockScene {
    fn shapes(&self) -> Result<Vec<HostShape>> {
        Ok(self.shapes.clone())
    }

    fn skeleton(&self) -> Result<HostSkeleton> {
        Ok(self.skeleton.clone())
    }

    fn locators(&self) -> Result<Vec<HostLocator>> {
        Ok(self.locators.clone())
    }

    fn animated_joints(&self) -> Result<Vec<usize>> {
        Ok(self.animated.clone())
    }

    fn frame_rate(&self) -> f32 {
        self.fps
    }

    fn sample(&self, frame: i32, joints: &[usize]) -> Result<Vec<HostTransform>> {
        let i = (frame - self.first_frame) as usize;
        Ok(joints
            .iter()
            .map(|j| {
                self.tracks
                    .get(j)
                    .and_then(|t| t.get(i).copied())
                    .unwrap_or_default()
            })
            .collect())
    }
}

impl SceneWriter for MockScene {
    type Mesh = usize;

    fn create_skeleton(&mut self, shape: &str, bones: &[ImportedBone]) -> Result<()> {
        for bone in bones {
            if !self.joints.contains(&bone.name) {
                self.joints.push(bone.name.clone());
            }
        }
        self.skeletons.push((shape.to_string(), bones.to_vec()));
        Ok(())
    }

    fn create_mesh(&mut self, shape: &str, mesh_index: usize, data: &HostMeshData) -> Result<usize> {
        self.meshes.push(CreatedMesh {
            shape: shape.to_string(),
            mesh_index,
            data: data.clone(),
            material: None,
            skin: None,
        });
        Ok(self.meshes.len() - 1)
    }

    fn assign_material(&mut self, mesh: usize, material: &ImportedMaterial) -> Result<()> {
        self.meshes[mesh].material = Some(material.clone());
        Ok(())
    }

    fn bind_skin(&mut self, mesh: usize, bones: &[String], influences: &[Influences]) -> Result<()> {
        self.meshes[mesh].skin = Some((bones.to_vec(), influences.to_vec()));
        Ok(())
    }

    fn has_joint(&self, name: &str) -> bool {
        self.joints.iter().any(|j| j == name)
    }

    fn create_locator(&mut self, locator: &HostLocator) -> Result<()> {
        self.created_locators.push(locator.clone());
        Ok(())
    }

    fn set_playback(&mut self, fps: f32, start: i32, end: i32) -> Result<()> {
        self.playback = Some((fps, start, end));
        Ok(())
    }

    fn set_pose(&mut self, joint: &str, pose: &HostTransform) -> Result<()> {
        if !self.has_joint(joint) {
            return Err(Error::MissingBones(vec![joint.to_string()]));
        }
        self.poses.insert(joint.to_string(), *pose);
        Ok(())
    }

    fn set_key(&mut self, joint: &str, frame: i32, key: &HostKey) -> Result<()> {
        self.keys.entry(joint.to_string()).or_default().push((frame, *key));
        Ok(())
    }

    fn clips(&self, root: &str) -> Option<String> {
        self.clip_attrs.get(root).cloned()
    }

    fn set_clips(&mut self, root: &str, clips: &str) -> Result<()> {
        self.clip_attrs.insert(root.to_string(), clips.to_string());
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

/// Cube with 8 corner vertices, flat per-face normals and one UV set.
pub fn cube() -> SourceMesh {
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

/// UV sphere on a `(rings + 1) x (segments + 1)` vertex grid with smooth
/// normals. Every grid vertex is its own source vertex.
pub fn uv_sphere(rings: u32, segments: u32) -> (SourceMesh, usize) {
    let columns = segments + 1;
    let vertex = |r: u32, s: u32| {
        let theta = PI * r as f32 / rings as f32;
        let phi = 2.0 * PI * s as f32 / segments as f32;
        let p = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
        let uv = Vec2::new(s as f32 / segments as f32, r as f32 / rings as f32);
        FaceVertex::new(r * columns + s, p, p).with_uv(uv)
    };

    let mut faces = Vec::new();
    for r in 0..rings {
        for s in 0..segments {
            faces.push(SourceFace::new(vec![
                vertex(r, s),
                vertex(r + 1, s),
                vertex(r + 1, s + 1),
                vertex(r, s + 1),
            ]));
        }
    }
    let count = ((rings + 1) * columns) as usize;
    (SourceMesh { faces, uv_channels: 1 }, count)
}

/// Single triangle with exactly representable values.
pub fn triangle(ids: [u32; 3], positions: [Vec3; 3]) -> SourceFace {
    let uvs = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 0.5)];
    SourceFace::new(
        ids.iter()
            .zip(positions)
            .zip(uvs)
            .map(|((&id, p), uv)| FaceVertex::new(id, p, Vec3::Y).with_uv(uv))
            .collect(),
    )
}
