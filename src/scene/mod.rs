//! Host scene adapters.
//!
//! The codec never sees a concrete scene graph. Export queries a
//! [`SceneReader`]; import drives a [`SceneWriter`]. Everything crossing these
//! traits is in host space; conversion to file space happens in the pipelines.

use smallvec::SmallVec;
use std::path::PathBuf;

use crate::geom::{HostMeshData, SourceMesh};
use crate::skeleton::ImportedBone;
use crate::skin::Influences;
use crate::util::{Affine3A, Quat, Result, Vec3};

/// Local transform of a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl HostTransform {
    pub const IDENTITY: Self = Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE };

    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for HostTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A joint of the host hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct HostJoint {
    pub name: String,
    /// Index of the parent joint in [`HostSkeleton::joints`].
    pub parent: Option<usize>,
    /// World (bind) transform.
    pub world: Affine3A,
    /// Excluded from export. Its children are kept.
    pub ignored: bool,
}

/// Every joint the host knows about, in declaration order. Children of a
/// joint are the later joints naming it as parent, in the order they appear.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostSkeleton {
    pub joints: Vec<HostJoint>,
}

impl HostSkeleton {
    /// Append a joint and return its index.
    pub fn add(&mut self, name: &str, parent: Option<usize>, world: Affine3A) -> usize {
        self.joints.push(HostJoint { name: name.to_string(), parent, world, ignored: false });
        self.joints.len() - 1
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Children of every joint, declaration order.
    pub fn child_lists(&self) -> Vec<Vec<usize>> {
        let mut children = vec![Vec::new(); self.joints.len()];
        for (i, joint) in self.joints.iter().enumerate() {
            if let Some(p) = joint.parent.filter(|&p| p < self.joints.len()) {
                children[p].push(i);
            }
        }
        children
    }
}

/// Host material. `shader` is `None` for materials that are not engine
/// materials; those groups are not exported.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostMaterial {
    pub name: String,
    pub shader: Option<String>,
    pub diffuse: Option<PathBuf>,
    pub normal: Option<PathBuf>,
    pub specular: Option<PathBuf>,
}

/// Faces of one shape sharing a material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostMeshGroup {
    pub material: HostMaterial,
    pub mesh: SourceMesh,
}

/// Joint influences per source vertex id, as `(joint index, weight)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostSkin {
    pub influences: Vec<SmallVec<[(usize, f32); 4]>>,
}

/// A mesh shape and its material groups.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostShape {
    pub name: String,
    /// Engine draw order. Unset shapes sort last.
    pub mesh_index: Option<u32>,
    pub groups: Vec<HostMeshGroup>,
    pub skin: Option<HostSkin>,
}

/// A locator, local transform.
#[derive(Clone, Debug, PartialEq)]
pub struct HostLocator {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    /// Joint the locator hangs from.
    pub parent: Option<String>,
}

/// A material as created on import. Texture paths are resolved against the
/// file's directory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMaterial {
    pub shader: String,
    pub diffuse: Option<PathBuf>,
    pub normal: Option<PathBuf>,
    pub specular: Option<PathBuf>,
}

/// One animation key. Channels that are not animated are `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HostKey {
    pub translation: Option<Vec3>,
    pub rotation: Option<Quat>,
    pub scale: Option<f32>,
}

/// Read access to a host scene (export).
pub trait SceneReader {
    /// Mesh shapes to export.
    fn shapes(&self) -> Result<Vec<HostShape>>;

    /// The joint hierarchy skins and animation refer to.
    fn skeleton(&self) -> Result<HostSkeleton>;

    fn locators(&self) -> Result<Vec<HostLocator>>;

    /// Joints selected for animation export, as skeleton indices.
    fn animated_joints(&self) -> Result<Vec<usize>>;

    /// Scene frame rate.
    fn frame_rate(&self) -> f32;

    /// Local transforms of `joints` at `frame`, same order.
    fn sample(&self, frame: i32, joints: &[usize]) -> Result<Vec<HostTransform>>;
}

/// Write access to a host scene (import).
pub trait SceneWriter {
    /// Handle to a created mesh.
    type Mesh: Copy;

    /// Create (or reuse) joints for a shape's skeleton. Bones arrive parent
    /// first.
    fn create_skeleton(&mut self, shape: &str, bones: &[ImportedBone]) -> Result<()>;

    fn create_mesh(&mut self, shape: &str, mesh_index: usize, data: &HostMeshData) -> Result<Self::Mesh>;

    fn assign_material(&mut self, mesh: Self::Mesh, material: &ImportedMaterial) -> Result<()>;

    /// Bind a skin. `bones` holds joint names by bone index.
    fn bind_skin(&mut self, mesh: Self::Mesh, bones: &[String], influences: &[Influences]) -> Result<()>;

    fn has_joint(&self, name: &str) -> bool;

    fn create_locator(&mut self, locator: &HostLocator) -> Result<()>;

    fn set_playback(&mut self, fps: f32, start: i32, end: i32) -> Result<()>;

    /// Set a joint's rest pose before keys are written.
    fn set_pose(&mut self, joint: &str, pose: &HostTransform) -> Result<()>;

    fn set_key(&mut self, joint: &str, frame: i32, key: &HostKey) -> Result<()>;

    /// Clip table string stored on a skeleton root.
    fn clips(&self, root: &str) -> Option<String>;

    fn set_clips(&mut self, root: &str, clips: &str) -> Result<()>;
}
