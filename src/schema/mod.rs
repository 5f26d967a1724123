//! Asset schema mapper.
//!
//! Interprets a [`TaggedNode`] tree as PDX domain objects and back. This is
//! the only place that knows the attribute-name contract; the codec below it
//! is content-agnostic and the pipelines above it never touch raw nodes.
//!
//! Mapping is pure: no logging beyond version warnings, no I/O.

mod anim;
mod mesh;

pub use anim::*;
pub use mesh::*;

use bytemuck::Pod;

use crate::tree::TaggedNode;
use crate::util::{Error, Result, Vec2, Vec3, Vec4};

/// Format version written by this crate.
pub const PDX_VERSION: [i32; 2] = [1, 0];

/// Node and attribute names. Stable, shared with the engine.
pub mod names {
    pub const ROOT: &str = "File";
    pub const VERSION: &str = "pdxasset";

    pub const OBJECT: &str = "object";
    pub const MESH: &str = "mesh";
    pub const AABB: &str = "aabb";
    pub const MATERIAL: &str = "material";
    pub const SKIN: &str = "skin";
    pub const SKELETON: &str = "skeleton";
    pub const LOCATOR: &str = "locator";
    pub const INFO: &str = "info";
    pub const SAMPLES: &str = "samples";

    pub const POSITION: &str = "p";
    pub const NORMAL: &str = "n";
    pub const TANGENT: &str = "ta";
    pub const UV: [&str; 4] = ["u0", "u1", "u2", "u3"];
    pub const TRIANGLES: &str = "tri";
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";

    pub const SHADER: &str = "shader";
    pub const DIFFUSE: &str = "diff";
    pub const NORMAL_MAP: &str = "n";
    pub const SPECULAR: &str = "spec";

    pub const BONES: &str = "bones";
    pub const INDEX: &str = "ix";
    pub const WEIGHT: &str = "w";
    pub const PARENT: &str = "pa";
    pub const TRANSFORM: &str = "tx";

    pub const ROTATION: &str = "q";

    pub const FPS: &str = "fps";
    pub const SAMPLE_ATTRS: &str = "sa";
    pub const JOINTS: &str = "j";
    pub const TRANSLATE: &str = "t";
    pub const SCALE: &str = "s";
}

/// Create an empty root node carrying the current version.
pub fn new_root() -> TaggedNode {
    TaggedNode::new(names::ROOT).with_attr(names::VERSION, PDX_VERSION.to_vec())
}

/// Check the `pdxasset` version of a root node.
///
/// Only major version 1 is understood. A newer minor is accepted with a
/// warning since minors only add attributes.
pub fn check_version(root: &TaggedNode) -> Result<()> {
    let version = root.require_ints(names::VERSION)?;
    let (major, minor) = match version {
        [major, minor, ..] => (*major, *minor),
        _ => return Err(Error::invalid(&root.name, names::VERSION, "expected [major, minor]")),
    };
    if major != PDX_VERSION[0] {
        return Err(Error::UnsupportedVersion { major, minor });
    }
    if minor != PDX_VERSION[1] {
        tracing::warn!("reading pdxasset {}.{} as {}.{}", major, minor, PDX_VERSION[0], PDX_VERSION[1]);
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Flat array helpers
// ----------------------------------------------------------------------------

/// Flatten vectors into their float components.
pub(crate) fn flatten<T: Pod>(values: &[T]) -> Vec<f32> {
    bytemuck::cast_slice(values).to_vec()
}

fn chunked<T>(node: &TaggedNode, name: &str, data: &[f32], width: usize, f: impl Fn(&[f32]) -> T) -> Result<Vec<T>> {
    if data.len() % width != 0 {
        return Err(Error::invalid(
            &node.name,
            name,
            format!("{} floats is not a multiple of {}", data.len(), width),
        ));
    }
    Ok(data.chunks_exact(width).map(f).collect())
}

pub(crate) fn vec2s(node: &TaggedNode, name: &str, data: &[f32]) -> Result<Vec<Vec2>> {
    chunked(node, name, data, 2, Vec2::from_slice)
}

pub(crate) fn vec3s(node: &TaggedNode, name: &str, data: &[f32]) -> Result<Vec<Vec3>> {
    chunked(node, name, data, 3, Vec3::from_slice)
}

pub(crate) fn vec4s(node: &TaggedNode, name: &str, data: &[f32]) -> Result<Vec<Vec4>> {
    chunked(node, name, data, 4, Vec4::from_slice)
}

/// Exactly one vec3 attribute.
pub(crate) fn require_vec3(node: &TaggedNode, name: &str) -> Result<Vec3> {
    match node.require_floats(name)? {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        other => Err(Error::invalid(&node.name, name, format!("expected 3 floats, got {}", other.len()))),
    }
}
