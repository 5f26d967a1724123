//! # pdx-asset
//!
//! Reader, writer and geometry normalization for PDX engine assets
//! (`.mesh` / `.anim`).
//!
//! ## Modules
//!
//! - [`tree`] - Tagged-attribute tree, the in-memory form of a file
//! - [`codec`] - Binary container encode/decode
//! - [`schema`] - Tree to domain objects (meshes, skeletons, skins, locators, animation)
//! - [`geom`] - Vertex deduplication and tangents
//! - [`skeleton`] - Bone hierarchy linearization
//! - [`skin`] - Fixed-width skin weight packing
//! - [`anim`] - Animation sample packing and clip table
//! - [`space`] - File/host coordinate conversion
//! - [`scene`] - Host scene adapter traits
//! - [`pipeline`] - Export and import passes
//!
//! ## Example
//!
//! ```ignore
//! use pdx_asset::prelude::*;
//!
//! let root = pdx_asset::codec::read_file("body.mesh")?;
//! let mesh = MeshFile::from_tree(&root)?;
//!
//! for shape in &mesh.shapes {
//!     println!("{}: {} meshes, {} bones", shape.name, shape.meshes.len(), shape.skeleton.len());
//! }
//! ```

pub mod util;
pub mod tree;
pub mod codec;
pub mod schema;
pub mod geom;
pub mod skeleton;
pub mod skin;
pub mod anim;
pub mod space;
pub mod config;
pub mod scene;
pub mod pipeline;

// Re-export commonly used types
pub use config::{ExportOptions, ImportOptions, PdxConfig};
pub use tree::{AttributeValue, TaggedNode};
pub use util::{Error, ErrorKind, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::anim::{AnimClip, ClipTable};
    pub use crate::codec::{decode, encode, read_file, write_file};
    pub use crate::config::{ExportOptions, ImportOptions, PdxConfig};
    pub use crate::pipeline::*;
    pub use crate::scene::{SceneReader, SceneWriter};
    pub use crate::schema::{AnimFile, MeshFile};
    pub use crate::space::CoordinateSpace;
    pub use crate::tree::{AttributeValue, TaggedNode};
    pub use crate::util::{Error, ErrorKind, Result};
}
