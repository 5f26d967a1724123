//! End-to-end export and import.
//!
//! Export: [`SceneReader`](crate::scene::SceneReader) → reducer → skin packer
//! → schema → codec → file. Import runs the other way and drives a
//! [`SceneWriter`](crate::scene::SceneWriter). Each call is one linear pass
//! with no state kept between calls.

mod export;
mod import;

pub use export::{build_anim_file, build_mesh_file, export_animation, export_mesh, DEFAULT_MESH_INDEX};
pub use import::{apply_anim_file, apply_mesh_file, clean_imported_name, import_animation, import_mesh};
