//! Geometry reduction and expansion.
//!
//! - [`GeometryReducer`] - host face-vertices to a deduplicated vertex buffer (export)
//! - [`HostMeshData`] - file mesh block back to host buffers (import)

mod expand;
mod reduce;
mod tangent;

pub use expand::HostMeshData;
pub use reduce::{FaceVertex, GeometryReducer, ReducedMesh, SourceFace, SourceMesh, MAX_UV_CHANNELS};
