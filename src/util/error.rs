//! Error types for the PDX asset library.

use thiserror::Error;

/// Taxonomy class of an [`Error`].
///
/// Format and schema errors abort the whole file operation. Skeleton and skin
/// errors abort the operation because bone indices cannot be trusted. Geometry
/// errors are recovered locally and only ever show up as collected issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or truncated binary stream.
    Format,
    /// Structurally missing or mistyped attribute.
    Schema,
    /// No single root, or an invalid bone order.
    Skeleton,
    /// Influence that cannot be expressed in the packed skin layout.
    Skin,
    /// Per-vertex anomaly, substituted with a safe default.
    Geometry,
    /// Filesystem access.
    Io,
}

/// Main error type for PDX operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid magic bytes at start of stream
    #[error("Invalid PDX file: expected '@@b@' magic bytes")]
    InvalidMagic,

    /// Stream is truncated
    #[error("Unexpected end of data at offset {offset} (need {need} more bytes)")]
    UnexpectedEof { offset: usize, need: usize },

    /// Attribute element type tag is not one of `i`, `f`, `s`
    #[error("Unknown attribute type tag 0x{tag:02x} at offset {offset}")]
    UnknownTypeTag { tag: u8, offset: usize },

    /// Record marker is not one of `[`, `]`, `!`
    #[error("Unknown record marker 0x{marker:02x} at offset {offset}")]
    UnknownMarker { marker: u8, offset: usize },

    /// Attribute payload disagrees with its declared element count
    #[error("Attribute '{name}' declares {declared} but holds {actual}")]
    LengthMismatch { name: String, declared: usize, actual: usize },

    /// Node or attribute name is empty or not terminated
    #[error("Invalid record name at offset {offset}")]
    InvalidName { offset: usize },

    /// Bytes left after the root node was closed
    #[error("Trailing data after root node at offset {offset}")]
    TrailingData { offset: usize },

    /// `pdxasset` version is not one we read
    #[error("Unsupported PDX asset version {major}.{minor}")]
    UnsupportedVersion { major: i32, minor: i32 },

    /// Node lacks an attribute it structurally requires
    #[error("Node '{node}' is missing required attribute '{attribute}'")]
    MissingAttribute { node: String, attribute: String },

    /// Node lacks a child it structurally requires
    #[error("Node '{parent}' is missing required child '{node}'")]
    MissingNode { parent: String, node: String },

    /// Attribute exists but has the wrong type or shape
    #[error("Invalid attribute '{attribute}' on '{node}': {reason}")]
    InvalidAttribute { node: String, attribute: String, reason: String },

    /// Clip table string could not be parsed
    #[error("Invalid animation clip entry: {0}")]
    InvalidClip(String),

    /// No clip with that name
    #[error("Animation clip not found: {0}")]
    ClipNotFound(String),

    /// Packed sample stream ran out before every bone and frame was read
    #[error("Sample stream '{channel}' exhausted at frame {frame} (bone '{bone}')")]
    SampleUnderflow { channel: char, frame: usize, bone: String },

    /// Frame range is empty or reversed
    #[error("Invalid animation range ({start}, {end})")]
    InvalidFrameRange { start: i32, end: i32 },

    /// No bones were given to resolve
    #[error("Unable to resolve a skeleton from an empty bone set")]
    EmptySkeleton,

    /// Input bones belong to more than one hierarchy
    #[error("Unable to resolve a single root bone for the skeleton: {0:?}")]
    MultipleRoots(Vec<String>),

    /// The single root is flagged as ignored
    #[error("Root bone '{0}' is flagged as ignored")]
    IgnoredRoot(String),

    /// Bone records are not parent-before-child
    #[error("Bone '{bone}' at index {index} has invalid parent {parent:?}")]
    InvalidBoneOrder { bone: String, index: usize, parent: Option<i32> },

    /// Animated bones not present in the scene
    #[error("Missing bones required for animation: {0:?}")]
    MissingBones(Vec<String>),

    /// Skinned bone is not part of the resolved hierarchy
    #[error("Skinned bone '{bone}' on mesh '{mesh}' is excluded from export, check its ignore flag")]
    SkinBoneExcluded { bone: String, mesh: String },

    /// Vertex has more non-zero influences than the packed width
    #[error("Vertex {vertex} has {count} influences (max {max})")]
    TooManyInfluences { vertex: usize, count: usize, max: usize },

    /// Face-vertex without a UV on a set the mesh uses (zero substituted)
    #[error("Vertex {vertex_id} has no UV on channel {channel}, using (0, 0)")]
    UnmappedUv { vertex_id: u32, channel: usize },

    /// Host triangle naming a corner the face does not have (triangle skipped)
    #[error("Triangle corner {corner} out of range for a face with {corners} corners, triangle skipped")]
    InvalidTriangle { corner: usize, corners: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Create a missing attribute error.
    pub fn missing(node: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute { node: node.into(), attribute: attribute.into() }
    }

    /// Create an invalid attribute error.
    pub fn invalid(
        node: impl Into<String>,
        attribute: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            node: node.into(),
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMagic
            | Self::UnexpectedEof { .. }
            | Self::UnknownTypeTag { .. }
            | Self::UnknownMarker { .. }
            | Self::LengthMismatch { .. }
            | Self::InvalidName { .. }
            | Self::TrailingData { .. }
            | Self::Utf8(_) => ErrorKind::Format,
            Self::UnsupportedVersion { .. }
            | Self::MissingAttribute { .. }
            | Self::MissingNode { .. }
            | Self::InvalidAttribute { .. }
            | Self::InvalidClip(_)
            | Self::ClipNotFound(_)
            | Self::SampleUnderflow { .. }
            | Self::InvalidFrameRange { .. } => ErrorKind::Schema,
            Self::EmptySkeleton
            | Self::MultipleRoots(_)
            | Self::IgnoredRoot(_)
            | Self::InvalidBoneOrder { .. }
            | Self::MissingBones(_) => ErrorKind::Skeleton,
            Self::SkinBoneExcluded { .. } | Self::TooManyInfluences { .. } => ErrorKind::Skin,
            Self::UnmappedUv { .. } | Self::InvalidTriangle { .. } => ErrorKind::Geometry,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether this error aborts the current file operation.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::Geometry
    }
}

/// Result type alias for PDX operations.
pub type Result<T> = std::result::Result<T, Error>;
