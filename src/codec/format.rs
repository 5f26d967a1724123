//! PDX binary container constants.

/// Magic bytes at the start of a PDX file.
pub const PDX_MAGIC: &[u8; 4] = b"@@b@";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Marker opening a node record, followed by a NUL-terminated name.
pub const NODE_START: u8 = b'[';

/// Marker closing the most recently opened node.
pub const NODE_END: u8 = b']';

/// Marker opening an attribute record.
pub const ATTRIBUTE: u8 = b'!';

/// Longest attribute name (length is stored in one byte).
pub const MAX_ATTRIBUTE_NAME: usize = u8::MAX as usize;

/// Size of one int or float element.
pub const ELEMENT_SIZE: usize = 4;
