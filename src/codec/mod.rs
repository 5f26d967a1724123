//! PDX binary container codec.
//!
//! Content-agnostic: the codec only knows nodes and typed attribute arrays.
//! Version checks and attribute meaning live in [`crate::schema`].
//!
//! ## File Structure
//!
//! ```text
//! +---------------------------+
//! | Magic: "@@b@"             |  4 bytes
//! +---------------------------+
//! | '[' name '\0'             |  root node start
//! |   '!' len name tag count  |  attribute: u8 name length, type tag
//! |       elements...         |  ('i' i32 / 'f' f32 / 's' u32-len + bytes + '\0'), LE
//! |   '[' child '\0' ... ']'  |  nested nodes
//! | ']'                       |  root node end
//! +---------------------------+
//! ```

mod format;
mod reader;
mod writer;

pub use format::*;
pub use reader::*;
pub use writer::*;

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::tree::TaggedNode;
use crate::util::Result;

/// Read and decode a PDX file.
pub fn read_file(path: impl AsRef<Path>) -> Result<TaggedNode> {
    let path = path.as_ref();
    let file = File::open(path)?;

    #[cfg(feature = "mmap")]
    {
        let size = file.metadata()?.len();
        if size > 0 {
            // Safety: the file is opened read-only and only read for the duration of decode
            let mmap = unsafe { memmap2::Mmap::map(&file) }?;
            tracing::debug!("read {} ({} bytes, mmap)", path.display(), mmap.len());
            return decode(&mmap);
        }
    }

    let mut data = Vec::new();
    (&file).read_to_end(&mut data)?;
    tracing::debug!("read {} ({} bytes)", path.display(), data.len());
    decode(&data)
}

/// Encode and write a PDX file, replacing any existing file.
pub fn write_file(path: impl AsRef<Path>, root: &TaggedNode) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode(root)?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    tracing::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
