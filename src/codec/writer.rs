//! PDX binary encoder.

use byteorder::{LittleEndian, WriteBytesExt};

use super::format::*;
use crate::tree::{AttributeValue, TaggedNode};
use crate::util::{Error, Result};

/// Output buffer for PDX records.
pub struct OStream {
    buf: Vec<u8>,
}

impl OStream {
    /// Create a stream with the file header already written.
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(64 * 1024);
        buf.extend_from_slice(PDX_MAGIC);
        Self { buf }
    }

    /// Write a node record and everything below it.
    pub fn write_node(&mut self, node: &TaggedNode) -> Result<()> {
        validate_node_name(&node.name)?;
        self.buf.push(NODE_START);
        self.buf.extend_from_slice(node.name.as_bytes());
        self.buf.push(0);

        for (name, value) in node.attributes() {
            self.write_attribute(&node.name, name, value)?;
        }
        for child in node.children() {
            self.write_node(child)?;
        }

        self.buf.push(NODE_END);
        Ok(())
    }

    fn write_attribute(&mut self, node: &str, name: &str, value: &AttributeValue) -> Result<()> {
        if name.is_empty() || name.len() > MAX_ATTRIBUTE_NAME {
            return Err(Error::invalid(node, name, "attribute name must be 1..=255 bytes"));
        }
        let count = u32::try_from(value.len())
            .map_err(|_| Error::invalid(node, name, "too many elements"))?;

        self.buf.push(ATTRIBUTE);
        self.buf.push(name.len() as u8);
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(value.attr_type().tag());
        self.buf.write_u32::<LittleEndian>(count)?;

        match value {
            AttributeValue::Int(v) => {
                self.buf.reserve(v.len() * ELEMENT_SIZE);
                for &x in v {
                    self.buf.write_i32::<LittleEndian>(x)?;
                }
            }
            AttributeValue::Float(v) => {
                self.buf.reserve(v.len() * ELEMENT_SIZE);
                for &x in v {
                    self.buf.write_f32::<LittleEndian>(x)?;
                }
            }
            AttributeValue::String(v) => {
                for s in v {
                    if s.as_bytes().contains(&0) {
                        return Err(Error::invalid(node, name, "string contains NUL"));
                    }
                    self.buf.write_u32::<LittleEndian>(s.len() as u32 + 1)?;
                    self.buf.extend_from_slice(s.as_bytes());
                    self.buf.push(0);
                }
            }
        }
        Ok(())
    }

    /// Finish and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for OStream {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_node_name(name: &str) -> Result<()> {
    if name.is_empty() || name.as_bytes().contains(&0) {
        return Err(Error::invalid(name, "", "node name must be non-empty and NUL-free"));
    }
    Ok(())
}

/// Encode a tagged-attribute tree as a PDX byte stream.
pub fn encode(root: &TaggedNode) -> Result<Vec<u8>> {
    let mut out = OStream::new();
    out.write_node(root)?;
    Ok(out.into_bytes())
}
