//! PDX binary decoder.

use byteorder::{ByteOrder, LittleEndian};

use super::format::*;
use crate::tree::{AttributeType, AttributeValue, TaggedNode};
use crate::util::{Error, Result};

/// Bounds-checked forward reader over a byte slice.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::UnexpectedEof { offset: self.pos, need: len - self.remaining() });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// NUL-terminated, non-empty UTF-8 name.
    fn read_cstr(&mut self) -> Result<String> {
        let start = self.pos;
        let rest = &self.data[start..];
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            return Err(Error::UnexpectedEof { offset: self.data.len(), need: 1 });
        };
        if len == 0 {
            return Err(Error::InvalidName { offset: start });
        }
        let bytes = self.take(len)?.to_vec();
        self.pos += 1; // terminator
        Ok(String::from_utf8(bytes)?)
    }
}

/// Decode a PDX byte stream into its tagged-attribute tree.
///
/// Fails on a bad header, a truncated stream, an unknown marker or type tag,
/// an attribute whose payload disagrees with its element count, or bytes left
/// over after the root node is closed.
pub fn decode(data: &[u8]) -> Result<TaggedNode> {
    if data.len() < HEADER_SIZE {
        return Err(Error::UnexpectedEof { offset: data.len(), need: HEADER_SIZE - data.len() });
    }
    if &data[..HEADER_SIZE] != PDX_MAGIC {
        return Err(Error::InvalidMagic);
    }

    let mut cur = Cursor::new(data, HEADER_SIZE);
    let marker_pos = cur.pos;
    let marker = cur.read_u8()?;
    if marker != NODE_START {
        return Err(Error::UnknownMarker { marker, offset: marker_pos });
    }

    // Explicit stack so deeply nested input cannot exhaust the call stack.
    let mut stack = vec![TaggedNode::new(cur.read_cstr()?)];

    loop {
        let offset = cur.pos;
        let marker = cur.read_u8()?;
        match marker {
            ATTRIBUTE => {
                let (name, value) = read_attribute(&mut cur)?;
                if let Some(node) = stack.last_mut() {
                    node.set_attr(&name, value);
                }
            }
            NODE_START => {
                stack.push(TaggedNode::new(cur.read_cstr()?));
            }
            NODE_END => {
                let Some(done) = stack.pop() else {
                    return Err(Error::UnknownMarker { marker, offset });
                };
                match stack.last_mut() {
                    Some(parent) => {
                        parent.add_child(done);
                    }
                    None => {
                        if !cur.is_at_end() {
                            return Err(Error::TrailingData { offset: cur.pos });
                        }
                        return Ok(done);
                    }
                }
            }
            _ => return Err(Error::UnknownMarker { marker, offset }),
        }
    }
}

fn read_attribute(cur: &mut Cursor<'_>) -> Result<(String, AttributeValue)> {
    let name_offset = cur.pos;
    let name_len = cur.read_u8()? as usize;
    if name_len == 0 {
        return Err(Error::InvalidName { offset: name_offset });
    }
    let name = String::from_utf8(cur.take(name_len)?.to_vec())?;

    let tag_offset = cur.pos;
    let tag = cur.read_u8()?;
    let attr_type =
        AttributeType::from_tag(tag).ok_or(Error::UnknownTypeTag { tag, offset: tag_offset })?;
    let count = cur.read_u32()? as usize;

    let value = match attr_type {
        AttributeType::Int => {
            let raw = take_elements(cur, &name, count)?;
            let mut out = vec![0i32; count];
            LittleEndian::read_i32_into(raw, &mut out);
            AttributeValue::Int(out)
        }
        AttributeType::Float => {
            let raw = take_elements(cur, &name, count)?;
            let mut out = vec![0f32; count];
            LittleEndian::read_f32_into(raw, &mut out);
            AttributeValue::Float(out)
        }
        AttributeType::String => {
            let mut out = Vec::with_capacity(count.min(cur.remaining()));
            for _ in 0..count {
                out.push(read_string_element(cur, &name)?);
            }
            AttributeValue::String(out)
        }
    };
    Ok((name, value))
}

/// Raw bytes for `count` fixed-width elements.
fn take_elements<'a>(cur: &mut Cursor<'a>, name: &str, count: usize) -> Result<&'a [u8]> {
    let need = count.checked_mul(ELEMENT_SIZE).unwrap_or(usize::MAX);
    if need > cur.remaining() {
        return Err(Error::LengthMismatch {
            name: name.to_string(),
            declared: count,
            actual: cur.remaining() / ELEMENT_SIZE,
        });
    }
    cur.take(need)
}

/// One length-prefixed string; the length counts a trailing NUL.
fn read_string_element(cur: &mut Cursor<'_>, name: &str) -> Result<String> {
    let len = cur.read_u32()? as usize;
    let bytes = cur.take(len)?;
    match bytes.split_last() {
        Some((0, body)) => Ok(String::from_utf8(body.to_vec())?),
        _ => Err(Error::LengthMismatch {
            name: name.to_string(),
            declared: len,
            actual: bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len()),
        }),
    }
}
