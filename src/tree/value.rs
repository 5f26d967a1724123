//! Typed attribute values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of an attribute, as tagged in the binary stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Int,
    Float,
    String,
}

impl AttributeType {
    /// One-byte tag used by the binary codec.
    #[inline]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Int => b'i',
            Self::Float => b'f',
            Self::String => b's',
        }
    }

    /// Parse a binary type tag.
    #[inline]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'i' => Some(Self::Int),
            b'f' => Some(Self::Float),
            b's' => Some(Self::String),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
        }
    }
}

/// Attribute payload. Always a sequence, even for scalars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum AttributeValue {
    Int(Vec<i32>),
    Float(Vec<f32>),
    String(Vec<String>),
}

impl AttributeValue {
    /// Element type of this value.
    pub fn attr_type(&self) -> AttributeType {
        match self {
            Self::Int(_) => AttributeType::Int,
            Self::Float(_) => AttributeType::Float,
            Self::String(_) => AttributeType::String,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    /// Check if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_ints(&self) -> Option<&[i32]> {
        match self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Vec<i32>> for AttributeValue {
    fn from(v: Vec<i32>) -> Self {
        Self::Int(v)
    }
}

impl From<Vec<f32>> for AttributeValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Float(v)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(v: Vec<String>) -> Self {
        Self::String(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(vec![s.to_string()])
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(vec![s])
    }
}
