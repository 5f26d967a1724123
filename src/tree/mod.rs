//! Tagged-attribute tree.
//!
//! Generic in-memory structure mirroring the on-disk layout of a PDX file.
//! Every read and write passes through this representation: the codec turns
//! bytes into a [`TaggedNode`] and the schema mapper turns nodes into domain
//! objects.
//!
//! ```text
//! File            pdxasset = [1, 0]
//! ├── object
//! │   └── shape
//! │       ├── mesh     p, n, ta, u0, tri
//! │       │   ├── aabb       min, max
//! │       │   ├── material   shader, diff, n, spec
//! │       │   └── skin       bones, ix, w
//! │       └── skeleton
//! │           └── bone       ix, pa, tx
//! └── locator
//!     └── loc     p, q, pa
//! ```

mod value;

pub use value::*;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// A named node with ordered attributes and ordered children.
///
/// Attribute names are unique per node. Child order is load-bearing: it
/// defines shape, mesh and bone enumeration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedNode {
    pub name: String,
    attributes: Vec<(String, AttributeValue)>,
    children: Vec<TaggedNode>,
}

impl TaggedNode {
    /// Create an empty node.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    /// Builder form of [`set_attr`](Self::set_attr).
    pub fn with_attr(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder form of [`add_child`](Self::add_child).
    pub fn with_child(mut self, child: TaggedNode) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute. Replaces in place if the name already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<AttributeValue>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Set an attribute only if the value is non-empty.
    pub fn set_attr_nonempty(&mut self, name: &str, value: impl Into<AttributeValue>) {
        let value = value.into();
        if !value.is_empty() {
            self.set_attr(name, value);
        }
    }

    /// Append a child node and return a reference to it.
    pub fn add_child(&mut self, child: TaggedNode) -> &mut TaggedNode {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    #[inline]
    pub fn attributes(&self) -> &[(String, AttributeValue)] {
        &self.attributes
    }

    #[inline]
    pub fn children(&self) -> &[TaggedNode] {
        &self.children
    }

    #[inline]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn attr(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&TaggedNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child with the given name, or a schema error.
    pub fn require_child(&self, name: &str) -> Result<&TaggedNode> {
        self.child(name).ok_or_else(|| Error::MissingNode {
            parent: self.name.clone(),
            node: name.to_string(),
        })
    }

    /// All children with the given name, in order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TaggedNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Total node count including self.
    pub fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(TaggedNode::count_nodes).sum::<usize>()
    }

    // ------------------------------------------------------------------------
    // Typed access
    // ------------------------------------------------------------------------

    /// Int attribute, `None` if absent, error if the type differs.
    pub fn ints(&self, name: &str) -> Result<Option<&[i32]>> {
        match self.attr(name) {
            None => Ok(None),
            Some(v) => v.as_ints().map(Some).ok_or_else(|| self.type_error(name, v, "int")),
        }
    }

    /// Float attribute, `None` if absent, error if the type differs.
    pub fn floats(&self, name: &str) -> Result<Option<&[f32]>> {
        match self.attr(name) {
            None => Ok(None),
            Some(v) => v.as_floats().map(Some).ok_or_else(|| self.type_error(name, v, "float")),
        }
    }

    /// String attribute, `None` if absent, error if the type differs.
    pub fn strings(&self, name: &str) -> Result<Option<&[String]>> {
        match self.attr(name) {
            None => Ok(None),
            Some(v) => v.as_strings().map(Some).ok_or_else(|| self.type_error(name, v, "string")),
        }
    }

    pub fn require_ints(&self, name: &str) -> Result<&[i32]> {
        self.ints(name)?.ok_or_else(|| Error::missing(&self.name, name))
    }

    pub fn require_floats(&self, name: &str) -> Result<&[f32]> {
        self.floats(name)?.ok_or_else(|| Error::missing(&self.name, name))
    }

    pub fn require_strings(&self, name: &str) -> Result<&[String]> {
        self.strings(name)?.ok_or_else(|| Error::missing(&self.name, name))
    }

    /// First element of a required int attribute.
    pub fn require_int(&self, name: &str) -> Result<i32> {
        first(self.require_ints(name)?, &self.name, name).copied()
    }

    /// First element of a required float attribute.
    pub fn require_float(&self, name: &str) -> Result<f32> {
        first(self.require_floats(name)?, &self.name, name).copied()
    }

    /// First element of a required string attribute.
    pub fn require_string(&self, name: &str) -> Result<&str> {
        first(self.require_strings(name)?, &self.name, name).map(String::as_str)
    }

    /// First element of an optional int attribute.
    pub fn opt_int(&self, name: &str) -> Result<Option<i32>> {
        match self.ints(name)? {
            Some(v) => first(v, &self.name, name).map(|i| Some(*i)),
            None => Ok(None),
        }
    }

    /// First element of an optional string attribute.
    pub fn opt_string(&self, name: &str) -> Result<Option<&str>> {
        match self.strings(name)? {
            Some(v) => first(v, &self.name, name).map(|s| Some(s.as_str())),
            None => Ok(None),
        }
    }

    fn type_error(&self, name: &str, v: &AttributeValue, expected: &str) -> Error {
        Error::invalid(&self.name, name, format!("expected {}, got {}", expected, v.attr_type()))
    }
}

fn first<'a, T>(values: &'a [T], node: &str, name: &str) -> Result<&'a T> {
    values.first().ok_or_else(|| Error::invalid(node, name, "empty"))
}
