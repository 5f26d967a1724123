//! Animation clip table.
//!
//! Clips are named frame ranges kept on a skeleton root as one string:
//! `name~start~end` entries joined by `@`, e.g. `walk~0~10@run~11~20`.

use serde::Serialize;
use std::fmt;

use crate::util::{Error, Result};

const FIELD_SEP: &str = "~";
const ENTRY_SEP: &str = "@";

/// A named frame range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnimClip {
    pub name: String,
    pub start: i32,
    pub end: i32,
}

impl AnimClip {
    pub fn new(name: impl Into<String>, start: i32, end: i32) -> Self {
        Self { name: name.into(), start, end }
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.contains(FIELD_SEP) || self.name.contains(ENTRY_SEP) {
            return Err(Error::InvalidClip(format!("bad clip name {:?}", self.name)));
        }
        if self.start > self.end {
            return Err(Error::InvalidFrameRange { start: self.start, end: self.end });
        }
        Ok(())
    }
}

impl fmt::Display for AnimClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}{}", self.name, FIELD_SEP, self.start, FIELD_SEP, self.end)
    }
}

/// Uniquely named clips, always sorted by start frame.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClipTable {
    clips: Vec<AnimClip>,
}

impl ClipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a clip string. An empty string is an empty table.
    pub fn parse(s: &str) -> Result<Self> {
        let mut table = Self::new();
        for entry in s.split(ENTRY_SEP).filter(|e| !e.is_empty()) {
            let fields: Vec<&str> = entry.split(FIELD_SEP).collect();
            let [name, start, end] = fields.as_slice() else {
                return Err(Error::InvalidClip(entry.to_string()));
            };
            let frame = |v: &str| v.trim().parse::<i32>().map_err(|_| Error::InvalidClip(entry.to_string()));
            table.edit(AnimClip::new(*name, frame(*start)?, frame(*end)?))?;
        }
        Ok(table)
    }

    /// Replace the clip with the same name, or add it.
    pub fn edit(&mut self, clip: AnimClip) -> Result<()> {
        clip.validate()?;
        match self.clips.iter_mut().find(|c| c.name == clip.name) {
            Some(existing) => *existing = clip,
            None => self.clips.push(clip),
        }
        self.clips.sort_by_key(|c| c.start);
        Ok(())
    }

    /// Remove a clip by name.
    pub fn remove(&mut self, name: &str) -> Result<AnimClip> {
        let i = self
            .clips
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::ClipNotFound(name.to_string()))?;
        Ok(self.clips.remove(i))
    }

    pub fn get(&self, name: &str) -> Option<&AnimClip> {
        self.clips.iter().find(|c| c.name == name)
    }

    #[inline]
    pub fn clips(&self) -> &[AnimClip] {
        &self.clips
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Serialized form for the skeleton root.
    pub fn to_attr_string(&self) -> String {
        self.clips.iter().map(AnimClip::to_string).collect::<Vec<_>>().join(ENTRY_SEP)
    }
}
