//! Animation file blocks: `info` (rate, length, initial pose) and `samples`.

use serde::Serialize;
use std::fmt;

use super::{check_version, names, new_root, require_vec3};
use crate::tree::TaggedNode;
use crate::util::{Error, Quat, Result, Vec3};

/// Which channels of a bone carry samples. Serialized as a subset of `"tqs"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelSet {
    pub translation: bool,
    pub rotation: bool,
    pub scale: bool,
}

impl ChannelSet {
    pub const NONE: Self = Self { translation: false, rotation: false, scale: false };
    pub const ALL: Self = Self { translation: true, rotation: true, scale: true };

    /// Parse an `sa` string. Order is not significant.
    pub fn parse(s: &str) -> Option<Self> {
        let mut set = Self::NONE;
        for c in s.chars() {
            match c {
                't' => set.translation = true,
                'q' => set.rotation = true,
                's' => set.scale = true,
                _ => return None,
            }
        }
        Some(set)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (on, c) in [(self.translation, "t"), (self.rotation, "q"), (self.scale, "s")] {
            if on {
                f.write_str(c)?;
            }
        }
        Ok(())
    }
}

/// Per-bone entry of `info`: animated channels plus the initial pose.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoneInfo {
    pub name: String,
    pub channels: ChannelSet,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl BoneInfo {
    pub fn to_tree(&self) -> TaggedNode {
        TaggedNode::new(self.name.as_str())
            .with_attr(names::SAMPLE_ATTRS, self.channels.to_string())
            .with_attr(names::TRANSLATE, self.translation.to_array().to_vec())
            .with_attr(names::ROTATION, self.rotation.to_array().to_vec())
            .with_attr(names::SCALE, vec![self.scale])
    }

    pub fn from_tree(node: &TaggedNode) -> Result<Self> {
        let sa = node.require_string(names::SAMPLE_ATTRS)?;
        let channels = ChannelSet::parse(sa)
            .ok_or_else(|| Error::invalid(&node.name, names::SAMPLE_ATTRS, format!("unknown channels in {:?}", sa)))?;
        let rotation = match node.require_floats(names::ROTATION)? {
            [x, y, z, w] => Quat::from_xyzw(*x, *y, *z, *w),
            q => return Err(Error::invalid(&node.name, names::ROTATION, format!("expected 4 floats, got {}", q.len()))),
        };
        Ok(Self {
            name: node.name.clone(),
            channels,
            translation: require_vec3(node, names::TRANSLATE)?,
            rotation,
            scale: node.require_float(names::SCALE)?,
        })
    }
}

/// The `info` block.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnimInfo {
    pub fps: f32,
    /// Number of sampled frames.
    pub frames: u32,
    /// Bones in hierarchy order.
    pub bones: Vec<BoneInfo>,
}

impl AnimInfo {
    pub fn to_tree(&self) -> TaggedNode {
        let mut node = TaggedNode::new(names::INFO)
            .with_attr(names::FPS, vec![self.fps])
            .with_attr(names::SAMPLE_ATTRS, vec![self.frames as i32])
            .with_attr(names::JOINTS, vec![self.bones.len() as i32]);
        for bone in &self.bones {
            node.add_child(bone.to_tree());
        }
        node
    }

    pub fn from_tree(node: &TaggedNode) -> Result<Self> {
        let frames = node.require_int(names::SAMPLE_ATTRS)?;
        let frames = u32::try_from(frames)
            .map_err(|_| Error::invalid(&node.name, names::SAMPLE_ATTRS, format!("negative frame count {}", frames)))?;
        let bones = node.children().iter().map(BoneInfo::from_tree).collect::<Result<Vec<_>>>()?;
        if let Some(j) = node.opt_int(names::JOINTS)? {
            if j as usize != bones.len() {
                tracing::warn!("info declares {} bones but has {}", j, bones.len());
            }
        }
        Ok(Self { fps: node.require_float(names::FPS)?, frames, bones })
    }
}

/// The `samples` block: flat, frame-major then bone-minor.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnimSamples {
    pub translations: Vec<f32>,
    pub rotations: Vec<f32>,
    pub scales: Vec<f32>,
}

impl AnimSamples {
    pub fn to_tree(&self) -> TaggedNode {
        let mut node = TaggedNode::new(names::SAMPLES);
        node.set_attr_nonempty(names::TRANSLATE, self.translations.clone());
        node.set_attr_nonempty(names::ROTATION, self.rotations.clone());
        node.set_attr_nonempty(names::SCALE, self.scales.clone());
        node
    }

    pub fn from_tree(node: &TaggedNode) -> Result<Self> {
        let get = |name: &str| -> Result<Vec<f32>> { Ok(node.floats(name)?.map(<[f32]>::to_vec).unwrap_or_default()) };
        Ok(Self {
            translations: get(names::TRANSLATE)?,
            rotations: get(names::ROTATION)?,
            scales: get(names::SCALE)?,
        })
    }
}

/// A `.anim` file.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnimFile {
    pub info: AnimInfo,
    pub samples: AnimSamples,
}

impl AnimFile {
    pub fn to_tree(&self) -> TaggedNode {
        new_root().with_child(self.info.to_tree()).with_child(self.samples.to_tree())
    }

    pub fn from_tree(root: &TaggedNode) -> Result<Self> {
        check_version(root)?;
        let info = AnimInfo::from_tree(root.require_child(names::INFO)?)?;
        let samples = match root.child(names::SAMPLES) {
            Some(s) => AnimSamples::from_tree(s)?,
            None => AnimSamples::default(),
        };
        Ok(Self { info, samples })
    }
}
