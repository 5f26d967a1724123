//! Skeletal animation: sample packing and the clip table.

mod clip;
mod sampler;

pub use clip::{AnimClip, ClipTable};
pub use sampler::{is_uniform_scale, pack, unpack, BoneKeyframes, BoneSample};
