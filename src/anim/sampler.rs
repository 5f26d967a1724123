//! Keyframe packing.
//!
//! Samples are stored frame-major, bone-minor: for each frame, each bone in
//! hierarchy order appends the components of its animated channels (`t` 3,
//! `q` 4, `s` 1) to that channel's flat array. Reading walks the same order
//! with one cursor per channel. Any other interleaving misattributes samples.

use crate::config::PdxConfig;
use crate::scene::HostTransform;
use crate::schema::{AnimSamples, BoneInfo, ChannelSet};
use crate::util::{round_quat, round_to, round_vec3, Error, Quat, Result, Vec3};

/// One bone at one frame, file space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneSample {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl BoneSample {
    /// Convert a host local transform and round it to the animation precision.
    ///
    /// Only uniform scale is stored; the X axis is used.
    pub fn from_host(t: &HostTransform, config: &PdxConfig) -> Self {
        let space = &config.space;
        Self {
            translation: round_vec3(space.point(t.translation), config.round_translation),
            rotation: round_quat(space.quat(t.rotation), config.round_rotation),
            scale: round_to(t.scale.x, config.round_scale),
        }
    }

    /// Back to a host transform with uniform scale.
    pub fn to_host(&self, config: &PdxConfig) -> HostTransform {
        HostTransform {
            translation: config.space.point(self.translation),
            rotation: config.space.quat(self.rotation),
            scale: Vec3::splat(self.scale),
        }
    }
}

/// Whether a host scale can be stored without loss.
#[inline]
pub fn is_uniform_scale(scale: Vec3) -> bool {
    scale.x == scale.y && scale.x == scale.z
}

/// Per-frame values of a bone's animated channels. A channel is `None` when
/// it does not vary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoneKeyframes {
    pub translation: Option<Vec<Vec3>>,
    pub rotation: Option<Vec<Quat>>,
    pub scale: Option<Vec<f32>>,
}

impl BoneKeyframes {
    /// Keep only channels whose values are not all equal.
    pub fn from_samples(samples: &[BoneSample]) -> Self {
        fn varying<T: PartialEq + Copy>(samples: &[BoneSample], f: impl Fn(&BoneSample) -> T) -> Option<Vec<T>> {
            let first = f(samples.first()?);
            if samples.iter().all(|s| f(s) == first) {
                None
            } else {
                Some(samples.iter().map(f).collect())
            }
        }
        Self {
            translation: varying(samples, |s| s.translation),
            rotation: varying(samples, |s| s.rotation),
            scale: varying(samples, |s| s.scale),
        }
    }

    pub fn channels(&self) -> ChannelSet {
        ChannelSet {
            translation: self.translation.is_some(),
            rotation: self.rotation.is_some(),
            scale: self.scale.is_some(),
        }
    }

    /// Animated values at `frame`.
    pub fn at(&self, frame: usize) -> (Option<Vec3>, Option<Quat>, Option<f32>) {
        (
            self.translation.as_ref().and_then(|v| v.get(frame).copied()),
            self.rotation.as_ref().and_then(|v| v.get(frame).copied()),
            self.scale.as_ref().and_then(|v| v.get(frame).copied()),
        )
    }
}

/// Pack keyframes of bones in hierarchy order over `frames` frames.
pub fn pack(bones: &[BoneKeyframes], frames: usize) -> Result<AnimSamples> {
    for bone in bones {
        let lens = [
            ('t', bone.translation.as_ref().map(Vec::len)),
            ('q', bone.rotation.as_ref().map(Vec::len)),
            ('s', bone.scale.as_ref().map(Vec::len)),
        ];
        for (channel, len) in lens {
            if let Some(len) = len.filter(|&l| l != frames) {
                return Err(Error::invalid(
                    "samples",
                    channel.to_string(),
                    format!("{} keys for {} frames", len, frames),
                ));
            }
        }
    }

    let mut out = AnimSamples::default();
    for frame in 0..frames {
        for bone in bones {
            let (t, q, s) = bone.at(frame);
            if let Some(t) = t {
                out.translations.extend_from_slice(&t.to_array());
            }
            if let Some(q) = q {
                out.rotations.extend_from_slice(&q.to_array());
            }
            if let Some(s) = s {
                out.scales.push(s);
            }
        }
    }
    Ok(out)
}

/// Unpack samples using each bone's declared channel set.
///
/// Running out of data is an error. Data left over after the last frame is
/// ignored with a warning.
pub fn unpack(bones: &[BoneInfo], samples: &AnimSamples, frames: usize) -> Result<Vec<BoneKeyframes>> {
    // Sizes come from the file; check them against the data before allocating.
    check_channel(bones, frames, 't', 3, |c| c.translation, samples.translations.len())?;
    check_channel(bones, frames, 'q', 4, |c| c.rotation, samples.rotations.len())?;
    check_channel(bones, frames, 's', 1, |c| c.scale, samples.scales.len())?;
    // Nothing to read when no bone is keyed, however many frames are declared.
    let keyed_frames = if bones.iter().any(|b| !b.channels.is_empty()) { frames } else { 0 };

    let mut out: Vec<BoneKeyframes> = bones
        .iter()
        .map(|b| {
            let c = b.channels;
            BoneKeyframes {
                translation: c.translation.then(|| Vec::with_capacity(frames)),
                rotation: c.rotation.then(|| Vec::with_capacity(frames)),
                scale: c.scale.then(|| Vec::with_capacity(frames)),
            }
        })
        .collect();

    let (mut t, mut q, mut s) = (0usize, 0usize, 0usize);
    for frame in 0..keyed_frames {
        for (info, keys) in bones.iter().zip(out.iter_mut()) {
            let underflow = |channel| Error::SampleUnderflow { channel, frame, bone: info.name.clone() };

            if let Some(v) = keys.translation.as_mut() {
                let data = samples.translations.get(t..t + 3).ok_or_else(|| underflow('t'))?;
                v.push(Vec3::from_slice(data));
                t += 3;
            }
            if let Some(v) = keys.rotation.as_mut() {
                let data = samples.rotations.get(q..q + 4).ok_or_else(|| underflow('q'))?;
                v.push(Quat::from_slice(data));
                q += 4;
            }
            if let Some(v) = keys.scale.as_mut() {
                let data = samples.scales.get(s).ok_or_else(|| underflow('s'))?;
                v.push(*data);
                s += 1;
            }
        }
    }

    let left = [
        ('t', samples.translations.len() - t),
        ('q', samples.rotations.len() - q),
        ('s', samples.scales.len() - s),
    ];
    for (channel, n) in left {
        if n > 0 {
            tracing::warn!("{} unread values in sample channel '{}'", n, channel);
        }
    }
    Ok(out)
}

/// Fail with the frame and bone where `channel` runs out, if it holds fewer
/// than `frames` values of `width` for every bone keyed on it.
fn check_channel(
    bones: &[BoneInfo],
    frames: usize,
    channel: char,
    width: usize,
    keyed: impl Fn(&ChannelSet) -> bool,
    available: usize,
) -> Result<()> {
    let keyed: Vec<&BoneInfo> = bones.iter().filter(|b| keyed(&b.channels)).collect();
    let per_frame = keyed.len() * width;
    if per_frame == 0 || per_frame.checked_mul(frames).is_some_and(|need| need <= available) {
        return Ok(());
    }
    Err(Error::SampleUnderflow {
        channel,
        frame: available / per_frame,
        bone: keyed[(available % per_frame) / width].name.clone(),
    })
}
