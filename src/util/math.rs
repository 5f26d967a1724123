//! Math type re-exports and PDX-specific math utilities.
//!
//! This module re-exports types from `glam` and provides the bounding box and
//! fixed-precision rounding used by the exporters.

pub use glam::{Affine3A, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned bounding box, stored as the `aabb` node of a mesh.
#[derive(Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounding box of a point set, `EMPTY` if there are no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.expand_by_point(*p);
        }
        b
    }

    /// Check if this box is empty (has no volume).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn expand_by_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aabb({:?} - {:?})", self.min, self.max)
    }
}

#[inline]
fn pow10(digits: u32) -> f64 {
    10f64.powi(digits as i32)
}

/// Fixed-point representation of `value` at `digits` decimal places.
///
/// Two floats that round to the same decimal value map to the same integer,
/// which is what vertex deduplication compares.
#[inline]
pub fn to_fixed(value: f32, digits: u32) -> i64 {
    (value as f64 * pow10(digits)).round_ties_even() as i64
}

/// Round `value` to `digits` decimal places.
#[inline]
pub fn round_to(value: f32, digits: u32) -> f32 {
    (to_fixed(value, digits) as f64 / pow10(digits)) as f32
}

/// Element-wise rounding of a vector.
#[inline]
pub fn round_vec2(v: Vec2, digits: u32) -> Vec2 {
    Vec2::new(round_to(v.x, digits), round_to(v.y, digits))
}

/// Element-wise rounding of a vector.
#[inline]
pub fn round_vec3(v: Vec3, digits: u32) -> Vec3 {
    Vec3::new(round_to(v.x, digits), round_to(v.y, digits), round_to(v.z, digits))
}

/// Element-wise rounding of a quaternion's stored components.
#[inline]
pub fn round_quat(q: Quat, digits: u32) -> Quat {
    Quat::from_xyzw(
        round_to(q.x, digits),
        round_to(q.y, digits),
        round_to(q.z, digits),
        round_to(q.w, digits),
    )
}
