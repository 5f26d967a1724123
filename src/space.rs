//! Coordinate space conversion between the file convention and a host's.
//!
//! PDX files are Y-up, left-handed. Most content tools are Y-up,
//! right-handed, so by default one axis (Z) is mirrored. The transform is a
//! diagonal reflection `S` with `S == S⁻¹`, which makes every conversion here
//! its own inverse: the same call maps file → host and host → file.
//!
//! | value        | rule                     |
//! |--------------|--------------------------|
//! | point/vector | `S · v`                  |
//! | matrix       | `S · M · S⁻¹`            |
//! | quaternion   | `S · R(q) · S⁻¹`         |
//! | uv           | `(u, 1 - v)`             |
//! | triangle     | `[a, b, c] → [a, c, b]`  |
//!
//! Apply exactly once per value crossing the import/export boundary.

use serde::{Deserialize, Serialize};

use crate::util::{Affine3A, Mat4, Quat, Vec2, Vec3};

/// Diagonal axis reflection relating the file and host spaces.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSpace {
    /// Per-axis sign, each `1.0` or `-1.0`.
    pub axis_signs: [f32; 3],
}

impl CoordinateSpace {
    /// Mirror along Z (the PDX <-> right-handed Y-up convention).
    pub const MIRROR_Z: Self = Self { axis_signs: [1.0, 1.0, -1.0] };

    /// No spatial change. UVs and winding are still flipped.
    pub const IDENTITY: Self = Self { axis_signs: [1.0, 1.0, 1.0] };

    /// Check that every sign is exactly +1 or -1.
    pub fn is_valid(&self) -> bool {
        self.axis_signs.iter().all(|s| *s == 1.0 || *s == -1.0)
    }

    #[inline]
    fn signs(&self) -> Vec3 {
        Vec3::from_array(self.axis_signs)
    }

    #[inline]
    fn determinant(&self) -> f32 {
        self.axis_signs.iter().product()
    }

    #[inline]
    fn matrix(&self) -> Mat4 {
        Mat4::from_scale(self.signs())
    }

    /// Convert a position.
    #[inline]
    pub fn point(&self, p: Vec3) -> Vec3 {
        p * self.signs()
    }

    /// Convert a direction (normal, tangent).
    #[inline]
    pub fn vector(&self, v: Vec3) -> Vec3 {
        v * self.signs()
    }

    /// Conjugate a rotation through the reflection.
    ///
    /// For a reflection `S`, `S · R(axis, θ) · S⁻¹ = R(det(S) · S · axis, θ)`,
    /// so the vector part picks up `det(S) · S` and `w` is untouched.
    #[inline]
    pub fn quat(&self, q: Quat) -> Quat {
        let v = Vec3::new(q.x, q.y, q.z) * self.signs() * self.determinant();
        Quat::from_xyzw(v.x, v.y, v.z, q.w)
    }

    /// Conjugate a 4x4 transform through the reflection.
    #[inline]
    pub fn mat4(&self, m: Mat4) -> Mat4 {
        let s = self.matrix();
        s * m * s
    }

    /// Conjugate an affine transform through the reflection.
    #[inline]
    pub fn affine(&self, a: Affine3A) -> Affine3A {
        Affine3A::from_mat4(self.mat4(Mat4::from(a)))
    }

    /// Flip a texture coordinate in V.
    #[inline]
    pub fn uv(&self, uv: Vec2) -> Vec2 {
        Vec2::new(uv.x, 1.0 - uv.y)
    }

    /// Reverse triangle winding.
    #[inline]
    pub fn triangle<T: Copy>(&self, tri: [T; 3]) -> [T; 3] {
        [tri[0], tri[2], tri[1]]
    }
}

impl Default for CoordinateSpace {
    fn default() -> Self {
        Self::MIRROR_Z
    }
}
