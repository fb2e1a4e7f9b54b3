// Unit-quaternion attitude representation
// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use nalgebra as na;

use crate::error::OrientationError;
use crate::vector::Vector3;

/// Quaternions with a norm at or below this value are treated as degenerate.
pub const DEGENERATE_NORM_EPSILON: f64 = 1e-9;

/// An attitude, stored as a unit quaternion `(w, x, y, z)`.
///
/// Every constructor and every operation that could introduce drift rescales the quaternion to
/// unit norm before returning, so an `Orientation` observed anywhere in the crate satisfies
/// `‖q‖ = 1` up to floating-point epsilon.
///
/// There is exactly one attitude encoding inside the core. Callers holding other encodings
/// convert at the boundary:
///
/// - [`Orientation::from_components`] takes raw quaternion components, scalar first.
/// - [`Orientation::from_axis_angle`] takes a rotation axis and an angle in **radians**.
/// - [`Orientation::from_euler_degrees`] takes an angle triple in **degrees**, applied as a
///   rotation about world X, then world Y, then world Z.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Orientation(na::UnitQuaternion<f64>);

impl Default for Orientation {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<na::UnitQuaternion<f64>> for Orientation {
    fn from(value: na::UnitQuaternion<f64>) -> Self {
        Self(value)
    }
}

impl Orientation {
    /// The orientation that rotates nothing.
    pub fn identity() -> Self {
        Self(na::UnitQuaternion::identity())
    }

    /// Rescales a quaternion to unit norm.
    ///
    /// # Returns
    /// - `Err(OrientationError::Degenerate)` if the norm is at or below
    ///   [`DEGENERATE_NORM_EPSILON`] or is not finite. Callers are expected to substitute
    ///   [`Orientation::identity`] and report the condition rather than propagate NaN.
    pub fn normalize(q: na::Quaternion<f64>) -> Result<Self, OrientationError> {
        let norm = q.norm();
        if !norm.is_finite() || norm <= DEGENERATE_NORM_EPSILON {
            return Err(OrientationError::Degenerate);
        }
        Ok(Self(na::UnitQuaternion::new_unchecked(q / norm)))
    }

    /// Builds an orientation from raw quaternion components: the scalar `w` followed by the
    /// vector part `(x, y, z)`. The components need not be normalized.
    pub fn from_components(w: f64, x: f64, y: f64, z: f64) -> Result<Self, OrientationError> {
        Self::normalize(na::Quaternion::new(w, x, y, z))
    }

    /// Builds the rotation of `angle` radians about `axis`. The axis need not be normalized but
    /// must not be (nearly) zero.
    pub fn from_axis_angle(axis: &Vector3, angle: f64) -> Result<Self, OrientationError> {
        let norm = axis.norm();
        if !norm.is_finite() || norm <= DEGENERATE_NORM_EPSILON || !angle.is_finite() {
            return Err(OrientationError::Degenerate);
        }
        let axis = na::Unit::new_unchecked(axis / norm);
        Self::normalize(*na::UnitQuaternion::from_axis_angle(&axis, angle).quaternion())
    }

    /// Builds an orientation from an angle triple in degrees. The body is rotated about world X
    /// by `angles.x`, then about world Y by `angles.y`, then about world Z by `angles.z`.
    pub fn from_euler_degrees(angles: &Vector3) -> Result<Self, OrientationError> {
        if !angles.iter().all(|a| a.is_finite()) {
            return Err(OrientationError::Degenerate);
        }
        let q = na::UnitQuaternion::from_euler_angles(
            angles.x.to_radians(),
            angles.y.to_radians(),
            angles.z.to_radians(),
        );
        Self::normalize(*q.quaternion())
    }

    /// Inverse of [`Orientation::from_euler_degrees`]. The Y angle is reported in [-90, 90].
    pub fn to_euler_degrees(&self) -> Vector3 {
        let (x, y, z) = self.0.euler_angles();
        Vector3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
    }

    /// Returns the orientation obtained by applying `self` first and `after` second.
    pub fn compose(&self, after: &Orientation) -> Orientation {
        let mut q = after.0 * self.0;
        q.renormalize();
        Self(q)
    }

    /// Rotates a vector. The magnitude of the vector is preserved.
    pub fn rotate(&self, v: &Vector3) -> Vector3 {
        self.0.transform_vector(v)
    }

    /// The opposite rotation.
    pub fn inverse(&self) -> Orientation {
        Self(self.0.inverse())
    }

    /// Advances the orientation by a world-frame angular velocity held for `dt` seconds.
    pub fn integrate(&self, angular_velocity: &Vector3, dt: f64) -> Result<Self, OrientationError> {
        let delta = na::UnitQuaternion::from_scaled_axis(angular_velocity * dt);
        Self::normalize(*(delta * self.0).quaternion())
    }

    /// The shortest-path rotation, as a world-frame scaled axis, that takes `self` to `target`.
    pub fn error_vector(&self, target: &Orientation) -> Vector3 {
        (target.0 * self.0.inverse()).scaled_axis()
    }

    /// The angle in radians of the rotation between two orientations, in [0, π].
    pub fn angle_to(&self, other: &Orientation) -> f64 {
        self.0.angle_to(&other.0)
    }

    /// Re-validates and renormalizes. Fails if the stored quaternion is not finite, which can
    /// only happen if it bypassed the constructors, e.g. through deserialization.
    pub fn checked(&self) -> Result<Self, OrientationError> {
        Self::normalize(*self.0.quaternion())
    }

    /// The norm of the underlying quaternion.
    pub fn norm(&self) -> f64 {
        self.0.quaternion().norm()
    }

    /// Components `[w, x, y, z]`.
    pub fn components(&self) -> [f64; 4] {
        let q = self.0.quaternion();
        [q.w, q.i, q.j, q.k]
    }

    pub fn as_unit_quaternion(&self) -> &na::UnitQuaternion<f64> {
        &self.0
    }
}
