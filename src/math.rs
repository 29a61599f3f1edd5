//! Coordinate-system helpers shared by the exporter.

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Z-up authoring space to Y-up export space: `(x, y, z) -> (x, z, -y)`.
pub const ROOT_TRANSFORM: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, -1.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::W,
);

/// Basis used for fake-light directions and normals: `(x, y, z) -> (-x, -z, y)`.
pub const RIGHT_TRANSFORM: Mat4 = Mat4::from_cols(
    Vec4::new(-1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 0.0),
    Vec4::new(0.0, -1.0, 0.0, 0.0),
    Vec4::W,
);

/// Axis-aligned box in export space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box enclosing `points`; `None` when empty.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    /// The unit cube `[-1, 1]^3` of a marker object, taken to export space
    /// through its world matrix.
    #[must_use]
    pub fn of_marker(matrix_world: Mat4) -> Self {
        let mat = ROOT_TRANSFORM * matrix_world;
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    let p = mat.transform_point3(Vec3::new(x, y, z));
                    min = min.min(p);
                    max = max.max(p);
                }
            }
        }
        Self { min, max }
    }
}

/// XYZ Euler angles (radians) to a quaternion: X is applied first, Z last.
#[inline]
#[must_use]
pub fn euler_xyz_to_quat(euler: Vec3) -> Quat {
    Quat::from_rotation_z(euler.z) * Quat::from_rotation_y(euler.y) * Quat::from_rotation_x(euler.x)
}

/// Quaternion stored in `(w, x, y, z)` channel order.
#[inline]
#[must_use]
pub fn quat_from_wxyz(v: Vec4) -> Quat {
    Quat::from_xyzw(v.y, v.z, v.w, v.x)
}

/// Quaternion as `(w, x, y, z)` channel values.
#[inline]
#[must_use]
pub fn quat_to_wxyz(q: Quat) -> Vec4 {
    Vec4::new(q.w, q.x, q.y, q.z)
}

/// Quaternion to XYZ Euler angles, the inverse of [`euler_xyz_to_quat`].
#[must_use]
pub fn quat_to_euler_xyz(q: Quat) -> Vec3 {
    let (z, y, x) = q.to_euler(glam::EulerRot::ZYX);
    Vec3::new(x, y, z)
}

/// Location/rotation/scale decomposition of an affine matrix.
#[must_use]
pub fn decompose(m: Mat4) -> (Vec3, Quat, Vec3) {
    let (scale, rotation, translation) = m.to_scale_rotation_translation();
    (translation, rotation, scale)
}

/// Rotation of `angle_deg` degrees about one axis.
#[inline]
#[must_use]
pub fn axis_rotation(axis: Vec3, angle_deg: f32) -> Mat4 {
    Mat4::from_axis_angle(axis, angle_deg.to_radians())
}

/// Rotation part of a matrix, without scale.
#[must_use]
pub fn rotation_3x3(m: Mat4) -> Mat3 {
    Mat3::from_quat(decompose(m).1)
}

/// Scales `weights` so that they sum to one. A zero vector is left untouched.
pub fn normalize_weights(weights: &mut [f32]) {
    let sum: f32 = weights.iter().sum();
    if sum > 0.0 {
        for w in weights {
            *w /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn root_transform_swaps_up_axis() {
        let p = ROOT_TRANSFORM.transform_point3(Vec3::new(1.0, 2.0, 3.0));
        assert!(p.abs_diff_eq(Vec3::new(1.0, 3.0, -2.0), EPSILON));
    }

    #[test]
    fn marker_box_of_identity_is_unit_cube() {
        let bb = Aabb::of_marker(Mat4::IDENTITY);
        assert!(bb.min.abs_diff_eq(Vec3::splat(-1.0), EPSILON));
        assert!(bb.max.abs_diff_eq(Vec3::splat(1.0), EPSILON));
    }

    #[test]
    fn euler_round_trips() {
        let e = Vec3::new(0.3, -0.2, 1.1);
        let back = quat_to_euler_xyz(euler_xyz_to_quat(e));
        assert!(back.abs_diff_eq(e, 1e-4));
    }

    #[test]
    fn weights_sum_to_one() {
        let mut w = [2.0, 1.0, 1.0, 0.0];
        normalize_weights(&mut w);
        assert!((w.iter().sum::<f32>() - 1.0).abs() < EPSILON);
    }
}
