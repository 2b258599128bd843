//! Rigid transform helpers
//!
//! The transform overlay stores plain 4x4 homogeneous matrices. Controllers
//! rarely speak in matrices though, so this module builds them from the pose
//! parameterizations that show up on the wire: a `wxyz` quaternion plus a
//! position, or a planar `(x, y, theta)` pose in the Z-up ground plane.
//!
//! Everything here produces proper rigid transforms (rotation + translation,
//! no scale or shear).

use nalgebra::{Isometry3, Matrix2, Translation3, UnitQuaternion, Vector2};

use super::math::{Mat3, Mat4, Quaternion, Vec3, RIGID_EPSILON};

/// Build a rigid transform from a `wxyz` quaternion and a position.
///
/// The quaternion does not need to be normalized. Returns `None` when it is
/// too close to zero to define a rotation.
pub fn from_wxyz_position(wxyz: [f32; 4], position: [f32; 3]) -> Option<Mat4> {
    let [w, x, y, z] = wxyz;
    let rotation = UnitQuaternion::try_new(Quaternion::new(w, x, y, z), f32::EPSILON)?;
    let translation = Translation3::new(position[0], position[1], position[2]);
    Some(Isometry3::from_parts(translation, rotation).to_homogeneous())
}

/// Planar pose lifted into 3D: translation in the XY plane and a rotation of
/// `theta` radians about +Z.
pub fn planar_pose(x: f32, y: f32, theta: f32) -> Mat4 {
    Isometry3::new(Vec3::new(x, y, 0.0), Vec3::z() * theta).to_homogeneous()
}

/// Recover `(x, y, theta)` from a planar pose.
///
/// Only meaningful for matrices built by [`planar_pose`] or
/// [`planar_exp`]; any out-of-plane component is ignored.
pub fn planar_from_matrix(matrix: &Mat4) -> (f32, f32, f32) {
    let theta = matrix[(1, 0)].atan2(matrix[(0, 0)]);
    (matrix[(0, 3)], matrix[(1, 3)], theta)
}

/// Below this angle the planar exp/log maps switch to their Taylor expansions
const PLANAR_TAYLOR_EPSILON: f32 = 1e-5;

/// Exponential map from a planar twist `[vx, vy, omega]` to a planar pose.
pub fn planar_exp(tangent: [f32; 3]) -> Mat4 {
    let [vx, vy, theta] = tangent;
    let (sin_over_theta, one_minus_cos_over_theta) = if theta.abs() < PLANAR_TAYLOR_EPSILON {
        let theta_sq = theta * theta;
        (1.0 - theta_sq / 6.0, 0.5 * theta - theta * theta_sq / 24.0)
    } else {
        (theta.sin() / theta, (1.0 - theta.cos()) / theta)
    };

    let v = Matrix2::new(
        sin_over_theta, -one_minus_cos_over_theta,
        one_minus_cos_over_theta, sin_over_theta,
    );
    let translation = v * Vector2::new(vx, vy);
    planar_pose(translation.x, translation.y, theta)
}

/// Logarithm map, the inverse of [`planar_exp`].
pub fn planar_log(matrix: &Mat4) -> [f32; 3] {
    let (x, y, theta) = planar_from_matrix(matrix);
    let cos_minus_one = theta.cos() - 1.0;
    let half_theta = theta / 2.0;
    let half_theta_over_tan = if cos_minus_one.abs() < PLANAR_TAYLOR_EPSILON {
        1.0 - theta * theta / 12.0
    } else {
        -(half_theta * theta.sin()) / cos_minus_one
    };

    let v_inv = Matrix2::new(
        half_theta_over_tan, half_theta,
        -half_theta, half_theta_over_tan,
    );
    let twist = v_inv * Vector2::new(x, y);
    [twist.x, twist.y, theta]
}

/// Basis change applied by the scene root so that +Z is "up" in a Y-up
/// rendering backend.
pub fn z_up_basis() -> Mat4 {
    Isometry3::rotation(Vec3::x() * -std::f32::consts::FRAC_PI_2).to_homogeneous()
}

/// Check whether `matrix` is a proper rigid transform within `epsilon`.
///
/// The bottom row must be `[0, 0, 0, 1]` and the upper-left 3x3 block must be
/// orthonormal with determinant +1.
pub fn is_rigid(matrix: &Mat4, epsilon: f32) -> bool {
    let bottom = matrix.row(3);
    if bottom[0].abs() > epsilon
        || bottom[1].abs() > epsilon
        || bottom[2].abs() > epsilon
        || (bottom[3] - 1.0).abs() > epsilon
    {
        return false;
    }

    let rotation: Mat3 = matrix.fixed_view::<3, 3>(0, 0).into_owned();
    let gram = rotation.transpose() * rotation;
    (gram - Mat3::identity()).abs().max() <= epsilon
        && (rotation.determinant() - 1.0).abs() <= epsilon
}

/// Inverse of a rigid transform, computed as `[R^T | -R^T t]`.
///
/// Returns `None` if the matrix is not rigid.
pub fn rigid_inverse(matrix: &Mat4) -> Option<Mat4> {
    if !is_rigid(matrix, RIGID_EPSILON) {
        return None;
    }

    let rotation_t: Mat3 = matrix.fixed_view::<3, 3>(0, 0).transpose();
    let translation: Vec3 = matrix.fixed_view::<3, 1>(0, 3).into_owned();

    let mut inverse = Mat4::identity();
    inverse.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation_t);
    inverse
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&(-(rotation_t * translation)));
    Some(inverse)
}
