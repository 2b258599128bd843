//! Math utilities and types
//!
//! Provides the fundamental math types used by the transform overlay and the
//! rendering backends.

pub use nalgebra::{
    Vector3,
    Matrix3, Matrix4,
    Quaternion,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 homogeneous matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Default tolerance for rigidity checks on single precision matrices
pub const RIGID_EPSILON: f32 = 1e-4;
