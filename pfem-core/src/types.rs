//! Core data types shared by the mesh, geometry and assembler modules.

use nalgebra::{DMatrix, Vector3};

/// A point in 3D space. 2D meshes store `z = 0`.
pub type Point3 = Vector3<f64>;

/// A 3D vector (normal, displacement, ...).
pub type Vec3 = Vector3<f64>;

/// Von Mises equivalent stress of a `dim x dim` stress tensor.
///
/// 3D: `sqrt(3/2 s:s)` with `s` the deviatoric part. 2D tensors are taken
/// as plane stress: `sqrt(s11² - s11 s22 + s22² + 3 s12²)`.
pub fn von_mises(sigma: &DMatrix<f64>) -> f64 {
    debug_assert_eq!(sigma.nrows(), sigma.ncols());
    let dim = sigma.nrows();
    if dim == 2 {
        let (s11, s22, s12) = (sigma[(0, 0)], sigma[(1, 1)], sigma[(0, 1)]);
        return (s11 * s11 - s11 * s22 + s22 * s22 + 3.0 * s12 * s12).sqrt();
    }
    let sym = (sigma + sigma.transpose()) * 0.5;
    let dev = &sym - DMatrix::identity(dim, dim) * (sym.trace() / dim as f64);
    (1.5 * dev.norm_squared()).sqrt()
}
