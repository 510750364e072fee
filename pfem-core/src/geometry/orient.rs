//! Orientation of planar meshes and closed surfaces.

use super::predicates::signed_area;
use crate::error::{Error, Result};
use crate::mesh::SurfaceMesh;
use nalgebra::{DMatrix, Vector3};

/// Flip facets so that every connected component has non-negative area.
///
/// Components are edge-connected sets of facets. The summed XY area of each
/// component decides its orientation; all facets of a component with
/// negative area are reversed.
pub fn orient_normals_2d(mesh: &mut SurfaceMesh) {
    let (n_components, component) = mesh.connected_components();
    let mut area = vec![0.0; n_components];
    for f in 0..mesh.n_facets() {
        area[component[f]] += signed_area(mesh, f);
    }
    for f in 0..mesh.n_facets() {
        if area[component[f]] < 0.0 {
            mesh.flip(f);
        }
    }
}

/// Signed volume enclosed by a closed triangle surface.
///
/// Each triangle forms a tetrahedron with the origin; the sum is positive
/// for outward-facing triangles.
pub fn signed_volume(v: &DMatrix<f64>, f: &DMatrix<usize>) -> Result<f64> {
    if f.ncols() != 3 || v.ncols() != 3 {
        return Err(Error::Format(format!(
            "signed volume needs 3-column tables, got V: {}, F: {}",
            v.ncols(),
            f.ncols()
        )));
    }
    let point = |i: usize| Vector3::new(v[(i, 0)], v[(i, 1)], v[(i, 2)]);
    let total: f64 = (0..f.nrows())
        .map(|t| {
            let (a, b, c) = (point(f[(t, 0)]), point(f[(t, 1)]), point(f[(t, 2)]));
            a.dot(&b.cross(&c))
        })
        .sum();
    Ok(total / 6.0)
}

/// Reverse every triangle if the enclosed volume has the wrong sign.
///
/// `positive = true` asks for outward-facing triangles.
pub fn orient_closed_surface(v: &DMatrix<f64>, f: &mut DMatrix<usize>, positive: bool) -> Result<()> {
    let sign = if positive { 1.0 } else { -1.0 };
    if sign * signed_volume(v, f)? < 0.0 {
        for mut row in f.row_iter_mut() {
            row.swap((0, 0), (0, 2));
        }
    }
    Ok(())
}
