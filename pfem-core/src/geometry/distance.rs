//! Signed squared distance field to a closed triangle surface.
//!
//! The unsigned part is a nearest-facet query; the sign comes from counting
//! crossings of a vertical ray below each query point. Both loops run in
//! parallel over the query points, each writing only its own output slot.

use super::aabb::FacetTree;
use super::predicates::intersect_ray_z_triangle;
use crate::error::{Error, Result};
use crate::mesh::{to_mesh, SurfaceMesh};
use crate::types::Point3;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

fn query_points(p: &DMatrix<f64>) -> Result<Vec<[f64; 3]>> {
    if p.ncols() != 3 {
        return Err(Error::Format(format!(
            "query points must have 3 columns, got {}",
            p.ncols()
        )));
    }
    Ok((0..p.nrows()).map(|i| [p[(i, 0)], p[(i, 1)], p[(i, 2)]]).collect())
}

/// Squared distance of each row of `p` to the closest facet in `tree`.
pub fn compute_unsigned_distance_field(tree: &FacetTree, p: &DMatrix<f64>) -> Result<DVector<f64>> {
    let points = query_points(p)?;
    let mut d = DVector::zeros(points.len());
    d.as_mut_slice()
        .par_iter_mut()
        .zip(points.par_iter())
        .for_each(|(di, q)| *di = tree.squared_distance(&Point3::new(q[0], q[1], q[2])));
    Ok(d)
}

/// Negate `d[k]` for every query point `p[k]` inside the surface.
///
/// A vertical ray spanning the mesh Z extent is cast through each query;
/// crossings are sorted by height and reduced so that tangential double
/// hits count once. An odd number of reduced crossings below the query
/// means the point is inside.
pub fn compute_sign(
    mesh: &SurfaceMesh,
    tree: &FacetTree,
    p: &DMatrix<f64>,
    d: &mut DVector<f64>,
) -> Result<()> {
    let points = query_points(p)?;
    if d.len() != points.len() {
        return Err(Error::Format(format!(
            "{} distances given for {} query points",
            d.len(),
            points.len()
        )));
    }
    let Some((min_corner, max_corner)) = mesh.bounds() else {
        return Ok(());
    };

    d.as_mut_slice()
        .par_iter_mut()
        .zip(points.par_iter())
        .for_each(|(dk, center)| {
            let lo = [center[0], center[1], min_corner.z];
            let hi = [center[0], center[1], max_corner.z];

            let mut inter: Vec<(f64, i32)> = tree
                .triangles_in_box(lo, hi)
                .filter_map(|tri| intersect_ray_z_triangle(&tri.corners, center))
                .map(|(s, z)| (z, s))
                .collect();
            inter.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            let mut parity = 0;
            let mut num_before = 0;
            for &(z, ds) in &inter {
                parity += ds;
                let enters = parity == -1 && ds < 0;
                let leaves = parity == 0 && ds > 0;
                if (enters || leaves) && z < center[2] {
                    num_before += 1;
                }
            }

            if num_before % 2 == 1 {
                *dk = -*dk;
            }
        });
    Ok(())
}

/// Signed squared distances from the rows of `p` to the surface (V, F).
///
/// Points inside the surface get a negative value.
pub fn signed_squared_distances(
    v: &DMatrix<f64>,
    f: &DMatrix<usize>,
    p: &DMatrix<f64>,
) -> Result<DVector<f64>> {
    let mesh = to_mesh(v, f)?;
    let tree = FacetTree::new(&mesh);
    let mut d = compute_unsigned_distance_field(&tree, p)?;
    compute_sign(&mesh, &tree, p, &mut d)?;
    Ok(d)
}
