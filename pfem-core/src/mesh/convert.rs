//! Dense matrix exchange for surface meshes.
//!
//! `V` is an `n x 3` coordinate table, `F` an `m x 3` (triangles) or `m x 4`
//! (quads) index table and `T` an `k x 4` tetrahedron table.

use super::SurfaceMesh;
use crate::error::{Error, Result};
use crate::types::Point3;
use nalgebra::{DMatrix, DVector};

/// Build a surface mesh from vertex and face tables.
///
/// # Errors
///
/// Returns [`Error::Format`] if `F` has a column count other than 3 or 4,
/// and [`Error::Mesh`] if it references a missing vertex.
pub fn to_mesh(v: &DMatrix<f64>, f: &DMatrix<usize>) -> Result<SurfaceMesh> {
    if v.ncols() != 3 {
        return Err(Error::Format(format!(
            "vertex table must have 3 columns, got {}",
            v.ncols()
        )));
    }
    if f.ncols() != 3 && f.ncols() != 4 {
        return Err(Error::Format(format!(
            "face table must have 3 or 4 columns, got {}",
            f.ncols()
        )));
    }

    let mut mesh = SurfaceMesh::new();
    for i in 0..v.nrows() {
        mesh.create_vertex(&Point3::new(v[(i, 0)], v[(i, 1)], v[(i, 2)]));
    }
    let mut facet = Vec::with_capacity(f.ncols());
    for i in 0..f.nrows() {
        facet.clear();
        facet.extend(f.row(i).iter().copied());
        mesh.add_facet(&facet)?;
    }
    Ok(mesh)
}

/// Build a surface mesh with tetrahedral cells.
pub fn to_mesh_with_cells(
    v: &DMatrix<f64>,
    f: &DMatrix<usize>,
    t: &DMatrix<usize>,
) -> Result<SurfaceMesh> {
    if t.ncols() != 4 && t.nrows() > 0 {
        return Err(Error::Format(format!(
            "cell table must have 4 columns, got {}",
            t.ncols()
        )));
    }
    let mut mesh = to_mesh(v, f)?;
    for i in 0..t.nrows() {
        mesh.add_cell([t[(i, 0)], t[(i, 1)], t[(i, 2)], t[(i, 3)]])?;
    }
    Ok(mesh)
}

/// Extract (V, F, T) from a simplicial mesh.
///
/// # Errors
///
/// Returns [`Error::Format`] if any facet is not a triangle.
pub fn from_mesh(mesh: &SurfaceMesh) -> Result<(DMatrix<f64>, DMatrix<usize>, DMatrix<usize>)> {
    if !mesh.facets_are_simplices() {
        return Err(Error::Format("facets must all be triangles".into()));
    }

    let v = DMatrix::from_fn(mesh.n_vertices(), 3, |i, d| mesh.point(i)[d]);
    let f = DMatrix::from_fn(mesh.n_facets(), 3, |i, lv| mesh.facet_vertices(i)[lv]);
    let t = DMatrix::from_fn(mesh.n_cells(), 4, |i, lv| mesh.cell_vertices(i)[lv]);
    Ok((v, f, t))
}

/// Reorder vertices so that vertices of the same color are contiguous.
///
/// `colors[v]` is the color of vertex `v`. `V` and `F` are rewritten in
/// place; the returned vector `R` has one entry per color plus one, and the
/// vertices of color `c` occupy rows `R[c]..R[c + 1]`.
pub fn reorder_mesh(
    v: &mut DMatrix<f64>,
    f: &mut DMatrix<usize>,
    colors: &[usize],
) -> Result<DVector<usize>> {
    if colors.len() != v.nrows() {
        return Err(Error::Mesh(format!(
            "{} colors given for {} vertices",
            colors.len(),
            v.nrows()
        )));
    }
    let num_colors = colors.iter().max().map_or(0, |&c| c + 1);

    let mut count = vec![0usize; num_colors];
    for &c in colors {
        count[c] += 1;
    }
    let mut ranges = DVector::zeros(num_colors + 1);
    for c in 0..num_colors {
        ranges[c + 1] = ranges[c] + count[c];
    }

    count.iter_mut().for_each(|n| *n = 0);
    let remap: Vec<usize> = colors
        .iter()
        .map(|&c| {
            let slot = ranges[c] + count[c];
            count[c] += 1;
            slot
        })
        .collect();

    let old = v.clone();
    for (src, &dst) in remap.iter().enumerate() {
        v.set_row(dst, &old.row(src));
    }
    for idx in f.iter_mut() {
        *idx = remap[*idx];
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tet_tables() -> (DMatrix<f64>, DMatrix<usize>, DMatrix<usize>) {
        let v = DMatrix::from_row_slice(
            5,
            3,
            &[
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0, //
                1.0, 1.0, 1.0,
            ],
        );
        let f = DMatrix::from_row_slice(4, 3, &[0, 2, 1, 0, 1, 3, 1, 2, 3, 0, 3, 2]);
        let t = DMatrix::from_row_slice(2, 4, &[0, 1, 2, 3, 1, 2, 3, 4]);
        (v, f, t)
    }

    #[test]
    fn test_roundtrip_triangles_and_tets() {
        let (v, f, t) = tet_tables();
        let mesh = to_mesh_with_cells(&v, &f, &t).unwrap();
        let (v2, f2, t2) = from_mesh(&mesh).unwrap();
        assert_eq!(v, v2);
        assert_eq!(f, f2);
        assert_eq!(t, t2);
    }

    #[test]
    fn test_quads_accepted_but_not_exported() {
        let v = DMatrix::from_row_slice(4, 3, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
        let f = DMatrix::from_row_slice(1, 4, &[0, 1, 2, 3]);
        let mesh = to_mesh(&v, &f).unwrap();
        assert_eq!(mesh.facet_size(0), 4);
        assert!(matches!(from_mesh(&mesh), Err(Error::Format(_))));
    }

    #[test]
    fn test_unsupported_arity() {
        let v = DMatrix::zeros(5, 3);
        let f = DMatrix::from_row_slice(1, 5, &[0, 1, 2, 3, 4]);
        assert!(matches!(to_mesh(&v, &f), Err(Error::Format(_))));
    }

    #[test]
    fn test_reorder_groups_colors() {
        let mut v = DMatrix::from_row_slice(4, 3, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 3.0, 0.0, 0.0]);
        let mut f = DMatrix::from_row_slice(2, 3, &[0, 1, 2, 1, 2, 3]);
        let r = reorder_mesh(&mut v, &mut f, &[1, 0, 1, 0]).unwrap();

        assert_eq!(r.as_slice(), &[0, 2, 4]);
        // color 0: old 1, old 3; color 1: old 0, old 2
        assert_eq!(v.column(0).as_slice(), &[1.0, 3.0, 0.0, 2.0]);
        assert_eq!(f.row(0).iter().copied().collect::<Vec<_>>(), vec![2, 0, 3]);
    }
}
