//! Polyhedron extraction from volume meshes.
//!
//! Each polytope cell (neither tetrahedron nor hexahedron) is copied into its
//! own closed surface mesh, optionally triangulated, with the cell kernel
//! appended as the last vertex.

use crate::error::{Error, Result};
use crate::mesh::{SurfaceMesh, VolumeMesh};
use crate::types::Point3;
use nalgebra::DMatrix;
use std::collections::HashMap;
use tracing::debug;

/// Boundary surface of one polytope cell.
#[derive(Debug, Clone)]
pub struct Polyhedron {
    /// Source cell in the volume mesh.
    pub cell: usize,
    /// Closed surface with the kernel as its last vertex.
    pub mesh: SurfaceMesh,
    /// Local index of the kernel vertex.
    pub kernel_vertex: usize,
    /// Border edges of `mesh`; empty for a watertight cell.
    pub borders: Vec<[usize; 2]>,
}

impl Polyhedron {
    pub fn kernel(&self) -> Point3 {
        self.mesh.point(self.kernel_vertex)
    }

    /// Tetrahedralize the cell by connecting every boundary triangle to the
    /// kernel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the surface was extracted without
    /// triangulation and has non-triangular facets.
    pub fn tetrahedralize(&self) -> Result<(DMatrix<f64>, DMatrix<usize>, DMatrix<usize>)> {
        if !self.mesh.facets_are_simplices() {
            return Err(Error::Format(format!(
                "polyhedron of cell {} has non-triangular facets",
                self.cell
            )));
        }
        // The kernel is the last vertex and is not referenced by any facet.
        let n = self.kernel_vertex;
        let v = DMatrix::from_fn(n, 3, |i, d| self.mesh.point(i)[d]);
        let f = DMatrix::from_fn(self.mesh.n_facets(), 3, |i, lv| {
            self.mesh.facet_vertices(i)[lv]
        });
        tetrahedralize_star_shaped_surface(&v, &f, &self.kernel())
    }
}

/// Extract one [`Polyhedron`] per polytope cell of `mesh`.
///
/// Faces are walked with the orientation they have in the cell. When
/// `triangulated` is set, each face is replaced by a fan of triangles around
/// its vertex centroid.
pub fn extract_polyhedra(mesh: &VolumeMesh, triangulated: bool) -> Result<Vec<Polyhedron>> {
    let mut polys = Vec::new();
    for c in 0..mesh.n_cells() {
        if !mesh.is_polytope(c) {
            continue;
        }

        let mut poly = SurfaceMesh::new();
        let mut global_to_local: HashMap<usize, usize> = HashMap::new();
        let mut facet = Vec::new();

        for lf in 0..mesh.n_cell_faces(c) {
            facet.clear();
            let mut index = mesh.get_index_from_element(c, lf, 0);
            for _ in 0..mesh.n_face_vertices(index.face) {
                let local = *global_to_local
                    .entry(index.vertex)
                    .or_insert_with(|| poly.create_vertex(&mesh.point(index.vertex)));
                facet.push(local);
                index = mesh.next_around_face(index);
            }

            if triangulated {
                let centroid = facet
                    .iter()
                    .fold(Point3::zeros(), |acc, &v| acc + poly.point(v))
                    / facet.len() as f64;
                let v0 = poly.create_vertex(&centroid);
                for lv in 0..facet.len() {
                    let v1 = facet[lv];
                    let v2 = facet[(lv + 1) % facet.len()];
                    poly.add_facet(&[v0, v1, v2])?;
                }
            } else {
                poly.add_facet(&facet)?;
            }
        }

        let kernel_vertex = poly.create_vertex(&mesh.kernel(c));
        let borders = poly.compute_borders();
        debug!(
            cell = c,
            vertices = poly.n_vertices(),
            facets = poly.n_facets(),
            borders = borders.len(),
            "extracted polyhedron"
        );

        polys.push(Polyhedron {
            cell: c,
            mesh: poly,
            kernel_vertex,
            borders,
        });
    }
    Ok(polys)
}

/// Connect every triangle of a star-shaped closed surface to `kernel`.
///
/// Returns `OV` (the input vertices with the kernel appended as the last
/// row), `OF` (a copy of `F`) and `OT`, whose row `i` is
/// `[n, F[i, 0], F[i, 1], F[i, 2]]` with `n` the kernel index.
pub fn tetrahedralize_star_shaped_surface(
    v: &DMatrix<f64>,
    f: &DMatrix<usize>,
    kernel: &Point3,
) -> Result<(DMatrix<f64>, DMatrix<usize>, DMatrix<usize>)> {
    if v.ncols() != 3 || f.ncols() != 3 {
        return Err(Error::Format(format!(
            "star-shaped tetrahedralization needs 3-column tables, got V: {}, F: {}",
            v.ncols(),
            f.ncols()
        )));
    }
    let n = v.nrows();
    let ov = DMatrix::from_fn(n + 1, 3, |i, d| if i < n { v[(i, d)] } else { kernel[d] });
    let ot = DMatrix::from_fn(f.nrows(), 4, |i, j| if j == 0 { n } else { f[(i, j - 1)] });
    Ok((ov, f.clone(), ot))
}
