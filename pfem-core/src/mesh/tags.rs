//! Element type classification of 2D facets.
//!
//! Each facet receives one [`ElementType`] based on its arity and on the
//! regularity of its vertices. A vertex is regular when the number of
//! incident quads matches the valence of a structured grid: exactly 4 in the
//! interior, at most 2 on the boundary or next to a polygon.

use super::SurfaceMesh;

/// Topological category of a mesh element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Triangle (or tetrahedron).
    Simplex,
    /// Interior quad whose vertices are all regular.
    RegularInteriorCube,
    /// Interior quad with exactly one irregular vertex.
    SimpleSingularInteriorCube,
    /// Interior quad with two or more irregular vertices.
    MultiSingularInteriorCube,
    /// Boundary quad whose vertices are all regular.
    RegularBoundaryCube,
    /// Boundary quad with an irregular boundary vertex.
    SimpleSingularBoundaryCube,
    /// Quad touching a polygonal element.
    InterfaceCube,
    /// Polygon away from the boundary.
    InteriorPolytope,
    /// Polygon with at least one boundary vertex.
    BoundaryPolytope,
    /// Boundary quad with an irregular interior vertex.
    Undefined,
}

impl ElementType {
    /// Quad-based element types.
    pub fn is_cube(self) -> bool {
        matches!(
            self,
            ElementType::RegularInteriorCube
                | ElementType::SimpleSingularInteriorCube
                | ElementType::MultiSingularInteriorCube
                | ElementType::RegularBoundaryCube
                | ElementType::SimpleSingularBoundaryCube
                | ElementType::InterfaceCube
        )
    }

    pub fn is_polytope(self) -> bool {
        matches!(self, ElementType::InteriorPolytope | ElementType::BoundaryPolytope)
    }
}

/// Classify every facet of `mesh`.
///
/// Vertices are read against the mesh `boundary_vertex` attribute. Isolated
/// vertices must not exist; they are not detected.
pub fn compute_element_tags(mesh: &SurfaceMesh) -> Vec<ElementType> {
    let n_vertices = mesh.n_vertices();
    let n_facets = mesh.n_facets();

    // Vertices of triangles and n-gons (n > 4) behave like boundary vertices.
    let mut is_interface = vec![false; n_vertices];
    let mut degree = vec![0usize; n_vertices];
    for f in 0..n_facets {
        let verts = mesh.facet_vertices(f);
        if verts.len() == 4 {
            for &v in verts {
                degree[v] += 1;
            }
        } else {
            for &v in verts {
                is_interface[v] = true;
            }
        }
    }

    let is_regular: Vec<bool> = (0..n_vertices)
        .map(|v| {
            if mesh.is_boundary_vertex(v) || is_interface[v] {
                degree[v] <= 2
            } else {
                degree[v] == 4
            }
        })
        .collect();

    let mut tags: Vec<ElementType> = (0..n_facets)
        .map(|f| {
            let verts = mesh.facet_vertices(f);
            debug_assert!(verts.len() > 2);
            if verts.len() == 4 {
                classify_quad(verts, mesh, &is_interface, &is_regular)
            } else if verts.iter().any(|&v| mesh.is_boundary_vertex(v)) {
                ElementType::BoundaryPolytope
            } else {
                ElementType::InteriorPolytope
            }
        })
        .collect();

    // Simplices bypass the quad analysis entirely.
    for (f, tag) in tags.iter_mut().enumerate() {
        if mesh.facet_size(f) == 3 {
            *tag = ElementType::Simplex;
        }
    }

    tags
}

fn classify_quad(
    verts: &[usize],
    mesh: &SurfaceMesh,
    is_interface: &[bool],
    is_regular: &[bool],
) -> ElementType {
    let on_boundary = |v: usize| mesh.is_boundary_vertex(v);
    let is_boundary_facet = verts.iter().any(|&v| on_boundary(v));
    let is_interface_facet = verts.iter().any(|&v| is_interface[v]);

    if !is_boundary_facet && !is_interface_facet {
        return match verts.iter().filter(|&&v| !is_regular[v]).count() {
            0 => ElementType::RegularInteriorCube,
            1 => ElementType::SimpleSingularInteriorCube,
            _ => ElementType::MultiSingularInteriorCube,
        };
    }

    if is_interface_facet {
        return ElementType::InterfaceCube;
    }

    let mut is_singular = false;
    for &v in verts {
        if on_boundary(v) {
            is_singular |= !is_regular[v];
        } else if !is_regular[v] {
            return ElementType::Undefined;
        }
    }

    if is_singular {
        ElementType::SimpleSingularBoundaryCube
    } else {
        ElementType::RegularBoundaryCube
    }
}
