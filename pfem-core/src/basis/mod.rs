//! Lagrange bases on reference elements.
//!
//! An [`ElementBases`] ties a reference element to the global degrees of
//! freedom of one mesh element and carries the quadrature used to integrate
//! over it. The same type describes the geometric mapping (isoparametric
//! elements use the same bases for both).
//!
//! # Submodules
//!
//! - [`quadrature`] - quadrature rules on the reference domains
//! - [`values`] - bases evaluated and mapped at physical points

use crate::error::{Error, Result};
use crate::mesh::SurfaceMesh;
use crate::types::Point3;
use nalgebra::{DMatrix, DVector};

pub mod quadrature;
pub mod values;

pub use quadrature::Quadrature;
pub use values::ElementValues;

/// Reference Lagrange elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceElement {
    /// Linear triangle on `(0,0), (1,0), (0,1)`.
    P1Triangle,
    /// Bilinear quad on `[0,1]^2`, nodes counter-clockwise from the origin.
    Q1Quad,
    /// Linear tetrahedron on the unit simplex.
    P1Tetrahedron,
    /// Trilinear hexahedron on `[0,1]^3`, bottom face then top face.
    Q1Hexahedron,
}

impl ReferenceElement {
    pub fn dim(&self) -> usize {
        match self {
            Self::P1Triangle | Self::Q1Quad => 2,
            Self::P1Tetrahedron | Self::Q1Hexahedron => 3,
        }
    }

    pub fn n_nodes(&self) -> usize {
        match self {
            Self::P1Triangle => 3,
            Self::Q1Quad | Self::P1Tetrahedron => 4,
            Self::Q1Hexahedron => 8,
        }
    }

    /// Polynomial degree of the basis along one direction.
    pub fn degree(&self) -> usize {
        1
    }

    /// Quadrature exact for polynomials of the given degree.
    pub fn quadrature(&self, degree: usize) -> Quadrature {
        match self {
            Self::P1Triangle => Quadrature::triangle(degree),
            Self::Q1Quad => Quadrature::quad(degree),
            Self::P1Tetrahedron => Quadrature::tetrahedron(degree),
            Self::Q1Hexahedron => Quadrature::hex(degree),
        }
    }

    /// Basis values and reference gradients at `p`.
    ///
    /// Returns `(values, grads)` with `values[i] = φ_i(p)` and row `i` of
    /// `grads` holding `∇ξ φ_i(p)` (`n_nodes x dim`).
    pub fn eval(&self, p: &[f64; 3]) -> (DVector<f64>, DMatrix<f64>) {
        let (x, y, z) = (p[0], p[1], p[2]);
        match self {
            Self::P1Triangle => (
                DVector::from_vec(vec![1.0 - x - y, x, y]),
                DMatrix::from_row_slice(3, 2, &[-1.0, -1.0, 1.0, 0.0, 0.0, 1.0]),
            ),
            Self::P1Tetrahedron => (
                DVector::from_vec(vec![1.0 - x - y - z, x, y, z]),
                DMatrix::from_row_slice(
                    4,
                    3,
                    &[
                        -1.0, -1.0, -1.0, //
                        1.0, 0.0, 0.0, //
                        0.0, 1.0, 0.0, //
                        0.0, 0.0, 1.0,
                    ],
                ),
            ),
            Self::Q1Quad => {
                // (corner x, corner y) per node
                const NODES: [(f64, f64); 4] = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
                let mut val = DVector::zeros(4);
                let mut grad = DMatrix::zeros(4, 2);
                for (i, &(cx, cy)) in NODES.iter().enumerate() {
                    let (fx, dx) = linear_1d(x, cx);
                    let (fy, dy) = linear_1d(y, cy);
                    val[i] = fx * fy;
                    grad[(i, 0)] = dx * fy;
                    grad[(i, 1)] = fx * dy;
                }
                (val, grad)
            }
            Self::Q1Hexahedron => {
                const NODES: [(f64, f64, f64); 8] = [
                    (0.0, 0.0, 0.0),
                    (1.0, 0.0, 0.0),
                    (1.0, 1.0, 0.0),
                    (0.0, 1.0, 0.0),
                    (0.0, 0.0, 1.0),
                    (1.0, 0.0, 1.0),
                    (1.0, 1.0, 1.0),
                    (0.0, 1.0, 1.0),
                ];
                let mut val = DVector::zeros(8);
                let mut grad = DMatrix::zeros(8, 3);
                for (i, &(cx, cy, cz)) in NODES.iter().enumerate() {
                    let (fx, dx) = linear_1d(x, cx);
                    let (fy, dy) = linear_1d(y, cy);
                    let (fz, dz) = linear_1d(z, cz);
                    val[i] = fx * fy * fz;
                    grad[(i, 0)] = dx * fy * fz;
                    grad[(i, 1)] = fx * dy * fz;
                    grad[(i, 2)] = fx * fy * dz;
                }
                (val, grad)
            }
        }
    }
}

/// 1D linear Lagrange function attached to `corner` (0 or 1) and its derivative.
#[inline]
fn linear_1d(t: f64, corner: f64) -> (f64, f64) {
    if corner == 0.0 {
        (1.0 - t, -1.0)
    } else {
        (t, 1.0)
    }
}

/// One local basis function: its global degree of freedom and its node.
#[derive(Debug, Clone, PartialEq)]
pub struct Basis {
    pub global_index: usize,
    pub node: Point3,
}

/// Local bases of one mesh element.
#[derive(Debug, Clone)]
pub struct ElementBases {
    pub element: ReferenceElement,
    pub bases: Vec<Basis>,
    pub quadrature: Quadrature,
}

impl ElementBases {
    /// Create the bases of an element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Assembly`] if the number of bases does not match the
    /// reference element.
    pub fn new(element: ReferenceElement, bases: Vec<Basis>, quadrature_degree: usize) -> Result<Self> {
        if bases.len() != element.n_nodes() {
            return Err(Error::Assembly(format!(
                "{:?} needs {} bases, got {}",
                element,
                element.n_nodes(),
                bases.len()
            )));
        }
        Ok(Self {
            element,
            bases,
            quadrature: element.quadrature(quadrature_degree),
        })
    }

    /// Bases attached to mesh vertices `vertices`, with positions from `points`.
    pub fn from_vertices(
        element: ReferenceElement,
        vertices: &[usize],
        points: impl Fn(usize) -> Point3,
        quadrature_degree: usize,
    ) -> Result<Self> {
        let bases = vertices
            .iter()
            .map(|&v| Basis {
                global_index: v,
                node: points(v),
            })
            .collect();
        Self::new(element, bases, quadrature_degree)
    }

    pub fn n_bases(&self) -> usize {
        self.bases.len()
    }

    pub fn dim(&self) -> usize {
        self.element.dim()
    }

    pub fn global_indices(&self) -> Vec<usize> {
        self.bases.iter().map(|b| b.global_index).collect()
    }
}

/// Build P1/Q1 bases for every element of `mesh`.
///
/// For a planar mesh (`is_volume = false`) each triangle or quad facet is an
/// element; for a volume mesh each tetrahedral cell is. The quadrature is
/// chosen exact for products of two basis gradients.
///
/// # Errors
///
/// Returns [`Error::Assembly`] for polygonal facets, which have no
/// Lagrange basis.
pub fn build_bases(mesh: &SurfaceMesh, is_volume: bool) -> Result<Vec<ElementBases>> {
    let points = |v: usize| mesh.point(v);
    if is_volume {
        return (0..mesh.n_cells())
            .map(|c| {
                ElementBases::from_vertices(
                    ReferenceElement::P1Tetrahedron,
                    &mesh.cell_vertices(c),
                    points,
                    2,
                )
            })
            .collect();
    }
    (0..mesh.n_facets())
        .map(|f| {
            let verts = mesh.facet_vertices(f);
            let element = match verts.len() {
                3 => ReferenceElement::P1Triangle,
                4 => ReferenceElement::Q1Quad,
                n => {
                    return Err(Error::Assembly(format!(
                        "facet {} has {} vertices, no Lagrange basis available",
                        f, n
                    )))
                }
            };
            ElementBases::from_vertices(element, verts, points, 2)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ELEMENTS: [ReferenceElement; 4] = [
        ReferenceElement::P1Triangle,
        ReferenceElement::Q1Quad,
        ReferenceElement::P1Tetrahedron,
        ReferenceElement::Q1Hexahedron,
    ];

    #[test]
    fn test_partition_of_unity() {
        let p = [0.2, 0.3, 0.1];
        for element in ELEMENTS {
            let (val, grad) = element.eval(&p);
            assert_eq!(val.len(), element.n_nodes());
            assert_relative_eq!(val.sum(), 1.0, epsilon = 1e-14);
            for d in 0..element.dim() {
                assert_relative_eq!(grad.column(d).sum(), 0.0, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_nodal_interpolation() {
        let (val, _) = ReferenceElement::Q1Hexahedron.eval(&[1.0, 1.0, 0.0]);
        assert_relative_eq!(val[2], 1.0);
        assert_relative_eq!(val.sum(), 1.0);

        let (val, _) = ReferenceElement::Q1Quad.eval(&[0.0, 1.0, 0.0]);
        assert_relative_eq!(val[3], 1.0);
    }

    #[test]
    fn test_build_bases_from_mesh() {
        let mut mesh = SurfaceMesh::new();
        for p in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (2.0, 0.5)] {
            mesh.create_vertex(&Point3::new(p.0, p.1, 0.0));
        }
        mesh.add_facet(&[0, 1, 2, 3]).unwrap();
        mesh.add_facet(&[1, 4, 2]).unwrap();

        let bases = build_bases(&mesh, false).unwrap();
        assert_eq!(bases.len(), 2);
        assert_eq!(bases[0].element, ReferenceElement::Q1Quad);
        assert_eq!(bases[1].global_indices(), vec![1, 4, 2]);
        assert_eq!(bases[1].bases[1].node, Point3::new(2.0, 0.5, 0.0));

        mesh.add_facet(&[0, 1, 4, 2, 3]).unwrap();
        assert!(matches!(build_bases(&mesh, false), Err(Error::Assembly(_))));
    }

    #[test]
    fn test_wrong_basis_count() {
        let bases = vec![
            Basis {
                global_index: 0,
                node: Point3::zeros(),
            };
            3
        ];
        assert!(ElementBases::new(ReferenceElement::P1Tetrahedron, bases, 1).is_err());
    }
}
