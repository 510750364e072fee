//! Bases evaluated at physical points through the geometric mapping.

use super::ElementBases;
use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// Basis values and physical gradients at a set of points of one element.
#[derive(Debug, Clone)]
pub struct ElementValues {
    pub dim: usize,
    /// Physical positions, one row per point.
    pub points: DMatrix<f64>,
    /// `|det J| * w` per point; zero when evaluated at bare points.
    pub det_weights: DVector<f64>,
    /// `values[(q, i)] = φ_i` at point `q`.
    pub values: DMatrix<f64>,
    /// `grads[q]` is `n_bases x dim`, row `i` the physical gradient of `φ_i`.
    pub grads: Vec<DMatrix<f64>>,
}

impl ElementValues {
    /// Evaluate `bases` at their quadrature points, mapped by `gbases`.
    pub fn compute(bases: &ElementBases, gbases: &ElementBases) -> Result<Self> {
        Self::compute_at(bases, gbases, &bases.quadrature.points, &bases.quadrature.weights)
    }

    /// Evaluate at arbitrary reference points (`weights` may be empty).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Assembly`] if the two bases disagree on dimension or
    /// the geometric mapping is singular at one of the points.
    pub fn compute_at(
        bases: &ElementBases,
        gbases: &ElementBases,
        reference: &[[f64; 3]],
        weights: &[f64],
    ) -> Result<Self> {
        let dim = bases.dim();
        if gbases.dim() != dim {
            return Err(Error::Assembly(format!(
                "bases of dimension {} mapped by geometry of dimension {}",
                dim,
                gbases.dim()
            )));
        }

        let n_q = reference.len();
        let nodes = DMatrix::from_fn(gbases.n_bases(), dim, |i, d| gbases.bases[i].node[d]);

        let mut points = DMatrix::zeros(n_q, dim);
        let mut det_weights = DVector::zeros(n_q);
        let mut values = DMatrix::zeros(n_q, bases.n_bases());
        let mut grads = Vec::with_capacity(n_q);

        for (q, p) in reference.iter().enumerate() {
            let (gval, ggrad) = gbases.element.eval(p);
            let jac = nodes.transpose() * &ggrad;
            let det = jac.determinant();
            let inv = jac.try_inverse().filter(|_| det != 0.0).ok_or_else(|| {
                Error::Assembly(format!("singular geometric mapping at {:?}", p))
            })?;

            points.row_mut(q).copy_from(&(nodes.transpose() * gval).transpose());
            det_weights[q] = det.abs() * weights.get(q).copied().unwrap_or(0.0);

            let (val, grad) = bases.element.eval(p);
            values.row_mut(q).copy_from(&val.transpose());
            grads.push(grad * inv);
        }

        Ok(Self {
            dim,
            points,
            det_weights,
            values,
            grads,
        })
    }

    pub fn n_points(&self) -> usize {
        self.det_weights.len()
    }

    /// Measure of the element.
    pub fn measure(&self) -> f64 {
        self.det_weights.sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::{Basis, ReferenceElement};
    use crate::types::Point3;
    use approx::assert_relative_eq;

    fn element(kind: ReferenceElement, nodes: &[[f64; 3]]) -> ElementBases {
        let bases = nodes
            .iter()
            .enumerate()
            .map(|(i, p)| Basis {
                global_index: i,
                node: Point3::new(p[0], p[1], p[2]),
            })
            .collect();
        ElementBases::new(kind, bases, 2).unwrap()
    }

    #[test]
    fn test_scaled_triangle() {
        let tri = element(
            ReferenceElement::P1Triangle,
            &[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 3.0, 0.0]],
        );
        let vals = ElementValues::compute(&tri, &tri).unwrap();
        assert_relative_eq!(vals.measure(), 3.0, epsilon = 1e-12);
        // ∇φ_1 = (1/2, 0), ∇φ_2 = (0, 1/3)
        assert_relative_eq!(vals.grads[0][(1, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(vals.grads[0][(2, 1)], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(vals.grads[0][(0, 0)], -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_hex_gradients_reproduce_linear_field() {
        let nodes = [
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 0.5],
            [2.0, 0.0, 0.5],
            [2.0, 1.0, 0.5],
            [0.0, 1.0, 0.5],
        ];
        let hex = element(ReferenceElement::Q1Hexahedron, &nodes);
        let vals = ElementValues::compute(&hex, &hex).unwrap();
        assert_relative_eq!(vals.measure(), 1.0, epsilon = 1e-12);

        // u = x + 2y - z interpolated at the nodes has gradient (1, 2, -1).
        let u: Vec<f64> = nodes.iter().map(|p| p[0] + 2.0 * p[1] - p[2]).collect();
        for q in 0..vals.n_points() {
            let g = vals.grads[q].transpose() * DVector::from_vec(u.clone());
            assert_relative_eq!(g[0], 1.0, epsilon = 1e-12);
            assert_relative_eq!(g[1], 2.0, epsilon = 1e-12);
            assert_relative_eq!(g[2], -1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_points_are_mapped() {
        let tri = element(
            ReferenceElement::P1Triangle,
            &[[1.0, 1.0, 0.0], [2.0, 1.0, 0.0], [1.0, 2.0, 0.0]],
        );
        let vals = ElementValues::compute_at(&tri, &tri, &[[0.5, 0.5, 0.0]], &[]).unwrap();
        assert_relative_eq!(vals.points[(0, 0)], 1.5, epsilon = 1e-12);
        assert_relative_eq!(vals.points[(0, 1)], 1.5, epsilon = 1e-12);
        assert_eq!(vals.det_weights[0], 0.0);
    }

    #[test]
    fn test_degenerate_element() {
        let tri = element(
            ReferenceElement::P1Triangle,
            &[[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 2.0, 0.0]],
        );
        assert!(matches!(ElementValues::compute(&tri, &tri), Err(Error::Assembly(_))));
    }
}
