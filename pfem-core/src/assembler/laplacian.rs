//! Scalar Laplacian: `∫ ∇φ_i · ∇φ_j`.

use super::{LinearAssembler, LocalAssembler, RhsAssembler, SolutionJet};
use crate::basis::ElementValues;
use crate::error::Result;
use nalgebra::{DMatrix, DVector};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct Laplacian;

impl LocalAssembler for Laplacian {
    fn size(&self, _dim: usize) -> usize {
        1
    }

    fn set_parameters(&mut self, _params: &Value) -> Result<()> {
        Ok(())
    }
}

impl LinearAssembler for Laplacian {
    fn assemble(&self, vals: &ElementValues) -> DMatrix<f64> {
        let n = vals.values.ncols();
        let mut k = DMatrix::zeros(n, n);
        for q in 0..vals.n_points() {
            let g = &vals.grads[q];
            k += (g * g.transpose()) * vals.det_weights[q];
        }
        k
    }
}

impl RhsAssembler for Laplacian {
    /// `Δu`.
    fn compute_rhs(&self, jet: &SolutionJet) -> DVector<f64> {
        DVector::from_element(1, jet.hessian[0].trace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::test_support::{tetrahedron, triangle, values};
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_triangle_stiffness() {
        let b = crate::assembler::test_support::bases(
            crate::basis::ReferenceElement::P1Triangle,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            0,
        );
        let k = Laplacian.assemble(&values(&b));
        let expected = DMatrix::from_row_slice(3, 3, &[1.0, -0.5, -0.5, -0.5, 0.5, 0.0, -0.5, 0.0, 0.5]);
        assert_relative_eq!(k, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_constants_in_kernel() {
        for b in [triangle(), tetrahedron()] {
            let k = Laplacian.assemble(&values(&b));
            let ones = DVector::from_element(b.n_bases(), 1.0);
            assert_relative_eq!((&k * ones).norm(), 0.0, epsilon = 1e-12);
            assert_relative_eq!(k.clone(), k.transpose(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rhs_is_trace_of_hessian() {
        let jet = SolutionJet {
            value: DVector::from_element(1, 3.0),
            gradient: DMatrix::zeros(1, 2),
            hessian: vec![DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, -5.0])],
        };
        assert_relative_eq!(Laplacian.compute_rhs(&jet)[0], -3.0);
    }
}
