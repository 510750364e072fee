//! Scalar Helmholtz operator: `∫ ∇φ_i · ∇φ_j - k² φ_i φ_j`.

use super::{parse_params, LinearAssembler, LocalAssembler, RhsAssembler, SolutionJet};
use crate::basis::ElementValues;
use crate::error::Result;
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HelmholtzKeys {
    k: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Helmholtz {
    /// Wave number.
    pub k: f64,
}

impl Default for Helmholtz {
    fn default() -> Self {
        Self { k: 1.0 }
    }
}

impl LocalAssembler for Helmholtz {
    fn size(&self, _dim: usize) -> usize {
        1
    }

    fn set_parameters(&mut self, params: &Value) -> Result<()> {
        let keys: HelmholtzKeys = parse_params(params)?;
        if let Some(k) = keys.k {
            self.k = k;
        }
        Ok(())
    }
}

impl LinearAssembler for Helmholtz {
    fn assemble(&self, vals: &ElementValues) -> DMatrix<f64> {
        let n = vals.values.ncols();
        let k2 = self.k * self.k;
        let mut m = DMatrix::zeros(n, n);
        for q in 0..vals.n_points() {
            let g = &vals.grads[q];
            let phi = vals.values.row(q);
            m += (g * g.transpose() - phi.transpose() * phi * k2) * vals.det_weights[q];
        }
        m
    }
}

impl RhsAssembler for Helmholtz {
    /// `Δu + k² u`.
    fn compute_rhs(&self, jet: &SolutionJet) -> DVector<f64> {
        DVector::from_element(1, jet.hessian[0].trace() + self.k * self.k * jet.value[0])
    }
}
