//! Isotropic linear elasticity in Lamé form.
//!
//! `a(u, v) = ∫ 2μ ε(u) : ε(v) + λ div u div v`

use super::{
    field_gradient, ElasticParameters, LinearAssembler, LocalAssembler, RhsAssembler,
    SolutionJet, StressAssembler,
};
use crate::basis::ElementValues;
use crate::error::Result;
use nalgebra::{DMatrix, DVector};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct LinearElasticity {
    pub params: ElasticParameters,
}

impl LocalAssembler for LinearElasticity {
    fn size(&self, dim: usize) -> usize {
        dim
    }

    fn set_parameters(&mut self, params: &Value) -> Result<()> {
        self.params.update(params)
    }
}

impl LinearAssembler for LinearElasticity {
    fn assemble(&self, vals: &ElementValues) -> DMatrix<f64> {
        let dim = vals.dim;
        let n = vals.values.ncols();
        let ElasticParameters { lambda, mu } = self.params;
        let mut k = DMatrix::zeros(n * dim, n * dim);

        for q in 0..vals.n_points() {
            let g = &vals.grads[q];
            let w = vals.det_weights[q];
            for i in 0..n {
                for j in 0..n {
                    let dot: f64 = (0..dim).map(|d| g[(i, d)] * g[(j, d)]).sum();
                    for a in 0..dim {
                        for b in 0..dim {
                            let mut v = mu * g[(i, b)] * g[(j, a)] + lambda * g[(i, a)] * g[(j, b)];
                            if a == b {
                                v += mu * dot;
                            }
                            k[(i * dim + a, j * dim + b)] += w * v;
                        }
                    }
                }
            }
        }
        k
    }
}

impl StressAssembler for LinearElasticity {
    fn compute_stress_tensor(&self, vals: &ElementValues, u: &DVector<f64>) -> Vec<DMatrix<f64>> {
        (0..vals.n_points())
            .map(|q| {
                let grad = field_gradient(vals, q, u, vals.dim);
                let strain = (&grad + grad.transpose()) * 0.5;
                self.params.stress(&strain)
            })
            .collect()
    }
}

impl RhsAssembler for LinearElasticity {
    /// `div σ(u) = μ Δu + (λ + μ) ∇(div u)`.
    fn compute_rhs(&self, jet: &SolutionJet) -> DVector<f64> {
        let dim = jet.dim();
        let ElasticParameters { lambda, mu } = self.params;
        DVector::from_fn(dim, |a, _| {
            let laplacian = jet.hessian[a].trace();
            let grad_div: f64 = (0..dim).map(|b| jet.hessian[b][(a, b)]).sum();
            mu * laplacian + (lambda + mu) * grad_div
        })
    }
}
