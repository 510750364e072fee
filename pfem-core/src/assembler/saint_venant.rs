//! Saint Venant-Kirchhoff hyperelasticity.
//!
//! With `F = I + ∇u` and the Green strain `E = ½(FᵀF - I)`:
//!
//! - energy density `W = μ E:E + ½ λ tr(E)²`
//! - second Piola stress `S = λ tr(E) I + 2μ E`
//! - first Piola stress `P = F S`
//!
//! The Hessian is assembled analytically from `dP = dF S + F dS`.

use super::{
    field_gradient, ElasticParameters, LocalAssembler, NonlinearAssembler, StressAssembler,
};
use crate::basis::ElementValues;
use crate::error::Result;
use nalgebra::{DMatrix, DVector};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct SaintVenant {
    pub params: ElasticParameters,
}

/// Deformation gradient and Green strain at one point.
struct Kinematics {
    f: DMatrix<f64>,
    e: DMatrix<f64>,
}

impl SaintVenant {
    fn kinematics(vals: &ElementValues, q: usize, u: &DVector<f64>) -> Kinematics {
        let dim = vals.dim;
        let f = field_gradient(vals, q, u, dim) + DMatrix::identity(dim, dim);
        let e = (f.transpose() * &f - DMatrix::identity(dim, dim)) * 0.5;
        Kinematics { f, e }
    }

    fn second_piola(&self, e: &DMatrix<f64>) -> DMatrix<f64> {
        self.params.stress(e)
    }

    fn energy_density(&self, e: &DMatrix<f64>) -> f64 {
        let ElasticParameters { lambda, mu } = self.params;
        let tr = e.trace();
        mu * e.component_mul(e).sum() + 0.5 * lambda * tr * tr
    }
}

impl LocalAssembler for SaintVenant {
    fn size(&self, dim: usize) -> usize {
        dim
    }

    fn set_parameters(&mut self, params: &Value) -> Result<()> {
        self.params.update(params)
    }
}

impl NonlinearAssembler for SaintVenant {
    fn compute_energy(&self, vals: &ElementValues, u: &DVector<f64>) -> f64 {
        (0..vals.n_points())
            .map(|q| {
                let Kinematics { e, .. } = Self::kinematics(vals, q, u);
                self.energy_density(&e) * vals.det_weights[q]
            })
            .sum()
    }

    fn assemble_gradient(&self, vals: &ElementValues, u: &DVector<f64>) -> DVector<f64> {
        let dim = vals.dim;
        let n = vals.values.ncols();
        let mut grad = DVector::zeros(n * dim);
        for q in 0..vals.n_points() {
            let Kinematics { f, e } = Self::kinematics(vals, q, u);
            let p = &f * self.second_piola(&e);
            // g_(i,a) = ∫ P[a, :] · ∇φ_i
            let pg = &vals.grads[q] * p.transpose() * vals.det_weights[q];
            for i in 0..n {
                for a in 0..dim {
                    grad[i * dim + a] += pg[(i, a)];
                }
            }
        }
        grad
    }

    fn assemble_hessian(&self, vals: &ElementValues, u: &DVector<f64>) -> DMatrix<f64> {
        let dim = vals.dim;
        let n = vals.values.ncols();
        let mut hessian = DMatrix::zeros(n * dim, n * dim);
        for q in 0..vals.n_points() {
            let Kinematics { f, e } = Self::kinematics(vals, q, u);
            let s = self.second_piola(&e);
            let g = &vals.grads[q];
            let w = vals.det_weights[q];

            for j in 0..n {
                for b in 0..dim {
                    // dF = e_b ⊗ ∇φ_j
                    let mut df = DMatrix::zeros(dim, dim);
                    for k in 0..dim {
                        df[(b, k)] = g[(j, k)];
                    }
                    let de = (df.transpose() * &f + f.transpose() * &df) * 0.5;
                    let dp = &df * &s + &f * self.second_piola(&de);
                    let column = g * dp.transpose() * w;
                    for i in 0..n {
                        for a in 0..dim {
                            hessian[(i * dim + a, j * dim + b)] += column[(i, a)];
                        }
                    }
                }
            }
        }
        hessian
    }
}

impl StressAssembler for SaintVenant {
    /// Cauchy stress `F S Fᵀ / det F`.
    fn compute_stress_tensor(&self, vals: &ElementValues, u: &DVector<f64>) -> Vec<DMatrix<f64>> {
        (0..vals.n_points())
            .map(|q| {
                let Kinematics { f, e } = Self::kinematics(vals, q, u);
                let j = f.determinant();
                &f * self.second_piola(&e) * f.transpose() / j
            })
            .collect()
    }
}
