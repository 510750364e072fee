//! Linear elasticity with a general (anisotropic) Hooke tensor.
//!
//! The tensor is given in Voigt notation with engineering shear strains,
//! ordered `[xx, yy, xy]` in 2D and `[xx, yy, zz, xy, yz, xz]` in 3D.
//! Without an explicit tensor the isotropic one built from `E`/`nu` (plane
//! strain in 2D) is used.

use super::{
    field_gradient, parse_params, ElasticParameters, LinearAssembler, LocalAssembler,
    RhsAssembler, SolutionJet, StressAssembler,
};
use crate::basis::ElementValues;
use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector, Matrix3, Matrix6};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HookeKeys {
    elasticity_tensor: Option<Vec<f64>>,
}

/// Voigt index of the symmetric pair `(a, b)`.
fn voigt(dim: usize, a: usize, b: usize) -> usize {
    if a == b {
        return a;
    }
    match (dim, a.min(b), a.max(b)) {
        (2, _, _) => 2,
        (_, 0, 1) => 3,
        (_, 1, 2) => 4,
        _ => 5,
    }
}

/// Symmetric matrix from its row-major upper triangle.
fn from_upper_triangle(n: usize, entries: &[f64]) -> DMatrix<f64> {
    let mut m = DMatrix::zeros(n, n);
    let mut it = entries.iter();
    for i in 0..n {
        for j in i..n {
            if let Some(&v) = it.next() {
                m[(i, j)] = v;
                m[(j, i)] = v;
            }
        }
    }
    m
}

#[derive(Debug, Clone, Default)]
pub struct HookeLinearElasticity {
    pub isotropic: ElasticParameters,
    tensor_2d: Option<Matrix3<f64>>,
    tensor_3d: Option<Matrix6<f64>>,
}

impl HookeLinearElasticity {
    /// Set the elasticity tensor from its 6 (2D) or 21 (3D) upper-triangle
    /// entries.
    pub fn set_elasticity_tensor(&mut self, entries: &[f64]) -> Result<()> {
        match entries.len() {
            6 => {
                let m = from_upper_triangle(3, entries);
                self.tensor_2d = Some(Matrix3::from_fn(|i, j| m[(i, j)]));
            }
            21 => {
                let m = from_upper_triangle(6, entries);
                self.tensor_3d = Some(Matrix6::from_fn(|i, j| m[(i, j)]));
            }
            n => {
                return Err(Error::InvalidParameter(format!(
                    "elasticity tensor needs 6 (2D) or 21 (3D) entries, got {}",
                    n
                )))
            }
        }
        Ok(())
    }

    /// Voigt stiffness for a problem of dimension `dim`.
    pub fn elasticity_matrix(&self, dim: usize) -> DMatrix<f64> {
        if dim == 2 {
            let c = self
                .tensor_2d
                .unwrap_or_else(|| self.isotropic.constitutive_plane_strain());
            DMatrix::from_fn(3, 3, |i, j| c[(i, j)])
        } else {
            let c = self
                .tensor_3d
                .unwrap_or_else(|| self.isotropic.constitutive_3d());
            DMatrix::from_fn(6, 6, |i, j| c[(i, j)])
        }
    }

    /// Strain-displacement matrix of one basis gradient (`n_voigt x dim`).
    fn b_matrix(dim: usize, grad: &[f64]) -> DMatrix<f64> {
        let n_voigt = if dim == 2 { 3 } else { 6 };
        let mut b = DMatrix::zeros(n_voigt, dim);
        for a in 0..dim {
            for k in 0..dim {
                b[(voigt(dim, a, k), a)] = grad[k];
            }
        }
        b
    }
}

impl LocalAssembler for HookeLinearElasticity {
    fn size(&self, dim: usize) -> usize {
        dim
    }

    fn set_parameters(&mut self, params: &Value) -> Result<()> {
        self.isotropic.update(params)?;
        let keys: HookeKeys = parse_params(params)?;
        if let Some(entries) = keys.elasticity_tensor {
            self.set_elasticity_tensor(&entries)?;
        }
        Ok(())
    }
}

impl LinearAssembler for HookeLinearElasticity {
    fn assemble(&self, vals: &ElementValues) -> DMatrix<f64> {
        let dim = vals.dim;
        let n = vals.values.ncols();
        let c = self.elasticity_matrix(dim);
        let mut k = DMatrix::zeros(n * dim, n * dim);

        for q in 0..vals.n_points() {
            let g = &vals.grads[q];
            let w = vals.det_weights[q];
            let bs: Vec<DMatrix<f64>> = (0..n)
                .map(|i| {
                    let row: Vec<f64> = g.row(i).iter().copied().collect();
                    Self::b_matrix(dim, &row)
                })
                .collect();
            for i in 0..n {
                let bt_c = bs[i].transpose() * &c;
                for j in 0..n {
                    let block = &bt_c * &bs[j] * w;
                    let mut view = k.view_mut((i * dim, j * dim), (dim, dim));
                    view += block;
                }
            }
        }
        k
    }
}

impl StressAssembler for HookeLinearElasticity {
    fn compute_stress_tensor(&self, vals: &ElementValues, u: &DVector<f64>) -> Vec<DMatrix<f64>> {
        let dim = vals.dim;
        let c = self.elasticity_matrix(dim);
        (0..vals.n_points())
            .map(|q| {
                let grad = field_gradient(vals, q, u, dim);
                // engineering strain: shear components are ∂_k u_a + ∂_a u_k
                let mut strain = DVector::zeros(c.nrows());
                for a in 0..dim {
                    for k in 0..dim {
                        if a == k {
                            strain[a] = grad[(a, a)];
                        } else if a < k {
                            strain[voigt(dim, a, k)] = grad[(a, k)] + grad[(k, a)];
                        }
                    }
                }
                let s = &c * strain;
                DMatrix::from_fn(dim, dim, |a, b| s[voigt(dim, a, b)])
            })
            .collect()
    }
}

impl RhsAssembler for HookeLinearElasticity {
    /// `(div σ)_a = Σ_{b,c,d} C_abcd ∂_b ∂_d u_c`.
    fn compute_rhs(&self, jet: &SolutionJet) -> DVector<f64> {
        let dim = jet.dim();
        let c = self.elasticity_matrix(dim);
        DVector::from_fn(dim, |a, _| {
            let mut sum = 0.0;
            for b in 0..dim {
                for cc in 0..dim {
                    for d in 0..dim {
                        sum += c[(voigt(dim, a, b), voigt(dim, cc, d))] * jet.hessian[cc][(d, b)];
                    }
                }
            }
            sum
        })
    }
}
