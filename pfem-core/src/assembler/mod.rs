//! Finite element operators and their dispatch by model name.
//!
//! Each model implements the capability traits it supports:
//!
//! | Model                   | Linear | Nonlinear | Stress | Rhs |
//! |-------------------------|--------|-----------|--------|-----|
//! | `Laplacian`             | x      |           |        | x   |
//! | `Helmholtz`             | x      |           |        | x   |
//! | `LinearElasticity`      | x      |           | x      | x   |
//! | `HookeLinearElasticity` | x      |           | x      | x   |
//! | `SaintVenant`           |        | x         | x      |     |
//!
//! Local operators work on [`ElementValues`]; [`global`] scatters them into
//! sparse matrices and vectors. Vector unknowns are interleaved: component
//! `d` of node `i` is degree of freedom `i * size + d`.
//!
//! # Submodules
//!
//! - [`dispatch`] - the [`Assemblers`] dispatcher
//! - [`global`] - parallel local-to-global assembly
//! - [`elastic`] - isotropic elastic parameters

use crate::basis::ElementValues;
use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub mod dispatch;
pub mod elastic;
pub mod global;
pub mod helmholtz;
pub mod hooke;
pub mod laplacian;
pub mod linear_elasticity;
pub mod saint_venant;

pub use dispatch::{Assemblers, DispatchConfig, DispatchPolicy};
pub use elastic::ElasticParameters;
pub use helmholtz::Helmholtz;
pub use hooke::HookeLinearElasticity;
pub use laplacian::Laplacian;
pub use linear_elasticity::LinearElasticity;
pub use saint_venant::SaintVenant;

/// Model identifiers known to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    Laplacian,
    Helmholtz,
    LinearElasticity,
    HookeLinearElasticity,
    SaintVenant,
}

impl Model {
    pub const SCALAR: [Model; 2] = [Model::Laplacian, Model::Helmholtz];
    pub const TENSOR: [Model; 3] = [
        Model::LinearElasticity,
        Model::HookeLinearElasticity,
        Model::SaintVenant,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Model::Laplacian => "Laplacian",
            Model::Helmholtz => "Helmholtz",
            Model::LinearElasticity => "LinearElasticity",
            Model::HookeLinearElasticity => "HookeLinearElasticity",
            Model::SaintVenant => "SaintVenant",
        }
    }

    pub fn is_scalar(&self) -> bool {
        Self::SCALAR.contains(self)
    }

    pub fn is_linear(&self) -> bool {
        *self != Model::SaintVenant
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::SCALAR
            .iter()
            .chain(Self::TENSOR.iter())
            .find(|m| m.name() == s)
            .copied()
            .ok_or_else(|| Error::UnknownModel(s.to_string()))
    }
}

/// Value, gradient and Hessian of a (possibly vector) field at one point.
///
/// `gradient` is `size x dim` and `hessian[c]` is the `dim x dim` Hessian of
/// component `c`.
#[derive(Debug, Clone)]
pub struct SolutionJet {
    pub value: DVector<f64>,
    pub gradient: DMatrix<f64>,
    pub hessian: Vec<DMatrix<f64>>,
}

impl SolutionJet {
    pub fn size(&self) -> usize {
        self.value.len()
    }

    pub fn dim(&self) -> usize {
        self.gradient.ncols()
    }
}

/// Common interface of every local operator.
pub trait LocalAssembler: Send + Sync {
    /// Number of unknowns per node in a problem of dimension `dim`.
    fn size(&self, dim: usize) -> usize;

    /// Read the keys this operator understands from `params`.
    fn set_parameters(&mut self, params: &Value) -> Result<()>;
}

/// Operators with a constant local stiffness matrix.
pub trait LinearAssembler: LocalAssembler {
    /// Local stiffness, `(n_bases * size)` square, interleaved.
    fn assemble(&self, vals: &ElementValues) -> DMatrix<f64>;
}

/// Operators defined by an energy density.
///
/// `u` is the local displacement, interleaved like the stiffness.
pub trait NonlinearAssembler: LocalAssembler {
    fn compute_energy(&self, vals: &ElementValues, u: &DVector<f64>) -> f64;

    fn assemble_gradient(&self, vals: &ElementValues, u: &DVector<f64>) -> DVector<f64>;

    fn assemble_hessian(&self, vals: &ElementValues, u: &DVector<f64>) -> DMatrix<f64>;
}

/// Operators with a stress post-processing.
pub trait StressAssembler: LocalAssembler {
    /// Cauchy stress (`dim x dim`) at every point of `vals`.
    fn compute_stress_tensor(&self, vals: &ElementValues, u: &DVector<f64>) -> Vec<DMatrix<f64>>;

    /// Von Mises stress at every point of `vals`.
    fn compute_von_mises_stresses(&self, vals: &ElementValues, u: &DVector<f64>) -> DVector<f64> {
        let stresses = self.compute_stress_tensor(vals, u);
        DVector::from_iterator(stresses.len(), stresses.iter().map(crate::types::von_mises))
    }
}

/// Operators that can produce a manufactured right-hand side.
pub trait RhsAssembler: LocalAssembler {
    /// The differential operator applied to the field described by `jet`.
    fn compute_rhs(&self, jet: &SolutionJet) -> DVector<f64>;
}

/// Deserialize the keys of `T` from a parameter object, `null` meaning none.
pub(crate) fn parse_params<T: DeserializeOwned + Default>(params: &Value) -> Result<T> {
    if params.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(params.clone())?)
}

/// `∇u` (`size x dim`) at point `q` for the local coefficients `u`.
pub(crate) fn field_gradient(vals: &ElementValues, q: usize, u: &DVector<f64>, size: usize) -> DMatrix<f64> {
    let grads = &vals.grads[q];
    let mut g = DMatrix::zeros(size, vals.dim);
    for i in 0..grads.nrows() {
        for a in 0..size {
            let ui = u[i * size + a];
            for k in 0..vals.dim {
                g[(a, k)] += ui * grads[(i, k)];
            }
        }
    }
    g
}
