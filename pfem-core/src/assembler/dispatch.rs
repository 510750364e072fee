//! Model dispatch.
//!
//! [`Assemblers`] owns one instance of every operator and routes each call
//! by model name. Names that are unknown, or that name a model of the wrong
//! kind for the call, are handled according to the [`DispatchPolicy`]:
//! logged and replaced by a default model, or rejected.

use super::global;
use super::{
    Helmholtz, HookeLinearElasticity, Laplacian, LinearElasticity, LocalAssembler, Model,
    RhsAssembler, SaintVenant, SolutionJet, StressAssembler,
};
use crate::basis::{ElementBases, ElementValues};
use crate::error::{Error, Result};
use crate::sparse::{self, gather_block_vector, CsrMatrix};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info_span, warn, Span};

/// What to do with a model name the call cannot serve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchPolicy {
    /// Warn and use the default model of the call.
    #[default]
    Fallback,
    /// Return [`Error::UnknownModel`].
    Strict,
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub policy: DispatchPolicy,
}

/// Operator registry with name-based dispatch.
pub struct Assemblers {
    laplacian: Laplacian,
    helmholtz: Helmholtz,
    linear_elasticity: LinearElasticity,
    hooke_linear_elasticity: HookeLinearElasticity,
    saint_venant: SaintVenant,
    policy: DispatchPolicy,
    span: Span,
}

impl Default for Assemblers {
    fn default() -> Self {
        Self::new()
    }
}

impl Assemblers {
    /// Dispatcher with default parameters and the fallback policy.
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self {
            laplacian: Laplacian,
            helmholtz: Helmholtz::default(),
            linear_elasticity: LinearElasticity::default(),
            hooke_linear_elasticity: HookeLinearElasticity::default(),
            saint_venant: SaintVenant::default(),
            policy: config.policy,
            span: info_span!("assemblers"),
        }
    }

    /// Emit this dispatcher's events under `span` instead of its own.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Names of the scalar models.
    pub fn scalar_assemblers(&self) -> Vec<&'static str> {
        Model::SCALAR.iter().map(Model::name).collect()
    }

    /// Names of the tensor models.
    pub fn tensor_assemblers(&self) -> Vec<&'static str> {
        Model::TENSOR.iter().map(Model::name).collect()
    }

    /// False only for `"SaintVenant"`.
    pub fn is_linear(&self, name: &str) -> bool {
        name != Model::SaintVenant.name()
    }

    fn resolve(&self, name: &str, allowed: &[Model], fallback: Model, call: &str) -> Result<Model> {
        if let Ok(model) = name.parse::<Model>() {
            if allowed.contains(&model) {
                return Ok(model);
            }
        }
        match self.policy {
            DispatchPolicy::Fallback => {
                warn!(
                    parent: &self.span,
                    model = name,
                    fallback = %fallback,
                    call = call,
                    "{} not found, fallback to default",
                    name
                );
                Ok(fallback)
            }
            DispatchPolicy::Strict => Err(Error::UnknownModel(name.to_string())),
        }
    }

    /// Global stiffness of a scalar model.
    pub fn assemble_scalar_problem(
        &self,
        name: &str,
        is_volume: bool,
        n_basis: usize,
        bases: &[ElementBases],
        gbases: &[ElementBases],
    ) -> Result<CsrMatrix> {
        let model = self.resolve(name, &Model::SCALAR, Model::Laplacian, "assemble_scalar_problem")?;
        debug!(parent: &self.span, %model, elements = bases.len(), "assemble scalar problem");
        match model {
            Model::Helmholtz => global::assemble_stiffness(&self.helmholtz, is_volume, n_basis, bases, gbases),
            Model::Laplacian
            | Model::LinearElasticity
            | Model::HookeLinearElasticity
            | Model::SaintVenant => global::assemble_stiffness(&self.laplacian, is_volume, n_basis, bases, gbases),
        }
    }

    /// Global stiffness of a tensor model; empty for `SaintVenant`.
    pub fn assemble_tensor_problem(
        &self,
        name: &str,
        is_volume: bool,
        n_basis: usize,
        bases: &[ElementBases],
        gbases: &[ElementBases],
    ) -> Result<CsrMatrix> {
        let model = self.resolve(name, &Model::TENSOR, Model::LinearElasticity, "assemble_tensor_problem")?;
        debug!(parent: &self.span, %model, elements = bases.len(), "assemble tensor problem");
        match model {
            Model::HookeLinearElasticity => global::assemble_stiffness(
                &self.hooke_linear_elasticity,
                is_volume,
                n_basis,
                bases,
                gbases,
            ),
            Model::SaintVenant => Ok(sparse::zeros(n_basis * dim(is_volume))),
            Model::LinearElasticity | Model::Laplacian | Model::Helmholtz => global::assemble_stiffness(
                &self.linear_elasticity,
                is_volume,
                n_basis,
                bases,
                gbases,
            ),
        }
    }

    /// Elastic energy; zero for every model but `SaintVenant`.
    ///
    /// Linear and unknown names are not an error here and are not logged.
    pub fn assemble_tensor_energy(
        &self,
        name: &str,
        is_volume: bool,
        bases: &[ElementBases],
        gbases: &[ElementBases],
        displacement: &DVector<f64>,
    ) -> Result<f64> {
        if self.is_linear(name) {
            return Ok(0.0);
        }
        global::assemble_energy(&self.saint_venant, is_volume, bases, gbases, displacement)
    }

    /// Energy gradient; zero for every model but `SaintVenant`.
    pub fn assemble_tensor_energy_gradient(
        &self,
        name: &str,
        is_volume: bool,
        n_basis: usize,
        bases: &[ElementBases],
        gbases: &[ElementBases],
        displacement: &DVector<f64>,
    ) -> Result<DVector<f64>> {
        if self.is_linear(name) {
            return Ok(DVector::zeros(n_basis * dim(is_volume)));
        }
        global::assemble_gradient(&self.saint_venant, is_volume, n_basis, bases, gbases, displacement)
    }

    /// Energy Hessian; zero for every model but `SaintVenant`.
    pub fn assemble_tensor_energy_hessian(
        &self,
        name: &str,
        is_volume: bool,
        n_basis: usize,
        bases: &[ElementBases],
        gbases: &[ElementBases],
        displacement: &DVector<f64>,
    ) -> Result<CsrMatrix> {
        if self.is_linear(name) {
            return Ok(sparse::zeros(n_basis * dim(is_volume)));
        }
        global::assemble_hessian(&self.saint_venant, is_volume, n_basis, bases, gbases, displacement)
    }

    /// Von Mises stress of the global solution `fun` at the reference
    /// points `local_pts` of element `bs`.
    ///
    /// Scalar models have no stress and return an empty vector.
    pub fn compute_scalar_value(
        &self,
        name: &str,
        bs: &ElementBases,
        local_pts: &[[f64; 3]],
        fun: &DVector<f64>,
    ) -> Result<DVector<f64>> {
        let op: &dyn StressAssembler = match self.resolve_any(name, "compute_scalar_value")? {
            Model::Laplacian | Model::Helmholtz => return Ok(DVector::zeros(0)),
            Model::LinearElasticity => &self.linear_elasticity,
            Model::HookeLinearElasticity => &self.hooke_linear_elasticity,
            Model::SaintVenant => &self.saint_venant,
        };

        let size = op.size(bs.dim());
        let global = bs.global_indices();
        if let Some(&g) = global.iter().find(|&&g| (g + 1) * size > fun.len()) {
            return Err(Error::Assembly(format!(
                "solution of length {} has no values for basis {}",
                fun.len(),
                g
            )));
        }
        let vals = ElementValues::compute_at(bs, bs, local_pts, &[])?;
        let u = gather_block_vector(fun, &global, size);
        Ok(op.compute_von_mises_stresses(&vals, &u))
    }

    /// Manufactured right-hand side of `name` for the field `jet`.
    pub fn compute_rhs(&self, name: &str, jet: &SolutionJet) -> Result<DVector<f64>> {
        let supported = [
            Model::Laplacian,
            Model::Helmholtz,
            Model::LinearElasticity,
            Model::HookeLinearElasticity,
        ];
        let op: &dyn RhsAssembler = match self.resolve(name, &supported, Model::Laplacian, "compute_rhs")? {
            Model::Helmholtz => &self.helmholtz,
            Model::LinearElasticity => &self.linear_elasticity,
            Model::HookeLinearElasticity => &self.hooke_linear_elasticity,
            Model::Laplacian | Model::SaintVenant => &self.laplacian,
        };
        Ok(op.compute_rhs(jet))
    }

    /// Forward `params` to every operator, selected or not.
    ///
    /// Either every operator takes the new values or, on error, none does.
    pub fn set_parameters(&mut self, params: &Value) -> Result<()> {
        let mut laplacian = self.laplacian.clone();
        let mut helmholtz = self.helmholtz.clone();
        let mut linear_elasticity = self.linear_elasticity.clone();
        let mut hooke_linear_elasticity = self.hooke_linear_elasticity.clone();
        let mut saint_venant = self.saint_venant.clone();

        laplacian.set_parameters(params)?;
        helmholtz.set_parameters(params)?;
        linear_elasticity.set_parameters(params)?;
        hooke_linear_elasticity.set_parameters(params)?;
        saint_venant.set_parameters(params)?;

        self.laplacian = laplacian;
        self.helmholtz = helmholtz;
        self.linear_elasticity = linear_elasticity;
        self.hooke_linear_elasticity = hooke_linear_elasticity;
        self.saint_venant = saint_venant;
        Ok(())
    }

    /// Any known model; unknown names go through the policy with
    /// `LinearElasticity` as the default.
    fn resolve_any(&self, name: &str, call: &str) -> Result<Model> {
        let all = [
            Model::Laplacian,
            Model::Helmholtz,
            Model::LinearElasticity,
            Model::HookeLinearElasticity,
            Model::SaintVenant,
        ];
        self.resolve(name, &all, Model::LinearElasticity, call)
    }
}

fn dim(is_volume: bool) -> usize {
    if is_volume {
        3
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::test_support::{bases, tetrahedron, triangle};
    use crate::basis::ReferenceElement;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use serde_json::json;

    fn mesh() -> Vec<ElementBases> {
        vec![
            triangle(),
            bases(
                ReferenceElement::P1Triangle,
                &[[1.2, 0.1, 0.0], [1.5, 1.0, 0.0], [0.3, 0.9, 0.0]],
                1,
            ),
        ]
    }

    fn dense(m: &CsrMatrix) -> DMatrix<f64> {
        DMatrix::from(m)
    }

    #[test]
    fn test_unknown_scalar_model_falls_back_to_laplacian() {
        let assemblers = Assemblers::new();
        let b = mesh();
        let bogus = assemblers.assemble_scalar_problem("Bogus", false, 4, &b, &b).unwrap();
        let laplacian = assemblers.assemble_scalar_problem("Laplacian", false, 4, &b, &b).unwrap();
        assert_eq!(dense(&bogus), dense(&laplacian));

        // a tensor model is unknown to the scalar call
        let wrong_kind = assemblers.assemble_scalar_problem("SaintVenant", false, 4, &b, &b).unwrap();
        assert_eq!(dense(&wrong_kind), dense(&laplacian));
    }

    #[test]
    fn test_strict_policy_rejects_unknown_models() {
        let config: DispatchConfig = serde_json::from_value(json!({ "policy": "Strict" })).unwrap();
        let assemblers = Assemblers::with_config(config);
        assert_eq!(assemblers.policy(), DispatchPolicy::Strict);
        let b = mesh();
        assert!(matches!(
            assemblers.assemble_scalar_problem("Bogus", false, 4, &b, &b),
            Err(Error::UnknownModel(name)) if name == "Bogus"
        ));
        assert!(assemblers.assemble_tensor_problem("Helmholtz", false, 4, &b, &b).is_err());
        let jet = SolutionJet {
            value: DVector::zeros(2),
            gradient: DMatrix::zeros(2, 2),
            hessian: vec![DMatrix::zeros(2, 2); 2],
        };
        assert!(assemblers.compute_rhs("SaintVenant", &jet).is_err());
        assert!(assemblers.assemble_scalar_problem("Helmholtz", false, 4, &b, &b).is_ok());
    }

    #[test]
    fn test_tensor_problems() {
        let assemblers = Assemblers::new();
        let b = mesh();
        let linear = assemblers.assemble_tensor_problem("LinearElasticity", false, 4, &b, &b).unwrap();
        let hooke = assemblers.assemble_tensor_problem("HookeLinearElasticity", false, 4, &b, &b).unwrap();
        assert_relative_eq!(dense(&linear), dense(&hooke), epsilon = 1e-9);

        let bogus = assemblers.assemble_tensor_problem("Bogus", false, 4, &b, &b).unwrap();
        assert_eq!(dense(&bogus), dense(&linear));

        let sv = assemblers.assemble_tensor_problem("SaintVenant", false, 4, &b, &b).unwrap();
        assert_eq!(sv.nrows(), 8);
        assert_eq!(sv.nnz(), 0);
    }

    #[test]
    fn test_energy_only_for_saint_venant() {
        let assemblers = Assemblers::new();
        let b = mesh();
        let u = DVector::from_fn(8, |i, _| 0.01 * i as f64);

        assert_eq!(assemblers.assemble_tensor_energy("LinearElasticity", false, &b, &b, &u).unwrap(), 0.0);
        assert!(assemblers.assemble_tensor_energy("SaintVenant", false, &b, &b, &u).unwrap() > 0.0);

        let g = assemblers
            .assemble_tensor_energy_gradient("HookeLinearElasticity", false, 4, &b, &b, &u)
            .unwrap();
        assert_eq!(g, DVector::zeros(8));
        let g = assemblers.assemble_tensor_energy_gradient("SaintVenant", false, 4, &b, &b, &u).unwrap();
        assert!(g.norm() > 0.0);

        let h = assemblers.assemble_tensor_energy_hessian("Laplacian", false, 4, &b, &b, &u).unwrap();
        assert_eq!((h.nrows(), h.nnz()), (8, 0));
        let h = assemblers.assemble_tensor_energy_hessian("SaintVenant", false, 4, &b, &b, &u).unwrap();
        assert!(h.nnz() > 0);
    }

    #[test]
    fn test_scalar_value() {
        let assemblers = Assemblers::new();
        let tet = tetrahedron();
        let pts = [[0.25, 0.25, 0.25], [0.1, 0.2, 0.3]];
        // uniaxial stretch u = (0.01 x, 0, 0)
        let fun = DVector::from_iterator(
            12,
            tet.bases.iter().flat_map(|b| [0.01 * b.node.x, 0.0, 0.0]),
        );

        let none = assemblers.compute_scalar_value("Laplacian", &tet, &pts, &fun).unwrap();
        assert_eq!(none.len(), 0);

        let vm = assemblers.compute_scalar_value("LinearElasticity", &tet, &pts, &fun).unwrap();
        assert_eq!(vm.len(), 2);
        // σ = diag(λ + 2μ, λ, λ) ε: von Mises = 2μ ε
        let mu = crate::assembler::ElasticParameters::default().mu;
        assert_relative_eq!(vm[0], 2.0 * mu * 0.01, epsilon = 1e-10);
        assert_relative_eq!(vm[1], vm[0], epsilon = 1e-10);

        let hooke = assemblers.compute_scalar_value("HookeLinearElasticity", &tet, &pts, &fun).unwrap();
        assert_relative_eq!(hooke, vm, epsilon = 1e-9);
        let bogus = assemblers.compute_scalar_value("Bogus", &tet, &pts, &fun).unwrap();
        assert_relative_eq!(bogus, vm, epsilon = 1e-12);

        assert!(assemblers.compute_scalar_value("SaintVenant", &tet, &pts, &fun).unwrap()[0] > 0.0);
        assert!(assemblers
            .compute_scalar_value("LinearElasticity", &tet, &pts, &DVector::zeros(5))
            .is_err());
    }

    #[test]
    fn test_rhs_dispatch() {
        let mut assemblers = Assemblers::new();
        assemblers.set_parameters(&json!({ "k": 3.0 })).unwrap();
        let scalar = SolutionJet {
            value: DVector::from_element(1, 1.0),
            gradient: DMatrix::zeros(1, 2),
            hessian: vec![DMatrix::identity(2, 2)],
        };
        assert_relative_eq!(assemblers.compute_rhs("Laplacian", &scalar).unwrap()[0], 2.0);
        assert_relative_eq!(assemblers.compute_rhs("Helmholtz", &scalar).unwrap()[0], 11.0);
        // SaintVenant has no rhs and falls back to the Laplacian
        assert_relative_eq!(assemblers.compute_rhs("SaintVenant", &scalar).unwrap()[0], 2.0);
    }

    #[test]
    fn test_set_parameters_reaches_every_operator() {
        let mut assemblers = Assemblers::new();
        let b = mesh();
        let before = dense(&assemblers.assemble_tensor_problem("LinearElasticity", false, 4, &b, &b).unwrap());
        assemblers.set_parameters(&json!({ "E": 200.0, "nu": 0.3 })).unwrap();
        let after = dense(&assemblers.assemble_tensor_problem("LinearElasticity", false, 4, &b, &b).unwrap());
        assert_relative_eq!(after, before * 2.0, epsilon = 1e-9);

        let hooke = dense(&assemblers.assemble_tensor_problem("HookeLinearElasticity", false, 4, &b, &b).unwrap());
        assert_relative_eq!(hooke, after, epsilon = 1e-9);

        assert!(matches!(
            assemblers.set_parameters(&json!({ "E": -1.0 })),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rejected_update_leaves_every_operator_unchanged() {
        let mut assemblers = Assemblers::new();
        let b = mesh();
        let before = dense(&assemblers.assemble_tensor_problem("LinearElasticity", false, 4, &b, &b).unwrap());

        // Valid moduli, but a tensor of the wrong length.
        let params = json!({ "E": 200.0, "elasticity_tensor": [1.0, 2.0] });
        assert!(matches!(assemblers.set_parameters(&params), Err(Error::InvalidParameter(_))));

        let default = crate::assembler::ElasticParameters::default();
        assert_eq!(assemblers.linear_elasticity.params, default);
        assert_eq!(assemblers.hooke_linear_elasticity.isotropic, default);
        assert_eq!(assemblers.saint_venant.params, default);
        let after = dense(&assemblers.assemble_tensor_problem("LinearElasticity", false, 4, &b, &b).unwrap());
        assert_eq!(after, before);
    }

    #[test]
    fn test_energy_ignores_policy() {
        let assemblers = Assemblers::with_config(DispatchConfig {
            policy: DispatchPolicy::Strict,
        });
        let b = mesh();
        let u = DVector::from_fn(8, |i, _| 0.01 * i as f64);

        assert_eq!(assemblers.assemble_tensor_energy("Bogus", false, &b, &b, &u).unwrap(), 0.0);
        let g = assemblers.assemble_tensor_energy_gradient("Bogus", false, 4, &b, &b, &u).unwrap();
        assert_eq!(g, DVector::zeros(8));
        let h = assemblers.assemble_tensor_energy_hessian("Bogus", false, 4, &b, &b, &u).unwrap();
        assert_eq!((h.nrows(), h.nnz()), (8, 0));
        assert!(assemblers.assemble_tensor_energy("SaintVenant", false, &b, &b, &u).unwrap() > 0.0);
    }

    #[test]
    fn test_model_lists() {
        let assemblers = Assemblers::new();
        assert_eq!(assemblers.scalar_assemblers(), vec!["Laplacian", "Helmholtz"]);
        assert_eq!(assemblers.tensor_assemblers().len(), 3);
        assert!(assemblers.is_linear("HookeLinearElasticity"));
        assert!(assemblers.is_linear("Bogus"));
        assert!(!assemblers.is_linear("SaintVenant"));
    }
}
