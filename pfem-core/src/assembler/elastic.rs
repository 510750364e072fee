//! Isotropic elastic parameters.
//!
//! Parameters are kept as Lamé coefficients and can be set either directly
//! (`lambda`, `mu`) or through Young's modulus and Poisson's ratio (`E`,
//! `nu`).

use super::parse_params;
use crate::error::{Error, Result};
use nalgebra::{DMatrix, Matrix3, Matrix6};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ElasticKeys {
    lambda: Option<f64>,
    mu: Option<f64>,
    #[serde(rename = "E")]
    youngs_modulus: Option<f64>,
    nu: Option<f64>,
}

/// Lamé coefficients of an isotropic material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticParameters {
    pub lambda: f64,
    pub mu: f64,
}

impl Default for ElasticParameters {
    /// E = 100, ν = 0.3.
    fn default() -> Self {
        Self {
            lambda: 100.0 * 0.3 / (1.3 * 0.4),
            mu: 100.0 / 2.6,
        }
    }
}

impl ElasticParameters {
    /// From Young's modulus and Poisson's ratio.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] unless `E > 0` and `-1 < ν < 0.5`.
    pub fn from_youngs(youngs_modulus: f64, poissons_ratio: f64) -> Result<Self> {
        if youngs_modulus <= 0.0 || !youngs_modulus.is_finite() {
            return Err(Error::InvalidParameter(
                "Young's modulus must be positive".into(),
            ));
        }
        if poissons_ratio <= -1.0 || poissons_ratio >= 0.5 {
            return Err(Error::InvalidParameter(
                "Poisson's ratio must be in range (-1, 0.5)".into(),
            ));
        }
        let e = youngs_modulus;
        let nu = poissons_ratio;
        Ok(Self {
            lambda: e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu)),
            mu: e / (2.0 * (1.0 + nu)),
        })
    }

    /// From Lamé coefficients.
    pub fn from_lame(lambda: f64, mu: f64) -> Result<Self> {
        if mu <= 0.0 || !mu.is_finite() || !lambda.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "invalid Lamé coefficients lambda = {}, mu = {}",
                lambda, mu
            )));
        }
        Ok(Self { lambda, mu })
    }

    /// E = μ(3λ + 2μ) / (λ + μ).
    pub fn youngs_modulus(&self) -> f64 {
        self.mu * (3.0 * self.lambda + 2.0 * self.mu) / (self.lambda + self.mu)
    }

    /// ν = λ / (2(λ + μ)).
    pub fn poissons_ratio(&self) -> f64 {
        self.lambda / (2.0 * (self.lambda + self.mu))
    }

    /// Apply the elastic keys of `params`, keeping current values for the
    /// ones that are absent. Lamé keys take precedence over `E`/`nu`.
    pub fn update(&mut self, params: &Value) -> Result<()> {
        let keys: ElasticKeys = parse_params(params)?;
        if keys.lambda.is_some() || keys.mu.is_some() {
            *self = Self::from_lame(
                keys.lambda.unwrap_or(self.lambda),
                keys.mu.unwrap_or(self.mu),
            )?;
        } else if keys.youngs_modulus.is_some() || keys.nu.is_some() {
            *self = Self::from_youngs(
                keys.youngs_modulus.unwrap_or_else(|| self.youngs_modulus()),
                keys.nu.unwrap_or_else(|| self.poissons_ratio()),
            )?;
        }
        Ok(())
    }

    /// σ = 2μ ε + λ tr(ε) I.
    pub fn stress(&self, strain: &DMatrix<f64>) -> DMatrix<f64> {
        let dim = strain.nrows();
        strain * (2.0 * self.mu) + DMatrix::identity(dim, dim) * (self.lambda * strain.trace())
    }

    /// 3D constitutive matrix in Voigt notation (engineering shear strains).
    ///
    /// Ordering is `[xx, yy, zz, xy, yz, xz]`.
    pub fn constitutive_3d(&self) -> Matrix6<f64> {
        let c11 = self.lambda + 2.0 * self.mu;
        let c12 = self.lambda;
        let c44 = self.mu;

        #[rustfmt::skip]
        let d = Matrix6::new(
            c11, c12, c12, 0.0, 0.0, 0.0,
            c12, c11, c12, 0.0, 0.0, 0.0,
            c12, c12, c11, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, c44, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, c44, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, c44,
        );
        d
    }

    /// Plane strain constitutive matrix for `[xx, yy, xy]`.
    pub fn constitutive_plane_strain(&self) -> Matrix3<f64> {
        let c11 = self.lambda + 2.0 * self.mu;
        let c12 = self.lambda;
        Matrix3::new(c11, c12, 0.0, c12, c11, 0.0, 0.0, 0.0, self.mu)
    }
}
