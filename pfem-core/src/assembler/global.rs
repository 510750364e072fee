//! Parallel local-to-global assembly.
//!
//! Local matrices and vectors are computed per element with Rayon, then
//! scattered into the global structure in element order so the result does
//! not depend on thread scheduling.

use super::{LinearAssembler, NonlinearAssembler};
use crate::basis::{ElementBases, ElementValues};
use crate::error::{Error, Result};
use crate::sparse::{add_block_vector, gather_block_vector, CsrMatrix, TripletMatrix};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::debug;

/// Check that the element lists are paired, match the problem dimension
/// and only reference bases below `n_basis`.
fn check_bases(
    is_volume: bool,
    n_basis: usize,
    bases: &[ElementBases],
    gbases: &[ElementBases],
) -> Result<usize> {
    let dim = if is_volume { 3 } else { 2 };
    if bases.len() != gbases.len() {
        return Err(Error::Assembly(format!(
            "{} elements but {} geometric elements",
            bases.len(),
            gbases.len()
        )));
    }
    if let Some(e) = bases.iter().position(|b| b.dim() != dim) {
        return Err(Error::Assembly(format!(
            "element {} has dimension {}, expected {}",
            e,
            bases[e].dim(),
            dim
        )));
    }
    let max_index = bases
        .iter()
        .flat_map(|b| b.bases.iter().map(|basis| basis.global_index))
        .max();
    if let Some(index) = max_index.filter(|&i| i >= n_basis) {
        return Err(Error::Assembly(format!(
            "basis index {} out of range for {} bases",
            index, n_basis
        )));
    }
    Ok(dim)
}

fn check_displacement(displacement: &DVector<f64>, n_dofs: usize) -> Result<()> {
    if displacement.len() != n_dofs {
        return Err(Error::Assembly(format!(
            "displacement has {} entries, expected {}",
            displacement.len(),
            n_dofs
        )));
    }
    Ok(())
}

/// Compute `f` on every element in parallel, keeping element order.
fn map_elements<T, F>(bases: &[ElementBases], gbases: &[ElementBases], f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&ElementBases, &ElementValues) -> T + Sync,
{
    bases
        .par_iter()
        .zip(gbases.par_iter())
        .map(|(b, g)| ElementValues::compute(b, g).map(|vals| f(b, &vals)))
        .collect()
}

/// Assemble the global stiffness matrix of a linear operator.
pub fn assemble_stiffness<A>(
    op: &A,
    is_volume: bool,
    n_basis: usize,
    bases: &[ElementBases],
    gbases: &[ElementBases],
) -> Result<CsrMatrix>
where
    A: LinearAssembler + ?Sized,
{
    let dim = check_bases(is_volume, n_basis, bases, gbases)?;
    let size = op.size(dim);
    let n_dofs = n_basis * size;

    let locals = map_elements(bases, gbases, |b, vals| (b.global_indices(), op.assemble(vals)))?;

    let nnz_estimate = locals.iter().map(|(_, k)| k.len()).sum();
    let mut triplet = TripletMatrix::with_capacity(n_dofs, n_dofs, nnz_estimate);
    for (global, local) in &locals {
        triplet.add_block(global, size, local);
    }
    debug!(elements = bases.len(), n_dofs, nnz = triplet.nnz(), "assembled stiffness");
    Ok(triplet.to_csr())
}

/// Total energy of a nonlinear operator.
pub fn assemble_energy<A>(
    op: &A,
    is_volume: bool,
    bases: &[ElementBases],
    gbases: &[ElementBases],
    displacement: &DVector<f64>,
) -> Result<f64>
where
    A: NonlinearAssembler + ?Sized,
{
    let dim = if is_volume { 3 } else { 2 };
    let size = op.size(dim);
    let n_basis = displacement.len() / size;
    check_bases(is_volume, n_basis, bases, gbases)?;
    check_displacement(displacement, n_basis * size)?;

    let energies = map_elements(bases, gbases, |b, vals| {
        let u = gather_block_vector(displacement, &b.global_indices(), size);
        op.compute_energy(vals, &u)
    })?;
    Ok(energies.iter().sum())
}

/// Global energy gradient of a nonlinear operator.
pub fn assemble_gradient<A>(
    op: &A,
    is_volume: bool,
    n_basis: usize,
    bases: &[ElementBases],
    gbases: &[ElementBases],
    displacement: &DVector<f64>,
) -> Result<DVector<f64>>
where
    A: NonlinearAssembler + ?Sized,
{
    let dim = check_bases(is_volume, n_basis, bases, gbases)?;
    let size = op.size(dim);
    check_displacement(displacement, n_basis * size)?;

    let locals = map_elements(bases, gbases, |b, vals| {
        let global = b.global_indices();
        let u = gather_block_vector(displacement, &global, size);
        (global, op.assemble_gradient(vals, &u))
    })?;

    let mut grad = DVector::zeros(n_basis * size);
    for (global, local) in &locals {
        add_block_vector(&mut grad, global, size, local);
    }
    Ok(grad)
}

/// Global energy Hessian of a nonlinear operator.
pub fn assemble_hessian<A>(
    op: &A,
    is_volume: bool,
    n_basis: usize,
    bases: &[ElementBases],
    gbases: &[ElementBases],
    displacement: &DVector<f64>,
) -> Result<CsrMatrix>
where
    A: NonlinearAssembler + ?Sized,
{
    let dim = check_bases(is_volume, n_basis, bases, gbases)?;
    let size = op.size(dim);
    let n_dofs = n_basis * size;
    check_displacement(displacement, n_dofs)?;

    let locals: Vec<(Vec<usize>, DMatrix<f64>)> = map_elements(bases, gbases, |b, vals| {
        let global = b.global_indices();
        let u = gather_block_vector(displacement, &global, size);
        (global, op.assemble_hessian(vals, &u))
    })?;

    let mut triplet = TripletMatrix::new(n_dofs, n_dofs);
    for (global, local) in &locals {
        triplet.add_block(global, size, local);
    }
    debug!(elements = bases.len(), n_dofs, nnz = triplet.nnz(), "assembled hessian");
    Ok(triplet.to_csr())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::test_support::bases;
    use crate::assembler::{Laplacian, LinearElasticity, SaintVenant};
    use crate::basis::ReferenceElement;
    use crate::sparse::triplets;
    use approx::assert_relative_eq;

    /// Unit square split into two triangles sharing the diagonal 0-2.
    fn square() -> Vec<ElementBases> {
        let p = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let tri = |ids: [usize; 3]| {
            let mut b = bases(ReferenceElement::P1Triangle, &[p[ids[0]], p[ids[1]], p[ids[2]]], 0);
            for (basis, &id) in b.bases.iter_mut().zip(&ids) {
                basis.global_index = id;
            }
            b
        };
        vec![tri([0, 1, 2]), tri([0, 2, 3])]
    }

    #[test]
    fn test_laplacian_square() {
        let b = square();
        let k = assemble_stiffness(&Laplacian, false, 4, &b, &b).unwrap();
        let dense = DMatrix::from(&k);
        // vertex 0 lies on both triangles, vertex 1 on one
        assert_relative_eq!(dense[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(dense[(1, 1)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(dense[(0, 2)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(dense[(0, 1)], -0.5, epsilon = 1e-12);
        assert_relative_eq!((dense * DVector::from_element(4, 1.0)).norm(), 0.0, epsilon = 1e-12);
        // vertices 1 and 3 share no element
        assert!(triplets(&k).iter().all(|&(r, c, _)| (r, c) != (1, 3) && (r, c) != (3, 1)));
    }

    #[test]
    fn test_tensor_dofs_are_interleaved() {
        let b = square();
        let k = assemble_stiffness(&LinearElasticity::default(), false, 4, &b, &b).unwrap();
        assert_eq!(k.nrows(), 8);
        let dense = DMatrix::from(&k);
        assert_relative_eq!(dense.clone(), dense.transpose(), epsilon = 1e-10);
        // x translation
        let t = DVector::from_fn(8, |i, _| if i % 2 == 0 { 1.0 } else { 0.0 });
        assert_relative_eq!((dense * t).norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_nonlinear_gradient_consistency() {
        let b = square();
        let op = SaintVenant::default();
        let u = DVector::from_fn(8, |i, _| 0.02 * (i as f64).cos());
        let grad = assemble_gradient(&op, false, 4, &b, &b, &u).unwrap();
        let hessian = DMatrix::from(&assemble_hessian(&op, false, 4, &b, &b, &u).unwrap());

        let h = 1e-6;
        let du = DVector::from_fn(8, |i, _| if i == 3 { h } else { 0.0 });
        let e_plus = assemble_energy(&op, false, &b, &b, &(&u + &du)).unwrap();
        let e_minus = assemble_energy(&op, false, &b, &b, &(&u - &du)).unwrap();
        assert_relative_eq!(grad[3], (e_plus - e_minus) / (2.0 * h), epsilon = 1e-5);
        assert_relative_eq!(hessian.clone(), hessian.transpose(), epsilon = 1e-8);
    }

    #[test]
    fn test_dimension_mismatch() {
        let b = square();
        assert!(matches!(
            assemble_stiffness(&Laplacian, true, 4, &b, &b),
            Err(Error::Assembly(_))
        ));
        assert!(matches!(
            assemble_stiffness(&Laplacian, false, 4, &b, &b[..1]),
            Err(Error::Assembly(_))
        ));
        assert!(assemble_stiffness(&Laplacian, false, 3, &b, &b).is_err());
        let u = DVector::zeros(3);
        assert!(assemble_gradient(&SaintVenant::default(), false, 4, &b, &b, &u).is_err());
        assert!(assemble_energy(&SaintVenant::default(), false, &b, &b, &u).is_err());
    }
}
