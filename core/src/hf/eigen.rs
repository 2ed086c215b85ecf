use nalgebra::{DMatrix, DVector};

use crate::error::HartreeFockError;

use super::utils;

/// Overlap eigenvalues at or below this mark the basis as linearly dependent
const LINEAR_DEPENDENCE_THRESHOLD: f64 = 1e-10;

/// Solutions of the generalized eigenproblem `F C = S C diag(e)`.
#[derive(Debug, Clone)]
pub struct Orbitals {
    /// orbital energies, sorted in ascending order
    pub energies: DVector<f64>,
    /// orbital coefficients, one orbital per column, normalized such that C^T S C = 1
    pub coefficients: DMatrix<f64>,
}

/// Solves generalized symmetric eigenproblems `F C = S C diag(e)` for a fixed, positive
/// definite overlap matrix `S`.
///
/// Uses symmetric (Löwdin) orthogonalization: `X = S^-1/2` is computed once, every solve
/// then diagonalizes `X^T F X` and transforms the eigenvectors back with `C = X C'`.
///
/// Signs of the eigenvectors, and the choice of basis inside a degenerate subspace, are
/// whatever the dense solver produces.
#[derive(Debug, Clone)]
pub struct GeneralizedEigensolver {
    transform: DMatrix<f64>,
}

impl GeneralizedEigensolver {
    /// Prepares the solver for a given overlap matrix. Fails if the overlap matrix isn't
    /// positive definite or can't be diagonalized.
    pub fn new(overlap: &DMatrix<f64>) -> Result<Self, HartreeFockError> {
        let transform = compute_transformation_matrix(overlap)?;
        Ok(Self { transform })
    }

    /// The orthogonalization matrix `X = S^-1/2`
    pub fn transform(&self) -> &DMatrix<f64> {
        &self.transform
    }

    /// Solve `F C = S C diag(e)` for a symmetric matrix `F`
    pub fn solve(&self, matrix: &DMatrix<f64>) -> Result<Orbitals, HartreeFockError> {
        let transformed = self.transform.transpose() * (matrix * &self.transform);
        let (transformed_coefficients, energies) =
            utils::sorted_eigs(transformed).ok_or(HartreeFockError::EigensolverFailed {
                what: "fock matrix",
            })?;

        let coefficients = &self.transform * transformed_coefficients;
        if !(energies.iter().all(|e| e.is_finite()) && coefficients.iter().all(|c| c.is_finite()))
        {
            return Err(HartreeFockError::EigensolverFailed {
                what: "fock matrix",
            });
        }

        Ok(Orbitals {
            energies,
            coefficients,
        })
    }
}

fn compute_transformation_matrix(
    overlap: &DMatrix<f64>,
) -> Result<DMatrix<f64>, HartreeFockError> {
    let (u, eigenvalues) =
        utils::eigs(overlap.clone()).ok_or(HartreeFockError::EigensolverFailed {
            what: "overlap matrix",
        })?;

    if !u.iter().all(|v| v.is_finite()) {
        return Err(HartreeFockError::EigensolverFailed {
            what: "overlap matrix",
        });
    }

    let smallest_eigenvalue = eigenvalues.min();
    log::debug!("smallest overlap eigenvalue: {smallest_eigenvalue:1.4e}");

    if !(smallest_eigenvalue > LINEAR_DEPENDENCE_THRESHOLD)
        || !eigenvalues.iter().all(|e| e.is_finite())
    {
        return Err(HartreeFockError::OverlapNotPositiveDefinite {
            smallest_eigenvalue,
        });
    }

    let diagonal_inv_sqrt = DMatrix::from_diagonal(&eigenvalues.map(|f| f.sqrt().recip()));
    Ok(&u * (diagonal_inv_sqrt * u.transpose()))
}
