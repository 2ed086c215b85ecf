//! Atomic orbital integrals as consumed by the SCF procedure.
//!
//! Evaluating the integrals is not the job of this crate. An [`IntegralProvider`] hands
//! over an [`AoIntegrals`] bundle, which is checked for structural consistency once and
//! is immutable afterwards.
use std::error::Error;

use nalgebra::DMatrix;

use crate::error::HartreeFockError;

pub mod electron_tensor;

pub use electron_tensor::ElectronTensor;

/// Largest tolerated |A - A^T| entry for matrices that have to be symmetric. Non-finite
/// entries are rejected before the comparison.
pub(crate) const SYMMETRY_TOLERANCE: f64 = 1e-8;

/// Anything that can produce the integrals of a molecule in some basis.
pub trait IntegralProvider {
    /// Produce the integral bundle.
    fn ao_integrals(&self) -> Result<AoIntegrals, Box<dyn Error + Send + Sync>>;
}

/// The integrals and electron counts of a molecule in a fixed atomic orbital basis.
#[derive(Debug, Clone)]
pub struct AoIntegrals {
    overlap: DMatrix<f64>,
    core_hamiltonian: DMatrix<f64>,
    electron: ElectronTensor,
    n_alpha: usize,
    n_beta: usize,
    nuclear_repulsion: f64,
}

impl AoIntegrals {
    /// Bundles the integrals of a system, checking that all dimensions agree and that the
    /// one-electron matrices are symmetric.
    pub fn new(
        overlap: DMatrix<f64>,
        core_hamiltonian: DMatrix<f64>,
        electron: ElectronTensor,
        n_alpha: usize,
        n_beta: usize,
        nuclear_repulsion: f64,
    ) -> Result<Self, HartreeFockError> {
        let n_basis = overlap.nrows();
        if n_basis == 0 {
            return Err(HartreeFockError::EmptyBasis);
        }

        check_square("overlap matrix", &overlap, n_basis)?;
        check_square("core hamiltonian", &core_hamiltonian, n_basis)?;
        if electron.size() != n_basis {
            return Err(HartreeFockError::DimensionMismatch {
                what: "electron repulsion tensor",
                expected: (n_basis, n_basis),
                found: (electron.size(), electron.size()),
            });
        }

        if !electron.is_finite() {
            return Err(HartreeFockError::NonFinite {
                what: "electron repulsion tensor",
            });
        }
        if !nuclear_repulsion.is_finite() {
            return Err(HartreeFockError::NonFinite {
                what: "nuclear repulsion energy",
            });
        }

        check_symmetric("overlap matrix", &overlap)?;
        check_symmetric("core hamiltonian", &core_hamiltonian)?;

        Ok(Self {
            overlap,
            core_hamiltonian,
            electron,
            n_alpha,
            n_beta,
            nuclear_repulsion,
        })
    }

    /// The number of basis functions
    pub fn n_basis(&self) -> usize {
        self.overlap.nrows()
    }

    pub fn overlap(&self) -> &DMatrix<f64> {
        &self.overlap
    }

    /// Kinetic plus nuclear attraction integrals
    pub fn core_hamiltonian(&self) -> &DMatrix<f64> {
        &self.core_hamiltonian
    }

    pub fn electron_repulsion(&self) -> &ElectronTensor {
        &self.electron
    }

    /// Returns the number of electrons in the alpha (by convention, spin up) state
    pub fn n_alpha(&self) -> usize {
        self.n_alpha
    }

    /// Returns the number of electrons in the beta (by convention, spin down) state
    pub fn n_beta(&self) -> usize {
        self.n_beta
    }

    pub fn nuclear_repulsion(&self) -> f64 {
        self.nuclear_repulsion
    }
}

/// A bundle that is already in memory provides itself.
impl IntegralProvider for AoIntegrals {
    fn ao_integrals(&self) -> Result<AoIntegrals, Box<dyn Error + Send + Sync>> {
        Ok(self.clone())
    }
}

pub(crate) fn check_square(
    what: &'static str,
    matrix: &DMatrix<f64>,
    n: usize,
) -> Result<(), HartreeFockError> {
    if matrix.shape() != (n, n) {
        return Err(HartreeFockError::DimensionMismatch {
            what,
            expected: (n, n),
            found: matrix.shape(),
        });
    }
    Ok(())
}

pub(crate) fn check_symmetric(
    what: &'static str,
    matrix: &DMatrix<f64>,
) -> Result<(), HartreeFockError> {
    if !matrix.iter().all(|v| v.is_finite()) {
        return Err(HartreeFockError::NonFinite { what });
    }

    let max_deviation = (matrix - matrix.transpose()).amax();
    if max_deviation > SYMMETRY_TOLERANCE {
        return Err(HartreeFockError::NotSymmetric {
            what,
            max_deviation,
        });
    }
    Ok(())
}
