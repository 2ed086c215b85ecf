use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{
    error::HartreeFockError,
    integrals::{check_square, check_symmetric, AoIntegrals},
};

use super::{density::compute_updated_density, eigen::GeneralizedEigensolver, utils};

/// Wolfsberg-Helmholz constant of the extended hückel guess
const WOLFSBERG_HELMHOLZ: f64 = 1.75;

/// The density matrix the SCF iterations start from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialGuess {
    /// No electrons at all, the first fock matrix is the core hamiltonian
    #[default]
    Zero,
    /// Occupy the lowest eigenvectors of the core hamiltonian
    CoreHamiltonian,
    /// Occupy the lowest eigenvectors of an extended hückel hamiltonian built from the
    /// diagonal of the core hamiltonian
    ExtendedHuckel,
    /// A density supplied by the caller
    Density(DMatrix<f64>),
}

impl InitialGuess {
    /// Construct the initial density matrix.
    pub(crate) fn density(
        &self,
        integrals: &AoIntegrals,
        solver: &GeneralizedEigensolver,
        n_occupied: usize,
    ) -> Result<DMatrix<f64>, HartreeFockError> {
        let n_basis = integrals.n_basis();

        match self {
            InitialGuess::Zero => Ok(zero_density(n_basis)),
            InitialGuess::CoreHamiltonian => {
                let orbitals = solver.solve(integrals.core_hamiltonian())?;
                Ok(compute_updated_density(&orbitals.coefficients, n_occupied))
            }
            InitialGuess::ExtendedHuckel => {
                let hamiltonian = hückel_hamiltonian(integrals);
                let orbitals = solver.solve(&hamiltonian)?;
                Ok(compute_updated_density(&orbitals.coefficients, n_occupied))
            }
            InitialGuess::Density(density) => {
                check_square("initial density", density, n_basis)?;
                check_symmetric("initial density", density)?;
                Ok(density.clone())
            }
        }
    }
}

/// The zero matrix: no electrons, the first fock matrix is the core hamiltonian.
pub fn zero_density(n_basis: usize) -> DMatrix<f64> {
    DMatrix::zeros(n_basis, n_basis)
}

fn hückel_hamiltonian(integrals: &AoIntegrals) -> DMatrix<f64> {
    let overlap = integrals.overlap();
    let hamiltonian = integrals.core_hamiltonian();

    utils::symmetric_matrix(integrals.n_basis(), |i, j| {
        if i == j {
            hamiltonian[(i, i)]
        } else {
            let average = (hamiltonian[(i, i)] + hamiltonian[(j, j)]) / 2.0;
            WOLFSBERG_HELMHOLZ * overlap[(i, j)] * average
        }
    })
}
