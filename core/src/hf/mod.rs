//! Restricted closed-shell hartree fock.
//!
//! The building blocks of a single SCF iteration live in their own modules, [`rhf`] ties
//! them together into the iteration loop.
pub mod convergence;
pub mod density;
pub mod eigen;
pub mod energy;
pub mod fock;
pub mod guess;
pub mod report;
pub mod rhf;
pub(super) mod utils;

use serde::{Deserialize, Serialize};

pub use convergence::Convergence;
pub use eigen::{GeneralizedEigensolver, Orbitals};
pub use fock::FockBuilder;
pub use guess::InitialGuess;
pub use report::{IterationRecord, LogObserver, ScfObserver};
pub use rhf::{
    restricted_hartree_fock, restricted_hartree_fock_with, RestrictedHartreeFockOutput,
    RestrictedScf, ScfState, ScfStatus, ScfStep,
};

use crate::error::HartreeFockError;

/// Settings of the SCF loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HartreeFockConfig {
    /// the maximum number of iterations to try
    pub max_iterations: usize,
    /// the system is converged once the electronic energy changes by less than this
    /// between two iterations (and the density criterion holds as well)
    pub energy_threshold: f64,
    /// the system is converged once the rms change of the density matrix drops below this
    /// (and the energy criterion holds as well)
    pub density_threshold: f64,
}

impl Default for HartreeFockConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            energy_threshold: 1e-9,
            density_threshold: 1e-5,
        }
    }
}

impl HartreeFockConfig {
    pub fn validate(&self) -> Result<(), HartreeFockError> {
        if self.max_iterations == 0 {
            return Err(HartreeFockError::InvalidConfig(
                "at least one iteration is needed".to_string(),
            ));
        }

        for (name, threshold) in [
            ("energy threshold", self.energy_threshold),
            ("density threshold", self.density_threshold),
        ] {
            if !(threshold.is_finite() && threshold > 0.0) {
                return Err(HartreeFockError::InvalidConfig(format!(
                    "{name} has to be a positive number, got {threshold}"
                )));
            }
        }

        Ok(())
    }
}
