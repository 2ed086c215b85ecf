use std::{error::Error, fmt};

/// Everything that can stop a hartree fock run before it reaches a terminal state.
///
/// Running out of iterations is *not* an error, it is reported through
/// [`RestrictedHartreeFockOutput::converged`](crate::hf::RestrictedHartreeFockOutput).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum HartreeFockError {
    /// The basis has no functions at all
    EmptyBasis,
    /// A matrix or tensor does not have the size implied by the number of basis functions
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// An input contains NaN or an infinite value
    NonFinite { what: &'static str },
    /// A matrix that has to be symmetric isn't
    NotSymmetric {
        what: &'static str,
        max_deviation: f64,
    },
    /// A restricted calculation needs as many alpha as beta electrons
    OpenShell { n_alpha: usize, n_beta: usize },
    /// More doubly occupied orbitals were requested than there are basis functions
    TooManyElectrons { n_occupied: usize, n_basis: usize },
    /// An electron repulsion integral refers to a basis function that doesn't exist
    IntegralIndexOutOfRange {
        index: (usize, usize, usize, usize),
        n_basis: usize,
    },
    /// The same unique electron repulsion integral was given twice with different values
    InconsistentIntegral {
        index: (usize, usize, usize, usize),
        first: f64,
        second: f64,
    },
    /// The driver configuration is unusable
    InvalidConfig(String),
    /// The overlap matrix is not positive definite, the basis is (nearly) linearly dependent
    OverlapNotPositiveDefinite { smallest_eigenvalue: f64 },
    /// The dense eigensolver did not converge
    EigensolverFailed { what: &'static str },
}

impl HartreeFockError {
    /// Errors that come from malformed input and can only be fixed by the caller
    pub fn is_configuration(&self) -> bool {
        !self.is_numerical()
    }

    /// Errors that come from the linear algebra on otherwise well formed input
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::OverlapNotPositiveDefinite { .. } | Self::EigensolverFailed { .. }
        )
    }
}

impl fmt::Display for HartreeFockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBasis => write!(f, "the basis contains no functions"),
            Self::DimensionMismatch {
                what,
                expected,
                found,
            } => write!(
                f,
                "{what} has shape {}x{}, expected {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
            Self::NonFinite { what } => write!(f, "{what} contains non-finite values"),
            Self::NotSymmetric {
                what,
                max_deviation,
            } => write!(
                f,
                "{what} is not symmetric (largest deviation {max_deviation:1.3e})"
            ),
            Self::OpenShell { n_alpha, n_beta } => write!(
                f,
                "restricted hartree fock needs a closed shell, got {n_alpha} alpha and {n_beta} beta electrons"
            ),
            Self::TooManyElectrons {
                n_occupied,
                n_basis,
            } => write!(
                f,
                "{n_occupied} occupied orbitals requested but the basis only has {n_basis} functions"
            ),
            Self::IntegralIndexOutOfRange {
                index: (i, j, k, l),
                n_basis,
            } => write!(
                f,
                "electron repulsion integral ({i} {j}|{k} {l}) is out of range for {n_basis} basis functions"
            ),
            Self::InconsistentIntegral {
                index: (i, j, k, l),
                first,
                second,
            } => write!(
                f,
                "electron repulsion integral ({i} {j}|{k} {l}) given twice with different values ({first} and {second})"
            ),
            Self::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
            Self::OverlapNotPositiveDefinite {
                smallest_eigenvalue,
            } => write!(
                f,
                "overlap matrix is not positive definite (smallest eigenvalue {smallest_eigenvalue:1.3e}), the basis is linearly dependent"
            ),
            Self::EigensolverFailed { what } => {
                write!(f, "eigendecomposition of the {what} failed to produce finite eigenpairs")
            }
        }
    }
}

impl Error for HartreeFockError {}
