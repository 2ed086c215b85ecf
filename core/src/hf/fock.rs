use nalgebra::DMatrix;

use crate::integrals::ElectronTensor;

/// Builds fock matrices `F = H + G(D)` for a fixed set of electron repulsion integrals, where
///
///   G[μν] = sum_{λσ} D[λσ] * (2 (μν|λσ) - (μλ|νσ))
///
/// The coulomb and exchange terms are merged into a single kernel once, so that every build
/// is a read-only contraction of the kernel with the density, independent for each `(μ, ν)`.
/// With the `rayon` feature those contractions run in parallel.
#[derive(Debug, Clone)]
pub struct FockBuilder {
    /// one row of n^2 entries per upper triangle pair, laid out column major to match the density
    kernel: Vec<f64>,
    pairs: Vec<(usize, usize)>,
    n_basis: usize,
}

impl FockBuilder {
    pub fn new(electron: &ElectronTensor) -> Self {
        let n_basis = electron.size();
        let pairs = (0..n_basis)
            .flat_map(|mu| (mu..n_basis).map(move |nu| (mu, nu)))
            .collect::<Vec<_>>();

        let mut kernel = Vec::with_capacity(pairs.len() * n_basis.pow(2));
        for &(mu, nu) in &pairs {
            for (sigma, lambda) in itertools::iproduct!(0..n_basis, 0..n_basis) {
                kernel.push(
                    2.0 * electron[(mu, nu, lambda, sigma)] - electron[(mu, lambda, nu, sigma)],
                );
            }
        }

        log::debug!(
            "fock kernel: {} pairs x {} density entries",
            pairs.len(),
            n_basis.pow(2)
        );

        Self {
            kernel,
            pairs,
            n_basis,
        }
    }

    /// The two-electron part `G(D)` of the fock matrix
    ///
    /// # Panics
    ///
    /// If the density is not `n_basis x n_basis`.
    pub fn two_electron(&self, density: &DMatrix<f64>) -> DMatrix<f64> {
        let n = self.n_basis;
        assert_eq!(density.shape(), (n, n), "density has the wrong shape");

        let density = density.as_slice();
        let contract = |pair: usize| -> f64 {
            self.kernel[pair * n * n..(pair + 1) * n * n]
                .iter()
                .zip(density)
                .map(|(k, d)| k * d)
                .sum()
        };

        #[cfg(feature = "rayon")]
        let values = {
            use rayon::iter::{IntoParallelIterator, ParallelIterator};

            (0..self.pairs.len())
                .into_par_iter()
                .map(contract)
                .collect::<Vec<_>>()
        };

        #[cfg(not(feature = "rayon"))]
        let values = (0..self.pairs.len()).map(contract).collect::<Vec<_>>();

        let mut g = DMatrix::zeros(n, n);
        for (&(mu, nu), value) in self.pairs.iter().zip(values) {
            g[(mu, nu)] = value;
            g[(nu, mu)] = value;
        }
        g
    }

    /// The fock matrix `F = H + G(D)`
    pub fn fock(&self, core_hamiltonian: &DMatrix<f64>, density: &DMatrix<f64>) -> DMatrix<f64> {
        let fock = core_hamiltonian + self.two_electron(density);
        log::trace!("fock matrix: {fock:0.6}");
        fock
    }
}
