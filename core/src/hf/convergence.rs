use serde::Serialize;

/// How much the energy and the density changed over a single iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Convergence {
    /// |E_elec(new) - E_elec(old)|
    pub energy_change: f64,
    /// root of the summed squared change of the density matrix
    pub density_rms: f64,
}

impl Convergence {
    pub fn new(energy: f64, previous_energy: f64, density_rms: f64) -> Self {
        Self {
            energy_change: (energy - previous_energy).abs(),
            density_rms,
        }
    }

    /// Both changes have to be below their threshold, neither is enough on its own.
    pub fn is_converged(&self, energy_threshold: f64, density_threshold: f64) -> bool {
        self.energy_change < energy_threshold && self.density_rms < density_threshold
    }
}
