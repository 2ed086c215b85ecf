use std::fmt;

use serde::{Deserialize, Serialize};

use super::{HartreeFockConfig, RestrictedHartreeFockOutput};

/// One row of the iteration log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration number
    pub iteration: usize,
    /// seconds since the first iteration started
    pub wall_time_seconds: f64,
    /// root of the summed squared change of the density matrix
    pub density_rms: f64,
    /// |E_elec(new) - E_elec(old)|
    pub energy_change: f64,
    pub electronic_energy: f64,
}

impl IterationRecord {
    /// Column headers matching the [`Display`](fmt::Display) implementation
    pub fn table_header() -> String {
        format!(
            "{:>4} {:>9} {:>12} {:>12} {:>20}",
            "Iter", "Time(s)", "RMSC DM", "delta E", "E_elec"
        )
    }
}

/// Formats the record as a row of the iteration table: density and energy change in
/// scientific notation with 5 significant digits, the energy in fixed point.
impl fmt::Display for IterationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>4} {:>9.3} {:>12.4e} {:>12.4e} {:>20.10}",
            self.iteration,
            self.wall_time_seconds,
            self.density_rms,
            self.energy_change,
            self.electronic_energy
        )
    }
}

/// Gets notified by the SCF driver as the iterations progress. None of the callbacks can
/// influence the calculation.
pub trait ScfObserver {
    /// Called once before the first iteration
    fn started(&mut self, _config: &HartreeFockConfig, _n_basis: usize) {}

    /// Called after every iteration
    fn iteration(&mut self, record: &IterationRecord);

    /// Called once the driver reached a terminal state
    fn finished(&mut self, _output: &RestrictedHartreeFockOutput) {}
}

/// Ignores everything
impl ScfObserver for () {
    fn iteration(&mut self, _record: &IterationRecord) {}
}

impl<O: ScfObserver + ?Sized> ScfObserver for &mut O {
    fn started(&mut self, config: &HartreeFockConfig, n_basis: usize) {
        (**self).started(config, n_basis)
    }

    fn iteration(&mut self, record: &IterationRecord) {
        (**self).iteration(record)
    }

    fn finished(&mut self, output: &RestrictedHartreeFockOutput) {
        (**self).finished(output)
    }
}

/// Writes the iteration table to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ScfObserver for LogObserver {
    fn started(&mut self, config: &HartreeFockConfig, n_basis: usize) {
        log::info!("{:-^66}", " RHF SCF ");
        log::info!("{: <25} {}", "basis functions:", n_basis);
        log::info!("{: <25} {}", "max. iterations:", config.max_iterations);
        log::info!("{: <25} {:1.1e}", "energy threshold:", config.energy_threshold);
        log::info!("{: <25} {:1.1e}", "density threshold:", config.density_threshold);
        log::info!("{:-^66}", "");
        log::info!("{}", IterationRecord::table_header());
    }

    fn iteration(&mut self, record: &IterationRecord) {
        log::info!("{record}");
    }

    fn finished(&mut self, output: &RestrictedHartreeFockOutput) {
        log::info!("{:-^66}", "");
        if output.converged {
            log::info!("SCF converged after {} iterations", output.iterations);
        } else {
            log::info!("SCF stopped after {} iterations without converging", output.iterations);
        }
        log::info!("{: <25} {:>20.10}", "electronic energy:", output.electronic_energy);
        log::info!("{: <25} {:>20.10}", "total energy:", output.total_energy());
    }
}
