use std::time::Instant;

use nalgebra::DMatrix;
use serde::Serialize;

use crate::{error::HartreeFockError, integrals::AoIntegrals};

use super::{
    convergence::Convergence,
    density::{compute_updated_density, density_rms},
    eigen::{GeneralizedEigensolver, Orbitals},
    energy,
    fock::FockBuilder,
    guess::InitialGuess,
    report::{IterationRecord, LogObserver, ScfObserver},
    HartreeFockConfig,
};

/// Where the SCF loop currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScfStatus {
    Iterating,
    Converged,
    MaxIterationsExceeded,
}

impl ScfStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScfStatus::Iterating)
    }
}

/// The values carried from one iteration to the next
#[derive(Debug, Clone)]
pub struct ScfState {
    pub density: DMatrix<f64>,
    pub electronic_energy: f64,
    /// number of completed iterations
    pub iteration: usize,
}

/// Everything a single iteration produced
#[derive(Debug, Clone)]
pub struct ScfStep {
    pub state: ScfState,
    /// the fock matrix built from the previous density
    pub fock: DMatrix<f64>,
    /// eigenpairs of [`ScfStep::fock`], the new density occupies the lowest of them
    pub orbitals: Orbitals,
    pub convergence: Convergence,
}

/// The output of a restricted hartree fock calculation
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct RestrictedHartreeFockOutput {
    pub converged: bool,
    pub status: ScfStatus,
    /// After how many iterations the loop stopped
    pub iterations: usize,
    /// the orbital energies that were found in this hartree fock calculation, sorted in
    /// ascending order
    pub orbital_energies: Vec<f64>,
    pub coefficients: DMatrix<f64>,
    pub density: DMatrix<f64>,
    pub fock: DMatrix<f64>,
    /// The electronic energy of the system
    pub electronic_energy: f64,
    /// The nuclear repulsion energy
    pub nuclear_repulsion: f64,
    /// one record per iteration, in order
    pub history: Vec<IterationRecord>,
}

impl RestrictedHartreeFockOutput {
    pub fn total_energy(&self) -> f64 {
        energy::total_energy(self.electronic_energy, self.nuclear_repulsion)
    }

    /// `trace(D S)`, the number of electrons of one spin held by the final density
    pub fn electrons_per_spin(&self, overlap: &DMatrix<f64>) -> f64 {
        (&self.density * overlap).trace()
    }
}

/// A validated closed shell SCF problem.
///
/// Construction checks everything that can be checked before iterating, prepares the
/// orthogonalization of the basis and unpacks the electron repulsion integrals into the
/// fock kernel. The iterations themselves only read from it.
#[derive(Debug, Clone)]
pub struct RestrictedScf<'a> {
    integrals: &'a AoIntegrals,
    config: HartreeFockConfig,
    fock_builder: FockBuilder,
    solver: GeneralizedEigensolver,
    n_occupied: usize,
}

impl<'a> RestrictedScf<'a> {
    pub fn new(
        integrals: &'a AoIntegrals,
        config: &HartreeFockConfig,
    ) -> Result<Self, HartreeFockError> {
        config.validate()?;

        let n_basis = integrals.n_basis();
        let (n_alpha, n_beta) = (integrals.n_alpha(), integrals.n_beta());
        if n_alpha != n_beta {
            return Err(HartreeFockError::OpenShell { n_alpha, n_beta });
        }
        if n_alpha > n_basis {
            return Err(HartreeFockError::TooManyElectrons {
                n_occupied: n_alpha,
                n_basis,
            });
        }

        log::debug!("basis functions: {n_basis}, doubly occupied orbitals: {n_alpha}");
        log::debug!("nuclear repulsion energy: {}", integrals.nuclear_repulsion());
        log::trace!("overlap matrix: {:0.6}", integrals.overlap());
        log::trace!("core hamiltonian: {:0.6}", integrals.core_hamiltonian());

        let solver = GeneralizedEigensolver::new(integrals.overlap())?;
        let fock_builder = FockBuilder::new(integrals.electron_repulsion());

        Ok(Self {
            integrals,
            config: config.clone(),
            fock_builder,
            solver,
            n_occupied: n_alpha,
        })
    }

    pub fn solver(&self) -> &GeneralizedEigensolver {
        &self.solver
    }

    pub fn fock_builder(&self) -> &FockBuilder {
        &self.fock_builder
    }

    /// The state before the first iteration: the guessed density, no energy yet
    pub fn initial_state(&self, guess: &InitialGuess) -> Result<ScfState, HartreeFockError> {
        let density = guess.density(self.integrals, &self.solver, self.n_occupied)?;
        log::trace!("initial density: {density:0.6}");

        Ok(ScfState {
            density,
            electronic_energy: 0.0,
            iteration: 0,
        })
    }

    /// One pass of the iteration: build the fock matrix from the previous density,
    /// diagonalize it, occupy the lowest orbitals and evaluate the energy of the new density.
    pub fn step(&self, previous: &ScfState) -> Result<ScfStep, HartreeFockError> {
        let core_hamiltonian = self.integrals.core_hamiltonian();

        let fock = self.fock_builder.fock(core_hamiltonian, &previous.density);
        let orbitals = self.solver.solve(&fock)?;
        let density = compute_updated_density(&orbitals.coefficients, self.n_occupied);
        log::trace!("density matrix: {density:0.6}");

        let electronic_energy = energy::electronic_energy(&density, core_hamiltonian, &fock);
        let convergence = Convergence::new(
            electronic_energy,
            previous.electronic_energy,
            density_rms(&density, &previous.density),
        );

        Ok(ScfStep {
            state: ScfState {
                density,
                electronic_energy,
                iteration: previous.iteration + 1,
            },
            fock,
            orbitals,
            convergence,
        })
    }

    /// Status after `state` was reached with the given convergence measures
    pub fn status(&self, state: &ScfState, convergence: &Convergence) -> ScfStatus {
        if convergence.is_converged(self.config.energy_threshold, self.config.density_threshold) {
            ScfStatus::Converged
        } else if state.iteration >= self.config.max_iterations {
            ScfStatus::MaxIterationsExceeded
        } else {
            ScfStatus::Iterating
        }
    }

    /// Iterate from the given guess until the loop converges or runs out of iterations.
    pub fn run(
        &self,
        guess: &InitialGuess,
        observer: &mut impl ScfObserver,
    ) -> Result<RestrictedHartreeFockOutput, HartreeFockError> {
        let mut state = self.initial_state(guess)?;
        let mut history = Vec::new();

        observer.started(&self.config, self.integrals.n_basis());
        let start = Instant::now();

        // start of scf iteration
        loop {
            let step = self.step(&state)?;

            let record = IterationRecord {
                iteration: step.state.iteration,
                wall_time_seconds: start.elapsed().as_secs_f64(),
                density_rms: step.convergence.density_rms,
                energy_change: step.convergence.energy_change,
                electronic_energy: step.state.electronic_energy,
            };
            observer.iteration(&record);
            history.push(record);

            let status = self.status(&step.state, &step.convergence);
            if status.is_terminal() {
                if status == ScfStatus::MaxIterationsExceeded {
                    log::warn!(
                        "SCF not converged after {} iterations (delta E {:1.4e}, RMSC DM {:1.4e})",
                        step.state.iteration,
                        step.convergence.energy_change,
                        step.convergence.density_rms
                    );
                }

                let output = self.finish(step, status, history);
                observer.finished(&output);
                return Ok(output);
            }

            state = step.state;
        }
    }

    fn finish(
        &self,
        step: ScfStep,
        status: ScfStatus,
        history: Vec<IterationRecord>,
    ) -> RestrictedHartreeFockOutput {
        RestrictedHartreeFockOutput {
            converged: status == ScfStatus::Converged,
            status,
            iterations: step.state.iteration,
            orbital_energies: step.orbitals.energies.as_slice().to_vec(),
            coefficients: step.orbitals.coefficients,
            density: step.state.density,
            fock: step.fock,
            electronic_energy: step.state.electronic_energy,
            nuclear_repulsion: self.integrals.nuclear_repulsion(),
            history,
        }
    }
}

/// Runs a restricted hartree fock calculation from the zero density, writing the
/// iteration table to the log.
pub fn restricted_hartree_fock(
    integrals: &AoIntegrals,
    config: &HartreeFockConfig,
) -> Result<RestrictedHartreeFockOutput, HartreeFockError> {
    restricted_hartree_fock_with(integrals, config, &InitialGuess::Zero, &mut LogObserver)
}

pub fn restricted_hartree_fock_with(
    integrals: &AoIntegrals,
    config: &HartreeFockConfig,
    guess: &InitialGuess,
    observer: &mut impl ScfObserver,
) -> Result<RestrictedHartreeFockOutput, HartreeFockError> {
    RestrictedScf::new(integrals, config)?.run(guess, observer)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{dmatrix, DMatrix};

    use super::{
        restricted_hartree_fock, restricted_hartree_fock_with, RestrictedScf, ScfStatus,
    };
    use crate::{
        error::HartreeFockError,
        hf::{
            density::compute_updated_density, report::IterationRecord, HartreeFockConfig,
            InitialGuess, RestrictedHartreeFockOutput, ScfObserver,
        },
        integrals::{AoIntegrals, ElectronTensor},
        testing,
    };

    const WATER_ORBITAL_ENERGIES: [f64; 7] = [
        -20.2417403,
        -1.2684036,
        -0.6179287,
        -0.4529932,
        -0.3912439,
        0.6056634,
        0.7423866,
    ];

    fn water() -> AoIntegrals {
        testing::fixture("h2o_sto-3g").unwrap()
    }

    #[test]
    fn water_sto3g() {
        let integrals = water();
        let output = restricted_hartree_fock(&integrals, &HartreeFockConfig::default()).unwrap();

        assert!(output.converged);
        assert_eq!(output.status, ScfStatus::Converged);
        assert_eq!(output.iterations, 23);
        assert_eq!(output.history.len(), 23);

        assert_relative_eq!(output.electronic_energy, -84.157793, epsilon = 1e-5);
        assert_relative_eq!(output.total_energy(), -74.962929, epsilon = 1e-5);
        assert_relative_eq!(output.nuclear_repulsion, 9.194863933335109);

        for (found, expected) in output.orbital_energies.iter().zip(WATER_ORBITAL_ENERGIES) {
            assert_relative_eq!(*found, expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn water_iteration_log() {
        let integrals = water();
        let output = restricted_hartree_fock_with(
            &integrals,
            &HartreeFockConfig::default(),
            &InitialGuess::Zero,
            &mut (),
        )
        .unwrap();

        let first = &output.history[0];
        assert_eq!(first.iteration, 1);
        assert_relative_eq!(first.density_rms, 2.69561, epsilon = 1e-4);
        assert_relative_eq!(first.energy_change, 127.367, epsilon = 1e-3);
        assert_relative_eq!(first.electronic_energy, -127.3667, epsilon = 1e-4);

        // not yet converged one step earlier
        let previous = &output.history[21];
        assert!(previous.energy_change >= 1e-9);

        let last = &output.history[22];
        assert_eq!(last.iteration, 23);
        assert_relative_eq!(last.density_rms, 3.53e-9, max_relative = 1e-2);
        assert_relative_eq!(last.energy_change, 5.30e-10, max_relative = 1e-2);
        assert_eq!(last.electronic_energy, output.electronic_energy);

        for (i, record) in output.history.iter().enumerate() {
            assert_eq!(record.iteration, i + 1);
        }
        assert!(output
            .history
            .windows(2)
            .all(|w| w[0].wall_time_seconds <= w[1].wall_time_seconds));
    }

    #[test]
    fn converged_density_holds_all_electrons() {
        let integrals = water();
        let config = HartreeFockConfig::default();
        let output = restricted_hartree_fock_with(&integrals, &config, &InitialGuess::Zero, &mut ())
            .unwrap();

        assert_relative_eq!(
            output.electrons_per_spin(integrals.overlap()),
            5.0,
            epsilon = config.density_threshold
        );
    }

    #[test]
    fn every_step_is_symmetric_and_orthonormal() {
        let integrals = water();
        let scf = RestrictedScf::new(&integrals, &HartreeFockConfig::default()).unwrap();
        let overlap = integrals.overlap();

        let mut state = scf.initial_state(&InitialGuess::Zero).unwrap();
        for _ in 0..10 {
            let step = scf.step(&state).unwrap();

            assert_eq!(step.fock, step.fock.transpose());
            assert_eq!(step.state.density, step.state.density.transpose());

            let coefficients = &step.orbitals.coefficients;
            let identity = coefficients.transpose() * overlap * coefficients;
            assert_relative_eq!(identity, DMatrix::identity(7, 7), epsilon = 1e-10);

            assert!(step
                .orbitals
                .energies
                .as_slice()
                .windows(2)
                .all(|w| w[0] <= w[1]));

            state = step.state;
        }
        assert_eq!(state.iteration, 10);
    }

    #[test]
    fn converged_density_is_a_fixed_point() {
        let integrals = water();
        let config = HartreeFockConfig::default();
        let scf = RestrictedScf::new(&integrals, &config).unwrap();
        let output = scf.run(&InitialGuess::Zero, &mut ()).unwrap();

        let fock = scf
            .fock_builder()
            .fock(integrals.core_hamiltonian(), &output.density);
        let orbitals = scf.solver().solve(&fock).unwrap();
        let density = compute_updated_density(&orbitals.coefficients, 5);

        assert_relative_eq!(density, output.density, epsilon = config.density_threshold);
    }

    #[test]
    fn iteration_cap() {
        let integrals = water();
        let config = HartreeFockConfig {
            max_iterations: 1,
            ..Default::default()
        };
        let output =
            restricted_hartree_fock_with(&integrals, &config, &InitialGuess::Zero, &mut ()).unwrap();

        assert!(!output.converged);
        assert_eq!(output.status, ScfStatus::MaxIterationsExceeded);
        assert_eq!(output.iterations, 1);
        assert_eq!(output.history.len(), 1);
        assert_relative_eq!(output.electronic_energy, -127.3667, epsilon = 1e-4);
        assert!(output.total_energy().is_finite());

        for max_iterations in [2, 5, 22] {
            let config = HartreeFockConfig {
                max_iterations,
                ..Default::default()
            };
            let output =
                restricted_hartree_fock_with(&integrals, &config, &InitialGuess::Zero, &mut ())
                    .unwrap();

            assert!(!output.converged);
            assert_eq!(output.iterations, max_iterations);
        }
    }

    #[test]
    fn result_does_not_depend_on_the_guess() {
        let integrals = water();
        let config = HartreeFockConfig::default();
        let run = |guess: &InitialGuess| {
            restricted_hartree_fock_with(&integrals, &config, guess, &mut ()).unwrap()
        };

        let reference = run(&InitialGuess::Zero);
        let core = run(&InitialGuess::CoreHamiltonian);
        let huckel = run(&InitialGuess::ExtendedHuckel);

        let scf = RestrictedScf::new(&integrals, &config).unwrap();
        let core_density = scf.initial_state(&InitialGuess::CoreHamiltonian).unwrap().density;
        let huckel_density = scf.initial_state(&InitialGuess::ExtendedHuckel).unwrap().density;
        let mixed = run(&InitialGuess::Density(0.5 * (core_density + huckel_density)));

        for output in [&core, &huckel, &mixed] {
            assert!(output.converged);
            assert!(output.iterations < reference.iterations);
            assert_relative_eq!(output.total_energy(), reference.total_energy(), epsilon = 1e-7);
        }
    }

    #[test]
    fn closed_shell_only() {
        let integrals = water();
        let open_shell = AoIntegrals::new(
            integrals.overlap().clone(),
            integrals.core_hamiltonian().clone(),
            integrals.electron_repulsion().clone(),
            5,
            4,
            integrals.nuclear_repulsion(),
        )
        .unwrap();

        let error = restricted_hartree_fock(&open_shell, &HartreeFockConfig::default()).unwrap_err();
        assert_eq!(error, HartreeFockError::OpenShell { n_alpha: 5, n_beta: 4 });
        assert!(error.is_configuration());
    }

    #[test]
    fn more_electrons_than_basis_functions() {
        let h2 = testing::fixture("h2_sto-3g").unwrap();
        let crowded = AoIntegrals::new(
            h2.overlap().clone(),
            h2.core_hamiltonian().clone(),
            h2.electron_repulsion().clone(),
            3,
            3,
            h2.nuclear_repulsion(),
        )
        .unwrap();

        let error = restricted_hartree_fock(&crowded, &HartreeFockConfig::default()).unwrap_err();
        assert_eq!(
            error,
            HartreeFockError::TooManyElectrons {
                n_occupied: 3,
                n_basis: 2
            }
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_iterating() {
        let integrals = water();
        let config = HartreeFockConfig {
            energy_threshold: -1.0,
            ..Default::default()
        };

        let mut observer = Counter::default();
        let error =
            restricted_hartree_fock_with(&integrals, &config, &InitialGuess::Zero, &mut observer)
                .unwrap_err();
        assert!(matches!(error, HartreeFockError::InvalidConfig(_)));
        assert_eq!(observer.started, 0);
    }

    #[test]
    fn linearly_dependent_basis() {
        let singular = AoIntegrals::new(
            dmatrix![1.0, 1.0; 1.0, 1.0],
            dmatrix![-1.0, -0.5; -0.5, -1.0],
            ElectronTensor::zeros(2),
            1,
            1,
            0.0,
        )
        .unwrap();

        let error = restricted_hartree_fock(&singular, &HartreeFockConfig::default()).unwrap_err();
        assert!(matches!(
            error,
            HartreeFockError::OverlapNotPositiveDefinite { .. }
        ));
        assert!(error.is_numerical());
    }

    #[test]
    fn hydrogen_molecule() {
        let integrals = testing::fixture("h2_sto-3g").unwrap();
        let output = restricted_hartree_fock(&integrals, &HartreeFockConfig::default()).unwrap();

        assert!(output.converged);
        assert_eq!(output.iterations, 3);
        assert_relative_eq!(output.total_energy(), -1.1167141899, epsilon = 1e-6);
        assert_relative_eq!(output.orbital_energies[0], -0.5782029, epsilon = 1e-6);
        assert_relative_eq!(output.orbital_energies[1], 0.6702679, epsilon = 1e-6);
    }

    #[derive(Default)]
    struct Counter {
        started: usize,
        iterations: Vec<usize>,
        finished: usize,
    }

    impl ScfObserver for Counter {
        fn started(&mut self, _config: &HartreeFockConfig, n_basis: usize) {
            assert_eq!(n_basis, 7);
            self.started += 1;
        }

        fn iteration(&mut self, record: &IterationRecord) {
            self.iterations.push(record.iteration);
        }

        fn finished(&mut self, output: &RestrictedHartreeFockOutput) {
            assert_eq!(output.iterations, self.iterations.len());
            self.finished += 1;
        }
    }

    #[test]
    fn observer_sees_every_iteration() {
        let integrals = water();
        let mut observer = Counter::default();
        let output = restricted_hartree_fock_with(
            &integrals,
            &HartreeFockConfig::default(),
            &InitialGuess::Zero,
            &mut observer,
        )
        .unwrap();

        assert_eq!(observer.started, 1);
        assert_eq!(observer.finished, 1);
        assert_eq!(observer.iterations, (1..=output.iterations).collect::<Vec<_>>());
    }
}
