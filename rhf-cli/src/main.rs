use std::{fs::File, io::BufWriter, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use rhf_core::{
    config::IntegralFile,
    hf::{
        restricted_hartree_fock_with, HartreeFockConfig, InitialGuess, IterationRecord,
        RestrictedHartreeFockOutput, ScfObserver,
    },
    integrals::IntegralProvider,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: QcCommand,

    /// Log debug output unless RUST_LOG says otherwise
    #[arg(long, short, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum QcCommand {
    #[command(name = "rhf")]
    RestrictedHartreeFock {
        /// A JSON file with the atomic orbital integrals and electron counts of the system
        #[arg(long, short)]
        integrals: PathBuf,
        /// The maximum number of iterations the SCF loop should attempt before giving up
        #[arg(long, default_value_t = 100)]
        max_iterations: usize,
        /// if the electronic energy changes by less than this (and the density criterion
        /// holds), the system is considered converged
        #[arg(long, default_value_t = 1e-9)]
        energy_threshold: f64,
        /// if the rms change of the density matrix drops below this (and the energy
        /// criterion holds), the system is considered converged
        #[arg(long, default_value_t = 1e-5)]
        density_threshold: f64,
        /// The density the iterations start from
        #[arg(long, value_enum, default_value_t = Guess::Zero)]
        guess: Guess,
        /// Write the result as JSON to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Guess {
    Zero,
    Core,
    Huckel,
}

impl From<Guess> for InitialGuess {
    fn from(guess: Guess) -> Self {
        match guess {
            Guess::Zero => InitialGuess::Zero,
            Guess::Core => InitialGuess::CoreHamiltonian,
            Guess::Huckel => InitialGuess::ExtendedHuckel,
        }
    }
}

/// Prints the iteration table to stdout
struct PrintObserver;

impl ScfObserver for PrintObserver {
    fn started(&mut self, _config: &HartreeFockConfig, _n_basis: usize) {
        println!("{}", IterationRecord::table_header());
    }

    fn iteration(&mut self, record: &IterationRecord) {
        println!("{record}");
    }
}

/// Exit status of a run that ended without converging
const NOT_CONVERGED: u8 = 2;

fn exit_status(output: &RestrictedHartreeFockOutput) -> u8 {
    if output.converged {
        0
    } else {
        NOT_CONVERGED
    }
}

#[derive(Serialize)]
struct Report<'a> {
    total_energy: f64,
    #[serde(flatten)]
    output: &'a RestrictedHartreeFockOutput,
}

fn main() -> anyhow::Result<ExitCode> {
    let args: Args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    pretty_env_logger::formatted_builder()
        .filter_level(level)
        .parse_default_env()
        .init();

    match args.command {
        QcCommand::RestrictedHartreeFock {
            integrals,
            max_iterations,
            energy_threshold,
            density_threshold,
            guess,
            output,
        } => {
            let file = IntegralFile::new(integrals);
            let integrals = file
                .ao_integrals()
                .map_err(|e| anyhow::anyhow!(e))
                .with_context(|| format!("failed to load {}", file.path().display()))?;

            let config = HartreeFockConfig {
                max_iterations,
                energy_threshold,
                density_threshold,
            };

            let hf_output = restricted_hartree_fock_with(
                &integrals,
                &config,
                &guess.into(),
                &mut PrintObserver,
            )
            .context("hartree fock failed")?;

            let RestrictedHartreeFockOutput {
                ref orbital_energies,
                electronic_energy,
                nuclear_repulsion,
                iterations,
                converged,
                ref history,
                ..
            } = hf_output;

            let wall_time = history.last().map_or(0.0, |r| r.wall_time_seconds);
            if converged {
                println!("hartree fock converged after {iterations} iterations and {wall_time:0.3}s");
            } else {
                println!("WARNING: hartree fock did not converge within {iterations} iterations ({wall_time:0.3}s)");
            }
            println!("electronic energy: {electronic_energy:.10}");
            println!("nuclear repulsion energy: {nuclear_repulsion:.10}");
            println!("hartree fock energy: {:.10}", hf_output.total_energy());
            println!("orbital energies: {orbital_energies:3.6?}");
            println!(
                "electrons per spin: {:.6}",
                hf_output.electrons_per_spin(integrals.overlap())
            );

            if let Some(path) = output {
                let writer = BufWriter::new(
                    File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?,
                );
                let report = Report {
                    total_energy: hf_output.total_energy(),
                    output: &hf_output,
                };
                serde_json::to_writer_pretty(writer, &report)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }

            Ok(ExitCode::from(exit_status(&hf_output)))
        }
    }
}
