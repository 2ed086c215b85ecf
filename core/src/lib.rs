pub mod config;
pub mod error;
pub mod hf;
pub mod integrals;

pub mod testing {
    use std::error::Error;

    use crate::{
        config::IntegralFile,
        integrals::{AoIntegrals, IntegralProvider},
    };

    /// Directory holding the integral files used by tests and benchmarks
    pub const FIXTURE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data");

    /// Loads `tests/data/<name>.json`
    pub fn fixture(name: &str) -> Result<AoIntegrals, Box<dyn Error + Send + Sync>> {
        IntegralFile::new(format!("{FIXTURE_DIR}/{name}.json")).ao_integrals()
    }
}
