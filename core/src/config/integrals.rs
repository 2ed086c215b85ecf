use std::{
    error::Error,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{
    error::HartreeFockError,
    integrals::{AoIntegrals, ElectronTensor, IntegralProvider},
};

/// Precomputed integrals of a molecule as stored in an integral file.
///
/// Matrices are stored as lists of rows. Electron repulsion integrals are a sparse list of
/// `[i, j, k, l, value]` entries in chemists' notation with zero-based indices; each unique
/// integral needs to be listed only once, in any of its eight equivalent index orders, and
/// integrals that aren't listed are zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigIntegrals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub n_alpha: usize,
    pub n_beta: usize,
    pub nuclear_repulsion: f64,
    overlap: Vec<Vec<f64>>,
    kinetic: Vec<Vec<f64>>,
    nuclear_attraction: Vec<Vec<f64>>,
    electron_repulsion: Vec<(usize, usize, usize, usize, f64)>,
}

impl ConfigIntegrals {
    /// The number of basis functions this file describes
    pub fn n_basis(&self) -> usize {
        self.overlap.len()
    }
}

impl TryFrom<ConfigIntegrals> for AoIntegrals {
    type Error = HartreeFockError;

    fn try_from(value: ConfigIntegrals) -> Result<Self, Self::Error> {
        let n_basis = value.n_basis();

        let overlap = matrix_from_rows("overlap matrix", &value.overlap, n_basis)?;
        let kinetic = matrix_from_rows("kinetic matrix", &value.kinetic, n_basis)?;
        let nuclear = matrix_from_rows(
            "nuclear attraction matrix",
            &value.nuclear_attraction,
            n_basis,
        )?;

        let electron = ElectronTensor::from_entries(
            n_basis,
            value
                .electron_repulsion
                .iter()
                .map(|&(i, j, k, l, integral)| ((i, j, k, l), integral)),
        )?;

        if let Some(name) = &value.name {
            log::debug!("loaded integrals '{name}' with {n_basis} basis functions");
        }

        AoIntegrals::new(
            overlap,
            kinetic + nuclear,
            electron,
            value.n_alpha,
            value.n_beta,
            value.nuclear_repulsion,
        )
    }
}

fn matrix_from_rows(
    what: &'static str,
    rows: &[Vec<f64>],
    n: usize,
) -> Result<DMatrix<f64>, HartreeFockError> {
    let mismatch = |found| HartreeFockError::DimensionMismatch {
        what,
        expected: (n, n),
        found,
    };

    if rows.len() != n {
        return Err(mismatch((rows.len(), rows.first().map_or(0, Vec::len))));
    }
    if let Some(row) = rows.iter().find(|row| row.len() != n) {
        return Err(mismatch((n, row.len())));
    }

    Ok(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
}

/// An [`IntegralProvider`] that reads a JSON integral file from disk.
#[derive(Debug, Clone)]
pub struct IntegralFile {
    path: PathBuf,
}

impl IntegralFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw file contents without turning them into an [`AoIntegrals`] bundle
    pub fn load(&self) -> Result<ConfigIntegrals, Box<dyn Error + Send + Sync>> {
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl IntegralProvider for IntegralFile {
    fn ao_integrals(&self) -> Result<AoIntegrals, Box<dyn Error + Send + Sync>> {
        log::debug!("reading integrals from {}", self.path.display());
        Ok(AoIntegrals::try_from(self.load()?)?)
    }
}
