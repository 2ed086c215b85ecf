use nalgebra::DMatrix;

/// Electronic energy `sum_{μν} D[μν] (H[μν] + F[μν])` of a closed shell density.
pub fn electronic_energy(
    density: &DMatrix<f64>,
    core_hamiltonian: &DMatrix<f64>,
    fock: &DMatrix<f64>,
) -> f64 {
    density.dot(&(core_hamiltonian + fock))
}

/// Electronic energy plus the repulsion between the nuclei
pub fn total_energy(electronic_energy: f64, nuclear_repulsion: f64) -> f64 {
    electronic_energy + nuclear_repulsion
}
