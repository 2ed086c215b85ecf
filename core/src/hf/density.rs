use nalgebra::DMatrix;

/// Density matrix `D = C_occ C_occ^T` of the `n_occupied` lowest orbitals.
///
/// Relies on the columns of `coefficients` being sorted by ascending orbital energy.
///
/// # Panics
///
/// If `n_occupied` is larger than the number of orbitals.
pub fn compute_updated_density(coefficients: &DMatrix<f64>, n_occupied: usize) -> DMatrix<f64> {
    assert!(
        n_occupied <= coefficients.ncols(),
        "{n_occupied} occupied orbitals requested but only {} exist",
        coefficients.ncols()
    );

    let occupied = coefficients.columns(0, n_occupied);
    let density = &occupied * occupied.transpose();

    // symmetric to the last bit
    (&density + density.transpose()) * 0.5
}

/// Root of the summed squared change between two density matrices
pub fn density_rms(density: &DMatrix<f64>, previous: &DMatrix<f64>) -> f64 {
    (density - previous).norm()
}
