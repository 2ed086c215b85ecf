use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// Upper bound on the sweeps of the symmetric eigensolver before it's considered diverged
const MAX_EIGEN_SWEEPS: usize = 10_000;

#[inline(always)]
/// Create a symmetric, square matrix. Function is only run for upper triangle of the matrix
pub(crate) fn symmetric_matrix(
    n: usize,
    mut func: impl FnMut(usize, usize) -> f64,
) -> DMatrix<f64> {
    let m = DMatrix::from_fn(n, n, |i, j| if i <= j { func(i, j) } else { 0.0 });
    DMatrix::from_fn(n, n, |i, j| if i <= j { m[(i, j)] } else { m[(j, i)] })
}

/// Eigendecomposition of a symmetric matrix, `None` if the solver doesn't converge
pub(super) fn eigs(matrix: DMatrix<f64>) -> Option<(DMatrix<f64>, DVector<f64>)> {
    let eigs = SymmetricEigen::try_new(matrix, f64::EPSILON, MAX_EIGEN_SWEEPS)?;
    Some((eigs.eigenvectors, eigs.eigenvalues))
}

/// Like [`eigs`], with the eigenpairs sorted by ascending eigenvalue
pub(super) fn sorted_eigs(matrix: DMatrix<f64>) -> Option<(DMatrix<f64>, DVector<f64>)> {
    let (eigenvectors, eigenvalues) = eigs(matrix)?;

    let mut val_vec_pairs = eigenvalues
        .iter()
        .copied()
        .zip(eigenvectors.column_iter())
        .collect::<Vec<_>>();

    val_vec_pairs.sort_unstable_by(|(a, _), (b, _)| a.total_cmp(b));

    let (values, vectors): (Vec<_>, Vec<_>) = val_vec_pairs.into_iter().unzip();

    Some((
        DMatrix::from_columns(&vectors),
        DVector::from_column_slice(&values),
    ))
}
