use std::ops::Index;

use crate::error::HartreeFockError;

/// Two values of the same integral that differ by less than this are considered equal
const DUPLICATE_TOLERANCE: f64 = 1e-10;

/// An integral index used in the two-electron integrals of a basis set.
///
/// The index represents the four indices (x, y, z, w) used to calculate a two-electron integral:
///   int_{x,y,z,w} = int_{xy|zw} = <x y | z w>
///
/// Two-electron integrals are symmetric under x <-> y, z <-> w and (xy) <-> (zw). This struct
/// stores its indices in canonical order: x >= y, z >= w and xy >= zw, so all eight equivalent
/// orders map to the same index.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct IntegralIndex(usize, usize, usize, usize);

impl IntegralIndex {
    /// Creates a new integral index with the given indices.
    pub(crate) const fn new(index: (usize, usize, usize, usize)) -> Self {
        let (i, j, k, l) = Self::correct_order(index);
        Self(i, j, k, l)
    }

    /// Returns the indices with the correct order, such that i >= j, k >= l and ij >= kl.
    #[inline(always)]
    const fn correct_order(
        (i, j, k, l): (usize, usize, usize, usize),
    ) -> (usize, usize, usize, usize) {
        let (i, j) = if i >= j { (i, j) } else { (j, i) };
        let (k, l) = if k >= l { (k, l) } else { (l, k) };

        if pair(i, j) >= pair(k, l) {
            (i, j, k, l)
        } else {
            (k, l, i, j)
        }
    }

    /// Position of this integral in the packed storage
    #[inline(always)]
    pub(crate) const fn packed(&self) -> usize {
        let &Self(i, j, k, l) = self;
        let ij = pair(i, j);
        let kl = pair(k, l);
        ij * (ij + 1) / 2 + kl
    }
}

/// Triangular index of an ordered pair a >= b
#[inline(always)]
const fn pair(a: usize, b: usize) -> usize {
    a * (a + 1) / 2 + b
}

impl std::fmt::Display for IntegralIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let &Self(i, j, k, l) = self;
        write!(f, "({} {}|{} {})", i, j, k, l)
    }
}

/// Electron-electron repulsion integrals (xy|zw) in chemists' notation over all
/// combinations of four basis functions.
///
/// Only the symmetry-unique integrals are stored, so the 8-fold permutational symmetry
/// holds by construction. Indexing with any of the eight equivalent orders returns the
/// same value.
#[derive(Clone, Debug, PartialEq)]
pub struct ElectronTensor {
    data: Vec<f64>,
    /// side length
    size: usize,
}

impl ElectronTensor {
    /// A tensor with all integrals set to zero
    pub fn zeros(size: usize) -> Self {
        Self {
            data: vec![0.0; Self::unique_len(size)],
            size,
        }
    }

    /// Builds a tensor by evaluating `func` once for every symmetry-unique integral.
    /// The indices passed to `func` are in canonical order.
    pub fn from_fn(size: usize, mut func: impl FnMut(usize, usize, usize, usize) -> f64) -> Self {
        let mut tensor = Self::zeros(size);

        for i in 0..size {
            for j in 0..=i {
                for k in 0..=i {
                    let l_max = if k == i { j } else { k };
                    for l in 0..=l_max {
                        let index = IntegralIndex(i, j, k, l);
                        let integral = func(i, j, k, l);
                        log::trace!("ERI {index} = {integral:<1.8}");
                        tensor.data[index.packed()] = integral;
                    }
                }
            }
        }

        tensor
    }

    /// Builds a tensor from a sparse list of integrals. Each entry may use any of the eight
    /// equivalent index orders; integrals that aren't listed are zero.
    ///
    /// Fails if an index is out of range or if the same integral appears twice with different
    /// values.
    pub fn from_entries(
        size: usize,
        entries: impl IntoIterator<Item = ((usize, usize, usize, usize), f64)>,
    ) -> Result<Self, HartreeFockError> {
        let mut tensor = Self::zeros(size);
        let mut assigned = vec![false; tensor.data.len()];

        for (index, value) in entries {
            let (i, j, k, l) = index;
            if i.max(j).max(k).max(l) >= size {
                return Err(HartreeFockError::IntegralIndexOutOfRange {
                    index,
                    n_basis: size,
                });
            }

            let linear = IntegralIndex::new(index).packed();
            if assigned[linear] {
                let first = tensor.data[linear];
                if (first - value).abs() > DUPLICATE_TOLERANCE {
                    return Err(HartreeFockError::InconsistentIntegral {
                        index,
                        first,
                        second: value,
                    });
                }
            }

            assigned[linear] = true;
            tensor.data[linear] = value;
        }

        log::debug!(
            "electron tensor: {} of {} unique integrals given explicitly",
            assigned.iter().filter(|&&set| set).count(),
            assigned.len()
        );

        Ok(tensor)
    }

    /// Number of basis functions along each of the four axes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether every stored integral is a finite number
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Number of symmetry-unique integrals for `size` basis functions
    pub fn unique_len(size: usize) -> usize {
        let n_pairs = size * (size + 1) / 2;
        n_pairs * (n_pairs + 1) / 2
    }
}

impl Index<(usize, usize, usize, usize)> for ElectronTensor {
    type Output = f64;

    fn index(&self, index: (usize, usize, usize, usize)) -> &Self::Output {
        &self.data[IntegralIndex::new(index).packed()]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::{ElectronTensor, IntegralIndex};
    use crate::error::HartreeFockError;

    #[test]
    fn packed_indices_are_dense_and_unique() {
        let n = 5;
        let mut seen = HashSet::new();
        for (i, j, k, l) in itertools::iproduct!(0..n, 0..n, 0..n, 0..n) {
            seen.insert(IntegralIndex::new((i, j, k, l)).packed());
        }

        assert_eq!(seen.len(), ElectronTensor::unique_len(n));
        assert_eq!(seen.iter().max(), Some(&(ElectronTensor::unique_len(n) - 1)));
    }

    #[test]
    fn eightfold_symmetry() {
        let mut rng = StdRng::seed_from_u64(7);
        let tensor = ElectronTensor::from_fn(4, |_, _, _, _| rng.gen_range(-1.0..1.0));

        for (i, j, k, l) in itertools::iproduct!(0..4, 0..4, 0..4, 0..4) {
            let value = tensor[(i, j, k, l)];
            for other in [
                (j, i, k, l),
                (i, j, l, k),
                (j, i, l, k),
                (k, l, i, j),
                (l, k, i, j),
                (k, l, j, i),
                (l, k, j, i),
            ] {
                assert_eq!(tensor[other], value, "({i}{j}|{k}{l}) vs {other:?}");
            }
        }
    }

    #[test]
    fn from_fn_visits_each_unique_integral_once() {
        let mut calls = 0;
        let _ = ElectronTensor::from_fn(6, |i, j, k, l| {
            assert!(i >= j && k >= l && i * (i + 1) / 2 + j >= k * (k + 1) / 2 + l);
            calls += 1;
            0.0
        });
        assert_eq!(calls, ElectronTensor::unique_len(6));
    }

    #[test]
    fn entries_in_any_order() {
        let tensor =
            ElectronTensor::from_entries(3, [((0, 1, 2, 2), 0.25), ((2, 2, 1, 0), 0.25)]).unwrap();

        assert_eq!(tensor[(1, 0, 2, 2)], 0.25);
        assert_eq!(tensor[(0, 0, 0, 0)], 0.0);
    }

    #[test]
    fn conflicting_entries() {
        let result = ElectronTensor::from_entries(3, [((0, 1, 2, 2), 0.25), ((2, 2, 0, 1), 0.5)]);

        assert!(matches!(
            result,
            Err(HartreeFockError::InconsistentIntegral { .. })
        ));
    }

    #[test]
    fn out_of_range_entry() {
        let result = ElectronTensor::from_entries(2, [((0, 0, 0, 2), 1.0)]);

        assert_eq!(
            result,
            Err(HartreeFockError::IntegralIndexOutOfRange {
                index: (0, 0, 0, 2),
                n_basis: 2
            })
        );
    }
}
