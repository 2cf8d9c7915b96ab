//! Randomized train/test index partitioning.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PalletsError, PalletsResult};

/// Disjoint train/test index sets that together cover `[0, size)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPartition {
    train: Vec<usize>,
    test: Vec<usize>,
}

impl IndexPartition {
    pub fn train(&self) -> &[usize] {
        &self.train
    }

    pub fn test(&self) -> &[usize] {
        &self.test
    }

    /// Total number of indices (`train + test`).
    pub fn size(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<usize>) {
        (self.train, self.test)
    }
}

/// Splits `[0, size)` into randomized train and test index sets.
///
/// One uniformly random permutation is drawn from `rng`; its first
/// `held_out` entries become the test set and the remainder the train set,
/// both in permutation order. Fails with
/// [`PalletsError::InvalidArgument`] when `held_out > size`.
///
/// # Examples
///
/// ```
/// use pallets_core::data::partition;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let split = partition(10, 3, &mut rng).unwrap();
/// assert_eq!(split.train().len(), 7);
/// assert_eq!(split.test().len(), 3);
/// ```
pub fn partition<R: Rng + ?Sized>(
    size: usize,
    held_out: usize,
    rng: &mut R,
) -> PalletsResult<IndexPartition> {
    if held_out > size {
        return Err(PalletsError::invalid(format!(
            "held_out ({held_out}) must not exceed size ({size})"
        )));
    }

    let mut indices: Vec<usize> = (0..size).collect();
    indices.shuffle(rng);

    let train = indices.split_off(held_out);
    Ok(IndexPartition {
        train,
        test: indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn assert_covers(split: &IndexPartition, size: usize) {
        let train: HashSet<_> = split.train().iter().copied().collect();
        let test: HashSet<_> = split.test().iter().copied().collect();

        assert_eq!(split.train().len() + split.test().len(), size);
        assert_eq!(train.len(), split.train().len(), "train repeats an index");
        assert_eq!(test.len(), split.test().len(), "test repeats an index");
        assert!(train.is_disjoint(&test));
        assert!(train.union(&test).all(|&i| i < size));
    }

    #[test]
    fn covers_every_index_exactly_once() {
        let mut rng = StdRng::seed_from_u64(7);
        for size in 0..40 {
            for held_out in 0..=size {
                let split = partition(size, held_out, &mut rng).unwrap();
                assert_eq!(split.test().len(), held_out);
                assert_covers(&split, size);
            }
        }
    }

    #[test]
    fn ten_three_split() {
        let mut rng = StdRng::seed_from_u64(1);
        let first = partition(10, 3, &mut rng).unwrap();
        assert_eq!(first.train().len(), 7);
        assert_eq!(first.test().len(), 3);

        // Fresh permutation per call
        let compositions: HashSet<Vec<usize>> = (0..20)
            .map(|_| partition(10, 3, &mut rng).unwrap().test().to_vec())
            .collect();
        assert!(compositions.len() > 1);
    }

    #[test]
    fn same_seed_same_split() {
        let a = partition(100, 20, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = partition(100, 20, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn held_out_larger_than_size_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = partition(5, 6, &mut rng).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn boundary_splits() {
        let mut rng = StdRng::seed_from_u64(0);
        let all_test = partition(4, 4, &mut rng).unwrap();
        assert!(all_test.train().is_empty());

        let none_held = partition(4, 0, &mut rng).unwrap();
        assert!(none_held.test().is_empty());
        assert_eq!(partition(0, 0, &mut rng).unwrap().size(), 0);
    }
}
