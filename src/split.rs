//! Seeded train/test partitioning of row indices.

use crate::error::{PriceError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

/// Row indices of the two partitions. Disjoint, together covering `0..n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n` with a seeded generator and cuts off the test partition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainingSplitter {
    test_ratio: f64,
    seed: u64,
}

impl Default for TrainingSplitter {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

impl TrainingSplitter {
    /// # Errors
    /// [`PriceError::InvalidParameter`] unless `0 < test_ratio < 1`.
    pub fn new(test_ratio: f64, seed: u64) -> Result<Self> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(PriceError::InvalidParameter(format!(
                "test_ratio must be in (0, 1), got {test_ratio}"
            )));
        }
        Ok(Self { test_ratio, seed })
    }

    pub fn test_ratio(&self) -> f64 {
        self.test_ratio
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Partition `0..n`. The test partition has `ceil(n * test_ratio)` rows.
    ///
    /// # Errors
    /// [`PriceError::EmptyData`] when either partition would be empty.
    pub fn split(&self, n: usize) -> Result<Partition> {
        let n_test = (n as f64 * self.test_ratio).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(PriceError::EmptyData(format!(
                "cannot split {n} rows with test_ratio {} into two non-empty partitions",
                self.test_ratio
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);
        let train = indices.split_off(n_test);

        debug!(train = train.len(), test = indices.len(), seed = self.seed, "split rows");
        Ok(Partition {
            train,
            test: indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_sizes_and_disjointness() {
        let p = TrainingSplitter::default().split(101).unwrap();
        assert_eq!(p.test.len(), 21);
        assert_eq!(p.train.len(), 80);

        let all: BTreeSet<usize> = p.train.iter().chain(&p.test).copied().collect();
        assert_eq!(all.len(), 101);
        assert_eq!(all.iter().max(), Some(&100));
    }

    #[test]
    fn test_same_seed_same_partition() {
        let a = TrainingSplitter::new(0.25, 7).unwrap().split(40).unwrap();
        let b = TrainingSplitter::new(0.25, 7).unwrap().split(40).unwrap();
        let c = TrainingSplitter::new(0.25, 8).unwrap().split(40).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(TrainingSplitter::new(0.0, 1).is_err());
        assert!(TrainingSplitter::new(1.0, 1).is_err());
        assert!(TrainingSplitter::new(f64::NAN, 1).is_err());
        assert!(matches!(
            TrainingSplitter::default().split(1),
            Err(PriceError::EmptyData(_))
        ));
        assert!(TrainingSplitter::default().split(0).is_err());
        assert!(TrainingSplitter::default().split(2).is_ok());
    }
}
