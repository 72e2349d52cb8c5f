//! Neighborhood target encoding.
//!
//! Each neighborhood is replaced by the mean price of its fitting rows. The
//! fallback for unseen neighborhoods is the **unweighted mean of the
//! per-neighborhood means**, not the mean of all prices: with means
//! `{A: 10000, B: 20000, C: 30000}` the fallback is `20000` whatever the
//! number of rows behind each mean.
//!
//! Inside a train/test split the encoder must be fitted on the training
//! partition only and then applied unchanged to both partitions, otherwise
//! test prices leak into training features.

use crate::dataset::{normalize_label, ListingRecord};
use crate::error::{PriceError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Neighborhood target encoder (unfitted).
#[derive(Clone, Debug, Default)]
pub struct NeighborhoodTargetEncoder;

impl NeighborhoodTargetEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for NeighborhoodTargetEncoder {
    type Fitted = FittedTargetEncoder;

    fn fit<'a, I>(&self, records: I) -> Result<Self::Fitted>
    where
        I: IntoIterator<Item = &'a ListingRecord>,
    {
        let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        let mut n_samples = 0;
        for record in records {
            let entry = groups.entry(record.neighborhood_key()).or_insert((0.0, 0));
            entry.0 += record.price;
            entry.1 += 1;
            n_samples += 1;
        }
        if groups.is_empty() {
            return Err(PriceError::EmptyData(
                "Cannot fit NeighborhoodTargetEncoder on empty data".to_string(),
            ));
        }

        let means: BTreeMap<String, f64> = groups
            .into_iter()
            .map(|(key, (sum, count))| (key, sum / count as f64))
            .collect();
        let fallback = means.values().sum::<f64>() / means.len() as f64;

        Ok(FittedTargetEncoder {
            means,
            fallback,
            n_samples,
        })
    }
}

/// Result of a lenient lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetEncoding {
    pub value: f64,
    pub used_fallback: bool,
}

/// Fitted neighborhood → mean price table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedTargetEncoder {
    means: BTreeMap<String, f64>,
    fallback: f64,
    n_samples: usize,
}

impl FittedTargetEncoder {
    /// Mean of the per-neighborhood means.
    pub fn fallback(&self) -> f64 {
        self.fallback
    }

    pub fn n_neighborhoods(&self) -> usize {
        self.means.len()
    }

    /// Fitted mean of a neighborhood, if known.
    pub fn mean(&self, neighborhood: &str) -> Option<f64> {
        self.means.get(&normalize_label(neighborhood)).copied()
    }

    /// Group mean, or the fallback for an unseen neighborhood. Does not log.
    pub fn lookup(&self, neighborhood: &str) -> TargetEncoding {
        match self.mean(neighborhood) {
            Some(value) => TargetEncoding {
                value,
                used_fallback: false,
            },
            None => TargetEncoding {
                value: self.fallback,
                used_fallback: true,
            },
        }
    }

    /// Strict lookup: an unseen neighborhood is an error.
    pub fn try_encode(&self, neighborhood: &str) -> Result<f64> {
        self.mean(neighborhood)
            .ok_or_else(|| PriceError::UnknownCategory {
                field: "neighborhood",
                value: neighborhood.to_string(),
            })
    }
}

impl FittedTransformer for FittedTargetEncoder {
    type Input = str;
    type Output = f64;

    /// Lenient lookup; the fallback branch is logged as a warning.
    fn transform(&self, neighborhood: &str) -> Result<f64> {
        let encoding = self.lookup(neighborhood);
        if encoding.used_fallback {
            warn!(
                neighborhood,
                fallback = encoding.value,
                "unknown neighborhood, using fallback mean"
            );
        }
        Ok(encoding.value)
    }

    fn n_samples_seen(&self) -> usize {
        self.n_samples
    }
}
