//! City label encoding.
//!
//! Codes are assigned in lexicographic order of the normalized city names, so
//! the same corpus always yields the same codes regardless of row order.
//!
//! Two lookups exist:
//! - [`FittedTransformer::transform`]: strict, used while building training
//!   features; an unseen city is an [`PriceError::UnknownCategory`].
//! - [`FittedCityEncoder::encode_for_inference`]: known cities get their
//!   fitted code; an unseen city gets [`fallback_city_code`], a stable hash
//!   reduced to `0..100`.
//!
//! The fallback code lives in a different numeric space than the dense
//! training codes and may collide with one of them. It only keeps inference
//! deterministic for cities the model has never seen.

use crate::dataset::{normalize_label, ListingRecord};
use crate::error::{PriceError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Number of buckets of the inference fallback code.
pub const FALLBACK_BUCKETS: u64 = 100;

/// Deterministic code for a city absent from the fitted vocabulary.
///
/// FNV-1a over the normalized name, modulo [`FALLBACK_BUCKETS`]. Independent
/// of the vocabulary, the platform and the process.
pub fn fallback_city_code(city: &str) -> usize {
    let hash = normalize_label(city)
        .bytes()
        .fold(FNV_OFFSET_BASIS, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME));
    (hash % FALLBACK_BUCKETS) as usize
}

/// City encoder (unfitted).
#[derive(Clone, Debug, Default)]
pub struct CityEncoder;

impl CityEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for CityEncoder {
    type Fitted = FittedCityEncoder;

    fn fit<'a, I>(&self, records: I) -> Result<Self::Fitted>
    where
        I: IntoIterator<Item = &'a ListingRecord>,
    {
        let mut cities = BTreeSet::new();
        let mut n_samples = 0;
        for record in records {
            cities.insert(record.city_key());
            n_samples += 1;
        }
        if cities.is_empty() {
            return Err(PriceError::EmptyData(
                "Cannot fit CityEncoder on empty data".to_string(),
            ));
        }
        Ok(FittedCityEncoder {
            cities: cities.into_iter().collect(),
            n_samples,
        })
    }
}

/// Fitted city vocabulary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedCityEncoder {
    /// Normalized names in ascending order; the position is the code.
    cities: Vec<String>,
    n_samples: usize,
}

impl FittedCityEncoder {
    /// Known cities in code order.
    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    pub fn n_cities(&self) -> usize {
        self.cities.len()
    }

    /// Fitted code of `city`, if known.
    pub fn lookup(&self, city: &str) -> Option<usize> {
        self.cities.binary_search(&normalize_label(city)).ok()
    }

    /// Inverse of [`FittedCityEncoder::lookup`].
    pub fn city(&self, code: usize) -> Option<&str> {
        self.cities.get(code).map(String::as_str)
    }

    /// Code used at inference time: fitted code, or the hash fallback.
    pub fn encode_for_inference(&self, city: &str) -> usize {
        match self.lookup(city) {
            Some(code) => code,
            None => {
                let code = fallback_city_code(city);
                warn!(city, code, "unknown city, using hash fallback code");
                code
            }
        }
    }
}

impl FittedTransformer for FittedCityEncoder {
    type Input = str;
    type Output = usize;

    fn transform(&self, city: &str) -> Result<usize> {
        self.lookup(city).ok_or_else(|| PriceError::UnknownCategory {
            field: "city",
            value: city.to_string(),
        })
    }

    fn n_samples_seen(&self) -> usize {
        self.n_samples
    }
}
