//! Derived features computed from raw listing attributes.
//!
//! - `amenity_score`: share of the five amenities present, in `[0, 1]`.
//! - `price_per_area`: the **city-level** average price per m², defined as
//!   `mean(price) / mean(surface)` over the fitting rows of that city. The same
//!   quantity is used for training rows and inference requests; a per-row
//!   `price / surface` would be unavailable at inference and would leak the
//!   target during training.
//! - `surface_villa`, `surface_appartement`: surface gated by the matching
//!   one-hot indicator.

use crate::dataset::{normalize_label, Amenities, ListingRecord, PropertyType};
use crate::error::{PriceError, Result};
use crate::preprocessing::encoding::{TargetEncoding, ONE_HOT_WIDTH};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Share of amenities present. Pure function of the five flags.
pub fn amenity_score(amenities: &Amenities) -> f64 {
    let present = amenities.flags().iter().filter(|&&f| f).count();
    present as f64 / Amenities::COUNT as f64
}

/// City price-per-area table (unfitted).
#[derive(Clone, Debug, Default)]
pub struct PricePerAreaEncoder;

impl PricePerAreaEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for PricePerAreaEncoder {
    type Fitted = FittedPricePerArea;

    fn fit<'a, I>(&self, records: I) -> Result<Self::Fitted>
    where
        I: IntoIterator<Item = &'a ListingRecord>,
    {
        // (sum price, sum surface) per city; the ratio of sums equals the
        // ratio of means.
        let mut sums: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        let (mut total_price, mut total_surface) = (0.0, 0.0);
        let mut n_samples = 0;
        for record in records {
            let entry = sums.entry(record.city_key()).or_insert((0.0, 0.0));
            entry.0 += record.price;
            entry.1 += record.surface;
            total_price += record.price;
            total_surface += record.surface;
            n_samples += 1;
        }
        if n_samples == 0 || total_surface <= 0.0 {
            return Err(PriceError::EmptyData(
                "Cannot fit PricePerAreaEncoder on empty data".to_string(),
            ));
        }

        let ratios = sums
            .into_iter()
            .map(|(city, (price, surface))| (city, price / surface))
            .collect();

        Ok(FittedPricePerArea {
            ratios,
            global: total_price / total_surface,
            n_samples,
        })
    }
}

/// Fitted city → average price per m² table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedPricePerArea {
    ratios: BTreeMap<String, f64>,
    /// Ratio over all fitting rows; used for unseen cities.
    global: f64,
    n_samples: usize,
}

impl FittedPricePerArea {
    pub fn global(&self) -> f64 {
        self.global
    }

    /// Ratio for a known city.
    pub fn ratio(&self, city: &str) -> Option<f64> {
        self.ratios.get(&normalize_label(city)).copied()
    }

    /// City ratio, or the global ratio for an unseen city. Does not log.
    pub fn lookup(&self, city: &str) -> TargetEncoding {
        match self.ratio(city) {
            Some(value) => TargetEncoding {
                value,
                used_fallback: false,
            },
            None => TargetEncoding {
                value: self.global,
                used_fallback: true,
            },
        }
    }
}

impl FittedTransformer for FittedPricePerArea {
    type Input = str;
    type Output = f64;

    fn transform(&self, city: &str) -> Result<f64> {
        Ok(self.ratio(city).unwrap_or_else(|| {
            warn!(
                city,
                fallback = self.global,
                "no price-per-area statistics for city, using global ratio"
            );
            self.global
        }))
    }

    fn n_samples_seen(&self) -> usize {
        self.n_samples
    }
}

/// Derived features of one listing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DerivedFeatures {
    pub amenity_score: f64,
    pub price_per_area: f64,
    pub surface_villa: f64,
    pub surface_appartement: f64,
}

/// Computes [`DerivedFeatures`] against a fitted price-per-area table.
#[derive(Clone, Copy, Debug)]
pub struct DerivedFeatureBuilder<'a> {
    price_per_area: &'a FittedPricePerArea,
    warn_on_fallback: bool,
}

impl<'a> DerivedFeatureBuilder<'a> {
    /// A builder that warns whenever a city falls back to the global ratio.
    pub fn new(price_per_area: &'a FittedPricePerArea) -> Self {
        Self {
            price_per_area,
            warn_on_fallback: true,
        }
    }

    /// Silence the per-listing fallback warning. Batch callers count
    /// fallbacks with [`FittedPricePerArea::lookup`] instead.
    pub fn warn_on_fallback(mut self, warn: bool) -> Self {
        self.warn_on_fallback = warn;
        self
    }

    pub fn build(
        &self,
        surface: f64,
        one_hot: &[f64; ONE_HOT_WIDTH],
        amenities: &Amenities,
        city: &str,
    ) -> Result<DerivedFeatures> {
        let price_per_area = if self.warn_on_fallback {
            self.price_per_area.transform(city)?
        } else {
            self.price_per_area.lookup(city).value
        };
        Ok(DerivedFeatures {
            amenity_score: amenity_score(amenities),
            price_per_area,
            surface_villa: surface * one_hot[PropertyType::Villa.index()],
            surface_appartement: surface * one_hot[PropertyType::Apartment.index()],
        })
    }
}
