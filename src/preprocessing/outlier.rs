//! Quantile clipping of the price distribution.
//!
//! Listings whose price falls outside `[quantile(low), quantile(high)]` of the
//! full collection are removed. Quantiles use linear interpolation between
//! order statistics, so `quantile(0.0)` is the minimum and `quantile(1.0)` the
//! maximum. Only `price` is inspected; extreme surfaces or counts are kept.

use crate::dataset::ListingRecord;
use crate::error::{PriceError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Linear-interpolation quantile of an ascending slice.
///
/// `sorted` must be non-empty and sorted; `q` is clamped to `[0, 1]`.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    let idx = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = (lower + 1).min(n - 1);
    let frac = idx - lower as f64;

    // Exact for tied order statistics and never outside [a, b].
    let (a, b) = (sorted[lower], sorted[upper]);
    if frac < 0.5 {
        a + (b - a) * frac
    } else {
        b - (b - a) * (1.0 - frac)
    }
}

/// Inclusive price range computed by [`OutlierFilter::fit`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub low: f64,
    pub high: f64,
}

impl PriceBounds {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }

    /// Keep the records whose price lies in the bounds, preserving order.
    pub fn apply(&self, records: Vec<ListingRecord>) -> Vec<ListingRecord> {
        records
            .into_iter()
            .filter(|r| self.contains(r.price))
            .collect()
    }
}

/// Removes price extremes by quantile clipping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutlierFilter {
    low_quantile: f64,
    high_quantile: f64,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self {
            low_quantile: 0.01,
            high_quantile: 0.99,
        }
    }
}

impl OutlierFilter {
    /// Create a filter with cut points `0 <= low <= high <= 1`.
    pub fn new(low_quantile: f64, high_quantile: f64) -> Result<Self> {
        let valid = (0.0..=1.0).contains(&low_quantile)
            && (0.0..=1.0).contains(&high_quantile)
            && low_quantile <= high_quantile;
        if !valid {
            return Err(PriceError::InvalidParameter(format!(
                "outlier quantiles must satisfy 0 <= low <= high <= 1, got ({}, {})",
                low_quantile, high_quantile
            )));
        }
        Ok(Self {
            low_quantile,
            high_quantile,
        })
    }

    pub fn low_quantile(&self) -> f64 {
        self.low_quantile
    }

    pub fn high_quantile(&self) -> f64 {
        self.high_quantile
    }

    /// Compute the price thresholds over the whole collection.
    pub fn fit(&self, records: &[ListingRecord]) -> Result<PriceBounds> {
        if records.is_empty() {
            return Err(PriceError::EmptyData(
                "Cannot compute price quantiles of an empty collection".to_string(),
            ));
        }
        let mut prices: Vec<f64> = records.iter().map(|r| r.price).collect();
        prices.sort_by(|a, b| a.total_cmp(b));

        Ok(PriceBounds {
            low: quantile(&prices, self.low_quantile),
            high: quantile(&prices, self.high_quantile),
        })
    }

    /// Fit the thresholds and drop the records outside them.
    pub fn filter(&self, records: Vec<ListingRecord>) -> Result<Vec<ListingRecord>> {
        let bounds = self.fit(&records)?;
        let before = records.len();
        let kept = bounds.apply(records);
        info!(
            low = bounds.low,
            high = bounds.high,
            kept = kept.len(),
            removed = before - kept.len(),
            "price outliers removed"
        );
        Ok(kept)
    }
}
