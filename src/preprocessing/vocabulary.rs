//! The fitted encoders and statistics tables persisted with a model.

use crate::dataset::ListingRecord;
use crate::error::{PriceError, Result};
use crate::preprocessing::derived::{FittedPricePerArea, PricePerAreaEncoder};
use crate::preprocessing::encoding::{
    CityEncoder, FittedCityEncoder, FittedTargetEncoder, NeighborhoodTargetEncoder,
};
use crate::preprocessing::imputation::{CountImputer, FittedCountImputer};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything the feature assembler needs besides the listing itself.
///
/// Immutable after [`EncodingVocabulary::fit`]; training rows and inference
/// requests are encoded against the same instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncodingVocabulary {
    pub city: FittedCityEncoder,
    pub neighborhood: FittedTargetEncoder,
    pub price_per_area: FittedPricePerArea,
    pub counts: FittedCountImputer,
}

impl EncodingVocabulary {
    /// Fit against a train/test split of `records`.
    ///
    /// The city vocabulary is label-only and covers every record, so test
    /// rows never hit an unknown city. Price statistics (neighborhood means,
    /// price per area) and count medians come from `train_indices` only.
    pub fn fit(records: &[ListingRecord], train_indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = train_indices.iter().find(|&&i| i >= records.len()) {
            return Err(PriceError::InvalidParameter(format!(
                "training index {bad} out of range for {} records",
                records.len()
            )));
        }
        let train = || train_indices.iter().map(|&i| &records[i]);

        let city = CityEncoder::new().fit(records)?;
        let neighborhood = NeighborhoodTargetEncoder::new().fit(train())?;
        let price_per_area = PricePerAreaEncoder::new().fit(train())?;
        let counts = CountImputer::new().fit(train())?;

        info!(
            cities = city.n_cities(),
            neighborhoods = neighborhood.n_neighborhoods(),
            fit_rows = neighborhood.n_samples_seen(),
            neighborhood_fallback = neighborhood.fallback(),
            global_price_per_area = price_per_area.global(),
            "fitted encoding vocabulary"
        );

        Ok(Self {
            city,
            neighborhood,
            price_per_area,
            counts,
        })
    }

    /// Fit every table on all records.
    pub fn fit_all(records: &[ListingRecord]) -> Result<Self> {
        let all: Vec<usize> = (0..records.len()).collect();
        Self::fit(records, &all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::record;
    use crate::dataset::PropertyType;

    fn records() -> Vec<ListingRecord> {
        vec![
            record(1_000_000.0, 100.0, "Rabat", "Agdal", PropertyType::Apartment),
            record(2_000_000.0, 100.0, "Rabat", "Agdal", PropertyType::Apartment),
            record(900_000.0, 90.0, "Fes", "Medina", PropertyType::Riad),
            record(50_000_000.0, 100.0, "Tanger", "Malabata", PropertyType::Villa),
        ]
    }

    #[test]
    fn test_city_vocabulary_covers_all_rows() {
        let vocab = EncodingVocabulary::fit(&records(), &[0, 1, 2]).unwrap();
        assert_eq!(vocab.city.n_cities(), 3);
        assert!(vocab.city.lookup("Tanger").is_some());
    }

    #[test]
    fn test_price_statistics_use_training_rows_only() {
        let vocab = EncodingVocabulary::fit(&records(), &[0, 1, 2]).unwrap();
        assert_eq!(vocab.neighborhood.mean("Malabata"), None);
        assert_eq!(vocab.neighborhood.mean("Agdal"), Some(1_500_000.0));
        assert_eq!(vocab.price_per_area.ratio("Tanger"), None);
        assert_eq!(vocab.neighborhood.n_samples_seen(), 3);
        assert_eq!(vocab.counts.n_samples_seen(), 3);
    }

    #[test]
    fn test_fit_all() {
        let vocab = EncodingVocabulary::fit_all(&records()).unwrap();
        assert_eq!(vocab.neighborhood.n_neighborhoods(), 3);
        assert_eq!(vocab.price_per_area.ratio("tanger"), Some(500_000.0));
    }

    #[test]
    fn test_out_of_range_index() {
        let err = EncodingVocabulary::fit(&records(), &[0, 9]).unwrap_err();
        assert!(matches!(err, PriceError::InvalidParameter(_)));
    }

    #[test]
    fn test_empty_training_partition() {
        let err = EncodingVocabulary::fit(&records(), &[]).unwrap_err();
        assert!(matches!(err, PriceError::EmptyData(_)));
    }
}
