//! Median imputation of the optional count attributes.
//!
//! Bedrooms, bathrooms and floor may be missing in scraped rows. The imputer
//! learns one median per attribute from the fitting rows and fills the gaps,
//! so the regressor never sees an arbitrary zero for an unknown count.

use crate::dataset::ListingRecord;
use crate::error::{PriceError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Count cells of one listing; `None` marks a missing value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CountCells {
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub floor: Option<i32>,
}

impl From<&ListingRecord> for CountCells {
    fn from(record: &ListingRecord) -> Self {
        Self {
            bedrooms: record.bedrooms,
            bathrooms: record.bathrooms,
            floor: record.floor,
        }
    }
}

/// Filled counts, in feature order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Counts {
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub floor: f64,
}

/// Median of the known values; `None` when there are none.
fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 0 {
        Some((values[n / 2 - 1] + values[n / 2]) / 2.0)
    } else {
        Some(values[n / 2])
    }
}

/// CountImputer transformer (unfitted).
#[derive(Clone, Debug, Default)]
pub struct CountImputer;

impl CountImputer {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for CountImputer {
    type Fitted = FittedCountImputer;

    fn fit<'a, I>(&self, records: I) -> Result<Self::Fitted>
    where
        I: IntoIterator<Item = &'a ListingRecord>,
    {
        let mut bedrooms = Vec::new();
        let mut bathrooms = Vec::new();
        let mut floors = Vec::new();
        let mut n_samples = 0;

        for record in records {
            n_samples += 1;
            bedrooms.extend(record.bedrooms.map(f64::from));
            bathrooms.extend(record.bathrooms.map(f64::from));
            floors.extend(record.floor.map(f64::from));
        }
        if n_samples == 0 {
            return Err(PriceError::EmptyData(
                "Cannot fit CountImputer on empty data".to_string(),
            ));
        }

        let fill = |name: &str, values: Vec<f64>| {
            median(values).unwrap_or_else(|| {
                warn!(attribute = name, "no known values, imputing 0");
                0.0
            })
        };

        Ok(FittedCountImputer {
            bedrooms: fill("bedrooms", bedrooms),
            bathrooms: fill("bathrooms", bathrooms),
            floor: fill("floor", floors),
            n_samples,
        })
    }
}

/// Fitted CountImputer holding one median per attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedCountImputer {
    bedrooms: f64,
    bathrooms: f64,
    floor: f64,
    n_samples: usize,
}

impl FittedCountImputer {
    /// Fill values for bedrooms, bathrooms and floor.
    pub fn statistics(&self) -> Counts {
        Counts {
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            floor: self.floor,
        }
    }
}

impl FittedTransformer for FittedCountImputer {
    type Input = CountCells;
    type Output = Counts;

    fn transform(&self, cells: &CountCells) -> Result<Counts> {
        Ok(Counts {
            bedrooms: cells.bedrooms.map(f64::from).unwrap_or(self.bedrooms),
            bathrooms: cells.bathrooms.map(f64::from).unwrap_or(self.bathrooms),
            floor: cells.floor.map(f64::from).unwrap_or(self.floor),
        })
    }

    fn n_samples_seen(&self) -> usize {
        self.n_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::record;
    use crate::dataset::PropertyType;

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(vec![]), None);
    }

    #[test]
    fn test_fit_and_fill() {
        let mut records = vec![
            record(1.0, 50.0, "Fes", "Medina", PropertyType::Apartment),
            record(1.0, 50.0, "Fes", "Medina", PropertyType::Apartment),
            record(1.0, 50.0, "Fes", "Medina", PropertyType::Apartment),
        ];
        records[0].bedrooms = Some(1);
        records[1].bedrooms = Some(5);
        records[2].bedrooms = None;
        records[0].floor = Some(-1);
        records[1].floor = Some(3);
        records[2].floor = None;

        let fitted = CountImputer::new().fit(&records).unwrap();
        assert_eq!(fitted.n_samples_seen(), 3);
        let stats = fitted.statistics();
        assert_eq!(stats.bedrooms, 3.0);
        assert_eq!(stats.floor, 1.0);

        let filled = fitted.transform(&CountCells::from(&records[2])).unwrap();
        assert_eq!(filled.bedrooms, 3.0);
        assert_eq!(filled.bathrooms, 1.0);
        assert_eq!(filled.floor, 1.0);

        let known = fitted.transform(&CountCells::from(&records[0])).unwrap();
        assert_eq!(known.floor, -1.0);
    }

    #[test]
    fn test_all_missing_defaults_to_zero() {
        let mut r = record(1.0, 50.0, "Fes", "Medina", PropertyType::Land);
        r.bedrooms = None;
        let fitted = CountImputer::new().fit([&r]).unwrap();
        assert_eq!(fitted.statistics().bedrooms, 0.0);
    }

    #[test]
    fn test_empty_fit_fails() {
        let records: Vec<ListingRecord> = Vec::new();
        assert!(CountImputer::new().fit(&records).is_err());
    }
}
