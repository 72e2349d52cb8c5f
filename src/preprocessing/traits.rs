//! Core traits for preprocessing transformers.
//!
//! This module defines the two central traits:
//! - [`Transformer`]: the unfitted, configurable side; learns from listing records.
//! - [`FittedTransformer`]: the immutable result of fitting, ready for lookups
//!   and serialization inside the artifact bundle.

use crate::dataset::ListingRecord;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trait for unfitted transformers.
///
/// Fitting consumes any iterator of borrowed records so that callers can fit
/// on a partition (`train.iter().map(|&i| &records[i])`) without copying rows.
pub trait Transformer: Clone {
    /// The fitted transformer type ready for inference.
    type Fitted: FittedTransformer;

    /// Learn statistics from the given records.
    ///
    /// # Errors
    /// Returns [`crate::PriceError::EmptyData`] when the iterator yields nothing.
    fn fit<'a, I>(&self, records: I) -> Result<Self::Fitted>
    where
        I: IntoIterator<Item = &'a ListingRecord>;
}

/// Trait for fitted transformers.
///
/// Fitted transformers never change after `fit`; every method takes `&self`,
/// so one instance can be shared by concurrent inference calls.
pub trait FittedTransformer: Clone + Serialize + DeserializeOwned {
    /// Input of a single lookup.
    type Input: ?Sized;
    /// Output of a single lookup.
    type Output;

    /// Transform one input using the learned statistics.
    fn transform(&self, input: &Self::Input) -> Result<Self::Output>;

    /// Number of records seen during fit.
    fn n_samples_seen(&self) -> usize;
}
