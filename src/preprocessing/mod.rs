//! Fitted statistics and encoders for listing features.
//!
//! Every transformer follows the same two-step pattern: an unfitted
//! [`Transformer`] learns from borrowed [`crate::dataset::ListingRecord`]s and
//! returns an immutable [`FittedTransformer`] that can be serialized into the
//! model artifact.
//!
//! # Core Traits
//!
//! - [`Transformer`]: unfitted side, `fit` over any record iterator
//! - [`FittedTransformer`]: fitted side, `transform` one input
//!
//! # Available Transformers
//!
//! ## Filtering
//! - [`OutlierFilter`]: quantile-based price trimming
//!
//! ## Encoding
//! - [`CityEncoder`]: dense lexicographic city codes
//! - [`NeighborhoodTargetEncoder`]: neighborhood → mean price
//! - [`one_hot`]: fixed property-type indicators
//!
//! ## Derived features
//! - [`PricePerAreaEncoder`]: city → average price per m²
//! - [`amenity_score`], [`DerivedFeatureBuilder`]
//!
//! ## Imputation
//! - [`CountImputer`]: median fill for bedrooms, bathrooms and floor
//!
//! # Example
//!
//! ```ignore
//! use immo_price::preprocessing::{EncodingVocabulary, OutlierFilter};
//!
//! let kept = OutlierFilter::default().filter(records)?;
//! let vocabulary = EncodingVocabulary::fit(&kept, &partition.train)?;
//! vocabulary.save_to_file("vocabulary.bin")?;
//! ```

pub mod derived;
pub mod encoding;
pub mod imputation;
pub mod outlier;
pub mod traits;
pub mod vocabulary;

pub use derived::{
    amenity_score, DerivedFeatureBuilder, DerivedFeatures, FittedPricePerArea, PricePerAreaEncoder,
};
pub use encoding::{
    fallback_city_code, one_hot, parse_property_type, CityEncoder, FittedCityEncoder,
    FittedTargetEncoder, NeighborhoodTargetEncoder, TargetEncoding, ONE_HOT_WIDTH,
};
pub use imputation::{CountCells, CountImputer, Counts, FittedCountImputer};
pub use outlier::{quantile, OutlierFilter, PriceBounds};
pub use traits::{FittedTransformer, Transformer};
pub use vocabulary::EncodingVocabulary;
