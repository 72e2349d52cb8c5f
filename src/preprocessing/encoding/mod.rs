//! Categorical feature encoders.
//!
//! # Available Encoders
//!
//! ## CityEncoder
//! Maps case-normalized city names to dense integer codes in lexicographic
//! order. The fitted vocabulary is persisted with the model, so inference
//! reproduces the training codes exactly.
//!
//! ## NeighborhoodTargetEncoder
//! Replaces a neighborhood by the mean price of its fitting rows, with the
//! unweighted mean of those means as fallback for unseen neighborhoods.
//!
//! ## Property-type one-hot
//! Fixed nine-column indicator set; see [`property_type`].

pub mod city;
pub mod property_type;
pub mod target;

pub use city::{fallback_city_code, CityEncoder, FittedCityEncoder};
pub use property_type::{one_hot, parse_property_type, ONE_HOT_WIDTH};
pub use target::{FittedTargetEncoder, NeighborhoodTargetEncoder, TargetEncoding};
