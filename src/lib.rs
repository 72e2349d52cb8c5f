//! # immo_price
//!
//! Price estimation for Moroccan real-estate listings: the feature engineering
//! and target encoding shared by an offline training pipeline and a
//! single-listing prediction service.
//!
//! ## Core Design Principles
//!
//! - **One feature function**: training rows and prediction requests go
//!   through the same [`features::FeatureAssembler`], checked against a
//!   versioned [`features::FeatureSchema`].
//! - **No leakage**: price statistics (neighborhood means, price per m²) are
//!   fitted on the training partition only and applied to both partitions.
//! - **Persisted vocabulary**: the fitted encoders travel inside the model
//!   bundle, so serving reproduces training encodings exactly.
//! - **Explicit fallbacks**: unseen cities and neighborhoods take logged,
//!   testable fallback branches.
//!
//! ## Quick Start
//!
//! ```no_run
//! use immo_price::{ServingContext, TrainingConfig, TrainingPipeline};
//!
//! let outcome = TrainingPipeline::new(TrainingConfig::default())?.run_and_save()?;
//! println!("{}", outcome.report);
//!
//! let context = ServingContext::new(outcome.bundle)?;
//! let body = r#"{"surface": 100, "nombre_de_chambres": 2, "nombre_de_salles_de_bain": 1,
//!     "etage": 2, "terrasse": 1, "garage": 0, "ascenseur": 1, "piscine": 0, "securite": 1,
//!     "type_bien": "appartement", "ville": "Casablanca", "quartier": "Maarif"}"#;
//! println!("{}", context.predict_json(body)?.formatted_price);
//! # Ok::<(), immo_price::PriceError>(())
//! ```
//!
//! ## Module Structure
//!
//! - `dataset`: raw file reader and cleaned listing records
//! - `preprocessing`: outlier filter, encoders, derived features, imputation
//! - `features`: schema, feature vectors and the assembler
//! - `transform`: log-price target space
//! - `split`: seeded train/test partition
//! - `model`, `trainer`: the regressor and its gradient-descent trainer
//! - `metrics`: regression metrics and the evaluation report
//! - `pipeline`: end-to-end training and the persisted bundle
//! - `serving`: request validation and prediction
//! - `catalog`: form choices derived from the dataset

pub mod catalog;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod serialization;
pub mod serving;
pub mod split;
pub mod trainer;
pub mod transform;

pub use catalog::ListingCatalog;
pub use config::TrainingConfig;
pub use dataset::{Dataset, ListingRecord, PropertyType, RawDatasetReader};
pub use error::{PriceError, Result};
pub use features::{EncodeMode, FeatureAssembler, FeatureSchema, FeatureVector, ListingAttributes};
pub use metrics::{EvaluationReport, Metrics};
pub use model::{Fitted, InferenceModel, LinearRegressor, Unfitted};
pub use pipeline::{PriceModelBundle, TrainingOutcome, TrainingPipeline, CURRENCY};
pub use preprocessing::EncodingVocabulary;
pub use serialization::SerializableParams;
pub use serving::{
    format_price, PredictionRequest, PredictionResponse, RejectedRequest, ServingContext,
};
pub use split::{Partition, TrainingSplitter};
pub use transform::{from_model_space, to_model_space, to_price};
