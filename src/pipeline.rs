//! Training pipeline and the persisted model bundle.
//!
//! ```text
//! dataset file ─► complete records ─► outlier filter ─► train/test split
//!      ─► EncodingVocabulary (prices from train rows only)
//!      ─► FeatureAssembler ─► Trainer on ln(1 + price)
//!      ─► EvaluationReport on the test rows ─► PriceModelBundle
//! ```
//!
//! Any failure aborts the run before an artifact exists.

use crate::catalog::ListingCatalog;
use crate::config::TrainingConfig;
use crate::dataset::{Dataset, ListingRecord, RawDatasetReader};
use crate::error::{PriceError, Result};
use crate::features::{EncodeMode, FeatureAssembler, FeatureSchema, FEATURE_NAMES};
use crate::metrics::EvaluationReport;
use crate::model::{InferenceModel, LinearRegression, LinearRegressor, SerializableLinearParams};
use crate::preprocessing::EncodingVocabulary;
use crate::serialization::SerializableParams;
use crate::transform::{to_model_space, to_price};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Currency of every price the crate reads or produces.
pub const CURRENCY: &str = "MAD";

/// Number of features listed in the post-training influence log.
const TOP_FEATURES: usize = 8;

/// Everything serving needs, written once by the training pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceModelBundle {
    pub schema: FeatureSchema,
    pub vocabulary: EncodingVocabulary,
    pub model: SerializableLinearParams,
    pub currency: String,
}

impl PriceModelBundle {
    pub fn new(vocabulary: EncodingVocabulary, model: &LinearRegressor) -> Self {
        Self {
            schema: FeatureSchema::current(),
            vocabulary,
            model: model.extract_params(),
            currency: CURRENCY.to_string(),
        }
    }

    /// Check the bundle against the schema compiled into this build.
    pub fn validate(&self) -> Result<()> {
        FeatureSchema::current().validate(&self.schema)?;
        if self.model.weights.len() != self.schema.len() {
            return Err(PriceError::FeatureSchema(format!(
                "model has {} weights for {} schema fields",
                self.model.weights.len(),
                self.schema.len()
            )));
        }
        Ok(())
    }

    /// Write the bundle with bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_to_file(&path)?;
        info!(path = %path.as_ref().display(), "saved model bundle");
        Ok(())
    }

    /// Read and validate a bundle.
    ///
    /// # Errors
    /// [`PriceError::FeatureSchema`] if it was written by a build with a
    /// different feature schema.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bundle = Self::load_from_file(&path)?;
        bundle.validate()?;
        info!(
            path = %path.as_ref().display(),
            cities = bundle.vocabulary.city.n_cities(),
            neighborhoods = bundle.vocabulary.neighborhood.n_neighborhoods(),
            "loaded model bundle"
        );
        Ok(bundle)
    }

    pub fn regressor(&self) -> Result<LinearRegressor> {
        LinearRegressor::from_params(self.model.clone())
    }
}

/// Result of a successful training run.
#[derive(Clone, Debug)]
pub struct TrainingOutcome {
    pub bundle: PriceModelBundle,
    pub report: EvaluationReport,
    /// Form catalog over all complete records.
    pub catalog: ListingCatalog,
}

pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Read the configured dataset and train on it.
    pub fn run(&self) -> Result<TrainingOutcome> {
        let dataset = RawDatasetReader::new().read(&self.config.data.dataset)?;
        self.run_on(&dataset)
    }

    /// Train, then write the artifact and the optional catalog.
    pub fn run_and_save(&self) -> Result<TrainingOutcome> {
        let outcome = self.run()?;
        outcome.bundle.save(&self.config.data.artifact)?;
        if let Some(path) = &self.config.data.catalog {
            outcome.catalog.save(path)?;
        }
        Ok(outcome)
    }

    /// Train on an already loaded dataset.
    pub fn run_on(&self, dataset: &Dataset) -> Result<TrainingOutcome> {
        let records = dataset.complete_records();
        if records.is_empty() {
            return Err(PriceError::EmptyData(
                "no complete listings in dataset".to_string(),
            ));
        }
        let catalog = ListingCatalog::from_records(&records);

        let records = self.config.outlier_filter()?.filter(records)?;

        let partition = self.config.splitter()?.split(records.len())?;
        info!(
            train = partition.train.len(),
            test = partition.test.len(),
            "split listings"
        );

        let vocabulary = EncodingVocabulary::fit(&records, &partition.train)?;
        let assembler = FeatureAssembler::new(&vocabulary);

        let x_train = assembler
            .assemble_rows(&records, &partition.train, EncodeMode::Training)?
            .into_array();
        let y_train = log_targets(&records, &partition.train);

        let model = LinearRegression::standardized(&x_train, &y_train)?;
        let scaled = model.scaling().apply(&x_train);
        let fitted = self.config.trainer()?.fit(model, &scaled, &y_train)?;
        log_feature_influence(&fitted);

        let report = evaluate(&fitted, &assembler, &records, &partition.train, &partition.test)?;
        info!(
            r2 = report.price.r_squared,
            rmse = report.price.rmse,
            mae = report.price.mae,
            log_rmse = report.log_price.rmse,
            "evaluated on test partition"
        );

        Ok(TrainingOutcome {
            bundle: PriceModelBundle::new(vocabulary, &fitted),
            report,
            catalog,
        })
    }
}

fn log_targets(records: &[ListingRecord], indices: &[usize]) -> Array1<f64> {
    indices
        .iter()
        .map(|&i| to_model_space(records[i].price))
        .collect()
}

fn log_feature_influence(model: &LinearRegressor) {
    for (rank, (index, weight)) in model
        .feature_influence()
        .into_iter()
        .take(TOP_FEATURES)
        .enumerate()
    {
        let feature = FEATURE_NAMES.get(index).copied().unwrap_or("?");
        info!(rank = rank + 1, feature, weight, "feature influence");
    }
}

fn evaluate(
    model: &LinearRegressor,
    assembler: &FeatureAssembler<'_>,
    records: &[ListingRecord],
    train: &[usize],
    test: &[usize],
) -> Result<EvaluationReport> {
    let x_test = assembler
        .assemble_rows(records, test, EncodeMode::Training)?
        .into_array();
    let predicted: Vec<f64> = model
        .predict_batch(&x_test)?
        .iter()
        .map(|&l| to_price(l))
        .collect();
    let actual: Vec<f64> = test.iter().map(|&i| records[i].price).collect();

    let vocabulary = assembler.vocabulary();
    let fallbacks = test
        .iter()
        .filter(|&&i| vocabulary.neighborhood.lookup(&records[i].neighborhood).used_fallback)
        .count();
    if fallbacks > 0 {
        warn!(
            rows = fallbacks,
            test = test.len(),
            "test neighborhoods unseen in training, encoded with fallback mean"
        );
    }
    let city_fallbacks = test
        .iter()
        .filter(|&&i| vocabulary.price_per_area.lookup(&records[i].city).used_fallback)
        .count();
    if city_fallbacks > 0 {
        warn!(
            rows = city_fallbacks,
            test = test.len(),
            "test cities unseen in training, encoded with global price per area"
        );
    }

    EvaluationReport::from_prices(&actual, &predicted, train.len(), fallbacks)
}
