//! Training configuration, read from a JSON file.
//!
//! Every field has a default, so `{}` is a valid configuration:
//!
//! ```json
//! {
//!   "data": { "dataset": "data_final.csv", "artifact": "price_model.bin" },
//!   "outliers": { "low_quantile": 0.01, "high_quantile": 0.99 },
//!   "split": { "test_ratio": 0.2, "seed": 42 },
//!   "trainer": { "learning_rate": 0.05, "max_epochs": 300 }
//! }
//! ```

use crate::error::Result;
use crate::preprocessing::OutlierFilter;
use crate::split::TrainingSplitter;
use crate::trainer::Trainer;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default)]
    pub data: DataPaths,
    #[serde(default)]
    pub outliers: OutlierSpec,
    #[serde(default)]
    pub split: SplitSpec,
    #[serde(default)]
    pub trainer: TrainerSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPaths {
    /// Delimited listings file.
    #[serde(default = "default_dataset")]
    pub dataset: PathBuf,
    /// Where the trained bundle is written.
    #[serde(default = "default_artifact")]
    pub artifact: PathBuf,
    /// Optional catalog export for the prediction form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            artifact: default_artifact(),
            catalog: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierSpec {
    #[serde(default = "default_low_quantile")]
    pub low_quantile: f64,
    #[serde(default = "default_high_quantile")]
    pub high_quantile: f64,
}

impl Default for OutlierSpec {
    fn default() -> Self {
        Self {
            low_quantile: default_low_quantile(),
            high_quantile: default_high_quantile(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitSpec {
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SplitSpec {
    fn default() -> Self {
        Self {
            test_ratio: default_test_ratio(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainerSpec {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_epochs")]
    pub max_epochs: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_l2")]
    pub l2: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for TrainerSpec {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_epochs: default_max_epochs(),
            learning_rate: default_learning_rate(),
            l2: default_l2(),
            tolerance: default_tolerance(),
        }
    }
}

fn default_dataset() -> PathBuf {
    PathBuf::from("data_final.csv")
}

fn default_artifact() -> PathBuf {
    PathBuf::from("price_model.bin")
}

fn default_low_quantile() -> f64 {
    0.01
}

fn default_high_quantile() -> f64 {
    0.99
}

fn default_test_ratio() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_batch_size() -> usize {
    32
}

fn default_max_epochs() -> usize {
    300
}

fn default_learning_rate() -> f64 {
    0.05
}

fn default_l2() -> f64 {
    1e-4
}

fn default_tolerance() -> f64 {
    1e-8
}

impl TrainingConfig {
    /// Parse and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges. Paths are checked when they are opened.
    ///
    /// The ranges are the ones the configured components enforce.
    pub fn validate(&self) -> Result<()> {
        self.outlier_filter()?;
        self.splitter()?;
        self.trainer()?;
        Ok(())
    }

    pub fn outlier_filter(&self) -> Result<OutlierFilter> {
        OutlierFilter::new(self.outliers.low_quantile, self.outliers.high_quantile)
    }

    pub fn splitter(&self) -> Result<TrainingSplitter> {
        TrainingSplitter::new(self.split.test_ratio, self.split.seed)
    }

    /// The trainer shares the split seed.
    pub fn trainer(&self) -> Result<Trainer> {
        let t = &self.trainer;
        Trainer::builder()
            .batch_size(t.batch_size)
            .max_epochs(t.max_epochs)
            .learning_rate(t.learning_rate)
            .l2(t.l2)
            .tolerance(t.tolerance)
            .seed(self.split.seed)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PriceError;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = TrainingConfig::from_json("{}").unwrap();
        assert_eq!(config, TrainingConfig::default());
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.split.test_ratio, 0.2);
        assert_eq!(config.outliers.high_quantile, 0.99);
        assert_eq!(config.data.artifact, PathBuf::from("price_model.bin"));
        assert!(config.data.catalog.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = TrainingConfig::from_json(
            r#"{"split": {"seed": 7}, "trainer": {"learning_rate": 0.01}, "data": {"catalog": "form.js"}}"#,
        )
        .unwrap();
        assert_eq!(config.split.seed, 7);
        assert_eq!(config.split.test_ratio, 0.2);
        assert_eq!(config.trainer.learning_rate, 0.01);
        assert_eq!(config.trainer.batch_size, 32);
        assert_eq!(config.data.catalog, Some(PathBuf::from("form.js")));
    }

    #[test]
    fn test_invalid_values() {
        for json in [
            r#"{"outliers": {"low_quantile": 0.9, "high_quantile": 0.1}}"#,
            r#"{"split": {"test_ratio": 1.0}}"#,
            r#"{"trainer": {"batch_size": 0}}"#,
            r#"{"trainer": {"learning_rate": -1.0}}"#,
        ] {
            let err = TrainingConfig::from_json(json).unwrap_err();
            assert!(matches!(err, PriceError::InvalidParameter(_)), "{json}");
        }
    }

    #[test]
    fn test_config_and_components_agree() {
        let mut config = TrainingConfig::default();
        config.trainer.l2 = f64::NAN;
        let from_config = config.validate().unwrap_err().to_string();
        let from_builder = Trainer::builder().l2(f64::NAN).build().unwrap_err().to_string();
        assert_eq!(from_config, from_builder);

        let mut config = TrainingConfig::default();
        config.outliers.low_quantile = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(PriceError::InvalidParameter(ref m)) if m.contains("outlier quantiles")
        ));

        let config = TrainingConfig::default();
        let trainer = config.trainer().unwrap();
        assert_eq!(trainer.seed, config.split.seed);
        assert_eq!(config.splitter().unwrap().test_ratio(), 0.2);
        assert_eq!(config.outlier_filter().unwrap(), OutlierFilter::default());
    }

    #[test]
    fn test_malformed_json() {
        let err = TrainingConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, PriceError::Serialization(_)));
    }
}
