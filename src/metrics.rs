//! Regression metrics and the evaluation report of a training run.

use crate::error::{PriceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metrics for evaluating regression models.
pub struct Metrics;

impl Metrics {
    fn check(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
        if y_true.len() != y_pred.len() {
            return Err(PriceError::InvalidParameter(format!(
                "{} targets but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        Ok(())
    }

    /// Mean Squared Error, `mean((y_true - y_pred)²)`. Zero for empty input.
    pub fn mse(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        Self::check(y_true, y_pred)?;
        if y_true.is_empty() {
            return Ok(0.0);
        }
        let sum_sq: f64 = y_true
            .iter()
            .zip(y_pred)
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();
        Ok(sum_sq / y_true.len() as f64)
    }

    /// Root Mean Squared Error, in the units of the target.
    pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        Ok(Self::mse(y_true, y_pred)?.sqrt())
    }

    /// Mean Absolute Error.
    pub fn mae(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        Self::check(y_true, y_pred)?;
        if y_true.is_empty() {
            return Ok(0.0);
        }
        let sum_abs: f64 = y_true.iter().zip(y_pred).map(|(&t, &p)| (t - p).abs()).sum();
        Ok(sum_abs / y_true.len() as f64)
    }

    /// Coefficient of determination, `1 - SS_res / SS_tot`.
    ///
    /// Negative when the predictions are worse than the mean. A constant
    /// target gives 1 for a perfect prediction and 0 otherwise.
    pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        Self::check(y_true, y_pred)?;
        if y_true.is_empty() {
            return Ok(0.0);
        }
        let mean_true = y_true.iter().sum::<f64>() / y_true.len() as f64;
        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred)
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();
        let ss_tot: f64 = y_true.iter().map(|&t| (t - mean_true).powi(2)).sum();

        if ss_tot == 0.0 {
            return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
        }
        Ok(1.0 - ss_res / ss_tot)
    }

    pub fn calculate_all(y_true: &[f64], y_pred: &[f64]) -> Result<RegressionMetrics> {
        Ok(RegressionMetrics {
            mse: Self::mse(y_true, y_pred)?,
            rmse: Self::rmse(y_true, y_pred)?,
            mae: Self::mae(y_true, y_pred)?,
            r_squared: Self::r_squared(y_true, y_pred)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r_squared: f64,
}

/// Test-partition quality of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Metrics on prices in currency units.
    pub price: RegressionMetrics,
    /// Metrics on `ln(1 + price)`.
    pub log_price: RegressionMetrics,
    pub n_train: usize,
    pub n_test: usize,
    /// Test rows whose neighborhood was absent from the training partition.
    pub neighborhood_fallbacks: usize,
}

impl EvaluationReport {
    /// Compute the report from true and predicted prices (currency units).
    pub fn from_prices(
        true_prices: &[f64],
        predicted_prices: &[f64],
        n_train: usize,
        neighborhood_fallbacks: usize,
    ) -> Result<Self> {
        let log_true: Vec<f64> = true_prices.iter().map(|p| p.ln_1p()).collect();
        let log_pred: Vec<f64> = predicted_prices.iter().map(|p| p.ln_1p()).collect();
        Ok(Self {
            price: Metrics::calculate_all(true_prices, predicted_prices)?,
            log_price: Metrics::calculate_all(&log_true, &log_pred)?,
            n_train,
            n_test: true_prices.len(),
            neighborhood_fallbacks,
        })
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "train rows: {}, test rows: {}", self.n_train, self.n_test)?;
        writeln!(f, "R²: {:.4}", self.price.r_squared)?;
        writeln!(f, "RMSE: {:.2} MAD", self.price.rmse)?;
        writeln!(f, "MAE: {:.2} MAD", self.price.mae)?;
        writeln!(
            f,
            "log RMSE: {:.4}, log MAE: {:.4}",
            self.log_price.rmse, self.log_price.mae
        )?;
        write!(
            f,
            "neighborhood fallbacks on test rows: {}",
            self.neighborhood_fallbacks
        )
    }
}
