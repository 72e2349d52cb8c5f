//! The price regressor behind the feature pipeline.
//!
//! The rest of the crate only sees [`InferenceModel`]: a feature vector goes
//! in, a log price comes out. [`linear::LinearModel`] is the regressor the
//! training pipeline fits.

pub mod linear;
pub mod state;

pub use linear::{
    FeatureScaling, LinearModel, LinearParams, LinearRegression, LinearRegressor,
    SerializableLinearParams,
};
pub use state::{Fitted, Unfitted};

use crate::error::Result;
use crate::features::FeatureVector;
use ndarray::{Array1, Array2, ArrayView2};

/// Training-side interface of a gradient-fitted model.
///
/// Inputs of `forward` and `backward` are already standardized.
pub trait TrainableModel {
    type Params;
    type Gradients;
    type Output;

    fn forward(&self, x: ArrayView2<'_, f64>) -> Array1<f64>;
    fn backward(&self, x: ArrayView2<'_, f64>, grad_output: &Array1<f64>) -> Self::Gradients;
    fn params(&self) -> &Self::Params;
    fn update_params(&mut self, new_params: Self::Params);

    fn into_fitted(self) -> Self::Output;
}

/// Element-wise arithmetic on parameter sets, used by the optimizer step.
pub trait ParamOps: Clone {
    fn add(&self, other: &Self) -> Self;
    fn scale(&self, scalar: f64) -> Self;
}

/// A trained regressor mapping feature vectors to log prices.
///
/// Implementations are immutable after loading and shared across request
/// threads.
pub trait InferenceModel: Send + Sync {
    /// Number of input features expected.
    fn n_features(&self) -> usize;

    /// Predict one log price.
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Predict one log price per row.
    fn predict_batch(&self, features: &Array2<f64>) -> Result<Array1<f64>>;
}
