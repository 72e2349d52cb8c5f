//! Standardized linear regressor with compile-time training state.
//!
//! - `LinearModel<Unfitted>` ([`LinearRegression`]) implements
//!   [`TrainableModel`] and is driven by [`crate::trainer::Trainer`].
//! - `LinearModel<Fitted>` ([`LinearRegressor`]) implements
//!   [`InferenceModel`] and converts to [`SerializableLinearParams`].
//!
//! Weights live in standardized feature space. The per-feature mean and scale
//! learned from the training matrix are part of the model, so callers always
//! pass raw feature vectors.

use crate::error::{PriceError, Result};
use crate::features::FeatureVector;
use crate::model::{Fitted, InferenceModel, ParamOps, TrainableModel, Unfitted};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Scale below which a feature column is treated as constant.
const MIN_SCALE: f64 = 1e-12;

/// Learnable parameters: one weight per feature plus a bias.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearParams {
    pub weights: Array1<f64>,
    pub bias: f64,
}

impl ParamOps for LinearParams {
    fn add(&self, other: &Self) -> Self {
        Self {
            weights: &self.weights + &other.weights,
            bias: self.bias + other.bias,
        }
    }

    fn scale(&self, scalar: f64) -> Self {
        Self {
            weights: &self.weights * scalar,
            bias: self.bias * scalar,
        }
    }
}

/// Per-feature standardization `(x - mean) / scale`.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureScaling {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl FeatureScaling {
    /// Column means and population standard deviations of `x`. Constant
    /// columns get scale `1.0`.
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        let mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            PriceError::EmptyData("Cannot fit feature scaling on zero rows".to_string())
        })?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < MIN_SCALE { 1.0 } else { s });
        Ok(Self { mean, scale })
    }

    /// Scaling that leaves inputs unchanged.
    pub fn identity(n_features: usize) -> Self {
        Self {
            mean: Array1::zeros(n_features),
            scale: Array1::ones(n_features),
        }
    }

    pub fn apply(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.to_owned();
        out -= &self.mean;
        out /= &self.scale;
        out
    }
}

/// Linear model `y = ((x - mean) / scale) · w + b` in state `S`.
#[derive(Clone, Debug)]
pub struct LinearModel<S> {
    params: LinearParams,
    scaling: FeatureScaling,
    _state: PhantomData<S>,
}

impl<S> LinearModel<S> {
    pub fn n_features(&self) -> usize {
        self.params.weights.len()
    }

    pub fn scaling(&self) -> &FeatureScaling {
        &self.scaling
    }
}

pub type LinearRegression = LinearModel<Unfitted>;
pub type LinearRegressor = LinearModel<Fitted>;

impl LinearRegression {
    /// Zero weights and identity scaling.
    pub fn new(n_features: usize) -> Self {
        Self {
            params: LinearParams {
                weights: Array1::zeros(n_features),
                bias: 0.0,
            },
            scaling: FeatureScaling::identity(n_features),
            _state: PhantomData,
        }
    }

    /// Model initialized for the given training data: scaling fitted on `x`,
    /// zero weights, bias at `mean(y)`.
    pub fn standardized(x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(PriceError::InvalidParameter(format!(
                "{} feature rows but {} targets",
                x.nrows(),
                y.len()
            )));
        }
        let scaling = FeatureScaling::fit(x)?;
        let bias = y.mean().ok_or_else(|| {
            PriceError::EmptyData("Cannot initialize model without targets".to_string())
        })?;
        Ok(Self {
            params: LinearParams {
                weights: Array1::zeros(x.ncols()),
                bias,
            },
            scaling,
            _state: PhantomData,
        })
    }
}

impl TrainableModel for LinearRegression {
    type Params = LinearParams;
    type Gradients = LinearParams;
    type Output = LinearRegressor;

    fn forward(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.dot(&self.params.weights) + self.params.bias
    }

    fn backward(&self, x: ArrayView2<'_, f64>, grad_output: &Array1<f64>) -> LinearParams {
        LinearParams {
            weights: x.t().dot(grad_output),
            bias: grad_output.sum(),
        }
    }

    fn params(&self) -> &LinearParams {
        &self.params
    }

    fn update_params(&mut self, params: LinearParams) {
        self.params = params;
    }

    fn into_fitted(self) -> LinearRegressor {
        LinearModel {
            params: self.params,
            scaling: self.scaling,
            _state: PhantomData,
        }
    }
}

impl LinearRegressor {
    pub fn params(&self) -> &LinearParams {
        &self.params
    }

    /// Feature indices ordered by decreasing `|weight|`.
    ///
    /// Weights are in standardized space, so magnitudes are comparable
    /// across features.
    pub fn feature_influence(&self) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = self
            .params
            .weights
            .iter()
            .copied()
            .enumerate()
            .collect();
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        ranked
    }

    pub fn extract_params(&self) -> SerializableLinearParams {
        self.into()
    }

    pub fn from_params(params: SerializableLinearParams) -> Result<Self> {
        Self::try_from(params)
    }
}

impl InferenceModel for LinearRegressor {
    fn n_features(&self) -> usize {
        self.params.weights.len()
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let x = features.values();
        if x.len() != self.n_features() {
            return Err(PriceError::FeatureSchema(format!(
                "model expects {} features, got {}",
                self.n_features(),
                x.len()
            )));
        }
        let linear: f64 = x
            .iter()
            .zip(self.scaling.mean.iter())
            .zip(self.scaling.scale.iter())
            .zip(self.params.weights.iter())
            .map(|(((v, m), s), w)| (v - m) / s * w)
            .sum();
        Ok(linear + self.params.bias)
    }

    fn predict_batch(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        if features.ncols() != self.n_features() {
            return Err(PriceError::FeatureSchema(format!(
                "model expects {} features, got {}",
                self.n_features(),
                features.ncols()
            )));
        }
        Ok(self.scaling.apply(features).dot(&self.params.weights) + self.params.bias)
    }
}

/// Plain-vector form of a fitted [`LinearModel`], stored in the artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializableLinearParams {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub feature_mean: Vec<f64>,
    pub feature_scale: Vec<f64>,
}

impl From<&LinearRegressor> for SerializableLinearParams {
    fn from(model: &LinearRegressor) -> Self {
        Self {
            weights: model.params.weights.to_vec(),
            bias: model.params.bias,
            feature_mean: model.scaling.mean.to_vec(),
            feature_scale: model.scaling.scale.to_vec(),
        }
    }
}

impl TryFrom<SerializableLinearParams> for LinearRegressor {
    type Error = PriceError;

    fn try_from(value: SerializableLinearParams) -> Result<Self> {
        let n = value.weights.len();
        if value.feature_mean.len() != n || value.feature_scale.len() != n {
            return Err(PriceError::Serialization(format!(
                "inconsistent parameter lengths: {} weights, {} means, {} scales",
                n,
                value.feature_mean.len(),
                value.feature_scale.len()
            )));
        }
        if value.feature_scale.iter().any(|&s| !(s > 0.0)) {
            return Err(PriceError::Serialization(
                "feature scales must be positive".to_string(),
            ));
        }
        Ok(LinearModel {
            params: LinearParams {
                weights: Array1::from_vec(value.weights),
                bias: value.bias,
            },
            scaling: FeatureScaling {
                mean: Array1::from_vec(value.feature_mean),
                scale: Array1::from_vec(value.feature_scale),
            },
            _state: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::SerializableParams;
    use ndarray::array;

    fn fitted(weights: Vec<f64>, bias: f64) -> LinearRegressor {
        let n = weights.len();
        LinearRegressor::from_params(SerializableLinearParams {
            weights,
            bias,
            feature_mean: vec![0.0; n],
            feature_scale: vec![1.0; n],
        })
        .unwrap()
    }

    #[test]
    fn test_param_ops() {
        let a = LinearParams {
            weights: array![1.0, 2.0],
            bias: 0.5,
        };
        let b = LinearParams {
            weights: array![-1.0, 0.5],
            bias: 1.0,
        };
        let sum = a.add(&b);
        assert_eq!(sum.weights, array![0.0, 2.5]);
        assert_eq!(sum.bias, 1.5);
        let scaled = a.scale(-2.0);
        assert_eq!(scaled.weights, array![-2.0, -4.0]);
        assert_eq!(scaled.bias, -1.0);
    }

    #[test]
    fn test_new_zero_initialized() {
        let model = LinearRegression::new(3);
        assert_eq!(model.params().weights, array![0.0, 0.0, 0.0]);
        assert_eq!(model.params().bias, 0.0);
        assert_eq!(model.n_features(), 3);
    }

    #[test]
    fn test_standardized_init() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let y = array![10.0, 20.0];
        let model = LinearRegression::standardized(&x, &y).unwrap();
        assert_eq!(model.params().bias, 15.0);
        assert_eq!(model.scaling().mean, array![2.0, 5.0]);
        // Constant second column keeps scale 1.
        assert_eq!(model.scaling().scale, array![1.0, 1.0]);

        let scaled = model.scaling().apply(&x);
        assert_eq!(scaled, array![[-1.0, 0.0], [1.0, 0.0]]);

        assert!(LinearRegression::standardized(&x, &array![1.0]).is_err());
    }

    #[test]
    fn test_forward_and_backward() {
        let mut model = LinearRegression::new(2);
        model.update_params(LinearParams {
            weights: array![2.0, -1.0],
            bias: 1.0,
        });
        let x = array![[1.0, 1.0], [0.0, 3.0]];
        assert_eq!(model.forward(x.view()), array![2.0, -2.0]);

        let grads = model.backward(x.view(), &array![1.0, -1.0]);
        assert_eq!(grads.weights, array![1.0, -2.0]);
        assert_eq!(grads.bias, 0.0);
    }

    #[test]
    fn test_predict_applies_scaling() {
        let model = LinearRegressor::from_params(SerializableLinearParams {
            weights: vec![2.0],
            bias: 1.0,
            feature_mean: vec![10.0],
            feature_scale: vec![5.0],
        })
        .unwrap();
        let batch = model.predict_batch(&array![[20.0], [10.0]]).unwrap();
        assert_eq!(batch, array![5.0, 1.0]);
        assert!(model.predict_batch(&array![[1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_feature_influence_order() {
        let model = fitted(vec![0.1, -3.0, 2.0], 0.0);
        let ranked: Vec<usize> = model.feature_influence().iter().map(|(i, _)| *i).collect();
        assert_eq!(ranked, vec![1, 2, 0]);
    }

    #[test]
    fn test_params_round_trip_through_bytes() {
        let model = fitted(vec![1.0, 2.0, 3.0], 0.5);
        let bytes = model.extract_params().to_bytes().unwrap();
        let loaded =
            LinearRegressor::from_params(SerializableLinearParams::from_bytes(&bytes).unwrap())
                .unwrap();
        assert_eq!(loaded.extract_params(), model.extract_params());
    }

    #[test]
    fn test_inconsistent_params_rejected() {
        let err = LinearRegressor::from_params(SerializableLinearParams {
            weights: vec![1.0, 2.0],
            bias: 0.0,
            feature_mean: vec![0.0],
            feature_scale: vec![1.0, 1.0],
        })
        .unwrap_err();
        assert!(matches!(err, PriceError::Serialization(_)));
    }
}
