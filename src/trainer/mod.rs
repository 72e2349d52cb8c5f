//! Mini-batch gradient descent for [`TrainableModel`]s.
use crate::error::{PriceError, Result};
use crate::model::{ParamOps, TrainableModel};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

/// Orchestrates the training loop: MSE loss, L2 penalty on the weights, plain
/// SGD step per mini-batch.
///
/// Built once through [`TrainerBuilder`]; immutable afterwards and reusable
/// across models.
#[derive(Clone, Debug)]
pub struct Trainer {
    pub(crate) batch_size: usize,
    pub(crate) max_epochs: usize,
    pub(crate) learning_rate: f64,
    pub(crate) l2: f64,
    pub(crate) tolerance: f64,
    pub(crate) seed: u64,
}

/// Fluent builder for [`Trainer`].
///
/// Defaults:
/// - `batch_size`: 32
/// - `max_epochs`: 300
/// - `learning_rate`: 0.05
/// - `l2`: 1e-4
/// - `tolerance`: 1e-8 (stop when the epoch loss improves by less)
/// - `seed`: 42 (mini-batch order)
#[derive(Clone, Debug)]
pub struct TrainerBuilder {
    batch_size: usize,
    max_epochs: usize,
    learning_rate: f64,
    l2: f64,
    tolerance: f64,
    seed: u64,
}

impl Default for TrainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainerBuilder {
    pub fn new() -> Self {
        Self {
            batch_size: 32,
            max_epochs: 300,
            learning_rate: 0.05,
            l2: 1e-4,
            tolerance: 1e-8,
            seed: 42,
        }
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }

    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    pub fn l2(mut self, lambda: f64) -> Self {
        self.l2 = lambda;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// # Errors
    /// [`PriceError::InvalidParameter`] for a zero batch size or epoch count,
    /// a non-positive learning rate, or a negative penalty or tolerance.
    pub fn build(self) -> Result<Trainer> {
        if self.batch_size == 0 || self.max_epochs == 0 {
            return Err(PriceError::InvalidParameter(
                "batch_size and max_epochs must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(PriceError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.l2 >= 0.0) || !(self.tolerance >= 0.0) {
            return Err(PriceError::InvalidParameter(
                "l2 and tolerance must be non-negative".to_string(),
            ));
        }
        Ok(Trainer {
            batch_size: self.batch_size,
            max_epochs: self.max_epochs,
            learning_rate: self.learning_rate,
            l2: self.l2,
            tolerance: self.tolerance,
            seed: self.seed,
        })
    }
}

/// The linear models the trainer fits expose these parameters.
pub trait WeightedParams: ParamOps {
    fn weights(&self) -> &Array1<f64>;
    fn with_weights_only(&self) -> Self;
}

impl WeightedParams for crate::model::LinearParams {
    fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    fn with_weights_only(&self) -> Self {
        Self {
            weights: self.weights.clone(),
            bias: 0.0,
        }
    }
}

impl Trainer {
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::new()
    }

    /// Train `model` on standardized rows `x` against targets `y`.
    ///
    /// The loss of an epoch is the mean squared error over all rows plus
    /// `l2 * |w|²`. Training stops after `max_epochs` or once the loss
    /// improves by less than `tolerance`.
    ///
    /// # Errors
    /// - [`PriceError::EmptyData`] for zero rows
    /// - [`PriceError::InvalidParameter`] when `x` and `y` disagree in length
    ///   or the loss diverges
    pub fn fit<M, P>(&self, mut model: M, x: &Array2<f64>, y: &Array1<f64>) -> Result<M::Output>
    where
        M: TrainableModel<Params = P, Gradients = P>,
        P: WeightedParams,
    {
        let n_total = x.nrows();
        if n_total == 0 {
            return Err(PriceError::EmptyData("training set is empty".to_string()));
        }
        if y.len() != n_total {
            return Err(PriceError::InvalidParameter(format!(
                "{n_total} feature rows but {} targets",
                y.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..n_total).collect();
        let mut previous = f64::INFINITY;

        for epoch in 0..self.max_epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(self.batch_size) {
                let batch_x = x.select(Axis(0), batch);
                let batch_y = y.select(Axis(0), batch);

                let preds = model.forward(batch_x.view());
                // d/dp mean((p - y)²)
                let grad_preds = (&preds - &batch_y) * (2.0 / batch.len() as f64);
                let grads = model.backward(batch_x.view(), &grad_preds);
                let penalty_grad = model.params().with_weights_only().scale(2.0 * self.l2);

                let step = grads.add(&penalty_grad).scale(-self.learning_rate);
                let updated = model.params().add(&step);
                model.update_params(updated);
            }

            let residual = &model.forward(x.view()) - y;
            let weights = model.params().weights();
            let loss = residual.mapv(|r| r * r).sum() / n_total as f64
                + self.l2 * weights.dot(weights);
            if !loss.is_finite() {
                return Err(PriceError::InvalidParameter(format!(
                    "training diverged at epoch {epoch}; lower the learning rate"
                )));
            }
            debug!(epoch, loss, "epoch finished");

            if (previous - loss).abs() < self.tolerance {
                info!(epoch, loss, "training converged");
                break;
            }
            previous = loss;
        }

        Ok(model.into_fitted())
    }
}
