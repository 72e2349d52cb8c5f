/// Marker: the regressor has **not been trained yet**.
///
/// `LinearModel<Unfitted>` only exposes the training interface
/// ([`crate::model::TrainableModel`]); it cannot predict prices.
#[derive(Clone, Copy, Debug)]
pub struct Unfitted;

/// Marker: the regressor has been **fully trained**.
///
/// `LinearModel<Fitted>` implements [`crate::model::InferenceModel`] and can be
/// converted to its serializable parameters. It holds no optimizer state and
/// no training hyper-parameters.
#[derive(Clone, Copy, Debug)]
pub struct Fitted;
