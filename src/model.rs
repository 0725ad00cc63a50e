mod network_model;

pub use network_model::NetworkModel;

use std::path::Path;

use ndarray::{Array2, Array4};

use crate::network::loss::Loss;
use crate::network::optimizer::Sgd;
use crate::network::NetworkError;

/// Action-value function approximator used by the agent.
///
/// Inputs are batches of observations `(batch, channels, rows, cols)`,
/// outputs are `(batch, actions)` Q-values.
pub trait Model {
    fn compile(&mut self, optimizer: Sgd, loss: Loss);
    fn is_compiled(&self) -> bool;
    fn num_actions(&self) -> usize;
    fn predict(&mut self, inputs: &Array4<f64>) -> Result<Array2<f64>, NetworkError>;
    fn train_on_batch(
        &mut self,
        inputs: Array4<f64>,
        targets: &Array2<f64>,
    ) -> Result<f64, NetworkError>;
    fn save(&self, path: &Path) -> Result<(), NetworkError>;
}
