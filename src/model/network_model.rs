use std::path::Path;

use ndarray::{Array2, Array4};

use super::Model;
use crate::network::loss::Loss;
use crate::network::optimizer::Sgd;
use crate::network::{Network, NetworkError};

#[derive(Debug)]
pub struct NetworkModel {
    network: Network,
    num_actions: usize,
}

impl NetworkModel {
    /// The network must end in a flat `(actions,)` output.
    pub fn new(network: Network) -> Result<Self, NetworkError> {
        let num_actions = match *network.output_shape() {
            [actions] if actions > 0 => actions,
            _ => {
                return Err(NetworkError::InvalidShape {
                    layer: "output".to_string(),
                    input: network.output_shape().to_vec(),
                    reason: "a Q-value model needs a flat, non-empty output".to_string(),
                })
            }
        };
        Ok(Self {
            network,
            num_actions,
        })
    }
}

impl Model for NetworkModel {
    fn compile(&mut self, optimizer: Sgd, loss: Loss) {
        log::debug!("compiling model with {:?} and {} loss", optimizer, loss);
        self.network.compile(optimizer, loss);
    }

    fn is_compiled(&self) -> bool {
        self.network.is_compiled()
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn predict(&mut self, inputs: &Array4<f64>) -> Result<Array2<f64>, NetworkError> {
        self.network.predict(inputs.clone().into_dyn())
    }

    fn train_on_batch(
        &mut self,
        inputs: Array4<f64>,
        targets: &Array2<f64>,
    ) -> Result<f64, NetworkError> {
        self.network.fit(inputs.into_dyn(), targets)
    }

    fn save(&self, path: &Path) -> Result<(), NetworkError> {
        self.network.save(path)
    }
}
