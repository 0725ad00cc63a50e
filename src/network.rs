use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::{Array2, ArrayD, Ix2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::layers::Layer;
use self::loss::Loss;
use self::optimizer::Sgd;

pub mod activation;
pub mod layers;
pub mod loss;
pub mod optimizer;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("layer {layer} cannot accept input of shape {input:?}: {reason}")]
    InvalidShape {
        layer: String,
        input: Vec<usize>,
        reason: String,
    },
    #[error("expected shape {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("network must be compiled with an optimizer and a loss before training")]
    NotCompiled,
    #[error("unknown loss function '{0}'")]
    UnknownLoss(String),
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    #[error("checkpoint io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint is malformed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Parameters of every layer, in order, as written to disk.
#[derive(Debug, Serialize, Deserialize)]
struct Checkpoint {
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    layers: Vec<Vec<ArrayD<f64>>>,
}

/// Sequential network trained with plain backpropagation.
///
/// Shapes are tracked per sample, without the leading batch axis, so a
/// network built with input shape `[1, 11, 11]` accepts `(batch, 1, 11, 11)`.
pub struct Network {
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    layers: Vec<Box<dyn Layer>>,
    optimizer: Option<Sgd>,
    loss: Option<Loss>,
}

impl Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("input_shape", &self.input_shape)
            .field("output_shape", &self.output_shape)
            .field("layers", &self.layers)
            .field("optimizer", &self.optimizer)
            .field("loss", &self.loss)
            .finish()
    }
}

impl Network {
    pub fn new(input_shape: &[usize]) -> Self {
        Self {
            input_shape: input_shape.to_vec(),
            output_shape: input_shape.to_vec(),
            layers: vec![],
            optimizer: None,
            loss: None,
        }
    }

    // add layer to network
    pub fn add(&mut self, layer: Box<dyn Layer>) -> Result<(), NetworkError> {
        self.output_shape = layer.output_shape(&self.output_shape)?;
        self.layers.push(layer);
        Ok(())
    }

    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    pub fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    pub fn compile(&mut self, optimizer: Sgd, loss: Loss) {
        self.optimizer = Some(optimizer);
        self.loss = Some(loss);
    }

    pub fn is_compiled(&self) -> bool {
        self.optimizer.is_some() && self.loss.is_some()
    }

    fn check_input(&self, input: &ArrayD<f64>) -> Result<(), NetworkError> {
        if input.ndim() == 0 || input.shape()[1..] != self.input_shape[..] {
            let mut expected = vec![input.shape().first().copied().unwrap_or(0)];
            expected.extend_from_slice(&self.input_shape);
            return Err(NetworkError::ShapeMismatch {
                expected,
                found: input.shape().to_vec(),
            });
        }
        Ok(())
    }

    fn forward(&mut self, input: ArrayD<f64>) -> Result<Array2<f64>, NetworkError> {
        self.check_input(&input)?;
        let mut output = input;
        for layer in &mut self.layers {
            output = layer.forward_propagation(output)?;
        }
        let found = output.shape().to_vec();
        output
            .into_dimensionality::<Ix2>()
            .map_err(|_| NetworkError::ShapeMismatch {
                expected: vec![found[0], self.output_shape.iter().product()],
                found,
            })
    }

    // predict output for given input
    pub fn predict(&mut self, input: ArrayD<f64>) -> Result<Array2<f64>, NetworkError> {
        self.forward(input)
    }

    /// One gradient descent step on the batch, returns the loss before the step.
    pub fn fit(
        &mut self,
        x_train: ArrayD<f64>,
        y_train: &Array2<f64>,
    ) -> Result<f64, NetworkError> {
        let (optimizer, loss) = match (self.optimizer, self.loss) {
            (Some(optimizer), Some(loss)) => (optimizer, loss),
            _ => return Err(NetworkError::NotCompiled),
        };
        let output = self.forward(x_train)?;
        if output.dim() != y_train.dim() {
            return Err(NetworkError::ShapeMismatch {
                expected: output.shape().to_vec(),
                found: y_train.shape().to_vec(),
            });
        }

        // backward propagation
        let mut error = loss.derivative(y_train, &output).into_dyn();
        for layer in self.layers.iter_mut().rev() {
            error = layer.backward_propagation(error, optimizer.learning_rate)?;
        }

        Ok(loss.loss(y_train, &output))
    }

    pub fn parameters(&self) -> Vec<Vec<ArrayD<f64>>> {
        self.layers.iter().map(|l| l.parameters()).collect()
    }

    pub fn set_parameters(
        &mut self,
        parameters: Vec<Vec<ArrayD<f64>>>,
    ) -> Result<(), NetworkError> {
        if parameters.len() != self.layers.len() {
            return Err(NetworkError::ShapeMismatch {
                expected: vec![self.layers.len()],
                found: vec![parameters.len()],
            });
        }
        for (layer, params) in self.layers.iter_mut().zip(parameters) {
            layer.set_parameters(params)?;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), NetworkError> {
        let checkpoint = Checkpoint {
            input_shape: self.input_shape.clone(),
            output_shape: self.output_shape.clone(),
            layers: self.parameters(),
        };
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &checkpoint)?;
        Ok(())
    }

    /// Restores parameters written by [`Network::save`] into a network with the same topology.
    pub fn load(&mut self, path: &Path) -> Result<(), NetworkError> {
        let reader = BufReader::new(File::open(path)?);
        let checkpoint: Checkpoint = serde_json::from_reader(reader)?;
        if checkpoint.input_shape != self.input_shape {
            return Err(NetworkError::ShapeMismatch {
                expected: self.input_shape.clone(),
                found: checkpoint.input_shape,
            });
        }
        if checkpoint.output_shape != self.output_shape {
            return Err(NetworkError::ShapeMismatch {
                expected: self.output_shape.clone(),
                found: checkpoint.output_shape,
            });
        }
        self.set_parameters(checkpoint.layers)
    }
}

#[cfg(test)]
mod tests {
    use super::activation::{relu, relu_prime};
    use super::layers::{ActivationLayer, Conv2d, Flatten, MaxPool2d};
    use super::*;
    use crate::utils::rng_from;
    use ndarray::{Array, Array4};
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    fn small_network(seed: u64) -> Network {
        let mut rng = rng_from(Some(seed), 0);
        let mut network = Network::new(&[1, 5, 5]);
        network
            .add(Box::new(Conv2d::new(1, 4, (3, 3), (1, 1), &mut rng)))
            .unwrap();
        network
            .add(Box::new(ActivationLayer::new(relu, relu_prime)))
            .unwrap();
        network
            .add(Box::new(Conv2d::new(4, 2, (3, 3), (1, 1), &mut rng)))
            .unwrap();
        network.add(Box::new(MaxPool2d::new((1, 1)))).unwrap();
        network.add(Box::new(Flatten::new())).unwrap();
        network
    }

    fn batch(seed: u64, n: usize) -> Array4<f64> {
        let mut rng = rng_from(Some(seed), 9);
        Array::random_using((n, 1, 5, 5), Uniform::new(0.0, 1.0), &mut rng)
    }

    #[test]
    fn shapes_are_inferred_per_layer() {
        let network = small_network(1);
        assert_eq!(network.output_shape(), &[2]);
        let mut network = small_network(1);
        let out = network.predict(batch(0, 3).into_dyn()).unwrap();
        assert_eq!(out.dim(), (3, 2));
    }

    #[test]
    fn wrong_input_shape_is_rejected() {
        let mut network = small_network(1);
        let err = network
            .predict(Array4::<f64>::zeros((1, 1, 4, 4)).into_dyn())
            .unwrap_err();
        assert!(matches!(err, NetworkError::ShapeMismatch { .. }));
    }

    #[test]
    fn fit_requires_compile() {
        let mut network = small_network(1);
        let err = network
            .fit(batch(0, 2).into_dyn(), &Array2::zeros((2, 2)))
            .unwrap_err();
        assert!(matches!(err, NetworkError::NotCompiled));
    }

    #[test]
    fn gradient_descent_reduces_loss() {
        let mut network = small_network(4);
        network.compile(Sgd::new(0.05), Loss::Mse);
        let x = batch(2, 8);
        let y = Array2::from_shape_fn((8, 2), |(i, j)| if (i + j) % 2 == 0 { 1.0 } else { -0.5 });
        let first = network.fit(x.clone().into_dyn(), &y).unwrap();
        let mut last = first;
        for _ in 0..200 {
            last = network.fit(x.clone().into_dyn(), &y).unwrap();
        }
        assert!(last < first, "loss went from {first} to {last}");
    }

    #[test]
    fn save_then_load_reproduces_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        let x = batch(5, 2);

        let mut trained = small_network(7);
        let expected = trained.predict(x.clone().into_dyn()).unwrap();
        trained.save(&path).unwrap();

        let mut restored = small_network(8);
        assert_ne!(restored.predict(x.clone().into_dyn()).unwrap(), expected);
        restored.load(&path).unwrap();
        assert_eq!(restored.predict(x.into_dyn()).unwrap(), expected);
    }

    #[test]
    fn load_rejects_other_topology() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        small_network(1).save(&path).unwrap();

        let mut rng = rng_from(Some(1), 0);
        let mut other = Network::new(&[1, 5, 5]);
        other
            .add(Box::new(Conv2d::new(1, 2, (5, 5), (1, 1), &mut rng)))
            .unwrap();
        other.add(Box::new(Flatten::new())).unwrap();
        assert!(matches!(
            other.load(&path).unwrap_err(),
            NetworkError::ShapeMismatch { .. }
        ));
    }
}
