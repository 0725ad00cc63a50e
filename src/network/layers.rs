use std::fmt::Debug;

use ndarray::{s, Array1, Array2, Array4, ArrayD, ArrayView3, ArrayViewMut3, Axis, Ix4, IxDyn};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

use super::NetworkError;

pub trait Layer: Debug {
    /// Per-sample output shape for a per-sample input shape.
    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NetworkError>;
    // computes the output Y of a layer for a given input X
    fn forward_propagation(&mut self, input: ArrayD<f64>) -> Result<ArrayD<f64>, NetworkError>;
    // computes dE/dX for a given dE/dY (and update parameters if any)
    fn backward_propagation(
        &mut self,
        output_error: ArrayD<f64>,
        learning_rate: f64,
    ) -> Result<ArrayD<f64>, NetworkError>;

    fn parameters(&self) -> Vec<ArrayD<f64>> {
        vec![]
    }

    fn set_parameters(&mut self, parameters: Vec<ArrayD<f64>>) -> Result<(), NetworkError> {
        if !parameters.is_empty() {
            return Err(NetworkError::ShapeMismatch {
                expected: vec![0],
                found: vec![parameters.len()],
            });
        }
        Ok(())
    }
}

fn to_4d(input: ArrayD<f64>) -> Result<Array4<f64>, NetworkError> {
    let found = input.shape().to_vec();
    input
        .into_dimensionality::<Ix4>()
        .map_err(|_| NetworkError::ShapeMismatch {
            expected: vec![found.first().copied().unwrap_or(0), 0, 0, 0],
            found,
        })
}

fn spatial_input(
    layer: &str,
    input_shape: &[usize],
) -> Result<(usize, usize, usize), NetworkError> {
    match *input_shape {
        [c, h, w] => Ok((c, h, w)),
        _ => Err(NetworkError::InvalidShape {
            layer: layer.to_string(),
            input: input_shape.to_vec(),
            reason: "expected (channels, rows, cols)".to_string(),
        }),
    }
}

/// 2D convolution with valid padding over channel-first images.
///
/// Each sample is unrolled into a column matrix so the convolution becomes a
/// single matrix product with the `(filters, channels * kh * kw)` kernel.
#[derive(Debug, Clone)]
pub struct Conv2d {
    in_channels: usize,
    filters: usize,
    kernel: (usize, usize),
    stride: (usize, usize),
    weights: Array2<f64>,
    bias: Array1<f64>,
    input_dim: (usize, usize, usize, usize),
    output_dim: (usize, usize),
    cols: Vec<Array2<f64>>,
}

impl Conv2d {
    /// Weights follow the Glorot uniform initialization, biases start at zero.
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        filters: usize,
        kernel: (usize, usize),
        stride: (usize, usize),
        rng: &mut R,
    ) -> Self {
        let receptive = kernel.0 * kernel.1;
        let limit = (6.0 / ((in_channels + filters) * receptive).max(1) as f64).sqrt();
        let weights = Array2::random_using(
            (filters, in_channels * receptive),
            Uniform::new_inclusive(-limit, limit),
            rng,
        );
        Self {
            in_channels,
            filters,
            kernel,
            stride: (stride.0.max(1), stride.1.max(1)),
            weights,
            bias: Array1::zeros(filters),
            input_dim: (0, 0, 0, 0),
            output_dim: (0, 0),
            cols: vec![],
        }
    }

    fn spatial_output(&self, h: usize, w: usize) -> (usize, usize) {
        (
            (h - self.kernel.0) / self.stride.0 + 1,
            (w - self.kernel.1) / self.stride.1 + 1,
        )
    }

    fn im2col(&self, sample: ArrayView3<f64>, oh: usize, ow: usize) -> Array2<f64> {
        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;
        let mut cols = Array2::zeros((self.in_channels * kh * kw, oh * ow));
        for ch in 0..self.in_channels {
            for ki in 0..kh {
                for kj in 0..kw {
                    let row = (ch * kh + ki) * kw + kj;
                    for oi in 0..oh {
                        for oj in 0..ow {
                            cols[[row, oi * ow + oj]] = sample[[ch, oi * sh + ki, oj * sw + kj]];
                        }
                    }
                }
            }
        }
        cols
    }

    fn col2im(&self, cols: &Array2<f64>, mut target: ArrayViewMut3<f64>) {
        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;
        let (oh, ow) = self.output_dim;
        for ch in 0..self.in_channels {
            for ki in 0..kh {
                for kj in 0..kw {
                    let row = (ch * kh + ki) * kw + kj;
                    for oi in 0..oh {
                        for oj in 0..ow {
                            target[[ch, oi * sh + ki, oj * sw + kj]] += cols[[row, oi * ow + oj]];
                        }
                    }
                }
            }
        }
    }
}

impl Layer for Conv2d {
    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NetworkError> {
        let (c, h, w) = spatial_input("Conv2d", input_shape)?;
        if c != self.in_channels {
            return Err(NetworkError::InvalidShape {
                layer: "Conv2d".to_string(),
                input: input_shape.to_vec(),
                reason: format!("expected {} input channels", self.in_channels),
            });
        }
        if h < self.kernel.0 || w < self.kernel.1 {
            return Err(NetworkError::InvalidShape {
                layer: "Conv2d".to_string(),
                input: input_shape.to_vec(),
                reason: format!("kernel {:?} does not fit", self.kernel),
            });
        }
        let (oh, ow) = self.spatial_output(h, w);
        Ok(vec![self.filters, oh, ow])
    }

    fn forward_propagation(&mut self, input: ArrayD<f64>) -> Result<ArrayD<f64>, NetworkError> {
        let input = to_4d(input)?;
        let (n, c, h, w) = input.dim();
        let shape = self.output_shape(&[c, h, w])?;
        let (oh, ow) = (shape[1], shape[2]);
        self.input_dim = (n, c, h, w);
        self.output_dim = (oh, ow);
        self.cols.clear();

        let bias = self.bias.view().insert_axis(Axis(1));
        let mut output = Array4::zeros((n, self.filters, oh, ow));
        for (i, sample) in input.outer_iter().enumerate() {
            let cols = self.im2col(sample, oh, ow);
            let out = self.weights.dot(&cols) + &bias;
            output
                .index_axis_mut(Axis(0), i)
                .assign(&out.into_shape((self.filters, oh, ow))?);
            self.cols.push(cols);
        }
        Ok(output.into_dyn())
    }

    fn backward_propagation(
        &mut self,
        output_error: ArrayD<f64>,
        learning_rate: f64,
    ) -> Result<ArrayD<f64>, NetworkError> {
        let output_error = to_4d(output_error)?;
        let (n, c, h, w) = self.input_dim;
        let (oh, ow) = self.output_dim;
        if output_error.dim() != (n, self.filters, oh, ow) || self.cols.len() != n {
            return Err(NetworkError::ShapeMismatch {
                expected: vec![n, self.filters, oh, ow],
                found: output_error.shape().to_vec(),
            });
        }

        let mut weights_error = Array2::zeros(self.weights.raw_dim());
        let mut bias_error = Array1::zeros(self.filters);
        let mut input_error = Array4::zeros((n, c, h, w));
        for (i, cols) in self.cols.iter().enumerate() {
            let delta = output_error
                .index_axis(Axis(0), i)
                .to_owned()
                .into_shape((self.filters, oh * ow))?;
            weights_error += &delta.dot(&cols.t());
            bias_error += &delta.sum_axis(Axis(1));
            let cols_error = self.weights.t().dot(&delta);
            self.col2im(&cols_error, input_error.index_axis_mut(Axis(0), i));
        }
        self.weights.scaled_add(-learning_rate, &weights_error);
        self.bias.scaled_add(-learning_rate, &bias_error);
        Ok(input_error.into_dyn())
    }

    fn parameters(&self) -> Vec<ArrayD<f64>> {
        vec![self.weights.clone().into_dyn(), self.bias.clone().into_dyn()]
    }

    fn set_parameters(&mut self, parameters: Vec<ArrayD<f64>>) -> Result<(), NetworkError> {
        let [weights, bias]: [ArrayD<f64>; 2] =
            parameters
                .try_into()
                .map_err(|p: Vec<ArrayD<f64>>| NetworkError::ShapeMismatch {
                    expected: vec![2],
                    found: vec![p.len()],
                })?;
        if weights.shape() != self.weights.shape() {
            return Err(NetworkError::ShapeMismatch {
                expected: self.weights.shape().to_vec(),
                found: weights.shape().to_vec(),
            });
        }
        if bias.shape() != self.bias.shape() {
            return Err(NetworkError::ShapeMismatch {
                expected: self.bias.shape().to_vec(),
                found: bias.shape().to_vec(),
            });
        }
        self.weights = weights.into_dimensionality()?;
        self.bias = bias.into_dimensionality()?;
        Ok(())
    }
}

/// Max pooling with stride equal to the pool size. Trailing rows and columns
/// that do not fill a whole window are dropped.
#[derive(Debug, Clone)]
pub struct MaxPool2d {
    pool: (usize, usize),
    input_dim: (usize, usize, usize, usize),
    switches: Array4<(usize, usize)>,
}

impl MaxPool2d {
    pub fn new(pool: (usize, usize)) -> Self {
        Self {
            pool: (pool.0.max(1), pool.1.max(1)),
            input_dim: (0, 0, 0, 0),
            switches: Array4::from_elem((0, 0, 0, 0), (0, 0)),
        }
    }
}

impl Layer for MaxPool2d {
    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NetworkError> {
        let (c, h, w) = spatial_input("MaxPool2d", input_shape)?;
        if h < self.pool.0 || w < self.pool.1 {
            return Err(NetworkError::InvalidShape {
                layer: "MaxPool2d".to_string(),
                input: input_shape.to_vec(),
                reason: format!("pool {:?} does not fit", self.pool),
            });
        }
        Ok(vec![c, h / self.pool.0, w / self.pool.1])
    }

    fn forward_propagation(&mut self, input: ArrayD<f64>) -> Result<ArrayD<f64>, NetworkError> {
        let input = to_4d(input)?;
        let (n, c, h, w) = input.dim();
        let shape = self.output_shape(&[c, h, w])?;
        let (oh, ow) = (shape[1], shape[2]);
        let (ph, pw) = self.pool;
        self.input_dim = (n, c, h, w);

        let mut output = Array4::zeros((n, c, oh, ow));
        self.switches = Array4::from_elem((n, c, oh, ow), (0, 0));
        for ((b, ch, oi, oj), out) in output.indexed_iter_mut() {
            let window = input.slice(s![b, ch, oi * ph..(oi + 1) * ph, oj * pw..(oj + 1) * pw]);
            let mut best = (oi * ph, oj * pw);
            let mut value = f64::NEG_INFINITY;
            for ((i, j), v) in window.indexed_iter() {
                if *v > value {
                    value = *v;
                    best = (oi * ph + i, oj * pw + j);
                }
            }
            *out = value;
            self.switches[[b, ch, oi, oj]] = best;
        }
        Ok(output.into_dyn())
    }

    fn backward_propagation(
        &mut self,
        output_error: ArrayD<f64>,
        _learning_rate: f64,
    ) -> Result<ArrayD<f64>, NetworkError> {
        let output_error = to_4d(output_error)?;
        if output_error.shape() != self.switches.shape() {
            return Err(NetworkError::ShapeMismatch {
                expected: self.switches.shape().to_vec(),
                found: output_error.shape().to_vec(),
            });
        }
        let mut input_error = Array4::zeros(self.input_dim);
        for ((b, ch, oi, oj), err) in output_error.indexed_iter() {
            let (i, j) = self.switches[[b, ch, oi, oj]];
            input_error[[b, ch, i, j]] += *err;
        }
        Ok(input_error.into_dyn())
    }
}

/// Collapses every axis after the batch axis into one.
#[derive(Debug, Clone, Default)]
pub struct Flatten {
    input_shape: Vec<usize>,
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Layer for Flatten {
    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NetworkError> {
        Ok(vec![input_shape.iter().product()])
    }

    fn forward_propagation(&mut self, input: ArrayD<f64>) -> Result<ArrayD<f64>, NetworkError> {
        self.input_shape = input.shape().to_vec();
        let n = self.input_shape.first().copied().unwrap_or(0);
        let rest: usize = self.input_shape.iter().skip(1).product();
        let input = input.as_standard_layout().into_owned();
        Ok(input.into_shape(IxDyn(&[n, rest]))?)
    }

    fn backward_propagation(
        &mut self,
        output_error: ArrayD<f64>,
        _learning_rate: f64,
    ) -> Result<ArrayD<f64>, NetworkError> {
        let output_error = output_error.as_standard_layout().into_owned();
        Ok(output_error.into_shape(IxDyn(&self.input_shape))?)
    }
}

pub type ActivationFn = fn(&ArrayD<f64>) -> ArrayD<f64>;

#[derive(Debug, Clone)]
pub struct ActivationLayer {
    input: ArrayD<f64>,
    activation: ActivationFn,
    activation_prime: ActivationFn,
}

impl ActivationLayer {
    pub fn new(activation: ActivationFn, activation_prime: ActivationFn) -> Self {
        let input = ArrayD::zeros(IxDyn(&[0]));
        Self {
            input,
            activation,
            activation_prime,
        }
    }
}

impl Layer for ActivationLayer {
    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, NetworkError> {
        Ok(input_shape.to_vec())
    }

    fn forward_propagation(&mut self, input: ArrayD<f64>) -> Result<ArrayD<f64>, NetworkError> {
        self.input = input;
        Ok((self.activation)(&self.input))
    }

    fn backward_propagation(
        &mut self,
        output_error: ArrayD<f64>,
        _learning_rate: f64,
    ) -> Result<ArrayD<f64>, NetworkError> {
        if output_error.shape() != self.input.shape() {
            return Err(NetworkError::ShapeMismatch {
                expected: self.input.shape().to_vec(),
                found: output_error.shape().to_vec(),
            });
        }
        Ok((self.activation_prime)(&self.input) * output_error)
    }
}
