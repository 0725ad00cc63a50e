mod action_space;
mod catcher;

use ndarray::{Array2, Array3};
use thiserror::Error;

pub use action_space::ActionSpace;
pub use catcher::{Catcher, CatcherAction};

/// Observations are channel-first images: `(channels, rows, cols)`.
pub type Observation = Array3<f64>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("environment is not ready to receive actions, call reset first")]
    NotReady,
    #[error("action {action} is outside the action space of size {size}")]
    InvalidAction { action: usize, size: usize },
    #[error("grid size {0} is too small, the catcher needs at least 3 columns")]
    GridTooSmall(usize),
}

pub trait Env {
    fn reset(&mut self) -> Observation;
    fn step(&mut self, action: usize) -> Result<(Observation, f64, bool), EnvError>;
    fn action_space(&self) -> ActionSpace;
    fn observation_shape(&self) -> [usize; 3];
    fn render(&self) -> String;
    /// Current screen as a single 2D intensity grid in `[0, 1]`.
    fn frame(&self) -> Array2<f64>;
}
