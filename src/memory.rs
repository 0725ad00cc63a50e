mod experience_replay;

pub use experience_replay::ExperienceReplay;

use thiserror::Error;

use crate::env::Observation;

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Observation,
    pub action: usize,
    pub reward: f64,
    pub next_state: Observation,
    pub terminal: bool,
}

impl Transition {
    pub fn new(
        state: Observation,
        action: usize,
        reward: f64,
        next_state: Observation,
        terminal: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            terminal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("replay memory length must be at least 1")]
    ZeroCapacity,
}

pub trait Memory {
    fn remember(&mut self, transition: Transition);
    /// Draws up to `batch_size` transitions uniformly, with replacement.
    fn sample(&mut self, batch_size: usize) -> Vec<&Transition>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
