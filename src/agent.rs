use ndarray::{Array2, Array4, Axis};

use crate::action_selection::{ActionSelection, EnumActionSelection};
use crate::env::Observation;
use crate::memory::{Memory, Transition};
use crate::model::Model;
use crate::network::NetworkError;
use crate::utils::max;

/// Couples a Q-value model with a replay memory.
#[derive(Debug)]
pub struct Agent<M: Model, R: Memory> {
    model: M,
    memory: R,
}

fn stack(states: &[&Observation]) -> Result<Array4<f64>, NetworkError> {
    let views: Vec<_> = states.iter().map(|s| s.view()).collect();
    Ok(ndarray::stack(Axis(0), &views)?)
}

impl<M: Model, R: Memory> Agent<M, R> {
    pub fn new(model: M, memory: R) -> Self {
        Self { model, memory }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn memory(&self) -> &R {
        &self.memory
    }

    pub fn q_values(&mut self, state: &Observation) -> Result<Vec<f64>, NetworkError> {
        let input = stack(&[state])?;
        Ok(self.model.predict(&input)?.row(0).to_vec())
    }

    pub fn act(
        &mut self,
        state: &Observation,
        action_selection: &mut EnumActionSelection,
    ) -> Result<usize, NetworkError> {
        let values = self.q_values(state)?;
        Ok(action_selection.get_action(&values))
    }

    pub fn remember(&mut self, transition: Transition) {
        self.memory.remember(transition);
    }

    /// Trains on a random batch of remembered transitions.
    ///
    /// The target of every sample is the model's own prediction, except for
    /// the action taken, which becomes `reward` on terminal transitions and
    /// `reward + gamma * max Q(next_state)` otherwise. Returns `None` while
    /// the memory is empty.
    pub fn learn(
        &mut self,
        batch_size: usize,
        gamma: f64,
    ) -> Result<Option<f64>, NetworkError> {
        let batch = self.memory.sample(batch_size);
        if batch.is_empty() {
            return Ok(None);
        }
        let states: Vec<&Observation> = batch.iter().map(|t| &t.state).collect();
        let next_states: Vec<&Observation> = batch.iter().map(|t| &t.next_state).collect();
        let inputs = stack(&states)?;
        let next_inputs = stack(&next_states)?;
        let actions: Vec<(usize, f64, bool)> = batch
            .iter()
            .map(|t| (t.action, t.reward, t.terminal))
            .collect();

        let mut targets: Array2<f64> = self.model.predict(&inputs)?;
        let next_q_values = self.model.predict(&next_inputs)?;
        for (i, (action, reward, terminal)) in actions.into_iter().enumerate() {
            targets[[i, action]] = if terminal {
                reward
            } else {
                let future_q_value = max(&next_q_values.row(i).to_vec());
                reward + gamma * future_q_value
            };
        }
        let loss = self.model.train_on_batch(inputs, &targets)?;
        Ok(Some(loss))
    }
}
