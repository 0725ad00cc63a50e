use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::Rng;

use super::{Memory, MemoryError, Transition};

/// Fixed length FIFO of transitions. Once full, the oldest transition is
/// dropped for every new one.
#[derive(Debug, Clone)]
pub struct ExperienceReplay {
    capacity: usize,
    transitions: VecDeque<Transition>,
    rng: StdRng,
}

impl ExperienceReplay {
    pub fn new(memory_length: usize, rng: StdRng) -> Result<Self, MemoryError> {
        if memory_length == 0 {
            return Err(MemoryError::ZeroCapacity);
        }
        Ok(Self {
            capacity: memory_length,
            transitions: VecDeque::with_capacity(memory_length),
            rng,
        })
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }
}

impl Memory for ExperienceReplay {
    fn remember(&mut self, transition: Transition) {
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    fn sample(&mut self, batch_size: usize) -> Vec<&Transition> {
        let len = self.transitions.len();
        if len == 0 {
            return vec![];
        }
        let index: Vec<usize> = (0..batch_size.min(len))
            .map(|_| self.rng.gen_range(0..len))
            .collect();
        index.iter().map(|i| &self.transitions[*i]).collect()
    }

    fn len(&self) -> usize {
        self.transitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::rng_from;
    use ndarray::Array3;
    use rstest::rstest;

    fn transition(tag: f64) -> Transition {
        let state = Array3::from_elem((1, 2, 2), tag);
        Transition::new(state.clone(), 1, tag, state, false)
    }

    fn memory(capacity: usize) -> ExperienceReplay {
        ExperienceReplay::new(capacity, rng_from(Some(5), 0)).unwrap()
    }

    #[test]
    fn zero_length_is_rejected() {
        assert_eq!(
            ExperienceReplay::new(0, rng_from(Some(5), 0)).unwrap_err(),
            MemoryError::ZeroCapacity
        );
    }

    #[test]
    fn oldest_transitions_are_evicted() {
        let mut memory = memory(3);
        for tag in 0..5 {
            memory.remember(transition(tag as f64));
        }
        assert_eq!(memory.len(), 3);
        let rewards: Vec<f64> = memory.iter().map(|t| t.reward).collect();
        assert_eq!(rewards, vec![2.0, 3.0, 4.0]);
    }

    #[rstest]
    #[case(10, 4, 4)]
    #[case(3, 50, 3)]
    #[case(1, 1, 1)]
    #[case(5, 0, 0)]
    fn sample_size_is_capped_by_memory(
        #[case] stored: usize,
        #[case] batch_size: usize,
        #[case] expected: usize,
    ) {
        let mut memory = memory(100);
        for tag in 0..stored {
            memory.remember(transition(tag as f64));
        }
        let batch = memory.sample(batch_size);
        assert_eq!(batch.len(), expected);
        assert!(batch.iter().all(|t| t.reward < stored as f64));
    }

    #[test]
    fn empty_memory_samples_nothing() {
        let mut memory = memory(4);
        assert!(memory.is_empty());
        assert!(memory.sample(8).is_empty());
        memory.remember(transition(1.0));
        assert!(!memory.is_empty());
        assert_eq!(memory.sample(8).len(), 1);
    }
}
