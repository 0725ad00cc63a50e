use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::Rng;

use crate::utils::argmax;

use super::ActionSelection;

#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    exploration_decider: Uniform<f64>,
    pub epsilon: f64,
    rng: StdRng,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64, rng: StdRng) -> Self {
        Self {
            exploration_decider: Uniform::from(0.0..1.0),
            epsilon: epsilon.clamp(0.0, 1.0),
            rng,
        }
    }

    fn should_explore(&mut self) -> bool {
        self.epsilon != 0.0 && self.exploration_decider.sample(&mut self.rng) < self.epsilon
    }
}

impl ActionSelection for EpsilonGreedy {
    fn get_action(&mut self, values: &[f64]) -> usize {
        if self.should_explore() && !values.is_empty() {
            self.rng.gen_range(0..values.len())
        } else {
            argmax(values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_selection::{EnumActionSelection, Greedy};
    use crate::utils::rng_from;

    #[test]
    fn zero_epsilon_always_exploits() {
        let mut selection =
            EnumActionSelection::from(EpsilonGreedy::new(0.0, rng_from(Some(1), 0)));
        for _ in 0..100 {
            assert_eq!(selection.get_action(&[0.1, 0.7, 0.2]), 1);
        }
    }

    #[test]
    fn full_epsilon_explores_every_action() {
        let mut selection = EpsilonGreedy::new(1.0, rng_from(Some(1), 0));
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[selection.get_action(&[0.1, 0.7, 0.2])] = true;
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn partial_epsilon_mostly_exploits() {
        let mut selection = EpsilonGreedy::new(0.3, rng_from(Some(1), 0));
        let greedy = (0..3000)
            .filter(|_| selection.get_action(&[0.0, 2.0, 1.0]) == 1)
            .count();
        // expected 0.7 + 0.3 / 3 = 0.8 of the draws
        assert!((2200..2600).contains(&greedy), "{greedy} greedy picks");
        assert_eq!(Greedy.get_action(&[0.0, 2.0, 1.0]), 1);
    }
}
