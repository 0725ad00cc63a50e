use crate::utils::argmax;

use super::ActionSelection;

/// Always exploits, used when evaluating a trained agent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Greedy;

impl ActionSelection for Greedy {
    fn get_action(&mut self, values: &[f64]) -> usize {
        argmax(values)
    }
}
