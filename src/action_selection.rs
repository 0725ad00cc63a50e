mod epsilon_greedy;
mod greedy;

use enum_dispatch::enum_dispatch;
pub use epsilon_greedy::EpsilonGreedy;
pub use greedy::Greedy;

#[enum_dispatch]
pub trait ActionSelection {
    fn get_action(&mut self, values: &[f64]) -> usize;
}

#[derive(Debug, Clone)]
#[enum_dispatch(ActionSelection)]
pub enum EnumActionSelection {
    EpsilonGreedy(EpsilonGreedy),
    Greedy(Greedy),
}
