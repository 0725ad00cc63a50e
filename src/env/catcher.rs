use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;

use crate::env::{ActionSpace, Env, EnvError, Observation};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CatcherAction {
    Left,
    Stay,
    Right,
}

impl CatcherAction {
    pub const COUNT: usize = 3;

    fn shift(self) -> isize {
        match self {
            Self::Left => -1,
            Self::Stay => 0,
            Self::Right => 1,
        }
    }
}

impl TryFrom<usize> for CatcherAction {
    type Error = EnvError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Left),
            1 => Ok(Self::Stay),
            2 => Ok(Self::Right),
            action => Err(EnvError::InvalidAction {
                action,
                size: Self::COUNT,
            }),
        }
    }
}

/// A fruit falls one row per step from the top of a square grid while a
/// three cell wide basket slides along the bottom row trying to catch it.
#[derive(Debug, Clone)]
pub struct Catcher {
    grid_size: usize,
    ready: bool,
    fruit_row: usize,
    fruit_col: usize,
    basket: usize,
    rng: StdRng,
}

impl Catcher {
    pub fn new(grid_size: usize, rng: StdRng) -> Result<Self, EnvError> {
        if grid_size < 3 {
            return Err(EnvError::GridTooSmall(grid_size));
        }
        Ok(Self {
            grid_size,
            ready: false,
            fruit_row: 0,
            fruit_col: 0,
            basket: 1,
            rng,
        })
    }

    /// Column of the basket center.
    pub fn basket(&self) -> usize {
        self.basket
    }

    pub fn fruit(&self) -> (usize, usize) {
        (self.fruit_row, self.fruit_col)
    }

    fn caught(&self) -> bool {
        self.fruit_col.abs_diff(self.basket) <= 1
    }

    fn observation(&self) -> Observation {
        self.frame().insert_axis(Axis(0))
    }

    #[cfg(test)]
    pub(crate) fn place(&mut self, fruit_row: usize, fruit_col: usize, basket: usize) {
        self.fruit_row = fruit_row;
        self.fruit_col = fruit_col;
        self.basket = basket;
        self.ready = true;
    }
}

impl Env for Catcher {
    fn reset(&mut self) -> Observation {
        self.fruit_row = 0;
        self.fruit_col = self.rng.gen_range(0..self.grid_size);
        self.basket = self.rng.gen_range(1..self.grid_size - 1);
        self.ready = true;
        self.observation()
    }

    fn step(&mut self, action: usize) -> Result<(Observation, f64, bool), EnvError> {
        if !self.ready {
            return Err(EnvError::NotReady);
        }
        let action = CatcherAction::try_from(action)?;
        let basket = self.basket as isize + action.shift();
        self.basket = basket.clamp(1, self.grid_size as isize - 2) as usize;
        self.fruit_row += 1;

        let terminated = self.fruit_row == self.grid_size - 1;
        let reward = match (terminated, self.caught()) {
            (false, _) => 0.0,
            (true, true) => 1.0,
            (true, false) => -1.0,
        };
        if terminated {
            self.ready = false;
        }
        Ok((self.observation(), reward, terminated))
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::new(CatcherAction::COUNT)
    }

    fn observation_shape(&self) -> [usize; 3] {
        [1, self.grid_size, self.grid_size]
    }

    fn render(&self) -> String {
        let mut screen = String::with_capacity(self.grid_size * (self.grid_size + 1));
        for row in 0..self.grid_size {
            for col in 0..self.grid_size {
                let c = if row == self.fruit_row && col == self.fruit_col {
                    '@'
                } else if row == self.grid_size - 1 && col.abs_diff(self.basket) <= 1 {
                    '='
                } else {
                    '_'
                };
                screen.push(c);
            }
            screen.push('\n');
        }
        screen
    }

    fn frame(&self) -> Array2<f64> {
        let last = self.grid_size - 1;
        let mut canvas = Array2::zeros((self.grid_size, self.grid_size));
        for col in self.basket - 1..=self.basket + 1 {
            canvas[[last, col]] = 1.0;
        }
        canvas[[self.fruit_row, self.fruit_col]] = 1.0;
        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::rng_from;
    use rstest::rstest;

    fn catcher(grid_size: usize) -> Catcher {
        Catcher::new(grid_size, rng_from(Some(3), 0)).unwrap()
    }

    #[test]
    fn rejects_grids_narrower_than_the_basket() {
        assert_eq!(
            Catcher::new(2, rng_from(Some(0), 0)).unwrap_err(),
            EnvError::GridTooSmall(2)
        );
    }

    #[test]
    fn step_before_reset_is_not_ready() {
        let mut env = catcher(5);
        assert_eq!(env.step(1).unwrap_err(), EnvError::NotReady);
    }

    #[test]
    fn reset_places_fruit_on_top_and_basket_inside() {
        let mut env = catcher(11);
        assert_eq!(env.observation_shape(), [1, 11, 11]);
        for _ in 0..50 {
            let obs = env.reset();
            assert_eq!(obs.dim(), (1, 11, 11));
            let (row, col) = env.fruit();
            assert_eq!(row, 0);
            assert!(col < 11);
            assert!((1..=9).contains(&env.basket()));
            assert_eq!(obs[[0, 0, col]], 1.0);
            assert_eq!(obs.sum(), 4.0);
        }
    }

    #[test]
    fn episode_lasts_grid_minus_one_steps() {
        let mut env = catcher(7);
        env.reset();
        let mut steps = 0;
        loop {
            steps += 1;
            let (_, reward, terminated) = env.step(1).unwrap();
            if terminated {
                assert!(reward == 1.0 || reward == -1.0);
                break;
            }
            assert_eq!(reward, 0.0);
        }
        assert_eq!(steps, 6);
        assert_eq!(env.step(1).unwrap_err(), EnvError::NotReady);
    }

    #[rstest]
    #[case(3, 4, 1.0)]
    #[case(4, 4, 1.0)]
    #[case(5, 4, 1.0)]
    #[case(6, 4, -1.0)]
    #[case(0, 4, -1.0)]
    fn reward_depends_on_basket_reach(
        #[case] fruit_col: usize,
        #[case] basket: usize,
        #[case] expected: f64,
    ) {
        let mut env = catcher(7);
        env.place(5, fruit_col, basket);
        let (_, reward, terminated) = env.step(1).unwrap();
        assert!(terminated);
        assert_eq!(reward, expected);
    }

    #[rstest]
    #[case(1, 0, 1)]
    #[case(5, 2, 5)]
    #[case(3, 0, 2)]
    #[case(3, 2, 4)]
    fn basket_is_clamped_inside_the_grid(
        #[case] start: usize,
        #[case] action: usize,
        #[case] expected: usize,
    ) {
        let mut env = catcher(7);
        env.place(0, 0, start);
        env.step(action).unwrap();
        assert_eq!(env.basket(), expected);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let mut env = catcher(5);
        env.reset();
        assert_eq!(
            env.step(3).unwrap_err(),
            EnvError::InvalidAction { action: 3, size: 3 }
        );
        assert!(!env.action_space().contains(3));
        assert!(env.action_space().contains(2));
    }

    #[test]
    fn render_draws_fruit_and_basket() {
        let mut env = catcher(3);
        env.place(0, 2, 1);
        assert_eq!(env.render(), "__@\n___\n===\n");
    }
}
