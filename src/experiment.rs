mod visualize;

pub use visualize::{save_gif, Visualize};

use kdam::{tqdm, BarExt};
use ndarray::Array2;
use thiserror::Error;

use crate::action_selection::{EnumActionSelection, EpsilonGreedy, Greedy};
use crate::agent::Agent;
use crate::env::{Env, EnvError};
use crate::memory::{Memory, Transition};
use crate::model::Model;
use crate::network::loss::Loss;
use crate::network::optimizer::Sgd;
use crate::network::NetworkError;
use crate::utils::{moving_average, rng_from};

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("experiment must be built with an optimizer and a loss before training")]
    NotBuilt,
    #[error("environment has {env} actions but the model predicts {model}")]
    ActionMismatch { env: usize, model: usize },
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("failed to render animation: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainReport {
    /// Sum of the batch losses of every step, per epoch.
    pub losses: Vec<f64>,
    pub rewards: Vec<f64>,
    pub lengths: Vec<u128>,
    pub wins: usize,
    pub updates: usize,
}

impl TrainReport {
    pub fn win_rate(&self) -> f64 {
        if self.rewards.is_empty() {
            return 0.0;
        }
        self.wins as f64 / self.rewards.len() as f64
    }

    pub fn moving_average_reward(&self, window: usize) -> Vec<f64> {
        moving_average(window, &self.rewards)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestReport {
    pub rewards: Vec<f64>,
    pub wins: usize,
    pub frames: usize,
}

/// Deep Q-learning over an environment with a single agent.
pub struct QLearning<E: Env, M: Model, R: Memory> {
    env: E,
    agent: Agent<M, R>,
    seed: Option<u64>,
    built: bool,
}

impl<E: Env, M: Model, R: Memory> QLearning<E, M, R> {
    pub fn new(env: E, agent: Agent<M, R>) -> Result<Self, ExperimentError> {
        let actions = env.action_space().size;
        if actions != agent.model().num_actions() {
            return Err(ExperimentError::ActionMismatch {
                env: actions,
                model: agent.model().num_actions(),
            });
        }
        Ok(Self {
            env,
            agent,
            seed: None,
            built: false,
        })
    }

    /// Seeds the exploration of every later `train` call.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn agent(&self) -> &Agent<M, R> {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut Agent<M, R> {
        &mut self.agent
    }

    pub fn build(&mut self, optimizer: Sgd, loss: Loss) {
        self.agent.model_mut().compile(optimizer, loss);
        self.built = true;
    }

    pub fn is_built(&self) -> bool {
        self.built && self.agent.model().is_compiled()
    }

    /// Runs `epoch` episodes of epsilon-greedy play, learning from a replay
    /// batch after every step.
    ///
    /// `verbose` 0 is silent, 1 shows a progress bar and 2 also logs every epoch.
    pub fn train(
        &mut self,
        epoch: usize,
        batch_size: usize,
        epsilon: f64,
        gamma: f64,
        verbose: u8,
    ) -> Result<TrainReport, ExperimentError> {
        if !self.is_built() {
            return Err(ExperimentError::NotBuilt);
        }
        let mut report = TrainReport::default();
        let exploration = EpsilonGreedy::new(epsilon, rng_from(self.seed, 3));
        let mut action_selection = EnumActionSelection::from(exploration);

        let mut pb = if verbose >= 1 {
            let mut pb = tqdm!(total = epoch);
            pb.set_description("train".to_string());
            Some(pb)
        } else {
            None
        };

        for e in 0..epoch {
            let mut loss = 0.0;
            let mut action_counter: u128 = 0;
            let mut epi_reward = 0.0;
            let mut curr_obs = self.env.reset();
            loop {
                action_counter += 1;
                let action = self.agent.act(&curr_obs, &mut action_selection)?;
                let (next_obs, reward, terminated) = self.env.step(action)?;
                epi_reward += reward;
                self.agent.remember(Transition::new(
                    curr_obs,
                    action,
                    reward,
                    next_obs.clone(),
                    terminated,
                ));
                if let Some(batch_loss) = self.agent.learn(batch_size, gamma)? {
                    loss += batch_loss;
                    report.updates += 1;
                }
                curr_obs = next_obs;
                if terminated {
                    break;
                }
            }
            if epi_reward > 0.0 {
                report.wins += 1;
            }
            report.losses.push(loss);
            report.rewards.push(epi_reward);
            report.lengths.push(action_counter);

            let line = format!(
                "Epoch {:03}/{} | Loss {:.4} | Win count {}",
                e + 1,
                epoch,
                loss,
                report.wins
            );
            if verbose >= 2 {
                log::info!("{}", line);
            } else {
                log::debug!("{}", line);
            }
            if let Some(pb) = pb.as_mut() {
                pb.set_postfix(format!("loss={:.4}, wins={}", loss, report.wins));
                pb.update(1);
            }
        }
        if let Some(pb) = pb.as_mut() {
            pb.refresh();
        }
        Ok(report)
    }

    /// Plays `epoch` greedy episodes without learning. When `visualize` is
    /// given, the first `n_frames` screens are written as one gif, which holds
    /// at least the current screen.
    pub fn test(
        &mut self,
        epoch: usize,
        visualize: Option<&Visualize>,
    ) -> Result<TestReport, ExperimentError> {
        let mut report = TestReport::default();
        let mut action_selection = EnumActionSelection::from(Greedy);
        let frame_budget = visualize.map_or(0, |v| v.n_frames);
        let mut frames: Vec<Array2<f64>> = Vec::with_capacity(frame_budget);

        for e in 0..epoch {
            let mut epi_reward = 0.0;
            let mut curr_obs = self.env.reset();
            if frames.len() < frame_budget {
                frames.push(self.env.frame());
            }
            loop {
                let action = self.agent.act(&curr_obs, &mut action_selection)?;
                let (next_obs, reward, terminated) = self.env.step(action)?;
                epi_reward += reward;
                if frames.len() < frame_budget {
                    frames.push(self.env.frame());
                }
                curr_obs = next_obs;
                if terminated {
                    break;
                }
            }
            if epi_reward > 0.0 {
                report.wins += 1;
            }
            log::debug!(
                "test episode {} reward {}\n{}",
                e + 1,
                epi_reward,
                self.env.render()
            );
            report.rewards.push(epi_reward);
        }

        if let Some(visualize) = visualize {
            if frames.is_empty() {
                frames.push(self.env.frame());
            }
            save_gif(&frames, visualize)?;
            report.frames = frames.len();
            log::info!(
                "saved {} frames to {}",
                report.frames,
                visualize.filepath.display()
            );
        }
        Ok(report)
    }
}
