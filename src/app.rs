use anyhow::Context;
use rand::Rng;

use crate::agent::Agent;
use crate::config::Config;
use crate::env::{Catcher, CatcherAction};
use crate::experiment::{QLearning, TestReport, TrainReport, Visualize};
use crate::memory::ExperienceReplay;
use crate::model::{Model, NetworkModel};
use crate::network::activation::{relu, relu_prime};
use crate::network::layers::{ActivationLayer, Conv2d, Flatten, MaxPool2d};
use crate::network::optimizer::Sgd;
use crate::network::{Network, NetworkError};
use crate::utils::rng_from;

/// Q-value network for a `grid_size` catcher screen.
///
/// Three convolutions shrink the screen to one score map per action, which
/// is then max-pooled over its whole extent and flattened.
pub fn build_catcher_network<R: Rng + ?Sized>(
    grid_size: usize,
    rng: &mut R,
) -> Result<Network, NetworkError> {
    let mut network = Network::new(&[1, grid_size, grid_size]);
    network.add(Box::new(Conv2d::new(1, 32, (3, 3), (2, 2), rng)))?;
    network.add(Box::new(ActivationLayer::new(relu, relu_prime)))?;
    network.add(Box::new(Conv2d::new(32, 32, (3, 3), (1, 1), rng)))?;
    network.add(Box::new(ActivationLayer::new(relu, relu_prime)))?;
    network.add(Box::new(Conv2d::new(
        32,
        CatcherAction::COUNT,
        (3, 3),
        (1, 1),
        rng,
    )))?;
    let pool = (network.output_shape()[1], network.output_shape()[2]);
    network.add(Box::new(MaxPool2d::new(pool)))?;
    network.add(Box::new(Flatten::new()))?;
    Ok(network)
}

/// Trains an agent on the catcher game, saves it and records a greedy test run.
pub fn run(config: &Config) -> anyhow::Result<(TrainReport, TestReport)> {
    let env = Catcher::new(config.grid, rng_from(config.seed, 0))
        .context("failed to create the catcher game")?;
    let network = build_catcher_network(config.grid, &mut rng_from(config.seed, 1))
        .with_context(|| format!("grid of {} is too small for the network", config.grid))?;
    log::debug!("network: {:?}", network);
    let model = NetworkModel::new(network)?;
    let memory = ExperienceReplay::new(config.memory, rng_from(config.seed, 2))
        .context("invalid memory length")?;

    let mut qlearning =
        QLearning::new(env, Agent::new(model, memory))?.with_seed(config.seed);
    qlearning.build(Sgd::new(config.lr), config.loss);

    log::info!(
        "training for {} epochs on a {}x{} grid",
        config.epoch,
        config.grid,
        config.grid
    );
    let train = qlearning
        .train(
            config.epoch,
            config.batch,
            config.epsilon,
            config.gamma,
            config.verbose,
        )
        .context("training failed")?;
    log::info!(
        "training done: {} wins out of {} epochs ({:.1}%)",
        train.wins,
        train.rewards.len(),
        train.win_rate() * 100.0
    );
    let window = (config.epoch / 10).max(1);
    if let Some(last) = train.moving_average_reward(window).last() {
        log::info!("final {}-epoch average reward {:.3}", window, last);
    }

    qlearning
        .agent()
        .model()
        .save(&config.save)
        .with_context(|| format!("failed to save the model to {}", config.save.display()))?;
    log::info!("model saved to {}", config.save.display());

    let visualize = Visualize::new(&config.output, config.frames, !config.color);
    let test = qlearning
        .test(config.test_epoch, Some(&visualize))
        .context("test run failed")?;
    log::info!("test: {} wins out of {} games", test.wins, test.rewards.len());
    Ok((train, test))
}
