//! Greedy evaluation of trained weights
//!
//! Loads a checkpoint into an inference network and plays a number of
//! episodes, always taking the most likely action.

use anyhow::{Result, anyhow};
use burn::tensor::{Tensor, backend::Backend};
use std::path::Path;

use crate::game::{Direction, GameConfig};
use crate::rl::{
    ActorCriticConfig, ActorCriticNetwork, Environment, SnakeEnvironment,
    persistence::load_weights,
};

/// Rewards of a finished evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayReport {
    pub rewards: Vec<f32>,
    pub steps: Vec<usize>,
}

impl PlayReport {
    pub fn average_reward(&self) -> f32 {
        if self.rewards.is_empty() {
            return 0.0;
        }
        self.rewards.iter().sum::<f32>() / self.rewards.len() as f32
    }
}

pub struct PlayMode<B: Backend> {
    network: ActorCriticNetwork<B>,
    env: SnakeEnvironment<B>,
    episodes: usize,
}

impl<B: Backend> PlayMode<B> {
    /// Build the network for `config` and load `weights_path` into it
    pub fn new(
        config: GameConfig,
        weights_path: &Path,
        episodes: usize,
        seed: Option<u64>,
        device: B::Device,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("invalid game configuration: {}", e))?;

        let network_config = ActorCriticConfig::new(config.frame_height(), config.frame_width());
        let network = network_config
            .try_init::<B>(&device)
            .map_err(|e| anyhow!("cannot build network: {}", e))?;
        let network = load_weights(network, &network_config, weights_path, &device)?;

        Ok(Self::with_network(network, config, episodes, seed, device))
    }

    pub fn with_network(
        network: ActorCriticNetwork<B>,
        config: GameConfig,
        episodes: usize,
        seed: Option<u64>,
        device: B::Device,
    ) -> Self {
        let env = match seed {
            Some(seed) => SnakeEnvironment::with_seed(config, seed, device),
            None => SnakeEnvironment::new(config, device),
        };

        Self {
            network,
            env,
            episodes,
        }
    }

    /// Play every episode and log the results
    pub fn run(&mut self) -> Result<PlayReport> {
        let mut report = PlayReport::default();

        for episode in 1..=self.episodes {
            let (reward, steps) = self.play_episode()?;
            tracing::info!(episode, reward, steps, score = self.env.state().score, "Episode");
            report.rewards.push(reward);
            report.steps.push(steps);
        }

        tracing::info!(
            episodes = self.episodes,
            average_reward = report.average_reward(),
            "Evaluation complete"
        );

        Ok(report)
    }

    fn play_episode(&mut self) -> Result<(f32, usize)> {
        self.env.reset();
        let mut total_reward = 0.0;
        let mut steps = 0;

        loop {
            let direction = self.greedy_direction(self.env.observation())?;
            let (reward, done) = self.env.step(direction);
            total_reward += reward;
            steps += 1;

            if done {
                return Ok((total_reward, steps));
            }
        }
    }

    fn greedy_direction(&self, observation: Tensor<B, 4>) -> Result<Direction> {
        let (logits, _) = self.network.forward(observation.unsqueeze::<5>());
        let logits: Vec<f32> = logits.into_data().iter::<f32>().collect();
        let action = argmax(&logits);

        Direction::from_action_index(action)
            .ok_or_else(|| anyhow!("network produced invalid action index {}", action))
    }
}

/// Index of the largest value, 0 for an empty slice
fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}
