//! A3C worker
//!
//! Each worker owns an environment, a local replica of the network and a
//! trajectory buffer. It runs a synchronous act/observe/update cycle:
//!
//! ```text
//! AwaitingEpisode ──reset──▶ Acting ──step──▶ Acting
//!        ▲                     │
//!        │        done or update_frequency steps
//!        │                     ▼
//!   EpisodeEnd ◀──done──── Updating ──not done──▶ Acting
//! ```
//!
//! An update re-evaluates the buffered states through the local replica,
//! hands the gradients to the shared [`ParameterStore`] and then replaces
//! the replica with the freshly committed parameters.

use anyhow::{Context, Result, anyhow};
use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::{
        ElementConversion, Tensor, TensorData, activation::softmax, backend::AutodiffBackend,
    },
};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{
    A3CConfig, ActorCriticNetwork, Checkpointer, Environment, ParameterStore, Trajectory,
    loss::actor_critic_loss,
    persistence::ModelMetadata,
    returns::{discounted_returns, standardize},
};
use crate::game::{Direction, GameConfig};
use crate::metrics::{EpisodeOutcome, EpisodeRecord, TrainingProgress};

/// Everything the workers of one run share
pub struct SharedTraining<B: AutodiffBackend, O> {
    pub store: ParameterStore<B, O>,
    pub progress: TrainingProgress,
    pub checkpointer: Checkpointer,
    pub config: A3CConfig,
    pub game: GameConfig,
}

/// Return targets of one rollout segment
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTargets {
    /// 0 for a finished episode, otherwise the critic's estimate of the
    /// current observation
    pub bootstrap: f32,
    /// Raw discounted returns
    pub discounted: Vec<f32>,
    /// Standardized returns used as training targets
    pub normalized: Vec<f32>,
}

/// Result of one gradient update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    /// Trajectory length the gradients were computed from
    pub steps: usize,
    pub policy_loss: f32,
    pub value_loss: f32,
    /// Store version after the commit
    pub version: u64,
}

/// One state-machine transition
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    EpisodeStarted,
    Acted {
        action: usize,
        reward: f32,
        done: bool,
    },
    Updated(UpdateReport),
    EpisodeCompleted(EpisodeRecord),
    Finished,
}

/// Totals reported when a worker stops
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerSummary {
    pub worker: usize,
    pub episodes: usize,
    pub updates: usize,
    pub steps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    AwaitingEpisode,
    Acting,
    Updating { done: bool },
    EpisodeEnd,
    Finished,
}

/// One asynchronous actor-learner
pub struct Worker<'a, B, O, E>
where
    B: AutodiffBackend,
{
    index: usize,
    env: E,
    shared: &'a SharedTraining<B, O>,
    local: ActorCriticNetwork<B>,
    actor: ActorCriticNetwork<B::InnerBackend>,
    trajectory: Trajectory<B::InnerBackend>,
    observation: Option<Tensor<B::InnerBackend, 4>>,
    state: WorkerState,
    rng: StdRng,
    device: B::Device,
    episode_reward: f32,
    episode_steps: usize,
    last_update: Option<UpdateReport>,
    summary: WorkerSummary,
}

impl<'a, B, O, E> Worker<'a, B, O, E>
where
    B: AutodiffBackend,
    O: Optimizer<ActorCriticNetwork<B>, B>,
    E: Environment<B::InnerBackend>,
{
    /// Create a worker whose replica starts from the current shared weights
    ///
    /// `seed` makes action sampling reproducible; `None` seeds from entropy.
    pub fn new(
        index: usize,
        env: E,
        shared: &'a SharedTraining<B, O>,
        seed: Option<u64>,
        device: B::Device,
    ) -> Self {
        let local = shared.store.snapshot();
        let actor = local.valid();
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            index,
            env,
            shared,
            local,
            actor,
            trajectory: Trajectory::new(),
            observation: None,
            state: WorkerState::AwaitingEpisode,
            rng,
            device,
            episode_reward: 0.0,
            episode_steps: 0,
            last_update: None,
            summary: WorkerSummary {
                worker: index,
                ..Default::default()
            },
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Transitions currently buffered and not yet used for an update
    pub fn pending_steps(&self) -> usize {
        self.trajectory.len()
    }

    pub fn summary(&self) -> &WorkerSummary {
        &self.summary
    }

    /// Run until the global episode budget is exhausted
    pub fn run(mut self) -> Result<WorkerSummary> {
        tracing::debug!(worker = self.index, "Worker started");

        loop {
            if let WorkerEvent::Finished = self.advance()? {
                break;
            }
        }

        tracing::debug!(
            worker = self.index,
            episodes = self.summary.episodes,
            updates = self.summary.updates,
            "Worker finished"
        );
        Ok(self.summary)
    }

    /// Perform exactly one state transition
    pub fn advance(&mut self) -> Result<WorkerEvent> {
        match self.state {
            WorkerState::AwaitingEpisode => Ok(self.start_episode()),
            WorkerState::Acting => self.act_step(),
            WorkerState::Updating { done } => {
                let report = self.update(done)?;
                self.state = if done {
                    WorkerState::EpisodeEnd
                } else {
                    WorkerState::Acting
                };
                Ok(WorkerEvent::Updated(report))
            }
            WorkerState::EpisodeEnd => Ok(WorkerEvent::EpisodeCompleted(self.finish_episode())),
            WorkerState::Finished => Ok(WorkerEvent::Finished),
        }
    }

    fn start_episode(&mut self) -> WorkerEvent {
        if self.shared.progress.global_episode() >= self.shared.config.max_episodes {
            self.state = WorkerState::Finished;
            return WorkerEvent::Finished;
        }

        self.env.reset();
        self.trajectory.clear();
        self.observation = Some(self.env.observation());
        self.episode_reward = 0.0;
        self.episode_steps = 0;
        self.last_update = None;
        self.state = WorkerState::Acting;

        WorkerEvent::EpisodeStarted
    }

    fn act_step(&mut self) -> Result<WorkerEvent> {
        let observation = self
            .observation
            .take()
            .ok_or_else(|| anyhow!("worker {} is acting without an observation", self.index))?;

        let action = self.sample_action(observation.clone());
        let direction = Direction::from_action_index(action)
            .ok_or_else(|| anyhow!("policy produced invalid action index {}", action))?;

        let (reward, done) = self.env.step(direction);
        self.trajectory.push(observation, action, reward);
        self.observation = Some(self.env.observation());

        self.episode_reward += reward;
        self.episode_steps += 1;
        self.summary.steps += 1;

        if done || self.trajectory.len() >= self.shared.config.update_frequency {
            self.state = WorkerState::Updating { done };
        }

        Ok(WorkerEvent::Acted {
            action,
            reward,
            done,
        })
    }

    /// Sample an action from the softmax over the local policy's logits
    fn sample_action(&mut self, observation: Tensor<B::InnerBackend, 4>) -> usize {
        let (logits, _) = self.actor.forward(observation.unsqueeze::<5>());
        let probs: Vec<f32> = softmax(logits, 1).into_data().iter::<f32>().collect();
        sample_categorical(&probs, &mut self.rng)
    }

    /// Bootstrap value and return targets for the buffered segment
    pub fn compute_targets(&self, done: bool) -> ReturnTargets {
        let bootstrap = match (&self.observation, done) {
            (Some(observation), false) => {
                let (_, value) = self.actor.forward(observation.clone().unsqueeze::<5>());
                value.squeeze::<1>(1).into_scalar().elem::<f32>()
            }
            _ => 0.0,
        };

        let discounted =
            discounted_returns(self.trajectory.rewards(), self.shared.config.gamma, bootstrap);
        let normalized = standardize(&discounted);

        ReturnTargets {
            bootstrap,
            discounted,
            normalized,
        }
    }

    /// Compute gradients on the replica, apply them to the shared model and
    /// resync the replica
    fn update(&mut self, done: bool) -> Result<UpdateReport> {
        let targets = self.compute_targets(done);

        let states = self
            .trajectory
            .states_batch()
            .context("update requested with an empty trajectory")?;
        let states = Tensor::<B, 5>::from_inner(states);
        let actions = self.trajectory.actions_tensor::<B>(&self.device);
        let returns = Tensor::<B, 1>::from_data(
            TensorData::new(targets.normalized.clone(), [targets.normalized.len()]),
            &self.device,
        );

        let (logits, values) = self.local.forward(states);
        let loss = actor_critic_loss(logits, values, actions, returns);
        let (policy_loss, value_loss) = loss.scalars();

        let grads = GradientsParams::from_grads(loss.total.backward(), &self.local);
        let version = self.shared.store.apply(grads);

        self.local = self.shared.store.snapshot();
        self.actor = self.local.valid();

        let report = UpdateReport {
            steps: self.trajectory.len(),
            policy_loss,
            value_loss,
            version,
        };
        self.trajectory.clear();
        self.summary.updates += 1;
        self.last_update = Some(report.clone());

        tracing::trace!(
            worker = self.index,
            steps = report.steps,
            policy_loss,
            value_loss,
            version,
            "Applied gradients"
        );

        Ok(report)
    }

    fn finish_episode(&mut self) -> EpisodeRecord {
        let (policy_loss, value_loss) = self
            .last_update
            .as_ref()
            .map(|report| (report.policy_loss, report.value_loss))
            .unwrap_or((0.0, 0.0));

        let record = self.shared.progress.record_episode(EpisodeOutcome {
            worker: self.index,
            reward: self.episode_reward,
            steps: self.episode_steps,
            policy_loss,
            value_loss,
        });
        self.summary.episodes += 1;

        tracing::info!(
            episode = record.episode,
            worker = record.worker,
            reward = record.reward,
            steps = record.steps,
            policy_loss = record.policy_loss,
            value_loss = record.value_loss,
            moving_average = record.moving_average,
            "Episode complete"
        );

        if self.shared.checkpointer.should_save(record.episode) {
            self.save_checkpoint(record.episode);
        }

        self.state = WorkerState::AwaitingEpisode;
        record
    }

    fn save_checkpoint(&self, episode: usize) {
        let snapshot = self.shared.store.snapshot();
        let metadata = ModelMetadata::new(self.shared.config.clone(), &self.shared.game, episode);

        if let Err(e) = self.shared.checkpointer.save(episode, &snapshot, &metadata) {
            tracing::error!(worker = self.index, episode, error = ?e, "Checkpoint lost");
        }
    }
}

/// Draw an index from a categorical distribution
///
/// Falls back to the last index when rounding leaves the cumulative sum
/// just below the drawn value.
pub fn sample_categorical<R: Rng>(probs: &[f32], rng: &mut R) -> usize {
    let draw: f32 = rng.gen_range(0.0..1.0);
    let mut cumulative = 0.0;

    for (index, &p) in probs.iter().enumerate() {
        cumulative += p;
        if draw < cumulative {
            return index;
        }
    }

    probs.len().saturating_sub(1)
}
