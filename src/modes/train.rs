//! Training mode for the A3C agent
//!
//! The [`MasterAgent`] builds the shared model (optionally from saved
//! weights), wires it into a [`ParameterStore`] together with the shared
//! Adam optimizer, and starts one thread per worker. Each worker gets its
//! own environment and a replica of the shared parameters. `train` blocks
//! until every worker has finished; the side effects are the checkpoint
//! files and the progress log in the save directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use snake_a3c::modes::{MasterAgent, TrainConfig};
//! use snake_a3c::rl::{TrainingBackend, default_device};
//!
//! let config = TrainConfig::new("runs/snake");
//! let master = MasterAgent::<TrainingBackend>::new(config, default_device())?;
//! let report = master.train()?;
//! ```

use anyhow::{Context, Result, anyhow, bail};
use burn::{
    module::AutodiffModule,
    tensor::{Tensor, backend::AutodiffBackend},
};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::thread;

use crate::game::GameConfig;
use crate::metrics::{ProgressLog, TrainingProgress};
use crate::rl::{
    A3CConfig, ActorCriticConfig, ActorCriticNetwork, Checkpointer, Environment, FRAME_STACK,
    ParameterStore, SharedTraining, SnakeEnvironment, Worker, WorkerSummary,
    observation::COLOR_CHANNELS, persistence::load_weights,
};

/// Configuration for training mode
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Directory receiving checkpoints and the progress log
    pub save_dir: PathBuf,

    /// Weights to start from instead of a fresh initialization
    pub weights_path: Option<PathBuf>,

    /// Base seed for environments and action sampling; worker `i` uses
    /// `seed + i`
    pub seed: Option<u64>,

    /// Game configuration (grid size, rewards, rendering)
    pub game_config: GameConfig,

    /// A3C hyperparameters
    pub a3c_config: A3CConfig,
}

impl TrainConfig {
    /// Default game and hyperparameters writing to `save_dir`
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            weights_path: None,
            seed: None,
            game_config: GameConfig::default(),
            a3c_config: A3CConfig::default(),
        }
    }

    /// Check everything that must hold before any worker starts
    pub fn validate(&self) -> Result<()> {
        if self.save_dir.as_os_str().is_empty() {
            bail!("a save directory is required for training");
        }

        self.game_config
            .validate()
            .map_err(|e| anyhow!("invalid game configuration: {}", e))?;
        self.a3c_config
            .validate()
            .map_err(|e| anyhow!("invalid A3C configuration: {}", e))?;

        if let Some(path) = &self.weights_path {
            if !path.exists() && !path.with_extension("mpk").exists() {
                bail!("weights file not found: {:?}", path);
            }
        }

        Ok(())
    }

    fn worker_seed(&self, worker: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(worker as u64))
    }
}

/// Outcome of a finished training run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    /// Value of the global episode counter once every worker joined
    pub episodes_completed: usize,
    pub workers_started: usize,
    /// Workers that returned an error or panicked
    pub workers_failed: usize,
    /// Gradient updates committed to the shared model
    pub updates: u64,
    pub moving_average: f32,
    /// Summaries of the workers that finished cleanly, by worker index
    pub workers: Vec<WorkerSummary>,
}

/// Owns the shared model and runs the workers
pub struct MasterAgent<B: AutodiffBackend> {
    config: TrainConfig,
    network_config: ActorCriticConfig,
    network: ActorCriticNetwork<B>,
    device: B::Device,
}

impl<B: AutodiffBackend> MasterAgent<B> {
    /// Validate the configuration, create the save directory and build the
    /// shared model
    ///
    /// The network runs once on a dummy observation before any weights are
    /// loaded into it.
    pub fn new(config: TrainConfig, device: B::Device) -> Result<Self> {
        config.validate()?;

        std::fs::create_dir_all(&config.save_dir)
            .with_context(|| format!("Failed to create save directory {:?}", config.save_dir))?;

        let network_config = ActorCriticConfig::new(
            config.game_config.frame_height(),
            config.game_config.frame_width(),
        );
        let network = network_config
            .try_init::<B>(&device)
            .map_err(|e| anyhow!("cannot build network: {}", e))?;

        let dummy = Tensor::<B::InnerBackend, 5>::zeros(
            [
                1,
                FRAME_STACK,
                network_config.frame_height,
                network_config.frame_width,
                COLOR_CHANNELS,
            ],
            &device,
        );
        let _ = network.valid().forward(dummy);

        let network = match &config.weights_path {
            Some(path) => {
                let network = load_weights(network, &network_config, path, &device)?;
                tracing::info!(path = %path.display(), "Loaded starting weights");
                network
            }
            None => network,
        };

        Ok(Self {
            config,
            network_config,
            network,
            device,
        })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn network_config(&self) -> &ActorCriticConfig {
        &self.network_config
    }

    /// Train with one [`SnakeEnvironment`] per worker
    pub fn train(self) -> Result<TrainingReport> {
        let game = self.config.game_config.clone();
        let device = self.device.clone();
        let seeds: Vec<Option<u64>> = (0..self.config.a3c_config.num_workers)
            .map(|worker| self.config.worker_seed(worker))
            .collect();

        self.train_with(|worker| match seeds.get(worker).copied().flatten() {
            Some(seed) => SnakeEnvironment::with_seed(game.clone(), seed, device.clone()),
            None => SnakeEnvironment::new(game.clone(), device.clone()),
        })
    }

    /// Train with environments produced by `make_env(worker_index)`
    ///
    /// Blocks until every worker has finished. A worker that errors or
    /// panics is logged and counted in the report; the others keep going.
    pub fn train_with<E, F>(self, make_env: F) -> Result<TrainingReport>
    where
        E: Environment<B::InnerBackend>,
        F: Fn(usize) -> E + Sync,
    {
        let a3c = self.config.a3c_config.clone();
        let save_dir = self.config.save_dir.clone();

        self.log_header();

        let shared = SharedTraining {
            store: ParameterStore::with_adam(self.network, a3c.learning_rate),
            progress: TrainingProgress::with_log(
                a3c.moving_average_window,
                ProgressLog::init(&save_dir),
            ),
            checkpointer: Checkpointer::new(
                save_dir.as_path(),
                a3c.save_frequency,
                a3c.checkpoint_attempts,
            ),
            config: a3c.clone(),
            game: self.config.game_config.clone(),
        };

        let mut report = TrainingReport {
            workers_started: a3c.num_workers,
            ..Default::default()
        };

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(a3c.num_workers);

            for index in 0..a3c.num_workers {
                let shared = &shared;
                let make_env = &make_env;
                let seed = self.config.worker_seed(index);
                let device = self.device.clone();

                let spawned = thread::Builder::new()
                    .name(format!("worker-{}", index))
                    .spawn_scoped(scope, move || {
                        catch_unwind(AssertUnwindSafe(|| {
                            Worker::new(index, make_env(index), shared, seed, device).run()
                        }))
                    });

                match spawned {
                    Ok(handle) => handles.push((index, handle)),
                    Err(e) => {
                        tracing::error!(worker = index, error = %e, "Failed to start worker");
                        report.workers_failed += 1;
                    }
                }
            }

            for (index, handle) in handles {
                match handle.join() {
                    Ok(Ok(Ok(summary))) => report.workers.push(summary),
                    Ok(Ok(Err(e))) => {
                        tracing::error!(worker = index, error = ?e, "Worker stopped with an error");
                        report.workers_failed += 1;
                    }
                    Ok(Err(payload)) | Err(payload) => {
                        tracing::error!(
                            worker = index,
                            panic = panic_message(payload.as_ref()),
                            "Worker panicked"
                        );
                        report.workers_failed += 1;
                    }
                }
            }
        });

        report.episodes_completed = shared.progress.global_episode();
        report.moving_average = shared.progress.moving_average();
        report.updates = shared.store.version();

        tracing::info!(
            episodes = report.episodes_completed,
            updates = report.updates,
            workers_failed = report.workers_failed,
            "Training complete. {}",
            shared.progress.format_summary()
        );

        if report.episodes_completed < a3c.max_episodes {
            tracing::warn!(
                episodes = report.episodes_completed,
                max_episodes = a3c.max_episodes,
                "Workers stopped before the episode budget was reached"
            );
        }

        Ok(report)
    }

    fn log_header(&self) {
        let a3c = &self.config.a3c_config;
        let game = &self.config.game_config;

        tracing::info!(
            grid_width = game.grid_width,
            grid_height = game.grid_height,
            frame_height = self.network_config.frame_height,
            frame_width = self.network_config.frame_width,
            "A3C training - Snake"
        );
        tracing::info!(
            workers = a3c.num_workers,
            max_episodes = a3c.max_episodes,
            gamma = a3c.gamma,
            learning_rate = a3c.learning_rate,
            update_frequency = a3c.update_frequency,
            save_frequency = a3c.save_frequency,
            save_dir = %self.config.save_dir.display(),
            "Hyperparameters"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
