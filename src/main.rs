use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use snake_a3c::game::GameConfig;
use snake_a3c::modes::{MasterAgent, PlayMode, TrainConfig};
use snake_a3c::rl::{A3CConfig, InferenceBackend, TrainingBackend, default_device};

#[derive(Parser)]
#[command(name = "snake_a3c")]
#[command(version, about = "Train and play Snake with asynchronous advantage actor-critic")]
struct Cli {
    /// Train new weights or play saved ones
    #[arg(long, default_value = "train")]
    mode: Mode,

    /// Width and height of the board in cells
    #[arg(long, default_value = "6")]
    grid_size: usize,

    /// Pixels per cell in rendered frames
    #[arg(long, default_value = "10")]
    block_size: usize,

    /// Step limit per episode
    #[arg(long, default_value = "500")]
    max_steps: u32,

    /// Weights to load on start (required for play)
    #[arg(long)]
    weights_path: Option<PathBuf>,

    /// Directory for checkpoints and the progress log (required for train)
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Stop once this many episodes have completed across all workers
    #[arg(long, default_value = "100000")]
    max_episodes: usize,

    /// Discount factor
    #[arg(long, default_value = "0.99")]
    gamma: f32,

    /// Steps collected before each gradient update
    #[arg(long, default_value = "20")]
    update_freq: usize,

    /// Save a checkpoint every N episodes
    #[arg(long, default_value = "100")]
    save_freq: usize,

    /// Adam learning rate
    #[arg(long, default_value = "0.0001")]
    learning_rate: f64,

    /// Seed for environments and action sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Episodes to play in play mode
    #[arg(long, default_value = "10")]
    episodes: usize,
}

#[derive(Clone, ValueEnum)]
enum Mode {
    /// Train with concurrent workers
    Train,
    /// Play saved weights greedily
    Play,
}

impl Cli {
    fn game_config(&self) -> GameConfig {
        let mut config = GameConfig::square(self.grid_size);
        config.block_size = self.block_size;
        config.max_steps = self.max_steps;
        config
    }

    fn a3c_config(&self) -> A3CConfig {
        A3CConfig {
            learning_rate: self.learning_rate,
            gamma: self.gamma,
            update_frequency: self.update_freq,
            save_frequency: self.save_freq,
            max_episodes: self.max_episodes,
            num_workers: self.workers,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Train => {
            let save_dir = cli
                .save_dir
                .clone()
                .context("--save-dir is required for training")?;

            let config = TrainConfig {
                save_dir,
                weights_path: cli.weights_path.clone(),
                seed: cli.seed,
                game_config: cli.game_config(),
                a3c_config: cli.a3c_config(),
            };

            let master = MasterAgent::<TrainingBackend>::new(config, default_device())?;
            let report = master.train()?;

            if report.workers_failed > 0 {
                tracing::warn!(
                    workers_failed = report.workers_failed,
                    "Some workers stopped early"
                );
            }
        }
        Mode::Play => {
            let weights_path = cli
                .weights_path
                .clone()
                .context("--weights-path is required for play")?;

            let mut play = PlayMode::<InferenceBackend>::new(
                cli.game_config(),
                &weights_path,
                cli.episodes,
                cli.seed,
                default_device(),
            )?;
            play.run()?;
        }
    }

    Ok(())
}
