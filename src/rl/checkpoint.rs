//! Periodic checkpoints of the shared model
//!
//! Every worker holds the same [`Checkpointer`]. Its internal lock guards
//! only the file writes, so two workers never interleave output for one
//! checkpoint while parameter updates carry on untouched.

use super::ActorCriticNetwork;
use super::persistence::{ModelMetadata, save_network};
use anyhow::{Result, anyhow};
use burn::tensor::backend::Backend;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Checkpoint policy shared by all workers
#[derive(Debug)]
pub struct Checkpointer {
    save_dir: PathBuf,
    save_frequency: usize,
    attempts: usize,
    lock: Mutex<()>,
}

impl Checkpointer {
    pub fn new(save_dir: impl Into<PathBuf>, save_frequency: usize, attempts: usize) -> Self {
        Self {
            save_dir: save_dir.into(),
            save_frequency,
            attempts: attempts.max(1),
            lock: Mutex::new(()),
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// True for positive multiples of the save frequency
    pub fn should_save(&self, episode: usize) -> bool {
        episode != 0 && self.save_frequency != 0 && episode % self.save_frequency == 0
    }

    /// `{save_dir}/{episode}_a3c`; the recorder appends `.mpk`
    pub fn checkpoint_path(&self, episode: usize) -> PathBuf {
        self.save_dir.join(format!("{}_a3c", episode))
    }

    /// Write a checkpoint for `episode`, retrying failed writes
    ///
    /// Only files are touched; `network` is a snapshot the caller owns.
    pub fn save<B: Backend>(
        &self,
        episode: usize,
        network: &ActorCriticNetwork<B>,
        metadata: &ModelMetadata,
    ) -> Result<PathBuf> {
        let path = self.checkpoint_path(episode);
        let _guard = self.lock.lock();

        let mut last_error = None;
        for attempt in 1..=self.attempts {
            match save_network(network, metadata, &path) {
                Ok(()) => {
                    tracing::info!(episode, path = %path.display(), "Saved checkpoint");
                    return Ok(path);
                }
                Err(e) => {
                    tracing::warn!(episode, attempt, error = %e, "Checkpoint write failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("no checkpoint attempts were made")))
    }
}
