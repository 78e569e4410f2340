//! A3C hyperparameter configuration

use serde::{Deserialize, Serialize};

/// Configuration for asynchronous actor-critic training
///
/// # Example
///
/// ```rust
/// use snake_a3c::rl::A3CConfig;
///
/// let config = A3CConfig {
///     num_workers: 2,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A3CConfig {
    /// Learning rate of the shared Adam optimizer
    ///
    /// Default: 1e-4
    pub learning_rate: f64,

    /// Discount factor for future rewards, in `(0, 1]`
    ///
    /// Default: 0.99
    pub gamma: f32,

    /// Acted steps per worker between gradient updates
    ///
    /// Bounds how stale a worker's replica can get. An episode end also
    /// triggers an update, so segments can be shorter.
    ///
    /// Default: 20
    pub update_frequency: usize,

    /// Save a checkpoint every this many completed episodes
    ///
    /// Default: 100
    pub save_frequency: usize,

    /// Global episode budget shared by all workers
    ///
    /// Default: 100_000
    pub max_episodes: usize,

    /// Number of concurrent workers
    ///
    /// Default: 4
    pub num_workers: usize,

    /// Completed-episode rewards kept for the moving average
    ///
    /// Default: 100
    pub moving_average_window: usize,

    /// Write attempts per checkpoint before giving up
    ///
    /// Default: 3
    pub checkpoint_attempts: usize,
}

impl Default for A3CConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-4,
            gamma: 0.99,
            update_frequency: 20,
            save_frequency: 100,
            max_episodes: 100_000,
            num_workers: 4,
            moving_average_window: 100,
            checkpoint_attempts: 3,
        }
    }
}

impl A3CConfig {
    /// Check that all hyperparameters are in valid ranges
    pub fn validate(&self) -> Result<(), String> {
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }

        if self.gamma.is_nan() || self.gamma <= 0.0 || self.gamma > 1.0 {
            return Err(format!("gamma must be in (0, 1], got {}", self.gamma));
        }

        if self.update_frequency == 0 {
            return Err("update_frequency must be at least 1".to_string());
        }

        if self.save_frequency == 0 {
            return Err("save_frequency must be at least 1".to_string());
        }

        if self.num_workers == 0 {
            return Err("num_workers must be at least 1".to_string());
        }

        if self.moving_average_window == 0 {
            return Err("moving_average_window must be at least 1".to_string());
        }

        if self.checkpoint_attempts == 0 {
            return Err("checkpoint_attempts must be at least 1".to_string());
        }

        Ok(())
    }
}
