use serde::{Deserialize, Serialize};

/// Configuration for the game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Width of the game grid
    pub grid_width: usize,
    /// Height of the game grid
    pub grid_height: usize,
    /// Initial length of the snake
    pub initial_snake_length: usize,

    // Rewards (for RL)
    /// Reward for eating food
    pub food_reward: f32,
    /// Reward for filling the whole board
    pub win_reward: f32,
    /// Penalty for dying
    pub death_penalty: f32,

    /// Episode ends (without penalty) after this many steps
    pub max_steps: u32,
    /// Pixels per grid cell in rendered frames
    pub block_size: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 6,
            grid_height: 6,
            initial_snake_length: 3,
            food_reward: 1.0,
            win_reward: 1.0,
            death_penalty: -1.0,
            max_steps: 500,
            block_size: 10,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with custom grid size
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            grid_width: width,
            grid_height: height,
            ..Default::default()
        }
    }

    /// Square grid of `size` cells per side
    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    /// Height of a rendered frame in pixels
    pub fn frame_height(&self) -> usize {
        self.grid_height * self.block_size
    }

    /// Width of a rendered frame in pixels
    pub fn frame_width(&self) -> usize {
        self.grid_width * self.block_size
    }

    /// Validate the board dimensions and rendering parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_snake_length == 0 {
            return Err("initial_snake_length must be at least 1".to_string());
        }

        // The snake spawns in the middle row heading right, with its tail
        // extending to the left of the center column.
        if self.grid_width / 2 + 1 < self.initial_snake_length || self.grid_height == 0 {
            return Err(format!(
                "a {}x{} grid cannot hold a snake of length {}",
                self.grid_width, self.grid_height, self.initial_snake_length
            ));
        }

        if self.max_steps == 0 {
            return Err("max_steps must be at least 1".to_string());
        }

        if self.block_size == 0 {
            return Err("block_size must be at least 1".to_string());
        }

        Ok(())
    }
}
