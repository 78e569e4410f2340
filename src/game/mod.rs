//! Core game logic module for Snake
//!
//! Pure board simulation without I/O. The RL environment adapter in
//! [`crate::rl::environment`] renders it into frames for the network.

pub mod action;
pub mod config;
pub mod engine;
pub mod state;

// Re-export commonly used types
pub use action::Direction;
pub use config::GameConfig;
pub use engine::{GameEngine, StepInfo, StepResult};
pub use state::{CollisionType, GameState, Position, Snake};
