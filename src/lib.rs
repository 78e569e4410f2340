//! Snake A3C - asynchronous advantage actor-critic training for Snake
//!
//! This library provides:
//! - Core game logic (game module)
//! - Frame observations, the actor-critic network and the A3C workers
//!   (rl module)
//! - Shared episode bookkeeping and the progress log (metrics module)
//! - Train and play entry points (modes module)

pub mod game;
pub mod metrics;
pub mod modes;
pub mod rl;
