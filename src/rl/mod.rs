//! Asynchronous advantage actor-critic training for Snake
//!
//! Provides:
//! - Stacked RGB frame observations
//! - A convolutional actor-critic network
//! - Discounted return and loss computation
//! - A shared parameter store updated by concurrent workers
//! - Checkpointing with compatibility metadata

pub mod backend;
pub mod buffer;
pub mod checkpoint;
pub mod config;
pub mod environment;
pub mod loss;
pub mod network;
pub mod observation;
pub mod persistence;
pub mod returns;
pub mod store;
pub mod worker;

pub use backend::{InferenceBackend, TrainingBackend, default_device};
pub use buffer::Trajectory;
pub use checkpoint::Checkpointer;
pub use config::A3CConfig;
pub use environment::{Environment, SnakeEnvironment};
pub use network::{ActorCriticConfig, ActorCriticNetwork};
pub use observation::{FRAME_STACK, FrameStack, render_frame};
pub use persistence::ModelMetadata;
pub use store::{ParameterStore, SharedAdam};
pub use worker::{SharedTraining, Worker, WorkerEvent, WorkerSummary};
