//! Training progress shared between workers and its CSV log

pub mod progress;
pub mod progress_log;

pub use progress::{EpisodeOutcome, EpisodeRecord, TrainingProgress};
pub use progress_log::ProgressLog;
