//! Shared training progress
//!
//! One [`TrainingProgress`] is shared by every worker. It owns the global
//! episode counter and the moving average of recent episode rewards, and
//! forwards each completed episode to the progress log.
//!
//! The counter is atomic so readers (the loop-exit check) never block. The
//! increment itself happens under the same lock as the moving-average push
//! and the log write, so episode numbers, averages and CSV rows always
//! appear in the same order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::progress_log::ProgressLog;

/// What a worker reports when one of its episodes ends
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOutcome {
    pub worker: usize,
    pub reward: f32,
    pub steps: usize,
    pub policy_loss: f32,
    pub value_loss: f32,
}

/// A completed episode with its global number and the moving average
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRecord {
    /// 1-based global episode number
    pub episode: usize,
    pub worker: usize,
    pub reward: f32,
    pub steps: usize,
    pub policy_loss: f32,
    pub value_loss: f32,
    pub moving_average: f32,
}

struct ProgressInner {
    rewards: VecDeque<f32>,
    log: Option<ProgressLog>,
}

/// Global episode counter plus rolling reward window
pub struct TrainingProgress {
    global_episode: AtomicUsize,
    window_size: usize,
    inner: Mutex<ProgressInner>,
}

impl TrainingProgress {
    /// Progress without a log file
    pub fn new(window_size: usize) -> Self {
        Self {
            global_episode: AtomicUsize::new(0),
            window_size: window_size.max(1),
            inner: Mutex::new(ProgressInner {
                rewards: VecDeque::with_capacity(window_size),
                log: None,
            }),
        }
    }

    /// Progress that appends every episode to `log`
    pub fn with_log(window_size: usize, log: ProgressLog) -> Self {
        let progress = Self::new(window_size);
        progress.inner.lock().log = Some(log);
        progress
    }

    /// Episodes completed so far, across all workers
    pub fn global_episode(&self) -> usize {
        self.global_episode.load(Ordering::Acquire)
    }

    /// Mean of the rewards in the window, 0 when empty
    pub fn moving_average(&self) -> f32 {
        Self::mean(&self.inner.lock().rewards)
    }

    /// Count a completed episode and log it
    pub fn record_episode(&self, outcome: EpisodeOutcome) -> EpisodeRecord {
        let mut inner = self.inner.lock();

        let episode = self.global_episode.fetch_add(1, Ordering::AcqRel) + 1;
        Self::push_deque(&mut inner.rewards, outcome.reward, self.window_size);

        let record = EpisodeRecord {
            episode,
            worker: outcome.worker,
            reward: outcome.reward,
            steps: outcome.steps,
            policy_loss: outcome.policy_loss,
            value_loss: outcome.value_loss,
            moving_average: Self::mean(&inner.rewards),
        };

        if let Some(log) = &inner.log {
            log.append(&record);
        }

        record
    }

    /// One-line summary for periodic logging
    pub fn format_summary(&self) -> String {
        format!(
            "Episodes: {} | Avg Reward (last {}): {:.3}",
            self.global_episode(),
            self.window_size,
            self.moving_average()
        )
    }

    fn mean(deque: &VecDeque<f32>) -> f32 {
        if deque.is_empty() {
            return 0.0;
        }
        deque.iter().sum::<f32>() / deque.len() as f32
    }

    fn push_deque<T>(deque: &mut VecDeque<T>, value: T, window_size: usize) {
        if deque.len() >= window_size {
            deque.pop_front();
        }
        deque.push_back(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::progress_log::LOG_HEADER;
    use tempfile::TempDir;

    fn outcome(worker: usize, reward: f32) -> EpisodeOutcome {
        EpisodeOutcome {
            worker,
            reward,
            steps: 10,
            policy_loss: 0.1,
            value_loss: 0.2,
        }
    }

    #[test]
    fn test_new() {
        let progress = TrainingProgress::new(100);
        assert_eq!(progress.global_episode(), 0);
        assert_eq!(progress.moving_average(), 0.0);
    }

    #[test]
    fn test_episode_numbers_start_at_one() {
        let progress = TrainingProgress::new(100);

        let first = progress.record_episode(outcome(0, 1.0));
        let second = progress.record_episode(outcome(1, -1.0));

        assert_eq!(first.episode, 1);
        assert_eq!(second.episode, 2);
        assert_eq!(second.worker, 1);
        assert_eq!(progress.global_episode(), 2);
    }

    #[test]
    fn test_rolling_window() {
        let progress = TrainingProgress::new(2);

        progress.record_episode(outcome(0, 10.0));
        progress.record_episode(outcome(0, 0.0));
        let record = progress.record_episode(outcome(0, 2.0));

        // Only the last two rewards remain
        assert_eq!(record.moving_average, 1.0);
        assert_eq!(progress.moving_average(), 1.0);
    }

    #[test]
    fn test_concurrent_recording_counts_every_episode() {
        let progress = TrainingProgress::new(100);

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let progress = &progress;
                scope.spawn(move || {
                    for _ in 0..250 {
                        progress.record_episode(outcome(worker, 1.0));
                    }
                });
            }
        });

        assert_eq!(progress.global_episode(), 1000);
        assert_eq!(progress.moving_average(), 1.0);
    }

    #[test]
    fn test_rows_follow_episode_order() {
        let temp_dir = TempDir::new().unwrap();
        let progress = TrainingProgress::with_log(100, ProgressLog::init(temp_dir.path()));

        std::thread::scope(|scope| {
            for worker in 0..3 {
                let progress = &progress;
                scope.spawn(move || {
                    for _ in 0..20 {
                        progress.record_episode(outcome(worker, 0.0));
                    }
                });
            }
        });

        let contents =
            std::fs::read_to_string(temp_dir.path().join("training_log.csv")).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some(LOG_HEADER));

        let episodes: Vec<usize> = lines
            .map(|line| line.split(',').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(episodes, (1..=60).collect::<Vec<_>>());
    }

    #[test]
    fn test_format_summary() {
        let progress = TrainingProgress::new(100);
        progress.record_episode(outcome(0, 1.0));

        let summary = progress.format_summary();
        assert!(summary.contains("Episodes: 1"));
        assert!(summary.contains("1.000"));
    }
}
