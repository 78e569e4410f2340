use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use super::progress::EpisodeRecord;

/// File name of the progress log inside the save directory
pub const LOG_FILE_NAME: &str = "training_log.csv";

/// Column header, written once when the file is created
pub const LOG_HEADER: &str =
    "Episode,Reward,Steps,Policy Loss,Value Loss,Moving Average,Worker Idx";

/// Append-only CSV with one row per completed episode
///
/// Write failures are logged and otherwise ignored; losing a progress row
/// never interrupts training.
#[derive(Debug)]
pub struct ProgressLog {
    path: PathBuf,
    initialized: bool,
}

impl ProgressLog {
    /// Open `{save_dir}/training_log.csv`, writing the header if the file is new
    pub fn init(save_dir: &Path) -> Self {
        Self::at_path(save_dir.join(LOG_FILE_NAME))
    }

    pub fn at_path(path: PathBuf) -> Self {
        let result = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .and_then(|mut file| {
                let is_new = file.metadata()?.len() == 0;
                if is_new {
                    writeln!(file, "{}", LOG_HEADER)?;
                }
                Ok(())
            });

        let initialized = match result {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(
                    path = %path.display(),
                    ?error,
                    "Could not initialize progress log. Episodes will not be recorded."
                );
                false
            }
        };

        Self { path, initialized }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one episode row
    pub fn append(&self, record: &EpisodeRecord) {
        if !self.initialized {
            return;
        }

        let result = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", format_row(record)));

        if let Err(error) = result {
            tracing::error!(
                path = %self.path.display(),
                ?error,
                "Could not write progress row."
            );
        }
    }
}

fn format_row(record: &EpisodeRecord) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        record.episode,
        record.reward,
        record.steps,
        record.policy_loss,
        record.value_loss,
        record.moving_average,
        record.worker
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(episode: usize) -> EpisodeRecord {
        EpisodeRecord {
            episode,
            worker: 1,
            reward: -1.0,
            steps: 7,
            policy_loss: 0.5,
            value_loss: 0.25,
            moving_average: -1.0,
        }
    }

    #[test]
    fn test_header_written_once() {
        let temp_dir = TempDir::new().unwrap();

        let log = ProgressLog::init(temp_dir.path());
        log.append(&record(1));
        // Reopening an existing log must not repeat the header
        let log = ProgressLog::init(temp_dir.path());
        log.append(&record(2));

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], LOG_HEADER);
        assert_eq!(lines[1], "1,-1,7,0.5,0.25,-1,1");
        assert!(lines[2].starts_with("2,"));
    }

    #[test]
    fn test_unwritable_path_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProgressLog::at_path(temp_dir.path().join("missing").join("log.csv"));

        // Must not panic
        log.append(&record(1));
        assert!(!log.path().exists());
    }
}
