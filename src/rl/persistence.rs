//! Model persistence for checkpoints and trained agents
//!
//! Weights go through Burn's record system. Next to every weights file a
//! `.meta.json` sidecar records the board and frame dimensions the network
//! was built for, so a mismatched load fails before any worker starts.

use super::{A3CConfig, ActorCriticConfig, ActorCriticNetwork};
use crate::game::GameConfig;
use anyhow::{Context, Result, bail};
use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::Backend,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata saved with the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Hyperparameters of the run that produced the weights
    pub a3c_config: A3CConfig,

    /// Grid height in cells
    pub grid_height: usize,

    /// Grid width in cells
    pub grid_width: usize,

    /// Frame height in pixels
    pub frame_height: usize,

    /// Frame width in pixels
    pub frame_width: usize,

    /// Global episode counter when the weights were written
    pub global_episode: usize,

    /// Version identifier for compatibility checking
    pub version: String,

    /// Unix time in seconds when the metadata was created
    #[serde(default)]
    pub saved_at: u64,
}

impl ModelMetadata {
    pub fn new(a3c_config: A3CConfig, game_config: &GameConfig, global_episode: usize) -> Self {
        Self {
            a3c_config,
            grid_height: game_config.grid_height,
            grid_width: game_config.grid_width,
            frame_height: game_config.frame_height(),
            frame_width: game_config.frame_width(),
            global_episode,
            version: env!("CARGO_PKG_VERSION").to_string(),
            saved_at: unix_seconds(),
        }
    }

    /// Fail if the weights were built for a different frame size
    pub fn ensure_compatible(&self, network_config: &ActorCriticConfig) -> Result<()> {
        if self.frame_height != network_config.frame_height
            || self.frame_width != network_config.frame_width
        {
            bail!(
                "weights were trained on {}x{} frames ({}x{} grid), but the network expects {}x{}",
                self.frame_height,
                self.frame_width,
                self.grid_height,
                self.grid_width,
                network_config.frame_height,
                network_config.frame_width
            );
        }
        Ok(())
    }
}

/// Seconds since the Unix epoch, 0 if the clock is before it
fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Path of the metadata sidecar for a weights path
pub fn metadata_path(path: &Path) -> PathBuf {
    path.with_extension("meta.json")
}

/// Save network weights and metadata
///
/// The model is saved in two files:
/// - `<path>.mpk` - Network weights (Burn named MessagePack record)
/// - `<path>.meta.json` - Metadata as JSON
///
/// Creates parent directories if they don't exist.
pub fn save_network<B: Backend>(
    network: &ActorCriticNetwork<B>,
    metadata: &ModelMetadata,
    path: &Path,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let record = network.clone().into_record();
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(record, path.to_path_buf())
        .with_context(|| format!("Failed to save network weights to {:?}", path))?;

    let meta_path = metadata_path(path);
    let meta_json =
        serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
    std::fs::write(&meta_path, meta_json)
        .with_context(|| format!("Failed to write metadata to {:?}", meta_path))?;

    Ok(())
}

/// Read the metadata sidecar, `None` if it does not exist
pub fn load_metadata(path: &Path) -> Result<Option<ModelMetadata>> {
    let meta_path = metadata_path(path);
    if !meta_path.exists() {
        return Ok(None);
    }

    let meta_json = std::fs::read_to_string(&meta_path)
        .with_context(|| format!("Failed to read metadata from {:?}", meta_path))?;
    let metadata = serde_json::from_str(&meta_json)
        .with_context(|| format!("Failed to deserialize metadata from {:?}", meta_path))?;

    Ok(Some(metadata))
}

/// Load saved weights into an already-built network
///
/// `path` may name the weights file with or without its `.mpk` extension.
/// When a metadata sidecar exists its frame size must match
/// `network_config`.
pub fn load_weights<B: Backend>(
    network: ActorCriticNetwork<B>,
    network_config: &ActorCriticConfig,
    path: &Path,
    device: &B::Device,
) -> Result<ActorCriticNetwork<B>> {
    if let Some(metadata) = load_metadata(path)? {
        metadata
            .ensure_compatible(network_config)
            .with_context(|| format!("Incompatible weights at {:?}", path))?;
    }

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(path.to_path_buf(), device)
        .with_context(|| format!("Failed to load network weights from {:?}", path))?;

    Ok(network.load_record(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::{InferenceBackend, default_device};
    use burn::tensor::Tensor;
    use tempfile::TempDir;

    fn small_game() -> GameConfig {
        let mut config = GameConfig::square(6);
        config.block_size = 2;
        config
    }

    #[test]
    fn test_metadata_creation() {
        let before = unix_seconds();
        let metadata = ModelMetadata::new(A3CConfig::default(), &small_game(), 300);
        let after = unix_seconds();

        assert_eq!(metadata.grid_height, 6);
        assert_eq!(metadata.frame_width, 12);
        assert_eq!(metadata.global_episode, 300);
        assert_eq!(metadata.version, env!("CARGO_PKG_VERSION"));
        assert!(before > 0);
        assert!((before..=after).contains(&metadata.saved_at));
    }

    #[test]
    fn test_metadata_compatibility() {
        let metadata = ModelMetadata::new(A3CConfig::default(), &small_game(), 0);

        assert!(metadata.ensure_compatible(&ActorCriticConfig::new(12, 12)).is_ok());
        assert!(metadata.ensure_compatible(&ActorCriticConfig::new(60, 60)).is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("100_a3c");
        let device = default_device();
        let config = ActorCriticConfig::new(12, 12);

        let network = config.init::<InferenceBackend>(&device);
        let metadata = ModelMetadata::new(A3CConfig::default(), &small_game(), 100);
        save_network(&network, &metadata, &path).unwrap();

        assert!(path.with_extension("mpk").exists());
        assert!(path.with_extension("meta.json").exists());

        let fresh = config.init::<InferenceBackend>(&device);
        let loaded = load_weights(fresh, &config, &path, &device).unwrap();

        let observation = Tensor::<InferenceBackend, 5>::ones([1, 4, 12, 12, 3], &device);
        let (expected, _) = network.forward(observation.clone());
        let (actual, _) = loaded.forward(observation);

        let expected = expected.into_data().to_vec::<f32>().unwrap();
        let actual = actual.into_data().to_vec::<f32>().unwrap();
        for (e, a) in expected.iter().zip(actual.iter()) {
            assert!((e - a).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_rejects_mismatched_frames() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model");
        let device = default_device();

        let network = ActorCriticConfig::new(12, 12).init::<InferenceBackend>(&device);
        let metadata = ModelMetadata::new(A3CConfig::default(), &small_game(), 0);
        save_network(&network, &metadata, &path).unwrap();

        let other = ActorCriticConfig::new(60, 60);
        let result = load_weights(other.init::<InferenceBackend>(&device), &other, &path, &device);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let device = default_device();
        let config = ActorCriticConfig::new(12, 12);

        let result = load_weights(
            config.init::<InferenceBackend>(&device),
            &config,
            &temp_dir.path().join("missing"),
            &device,
        );
        assert!(result.is_err());
    }
}
