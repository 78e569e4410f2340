//! Backend type aliases and device management
//!
//! - **TrainingBackend**: Autodiff-enabled NdArray backend. The shared model,
//!   the optimizer and every worker replica live here.
//! - **InferenceBackend**: Plain NdArray backend used for acting and for
//!   greedy play. `module.valid()` moves a training module onto it.
//!
//! ```rust
//! use snake_a3c::rl::{ActorCriticConfig, TrainingBackend, default_device};
//!
//! let device = default_device();
//! let network = ActorCriticConfig::new(60, 60).init::<TrainingBackend>(&device);
//! ```

use burn::backend::{
    Autodiff,
    ndarray::{NdArray, NdArrayDevice},
};

/// Backend type for training (with autodiff)
pub type TrainingBackend = Autodiff<NdArray<f32>>;

/// Backend type for inference (without autodiff)
pub type InferenceBackend = NdArray<f32>;

/// Get the default device for computation (CPU)
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tensor;

    #[test]
    fn test_default_device_is_usable() {
        let device = default_device();
        let tensor = Tensor::<TrainingBackend, 1>::from_floats([1.0, 2.0], &device);
        assert_eq!(tensor.dims(), [2]);
    }
}
