//! Shared parameter store
//!
//! Holds the single authoritative copy of the network and the optimizer
//! that updates it. Workers interact with it in two ways:
//!
//! - [`ParameterStore::snapshot`] returns a clone of the last committed
//!   parameters. It only waits for the pointer swap of a concurrent commit,
//!   never for an optimizer step.
//! - [`ParameterStore::apply`] runs one optimizer step with gradients that
//!   were computed on a worker replica and commits the result.
//!
//! Burn modules are `Send` but not `Sync`, so the committed model sits in a
//! `Mutex` rather than a read-write lock. Writers are serialized by the
//! optimizer lock because the optimizer state is updated in place.
//!
//! # Staleness
//!
//! A worker replica is refreshed right after each of its own updates, so it
//! never falls more than `update_frequency` acted steps behind its last
//! sync. Commits made by other workers in between are picked up at the
//! next refresh, and gradients computed against older parameters are
//! applied to whatever is committed when they arrive.

use super::ActorCriticNetwork;
use burn::{
    optim::{Adam, AdamConfig, GradientsParams, Optimizer, adaptor::OptimizerAdaptor},
    tensor::backend::AutodiffBackend,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Adam over the actor-critic network, the default shared optimizer
pub type SharedAdam<B> = OptimizerAdaptor<Adam, ActorCriticNetwork<B>, B>;

/// Authoritative network plus its optimizer
pub struct ParameterStore<B: AutodiffBackend, O> {
    committed: Mutex<ActorCriticNetwork<B>>,
    optimizer: Mutex<O>,
    learning_rate: f64,
    /// Number of committed updates
    version: AtomicU64,
}

impl<B: AutodiffBackend> ParameterStore<B, SharedAdam<B>> {
    /// Store updated by a fresh Adam optimizer
    pub fn with_adam(network: ActorCriticNetwork<B>, learning_rate: f64) -> Self {
        Self::new(network, AdamConfig::new().init(), learning_rate)
    }
}

impl<B, O> ParameterStore<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<ActorCriticNetwork<B>, B>,
{
    pub fn new(network: ActorCriticNetwork<B>, optimizer: O, learning_rate: f64) -> Self {
        Self {
            committed: Mutex::new(network),
            optimizer: Mutex::new(optimizer),
            learning_rate,
            version: AtomicU64::new(0),
        }
    }

    /// Clone of the last committed parameters
    ///
    /// The clone keeps parameter ids, so gradients computed on it can be
    /// passed back to [`ParameterStore::apply`].
    pub fn snapshot(&self) -> ActorCriticNetwork<B> {
        self.committed.lock().clone()
    }

    /// Apply gradients from a replica and commit the result
    ///
    /// Returns the version number of the new commit.
    pub fn apply(&self, grads: GradientsParams) -> u64 {
        let mut optimizer = self.optimizer.lock();

        let current = self.snapshot();
        let updated = optimizer.step(self.learning_rate, current, grads);

        *self.committed.lock() = updated;
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Number of commits so far
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::{ActorCriticConfig, TrainingBackend, default_device};
    use burn::module::AutodiffModule;
    use burn::tensor::Tensor;

    fn outputs_on_ones(network: &ActorCriticNetwork<TrainingBackend>) -> Vec<f32> {
        let device = default_device();
        let observation = Tensor::ones([2, 4, 12, 12, 3], &device);
        let (logits, value) = network.valid().forward(observation);

        let mut outputs = logits.into_data().to_vec::<f32>().unwrap();
        outputs.extend(value.into_data().to_vec::<f32>().unwrap());
        outputs
    }

    /// Gradients of `scale * sum(outputs)` with respect to `replica`
    fn gradients(replica: &ActorCriticNetwork<TrainingBackend>, scale: f32) -> GradientsParams {
        let device = default_device();
        let observation = Tensor::ones([2, 4, 12, 12, 3], &device);
        let (logits, value) = replica.forward(observation);
        let loss = (logits.sum() + value.sum()).mul_scalar(scale);
        GradientsParams::from_grads(loss.backward(), replica)
    }

    #[test]
    fn test_snapshot_matches_committed() {
        let device = default_device();
        let network = ActorCriticConfig::new(12, 12).init::<TrainingBackend>(&device);
        let expected = outputs_on_ones(&network);

        let store = ParameterStore::with_adam(network, 1e-3);

        assert_eq!(store.version(), 0);
        assert_eq!(outputs_on_ones(&store.snapshot()), expected);
    }

    #[test]
    fn test_apply_updates_shared_parameters() {
        let device = default_device();
        let network = ActorCriticConfig::new(12, 12).init::<TrainingBackend>(&device);
        let store = ParameterStore::with_adam(network, 1e-2);
        let before = outputs_on_ones(&store.snapshot());

        let replica = store.snapshot();
        let version = store.apply(gradients(&replica, 1.0));

        assert_eq!(version, 1);
        assert_eq!(store.version(), 1);
        assert_ne!(outputs_on_ones(&store.snapshot()), before);
        // The replica is a separate copy and keeps the old parameters
        assert_eq!(outputs_on_ones(&replica), before);
    }

    #[test]
    fn test_concurrent_zero_gradients_leave_parameters_unchanged() {
        let device = default_device();
        let network = ActorCriticConfig::new(12, 12).init::<TrainingBackend>(&device);
        let store = ParameterStore::with_adam(network, 1e-2);
        let before = outputs_on_ones(&store.snapshot());

        let workers = 4;
        let updates_per_worker = 3;

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    for _ in 0..updates_per_worker {
                        let replica = store.snapshot();
                        store.apply(gradients(&replica, 0.0));
                    }
                });
            }
        });

        assert_eq!(store.version(), (workers * updates_per_worker) as u64);

        let after = outputs_on_ones(&store.snapshot());
        for (b, a) in before.iter().zip(after.iter()) {
            assert!((b - a).abs() < 1e-7, "parameters drifted: {} -> {}", b, a);
        }
    }
}
