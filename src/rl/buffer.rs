//! Per-worker trajectory buffer
//!
//! Holds the (state, action, reward) triples of the current rollout
//! segment. A worker owns exactly one buffer and clears it after every
//! gradient update; nothing here is ever shared or persisted.

use burn::tensor::{Int, Tensor, backend::Backend};

/// Ordered rollout segment of one worker
///
/// ```rust
/// use snake_a3c::rl::Trajectory;
/// use burn::backend::ndarray::{NdArray, NdArrayDevice};
/// use burn::tensor::Tensor;
///
/// type Backend = NdArray<f32>;
///
/// let device = NdArrayDevice::default();
/// let mut trajectory = Trajectory::<Backend>::new();
///
/// trajectory.push(Tensor::zeros([4, 12, 12, 3], &device), 3, 0.0);
/// assert_eq!(trajectory.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Trajectory<B: Backend> {
    /// Observations `[K, H, W, C]` the actions were taken in
    states: Vec<Tensor<B, 4>>,
    /// Action indices in `0..4`
    actions: Vec<usize>,
    /// Rewards received after each action
    rewards: Vec<f32>,
}

impl<B: Backend> Default for Trajectory<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Trajectory<B> {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            actions: Vec::new(),
            rewards: Vec::new(),
        }
    }

    /// Append one transition
    pub fn push(&mut self, state: Tensor<B, 4>, action: usize, reward: f32) {
        self.states.push(state);
        self.actions.push(action);
        self.rewards.push(reward);
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    pub fn actions(&self) -> &[usize] {
        &self.actions
    }

    /// States stacked along a new batch dimension: `[T, K, H, W, C]`
    ///
    /// Returns `None` for an empty trajectory.
    pub fn states_batch(&self) -> Option<Tensor<B, 5>> {
        if self.states.is_empty() {
            return None;
        }
        Some(Tensor::stack(self.states.clone(), 0))
    }

    /// Actions as an integer tensor of shape `[T]`
    pub fn actions_tensor<A: Backend>(&self, device: &A::Device) -> Tensor<A, 1, Int> {
        let actions: Vec<i32> = self.actions.iter().map(|&a| a as i32).collect();
        Tensor::<A, 1, Int>::from_ints(actions.as_slice(), device)
    }

    /// Drop all transitions
    pub fn clear(&mut self) {
        self.states.clear();
        self.actions.clear();
        self.rewards.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    type TestBackend = NdArray<f32>;

    fn state(device: &NdArrayDevice, fill: f32) -> Tensor<TestBackend, 4> {
        Tensor::full([4, 2, 2, 3], fill, device)
    }

    #[test]
    fn test_push_and_len() {
        let device = NdArrayDevice::default();
        let mut trajectory = Trajectory::<TestBackend>::new();
        assert!(trajectory.is_empty());

        trajectory.push(state(&device, 0.0), 1, 0.0);
        trajectory.push(state(&device, 1.0), 2, -1.0);

        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.actions(), &[1, 2]);
        assert_eq!(trajectory.rewards(), &[0.0, -1.0]);
    }

    #[test]
    fn test_states_batch_preserves_order() {
        let device = NdArrayDevice::default();
        let mut trajectory = Trajectory::<TestBackend>::new();
        assert!(trajectory.states_batch().is_none());

        trajectory.push(state(&device, 0.0), 0, 0.0);
        trajectory.push(state(&device, 1.0), 0, 0.0);
        trajectory.push(state(&device, 2.0), 0, 0.0);

        let batch = trajectory.states_batch().unwrap();
        assert_eq!(batch.dims(), [3, 4, 2, 2, 3]);

        let values = batch.into_data().to_vec::<f32>().unwrap();
        let per_state = 4 * 2 * 2 * 3;
        assert_eq!(values[0], 0.0);
        assert_eq!(values[per_state], 1.0);
        assert_eq!(values[2 * per_state], 2.0);
    }

    #[test]
    fn test_actions_tensor() {
        let device = NdArrayDevice::default();
        let mut trajectory = Trajectory::<TestBackend>::new();
        trajectory.push(state(&device, 0.0), 3, 0.0);
        trajectory.push(state(&device, 0.0), 0, 0.0);

        let actions = trajectory.actions_tensor::<TestBackend>(&device);
        assert_eq!(actions.dims(), [2]);
        let values: Vec<i64> = actions.into_data().iter::<i64>().collect();
        assert_eq!(values, vec![3, 0]);
    }

    #[test]
    fn test_clear() {
        let device = NdArrayDevice::default();
        let mut trajectory = Trajectory::<TestBackend>::new();
        trajectory.push(state(&device, 0.0), 1, 1.0);

        trajectory.clear();

        assert!(trajectory.is_empty());
        assert!(trajectory.states_batch().is_none());
        assert!(trajectory.actions().is_empty());
    }
}
