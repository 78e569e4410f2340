//! Actor-critic loss
//!
//! ```text
//! advantage_t = R_t - V(s_t)                        (detached)
//! policy      = Σ -log(max(π(a_t|s_t), floor)) · advantage_t
//! value       = Σ huber(R_t - V(s_t))
//! total       = (policy + 0.5 · value) / T
//! ```
//!
//! `R_t` are the standardized discounted returns from
//! [`crate::rl::returns`], and both `π` and `V` come from re-evaluating the
//! trajectory with the local model.

use burn::tensor::{ElementConversion, Int, Tensor, activation::softmax, backend::Backend};

/// Lower bound applied to action probabilities before the logarithm
pub const PROBABILITY_FLOOR: f32 = 1e-8;

/// Transition point between the quadratic and linear Huber regions
pub const HUBER_DELTA: f32 = 1.0;

/// Weight of the value loss in the total loss
pub const VALUE_LOSS_COEF: f32 = 0.5;

/// Loss tensors of one update, all of shape `[1]`
#[derive(Debug, Clone)]
pub struct LossOutput<B: Backend> {
    pub total: Tensor<B, 1>,
    pub policy: Tensor<B, 1>,
    pub value: Tensor<B, 1>,
}

impl<B: Backend> LossOutput<B> {
    /// `(policy, value)` as plain floats for reporting
    pub fn scalars(&self) -> (f32, f32) {
        (
            self.policy.clone().into_scalar().elem::<f32>(),
            self.value.clone().into_scalar().elem::<f32>(),
        )
    }
}

/// Elementwise Huber loss with [`HUBER_DELTA`]
pub fn huber<B: Backend>(diff: Tensor<B, 1>) -> Tensor<B, 1> {
    let abs = diff.abs();
    let quadratic = abs.clone().clamp_max(HUBER_DELTA);
    let linear = abs - quadratic.clone();

    quadratic.clone().mul(quadratic).mul_scalar(0.5) + linear.mul_scalar(HUBER_DELTA)
}

/// Combined policy and value loss over one trajectory
///
/// * `logits` - `[T, 4]` action logits from the local model
/// * `values` - `[T, 1]` value estimates from the local model
/// * `actions` - `[T]` actions actually taken
/// * `returns` - `[T]` standardized discounted returns
pub fn actor_critic_loss<B: Backend>(
    logits: Tensor<B, 2>,
    values: Tensor<B, 2>,
    actions: Tensor<B, 1, Int>,
    returns: Tensor<B, 1>,
) -> LossOutput<B> {
    let [steps, _] = logits.dims();
    let values = values.squeeze::<1>(1);

    let advantages = returns.clone() - values.clone().detach();

    let value = huber(returns - values).sum();

    let probs = softmax(logits, 1)
        .gather(1, actions.unsqueeze_dim(1))
        .squeeze::<1>(1);
    let log_probs = probs.clamp_min(PROBABILITY_FLOOR).log();
    let policy = log_probs.neg().mul(advantages).sum();

    let total = (policy.clone() + value.clone().mul_scalar(VALUE_LOSS_COEF))
        .div_scalar(steps.max(1) as f32);

    LossOutput {
        total,
        policy,
        value,
    }
}
