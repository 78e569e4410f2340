//! Discounted returns and advantages
//!
//! Plain `f32` math over one rollout segment. Tensor work happens in
//! [`crate::rl::loss`]; these helpers stay backend-free so they can be
//! checked by hand.

/// Added to the standard deviation before dividing
pub const STD_EPSILON: f32 = f32::EPSILON;

/// Discounted returns `R_t = r_t + gamma * R_{t+1}` with `R_{T} = bootstrap`
///
/// Output has the same length and order as `rewards`.
pub fn discounted_returns(rewards: &[f32], gamma: f32, bootstrap: f32) -> Vec<f32> {
    let mut returns = vec![0.0; rewards.len()];
    let mut running = bootstrap;

    for (t, &reward) in rewards.iter().enumerate().rev() {
        running = reward + gamma * running;
        returns[t] = running;
    }

    returns
}

/// Standardize to zero mean and unit variance
///
/// Uses the population standard deviation plus [`STD_EPSILON`], so a batch
/// of identical values (including a single element) maps to zeros instead
/// of NaN.
pub fn standardize(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }

    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    let std = variance.sqrt() + STD_EPSILON;

    values.iter().map(|v| (v - mean) / std).collect()
}

/// Standardized discounted returns for one trajectory
pub fn normalized_returns(rewards: &[f32], gamma: f32, bootstrap: f32) -> Vec<f32> {
    standardize(&discounted_returns(rewards, gamma, bootstrap))
}

/// `returns[t] - values[t]` for every step
pub fn advantages(returns: &[f32], values: &[f32]) -> Vec<f32> {
    returns
        .iter()
        .zip(values.iter())
        .map(|(ret, value)| ret - value)
        .collect()
}
