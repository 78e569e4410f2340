//! Actor-Critic neural network for the Snake A3C agent
//!
//! A small convolutional trunk shared by two heads:
//! - **Actor head**: action logits over the 4 directions
//! - **Critic head**: scalar state-value estimate
//!
//! # Architecture
//!
//! ```text
//! Input: [batch, K, H, W, C]  (stacked RGB frames)
//!   ↓ Reorder to [batch, K*C, H, W]
//!   ↓ Conv2d(K*C→16, k=8, s=4, p=2) + ReLU
//!   ↓ Conv2d(16→32, k=4, s=2, p=1) + ReLU
//!   ↓ Flatten
//!   ↓ Linear(→256) + ReLU
//!   ├─→ Actor: Linear(256 → 4)
//!   └─→ Critic: Linear(256 → 1)
//! ```
//!
//! # Example
//!
//! ```rust
//! use snake_a3c::rl::{ActorCriticConfig, ActorCriticNetwork};
//! use burn::backend::ndarray::NdArrayDevice;
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//!
//! type Backend = NdArray<f32>;
//!
//! // 6x6 board rendered at 10 pixels per cell
//! let device = NdArrayDevice::default();
//! let network = ActorCriticConfig::new(60, 60).init::<Backend>(&device);
//!
//! let observation = Tensor::zeros([2, 4, 60, 60, 3], &device);
//! let (action_logits, value) = network.forward(observation);
//!
//! assert_eq!(action_logits.dims(), [2, 4]);
//! assert_eq!(value.dims(), [2, 1]);
//! ```

use burn::{
    module::Module,
    nn::{
        Linear, LinearConfig, PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
    },
    tensor::{Tensor, activation::relu, backend::Backend},
};
use serde::{Deserialize, Serialize};

use super::observation::{COLOR_CHANNELS, FRAME_STACK};
use crate::game::Direction;

/// `(kernel, stride, padding)` of the two convolutions
const CONV1: (usize, usize, usize) = (8, 4, 2);
const CONV2: (usize, usize, usize) = (4, 2, 1);

/// Spatial output size of a convolution, `None` if the input is too small
pub fn conv_output_size(
    input: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
) -> Option<usize> {
    if stride == 0 {
        return None;
    }
    let span = (input + 2 * padding).checked_sub(kernel)?;
    Some(span / stride + 1)
}

/// Configuration for the Actor-Critic network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorCriticConfig {
    /// Number of stacked frames per observation
    pub frame_stack: usize,
    /// Colour channels per frame
    pub color_channels: usize,
    /// Number of discrete actions
    pub num_actions: usize,
    /// Frame height in pixels
    pub frame_height: usize,
    /// Frame width in pixels
    pub frame_width: usize,
    /// Output channels of the two convolutions
    pub conv_channels: [usize; 2],
    /// Width of the shared dense layer
    pub hidden_dim: usize,
}

impl ActorCriticConfig {
    /// Create a configuration for frames of the given pixel size
    pub fn new(frame_height: usize, frame_width: usize) -> Self {
        Self {
            frame_stack: FRAME_STACK,
            color_channels: COLOR_CHANNELS,
            num_actions: Direction::COUNT,
            frame_height,
            frame_width,
            conv_channels: [16, 32],
            hidden_dim: 256,
        }
    }

    /// Spatial size `(height, width)` after the convolution stack
    pub fn conv_output_dims(&self) -> Option<(usize, usize)> {
        let reduce = |input: usize| {
            let after_first = conv_output_size(input, CONV1.0, CONV1.1, CONV1.2)?;
            conv_output_size(after_first, CONV2.0, CONV2.1, CONV2.2)
        };
        Some((reduce(self.frame_height)?, reduce(self.frame_width)?))
    }

    /// Reject frame sizes the convolution stack cannot reduce to one cell
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_stack == 0 || self.color_channels == 0 {
            return Err("frame_stack and color_channels must be positive".to_string());
        }
        if self.num_actions == 0 || self.hidden_dim == 0 {
            return Err("num_actions and hidden_dim must be positive".to_string());
        }

        match self.conv_output_dims() {
            Some((h, w)) if h > 0 && w > 0 => Ok(()),
            _ => Err(format!(
                "frames of {}x{} pixels are too small for the convolution stack",
                self.frame_height, self.frame_width
            )),
        }
    }

    /// Initialize the network, validating the frame size first
    pub fn try_init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<ActorCriticNetwork<B>, String> {
        self.validate()?;
        Ok(self.init(device))
    }

    /// Initialize the network
    ///
    /// Frame sizes that fail [`ActorCriticConfig::validate`] fall back to a
    /// single flattened cell; use [`ActorCriticConfig::try_init`] to reject
    /// them instead.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ActorCriticNetwork<B> {
        let (out_h, out_w) = self.conv_output_dims().unwrap_or((1, 1));
        let flattened_dim = self.conv_channels[1] * out_h * out_w;
        let input_channels = self.frame_stack * self.color_channels;

        ActorCriticNetwork {
            conv1: Conv2dConfig::new([input_channels, self.conv_channels[0]], [CONV1.0; 2])
                .with_stride([CONV1.1; 2])
                .with_padding(PaddingConfig2d::Explicit(CONV1.2, CONV1.2))
                .init(device),
            conv2: Conv2dConfig::new([self.conv_channels[0], self.conv_channels[1]], [CONV2.0; 2])
                .with_stride([CONV2.1; 2])
                .with_padding(PaddingConfig2d::Explicit(CONV2.2, CONV2.2))
                .init(device),
            fc_shared: LinearConfig::new(flattened_dim, self.hidden_dim).init(device),
            actor_head: LinearConfig::new(self.hidden_dim, self.num_actions).init(device),
            critic_head: LinearConfig::new(self.hidden_dim, 1).init(device),
        }
    }
}

impl Default for ActorCriticConfig {
    fn default() -> Self {
        Self::new(60, 60)
    }
}

/// Actor-Critic network with shared convolutional trunk
///
/// Cloning the module keeps parameter ids, so gradients computed on a
/// clone can be applied to the original by an optimizer.
#[derive(Module, Debug)]
pub struct ActorCriticNetwork<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    fc_shared: Linear<B>,
    actor_head: Linear<B>,
    critic_head: Linear<B>,
}

impl<B: Backend> ActorCriticNetwork<B> {
    /// Forward pass
    ///
    /// `observation` has shape `[batch, K, H, W, C]`. Returns
    /// `(action_logits [batch, 4], value [batch, 1])`.
    pub fn forward(&self, observation: Tensor<B, 5>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch_size, stack, height, width, channels] = observation.dims();

        // [b, K, H, W, C] -> [b, K, C, H, W] -> [b, K*C, H, W]
        let x = observation.swap_dims(3, 4).swap_dims(2, 3);
        let x = x.reshape([batch_size, stack * channels, height, width]);

        let x = relu(self.conv1.forward(x));
        let x = relu(self.conv2.forward(x));

        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = relu(self.fc_shared.forward(x));

        let action_logits = self.actor_head.forward(x.clone());
        let value = self.critic_head.forward(x);

        (action_logits, value)
    }

    #[cfg(test)]
    pub(crate) fn critic_weight(&self) -> Tensor<B, 2> {
        self.critic_head.weight.val()
    }

    #[cfg(test)]
    pub(crate) fn actor_weight(&self) -> Tensor<B, 2> {
        self.actor_head.weight.val()
    }
}
