use super::observation::{FRAME_STACK, FrameStack, render_frame};
use crate::game::{Direction, GameConfig, GameEngine, GameState};
use burn::tensor::{Tensor, backend::Backend};

/// Turn-based environment driven by a worker
///
/// `step` is deterministic given the environment's internal state and the
/// direction supplied. Observations are stacked frames of shape
/// `[K, H, W, C]`.
pub trait Environment<B: Backend> {
    /// Start a new episode
    fn reset(&mut self);

    /// Current stacked-frame observation
    fn observation(&self) -> Tensor<B, 4>;

    /// Advance one step, returning `(reward, done)`
    fn step(&mut self, direction: Direction) -> (f32, bool);
}

/// Snake environment for reinforcement learning
///
/// Wraps the game engine and renders every state into an RGB frame pushed
/// onto a 4-deep [`FrameStack`].
pub struct SnakeEnvironment<B: Backend> {
    engine: GameEngine,
    state: GameState,
    frames: FrameStack,
    block_size: usize,
    device: B::Device,
}

impl<B: Backend> SnakeEnvironment<B> {
    /// Create a new Snake environment seeded from OS entropy
    pub fn new(config: GameConfig, device: B::Device) -> Self {
        Self::from_engine(GameEngine::new(config), device)
    }

    /// Create a reproducible Snake environment
    pub fn with_seed(config: GameConfig, seed: u64, device: B::Device) -> Self {
        Self::from_engine(GameEngine::with_seed(config, seed), device)
    }

    fn from_engine(mut engine: GameEngine, device: B::Device) -> Self {
        let config = engine.config().clone();
        let state = engine.reset();
        let mut frames =
            FrameStack::new(FRAME_STACK, config.frame_height(), config.frame_width());
        frames.reset(render_frame(&state, config.block_size));

        Self {
            engine,
            state,
            frames,
            block_size: config.block_size,
            device,
        }
    }

    /// Get the device used by this environment
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Get reference to current game state (for testing/debugging)
    pub fn state(&self) -> &GameState {
        &self.state
    }
}

impl<B: Backend> Environment<B> for SnakeEnvironment<B> {
    fn reset(&mut self) {
        self.state = self.engine.reset();
        self.frames.reset(render_frame(&self.state, self.block_size));
    }

    fn observation(&self) -> Tensor<B, 4> {
        self.frames.to_tensor(&self.device)
    }

    fn step(&mut self, direction: Direction) -> (f32, bool) {
        let result = self.engine.step(&mut self.state, direction);
        self.frames.push(render_frame(&self.state, self.block_size));
        (result.reward, result.terminated)
    }
}

/// Deterministic environments for driving workers in tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Replays a fixed reward script; the episode ends after the last reward
    pub struct ScriptedEnvironment<B: Backend> {
        rewards: Vec<f32>,
        cursor: usize,
        frame_height: usize,
        frame_width: usize,
        device: B::Device,
    }

    impl<B: Backend> ScriptedEnvironment<B> {
        pub fn new(
            rewards: Vec<f32>,
            frame_height: usize,
            frame_width: usize,
            device: B::Device,
        ) -> Self {
            Self {
                rewards,
                cursor: 0,
                frame_height,
                frame_width,
                device,
            }
        }
    }

    impl<B: Backend> Environment<B> for ScriptedEnvironment<B> {
        fn reset(&mut self) {
            self.cursor = 0;
        }

        fn observation(&self) -> Tensor<B, 4> {
            Tensor::zeros(
                [FRAME_STACK, self.frame_height, self.frame_width, 3],
                &self.device,
            )
        }

        fn step(&mut self, _direction: Direction) -> (f32, bool) {
            let reward = self.rewards.get(self.cursor).copied().unwrap_or(0.0);
            self.cursor += 1;
            (reward, self.cursor >= self.rewards.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Position;
    use burn::backend::NdArray;
    use burn::backend::ndarray::NdArrayDevice;

    type TestBackend = NdArray<f32>;

    fn small_config() -> GameConfig {
        let mut config = GameConfig::square(6);
        config.block_size = 2;
        config
    }

    #[test]
    fn test_environment_creation() {
        let device = NdArrayDevice::default();
        let env = SnakeEnvironment::<TestBackend>::new(small_config(), device);

        assert!(env.state().is_alive);
        assert_eq!(env.state().score, 0);
        assert_eq!(env.state().steps, 0);
    }

    #[test]
    fn test_observation_shape() {
        let device = NdArrayDevice::default();
        let mut env = SnakeEnvironment::<TestBackend>::new(GameConfig::default(), device);

        env.reset();
        assert_eq!(env.observation().dims(), [4, 60, 60, 3]);
    }

    #[test]
    fn test_step_advances_game() {
        let device = NdArrayDevice::default();
        let mut env = SnakeEnvironment::<TestBackend>::new(small_config(), device);
        env.state.food = Some(Position::new(0, 0));

        let (reward, done) = env.step(Direction::Right);

        assert_eq!(reward, 0.0);
        assert!(!done);
        assert_eq!(env.state().steps, 1);
    }

    #[test]
    fn test_wall_collision_is_terminal() {
        let device = NdArrayDevice::default();
        let mut env = SnakeEnvironment::<TestBackend>::new(small_config(), device);

        let mut done = false;
        let mut reward = 0.0;
        for _ in 0..6 {
            (reward, done) = env.step(Direction::Up);
            if done {
                break;
            }
        }

        assert!(done);
        assert_eq!(reward, -1.0);
        assert!(!env.state().is_alive);
    }

    #[test]
    fn test_food_reward() {
        let device = NdArrayDevice::default();
        let mut env = SnakeEnvironment::<TestBackend>::new(small_config(), device);

        let head = env.state().snake.head();
        env.state.food = Some(head.moved_in_direction(Direction::Right));

        let (reward, _) = env.step(Direction::Right);

        assert_eq!(reward, 1.0);
        assert_eq!(env.state().score, 1);
    }

    #[test]
    fn test_newest_frame_differs_after_step() {
        let device = NdArrayDevice::default();
        let mut env = SnakeEnvironment::<TestBackend>::new(small_config(), device);

        let before = env.observation().into_data().to_vec::<f32>().unwrap();
        env.step(Direction::Right);
        let after = env.observation().into_data().to_vec::<f32>().unwrap();

        let frame_len = before.len() / FRAME_STACK;
        // The last three frames of `before` shift down by one
        assert_eq!(&after[..frame_len * 3], &before[frame_len..]);
        assert_ne!(&after[frame_len * 3..], &before[frame_len * 3..]);
    }

    #[test]
    fn test_seeded_environments_agree() {
        let device = NdArrayDevice::default();
        let a = SnakeEnvironment::<TestBackend>::with_seed(small_config(), 11, device.clone());
        let b = SnakeEnvironment::<TestBackend>::with_seed(small_config(), 11, device);

        assert_eq!(a.state().food, b.state().food);
    }

    #[test]
    fn test_scripted_environment() {
        let device = NdArrayDevice::default();
        let mut env =
            testing::ScriptedEnvironment::<TestBackend>::new(vec![0.0, -1.0], 8, 8, device);

        assert_eq!(env.step(Direction::Up), (0.0, false));
        assert_eq!(env.step(Direction::Up), (-1.0, true));

        env.reset();
        assert_eq!(env.step(Direction::Up), (0.0, false));
        assert_eq!(env.observation().dims(), [4, 8, 8, 3]);
    }
}
