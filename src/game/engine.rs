use super::{
    action::Direction,
    config::GameConfig,
    state::{CollisionType, GameState, Position, Snake},
};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Information about a step
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Whether the snake ate food this step
    pub ate_food: bool,
    /// Type of collision if one occurred
    pub collision_type: Option<CollisionType>,
    /// The snake filled the board
    pub won: bool,
    /// The episode hit the step limit
    pub truncated: bool,
}

impl StepInfo {
    fn quiet() -> Self {
        Self {
            ate_food: false,
            collision_type: None,
            won: false,
            truncated: false,
        }
    }
}

/// Result of a game step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Reward for this step (for RL training)
    pub reward: f32,
    /// Whether the game has terminated
    pub terminated: bool,
    /// Additional information about the step
    pub info: StepInfo,
}

/// The game engine that handles all game logic
///
/// Randomness (food placement) comes from a seedable `StdRng`, so an
/// engine built with [`GameEngine::with_seed`] replays the same game for
/// the same sequence of directions.
pub struct GameEngine {
    config: GameConfig,
    rng: StdRng,
}

impl GameEngine {
    /// Create a new game engine seeded from OS entropy
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a reproducible game engine
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Reset the game to initial state
    pub fn reset(&mut self) -> GameState {
        let center_x = (self.config.grid_width / 2) as i32;
        let center_y = (self.config.grid_height / 2) as i32;

        let snake = Snake::new(
            Position::new(center_x, center_y),
            Direction::Right,
            self.config.initial_snake_length,
        );

        let mut state =
            GameState::new(snake, None, self.config.grid_width, self.config.grid_height);
        state.food = self.spawn_food(&state);
        state
    }

    /// Execute one step of the game
    pub fn step(&mut self, state: &mut GameState, direction: Direction) -> StepResult {
        if !state.is_alive {
            return StepResult {
                reward: 0.0,
                terminated: true,
                info: StepInfo::quiet(),
            };
        }

        // 180-degree turns are ignored
        if !state.snake.direction.is_opposite(direction) {
            state.snake.direction = direction;
        }

        let new_head = state.snake.head().moved_in_direction(state.snake.direction);
        state.steps += 1;

        if let Some(collision_type) = self.check_collision(state, new_head) {
            state.is_alive = false;

            return StepResult {
                reward: self.config.death_penalty,
                terminated: true,
                info: StepInfo {
                    collision_type: Some(collision_type),
                    ..StepInfo::quiet()
                },
            };
        }

        let ate_food = state.food == Some(new_head);
        state.snake.move_snake(ate_food);

        let mut reward = 0.0;
        let mut info = StepInfo {
            ate_food,
            ..StepInfo::quiet()
        };

        if ate_food {
            state.score += 1;
            reward = self.config.food_reward;

            if state.is_board_full() {
                state.food = None;
                state.is_alive = false;
                info.won = true;
                return StepResult {
                    reward: self.config.win_reward,
                    terminated: true,
                    info,
                };
            }

            state.food = self.spawn_food(state);
        }

        if state.steps >= self.config.max_steps {
            info.truncated = true;
            return StepResult {
                reward,
                terminated: true,
                info,
            };
        }

        StepResult {
            reward,
            terminated: false,
            info,
        }
    }

    /// Check if the new head position causes a collision
    fn check_collision(&self, state: &GameState, pos: Position) -> Option<CollisionType> {
        if !state.is_in_bounds(pos) {
            return Some(CollisionType::Wall);
        }

        if state.snake.collides_with_body(pos) {
            return Some(CollisionType::SelfCollision);
        }

        None
    }

    /// Pick a uniformly random free cell, or `None` when the board is full
    fn spawn_food(&mut self, state: &GameState) -> Option<Position> {
        let free: Vec<Position> = (0..state.grid_height as i32)
            .flat_map(|y| (0..state.grid_width as i32).map(move |x| Position::new(x, y)))
            .filter(|pos| !state.is_occupied_by_snake(*pos))
            .collect();

        free.choose(&mut self.rng).copied()
    }
}
