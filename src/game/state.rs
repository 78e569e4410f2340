use super::action::Direction;

/// Grid cell, `(0, 0)` is the top-left corner and `y` grows downward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Neighbouring cell one step towards `direction`
    pub fn moved_in_direction(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.moved_by(dx, dy)
    }
}

/// Snake body, head first
#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    pub body: Vec<Position>,
    /// Heading applied on the next move
    pub direction: Direction,
}

impl Snake {
    /// Straight snake of `length` cells with its tail trailing opposite to
    /// `direction`
    pub fn new(head: Position, direction: Direction, length: usize) -> Self {
        let (dx, dy) = direction.delta();
        let body = (0..length as i32)
            .map(|offset| head.moved_by(-dx * offset, -dy * offset))
            .collect();

        Self { body, direction }
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Everything behind the head
    pub fn body_segments(&self) -> &[Position] {
        &self.body[1..]
    }

    pub fn collides_with_body(&self, pos: Position) -> bool {
        self.body_segments().contains(&pos)
    }

    /// Advance one cell; the tail stays in place when `should_grow`
    pub fn move_snake(&mut self, should_grow: bool) {
        let new_head = self.head().moved_in_direction(self.direction);
        self.body.insert(0, new_head);

        if !should_grow {
            self.body.pop();
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// What ended an episode early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionType {
    Wall,
    SelfCollision,
}

/// Board snapshot for one step of an episode
///
/// The engine is the only writer. `food` is `None` only after the snake
/// has filled the board, which is also the winning condition.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub snake: Snake,
    pub food: Option<Position>,
    pub grid_width: usize,
    pub grid_height: usize,
    /// Food eaten this episode
    pub score: u32,
    pub steps: u32,
    /// False after a collision or a win
    pub is_alive: bool,
}

impl GameState {
    pub fn new(
        snake: Snake,
        food: Option<Position>,
        grid_width: usize,
        grid_height: usize,
    ) -> Self {
        Self {
            snake,
            food,
            grid_width,
            grid_height,
            score: 0,
            steps: 0,
            is_alive: true,
        }
    }

    pub fn is_in_bounds(&self, pos: Position) -> bool {
        (0..self.grid_width as i32).contains(&pos.x)
            && (0..self.grid_height as i32).contains(&pos.y)
    }

    /// Head or body covers `pos`
    pub fn is_occupied_by_snake(&self, pos: Position) -> bool {
        self.snake.body.contains(&pos)
    }

    pub fn cell_count(&self) -> usize {
        self.grid_width * self.grid_height
    }

    /// No free cell is left for food
    pub fn is_board_full(&self) -> bool {
        self.snake.len() >= self.cell_count()
    }
}
