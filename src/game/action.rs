/// Direction the snake can move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions, ordered by their action index
    pub const ALL: [Direction; Self::COUNT] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Number of discrete actions the policy chooses from
    pub const COUNT: usize = 4;

    /// Map a policy action index onto a direction
    ///
    /// - 0 → Up
    /// - 1 → Down
    /// - 2 → Left
    /// - 3 → Right
    ///
    /// Returns `None` for indices outside `0..4`.
    pub fn from_action_index(index: usize) -> Option<Direction> {
        Self::ALL.get(index).copied()
    }

    /// Inverse of [`Direction::from_action_index`]
    pub fn action_index(&self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// Returns true if turning from self to other would be a 180-degree turn
    pub fn is_opposite(&self, other: Direction) -> bool {
        matches!(
            (self, other),
            (Direction::Up, Direction::Down)
                | (Direction::Down, Direction::Up)
                | (Direction::Left, Direction::Right)
                | (Direction::Right, Direction::Left)
        )
    }

    /// Returns the delta (dx, dy) for moving in this direction
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}
