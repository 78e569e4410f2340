use std::collections::VecDeque;

use burn::tensor::{Tensor, TensorData, backend::Backend};

use crate::game::{GameState, Position};

/// Number of frames stacked into one observation
pub const FRAME_STACK: usize = 4;

/// Colour channels per pixel
pub const COLOR_CHANNELS: usize = 3;

const HEAD_COLOR: [f32; 3] = [1.0, 1.0, 1.0];
const BODY_COLOR: [f32; 3] = [0.0, 1.0, 0.0];
const FOOD_COLOR: [f32; 3] = [1.0, 0.0, 0.0];

/// Render the board as an RGB frame with values in `[0, 1]`
///
/// Layout is row-major `[height * block, width * block, 3]`. Every cell is a
/// `block_size` square; with `block_size >= 3` the coloured block is inset
/// by one pixel so neighbouring segments stay distinguishable.
pub fn render_frame(state: &GameState, block_size: usize) -> Vec<f32> {
    let height = state.grid_height * block_size;
    let width = state.grid_width * block_size;
    let mut frame = vec![0.0; height * width * COLOR_CHANNELS];

    for &segment in state.snake.body_segments() {
        paint_cell(&mut frame, width, block_size, segment, BODY_COLOR);
    }
    paint_cell(&mut frame, width, block_size, state.snake.head(), HEAD_COLOR);

    if let Some(food) = state.food {
        paint_cell(&mut frame, width, block_size, food, FOOD_COLOR);
    }

    frame
}

fn paint_cell(
    frame: &mut [f32],
    frame_width: usize,
    block_size: usize,
    cell: Position,
    color: [f32; 3],
) {
    if cell.x < 0 || cell.y < 0 {
        return;
    }

    let inset = if block_size >= 3 { 1 } else { 0 };
    let left = cell.x as usize * block_size;
    let top = cell.y as usize * block_size;
    if left >= frame_width {
        return;
    }

    for y in top + inset..top + block_size - inset {
        for x in left + inset..left + block_size - inset {
            let idx = (y * frame_width + x) * COLOR_CHANNELS;
            if let Some(pixel) = frame.get_mut(idx..idx + COLOR_CHANNELS) {
                pixel.copy_from_slice(&color);
            }
        }
    }
}

/// FIFO window over the most recent rendered frames
///
/// The oldest frame is evicted on push. After [`FrameStack::reset`] the
/// window holds `capacity` copies of the initial frame, so an observation
/// is always full-depth.
#[derive(Debug, Clone)]
pub struct FrameStack {
    frames: VecDeque<Vec<f32>>,
    capacity: usize,
    height: usize,
    width: usize,
}

impl FrameStack {
    pub fn new(capacity: usize, height: usize, width: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            height,
            width,
        }
    }

    /// Drop all frames and fill the window with copies of `frame`
    pub fn reset(&mut self, frame: Vec<f32>) {
        self.frames.clear();
        for _ in 1..self.capacity {
            self.frames.push_back(frame.clone());
        }
        self.frames.push_back(frame);
    }

    pub fn push(&mut self, frame: Vec<f32>) {
        if self.frames.len() >= self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Flattened frames, oldest first
    pub fn to_vec(&self) -> Vec<f32> {
        self.frames.iter().flatten().copied().collect()
    }

    /// Stack as a tensor of shape `[K, H, W, C]`
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        let data = TensorData::new(
            self.to_vec(),
            [self.frames.len(), self.height, self.width, COLOR_CHANNELS],
        );
        Tensor::from_data(data, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Direction, Snake};
    use burn::backend::NdArray;
    use burn::backend::ndarray::NdArrayDevice;

    type TestBackend = NdArray<f32>;

    fn sample_state() -> GameState {
        let snake = Snake::new(Position::new(3, 3), Direction::Right, 3);
        GameState::new(snake, Some(Position::new(0, 0)), 6, 6)
    }

    fn pixel(frame: &[f32], width: usize, x: usize, y: usize) -> [f32; 3] {
        let idx = (y * width + x) * COLOR_CHANNELS;
        [frame[idx], frame[idx + 1], frame[idx + 2]]
    }

    #[test]
    fn test_frame_size() {
        let frame = render_frame(&sample_state(), 10);
        assert_eq!(frame.len(), 60 * 60 * 3);
    }

    #[test]
    fn test_frame_colors() {
        let frame = render_frame(&sample_state(), 10);

        // Head at (3,3): pixel (35, 35) is inside the block
        assert_eq!(pixel(&frame, 60, 35, 35), HEAD_COLOR);
        // Body at (2,3)
        assert_eq!(pixel(&frame, 60, 25, 35), BODY_COLOR);
        // Food at (0,0)
        assert_eq!(pixel(&frame, 60, 5, 5), FOOD_COLOR);
        // Background
        assert_eq!(pixel(&frame, 60, 55, 5), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_block_inset() {
        let frame = render_frame(&sample_state(), 10);

        // Top-left pixel of the head block stays background
        assert_eq!(pixel(&frame, 60, 30, 30), [0.0, 0.0, 0.0]);
        assert_eq!(pixel(&frame, 60, 31, 31), HEAD_COLOR);
    }

    #[test]
    fn test_small_blocks_fill_cell() {
        let frame = render_frame(&sample_state(), 2);
        assert_eq!(pixel(&frame, 12, 6, 6), HEAD_COLOR);
        assert_eq!(pixel(&frame, 12, 7, 7), HEAD_COLOR);
    }

    #[test]
    fn test_values_in_range() {
        let frame = render_frame(&sample_state(), 4);
        assert!(frame.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_reset_fills_stack() {
        let mut stack = FrameStack::new(FRAME_STACK, 1, 1);
        stack.reset(vec![0.5; 3]);

        assert_eq!(stack.len(), FRAME_STACK);
        assert!(stack.to_vec().iter().all(|v| *v == 0.5));
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut stack = FrameStack::new(FRAME_STACK, 1, 1);
        stack.reset(vec![0.0; 3]);

        for i in 1..=FRAME_STACK {
            stack.push(vec![i as f32; 3]);
        }

        assert_eq!(stack.len(), FRAME_STACK);
        let values = stack.to_vec();
        assert_eq!(values[0], 1.0);
        assert_eq!(values[values.len() - 1], FRAME_STACK as f32);
    }

    #[test]
    fn test_tensor_shape() {
        let device = NdArrayDevice::default();
        let mut stack = FrameStack::new(FRAME_STACK, 24, 24);
        stack.reset(render_frame(&sample_state(), 4));

        let tensor = stack.to_tensor::<TestBackend>(&device);
        assert_eq!(tensor.dims(), [4, 24, 24, 3]);
    }
}
