use std::collections::VecDeque;

use crate::config::{CellWidth, MAX_TAPE_CELLS};

/// The memory tape and its data pointer.
///
/// The tape never runs out: stepping past the tail appends a zero cell, and
/// stepping left of the head inserts a zero cell in front and keeps the
/// pointer at index 0. A `VecDeque` keeps both kinds of growth O(1) amortized.
#[derive(Debug, Clone)]
pub struct Tape {
    cells: VecDeque<u32>,
    pointer: usize,
    width: CellWidth,
}

impl Tape {
    /// Create a tape of `initial_cells` zeroed cells, clamped to
    /// `1..=MAX_TAPE_CELLS`.
    pub fn new(initial_cells: usize, width: CellWidth) -> Self {
        Self {
            cells: VecDeque::from(vec![0; initial_cells.clamp(1, MAX_TAPE_CELLS)]),
            pointer: 0,
            width,
        }
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn width(&self) -> CellWidth {
        self.width
    }

    /// Value of the cell under the pointer.
    pub fn get(&self) -> u32 {
        self.cells[self.pointer]
    }

    /// Store `value` under the pointer, reduced to the cell width.
    pub fn set(&mut self, value: u32) {
        self.cells[self.pointer] = self.width.reduce(value);
    }

    pub fn increment(&mut self) {
        self.set(self.get().wrapping_add(1));
    }

    pub fn decrement(&mut self) {
        self.set(self.get().wrapping_sub(1));
    }

    pub fn move_right(&mut self) {
        self.pointer += 1;
        if self.pointer == self.cells.len() {
            self.cells.push_back(0);
        }
    }

    /// Move left; at the head a fresh cell is inserted and the pointer stays 0.
    pub fn move_left(&mut self) {
        if self.pointer == 0 {
            self.cells.push_front(0);
        } else {
            self.pointer -= 1;
        }
    }
}
