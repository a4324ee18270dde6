use crate::error::EngineError;

/// Fixed-capacity byte memory with a single data pointer.
///
/// Cells wrap modulo 256 on increment and decrement. The pointer never wraps:
/// moving off either end is a [`EngineError::PointerOutOfBounds`] error and
/// leaves the pointer where it was.
#[derive(Debug, Clone)]
pub struct Tape {
    cells: Vec<u8>,
    pointer: usize,
}

impl Tape {
    pub fn new(size: usize) -> Result<Self, EngineError> {
        if size == 0 {
            return Err(EngineError::InvalidMemorySize { size });
        }
        Ok(Self {
            cells: vec![0; size],
            pointer: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn get(&self) -> u8 {
        self.cells[self.pointer]
    }

    pub fn set(&mut self, value: u8) {
        self.cells[self.pointer] = value;
    }

    pub fn inc(&mut self) {
        let cell = &mut self.cells[self.pointer];
        *cell = cell.wrapping_add(1);
    }

    pub fn dec(&mut self) {
        let cell = &mut self.cells[self.pointer];
        *cell = cell.wrapping_sub(1);
    }

    /// Move right one cell. `ip` is only used to locate a bounds error.
    pub fn move_right(&mut self, ip: usize) -> Result<(), EngineError> {
        if self.pointer + 1 < self.cells.len() {
            self.pointer += 1;
            return Ok(());
        }
        Err(EngineError::PointerOutOfBounds {
            ip,
            ptr: self.pointer,
            op: '>',
        })
    }

    /// Move left one cell. `ip` is only used to locate a bounds error.
    pub fn move_left(&mut self, ip: usize) -> Result<(), EngineError> {
        if self.pointer > 0 {
            self.pointer -= 1;
            return Ok(());
        }
        Err(EngineError::PointerOutOfBounds {
            ip,
            ptr: self.pointer,
            op: '<',
        })
    }
}
