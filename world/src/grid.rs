use pipeflow_core::{
    CellCoord, Direction, LevelDescriptor, LevelError, PipeDescriptor, PipeEditError,
    PlacementError, Rotation, MAX_GRID_SIZE,
};

use crate::pipe::Pipe;

/// Role a cell plays in the level layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellRole {
    /// Free cell that accepts player pipes.
    Open,
    /// Fixed water source.
    Start,
    /// Fixed drain the water must reach.
    End,
}

/// Single grid position, possibly holding a pipe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    coord: CellCoord,
    pipe: Option<Pipe>,
    role: CellRole,
}

impl Cell {
    const fn new(coord: CellCoord) -> Self {
        Self {
            coord,
            pipe: None,
            role: CellRole::Open,
        }
    }

    /// Coordinate identifying the cell.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Pipe held by the cell, if any.
    #[must_use]
    pub const fn pipe(&self) -> Option<&Pipe> {
        self.pipe.as_ref()
    }

    /// Role of the cell in the level layout.
    #[must_use]
    pub const fn role(&self) -> CellRole {
        self.role
    }

    /// Reports whether the cell is the level source.
    #[must_use]
    pub const fn is_start(&self) -> bool {
        matches!(self.role, CellRole::Start)
    }

    /// Reports whether the cell is the level drain.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self.role, CellRole::End)
    }

    /// Reports whether the cell holds a pipe.
    #[must_use]
    pub const fn has_pipe(&self) -> bool {
        self.pipe.is_some()
    }

    /// Reports whether a player pipe may be placed into the cell.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pipe.is_none() && matches!(self.role, CellRole::Open)
    }

    fn set_pipe(&mut self, pipe: Pipe) {
        debug_assert_eq!(self.role, CellRole::Open);
        self.pipe = Some(pipe);
    }

    fn remove_pipe(&mut self) -> Option<Pipe> {
        if self.role != CellRole::Open {
            return None;
        }
        self.pipe.take()
    }

    fn assign_endpoint(&mut self, role: CellRole, pipe: Pipe) {
        self.role = role;
        self.pipe = Some(pipe);
    }
}

/// Square grid of cells with fixed start and end endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    size: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates an empty `size × size` grid without endpoints.
    ///
    /// Sizes above [`MAX_GRID_SIZE`] are refused before anything is allocated.
    pub fn new(size: u32) -> Result<Self, LevelError> {
        if size == 0 {
            return Err(LevelError::EmptyGrid);
        }
        if size > MAX_GRID_SIZE {
            return Err(LevelError::TooLarge(size));
        }
        let mut cells = Vec::with_capacity(size as usize * size as usize);
        for row in 0..size {
            for col in 0..size {
                cells.push(Cell::new(CellCoord::new(row, col)));
            }
        }
        Ok(Self { size, cells })
    }

    /// Builds the grid described by a level, with its endpoints in place.
    pub fn from_level(level: &LevelDescriptor) -> Result<Self, LevelError> {
        let mut grid = Self::new(level.size)?;
        grid.set_start(level.start.cell(), level.start_direction())?;
        grid.set_end(level.end.cell(), level.end_direction())?;
        Ok(grid)
    }

    /// Edge length of the grid.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Cell at `coord`, or `None` when it lies outside the grid.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).and_then(|index| self.cells.get(index))
    }

    /// Iterates every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Marks `coord` as the level source. Load-time only.
    pub fn set_start(&mut self, coord: CellCoord, direction: Direction) -> Result<(), LevelError> {
        if self.find_start().is_some() {
            return Err(LevelError::StartAlreadySet);
        }
        self.assign_endpoint(coord, CellRole::Start, Pipe::start(direction))
    }

    /// Marks `coord` as the level drain. Load-time only.
    pub fn set_end(&mut self, coord: CellCoord, direction: Direction) -> Result<(), LevelError> {
        if self.find_end().is_some() {
            return Err(LevelError::EndAlreadySet);
        }
        self.assign_endpoint(coord, CellRole::End, Pipe::end(direction))
    }

    fn assign_endpoint(
        &mut self,
        coord: CellCoord,
        role: CellRole,
        pipe: Pipe,
    ) -> Result<(), LevelError> {
        let size = self.size;
        let cell = self
            .cell_mut(coord)
            .ok_or(LevelError::OutOfBounds { cell: coord, size })?;
        if cell.role != CellRole::Open {
            return Err(LevelError::CellTaken(coord));
        }
        cell.assign_endpoint(role, pipe);
        Ok(())
    }

    /// Places a new pipe into an empty cell.
    ///
    /// Any shape may go into any empty cell; connectivity is only checked
    /// once water flows.
    pub fn place_pipe(
        &mut self,
        coord: CellCoord,
        piece: PipeDescriptor,
    ) -> Result<(), PlacementError> {
        let cell = self.cell_mut(coord).ok_or(PlacementError::OutOfBounds)?;
        if cell.role != CellRole::Open {
            return Err(PlacementError::FixedCell);
        }
        if cell.has_pipe() {
            return Err(PlacementError::Occupied);
        }
        cell.set_pipe(Pipe::from_descriptor(piece));
        Ok(())
    }

    /// Turns a placed pipe a quarter turn clockwise, returning its new rotation.
    pub fn rotate_pipe(&mut self, coord: CellCoord) -> Result<Rotation, PipeEditError> {
        let cell = self.cell_mut(coord).ok_or(PipeEditError::OutOfBounds)?;
        if cell.role != CellRole::Open {
            return Err(PipeEditError::FixedCell);
        }
        let pipe = cell.pipe.as_mut().ok_or(PipeEditError::NoPipe)?;
        pipe.rotate();
        Ok(pipe.rotation())
    }

    /// Removes a placed pipe, returning it.
    pub fn remove_pipe(&mut self, coord: CellCoord) -> Result<Pipe, PipeEditError> {
        let cell = self.cell_mut(coord).ok_or(PipeEditError::OutOfBounds)?;
        if cell.role != CellRole::Open {
            return Err(PipeEditError::FixedCell);
        }
        cell.remove_pipe().ok_or(PipeEditError::NoPipe)
    }

    /// Removes every player pipe, keeping the endpoints. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        self.cells
            .iter_mut()
            .filter_map(Cell::remove_pipe)
            .count()
    }

    /// Neighbor of `coord` one step in `direction`, or `None` past the boundary.
    #[must_use]
    pub fn neighbor(&self, coord: CellCoord, direction: Direction) -> Option<&Cell> {
        coord
            .step(direction, self.size)
            .and_then(|next| self.cell(next))
    }

    /// Locates the level source.
    #[must_use]
    pub fn find_start(&self) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.is_start())
    }

    /// Locates the level drain.
    #[must_use]
    pub fn find_end(&self) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.is_end())
    }

    /// Marks the pipe at `coord` as carrying water. Returns `false` when there is no pipe.
    pub fn mark_water(&mut self, coord: CellCoord) -> bool {
        match self.cell_mut(coord).and_then(|cell| cell.pipe.as_mut()) {
            Some(pipe) => {
                pipe.fill();
                true
            }
            None => false,
        }
    }

    fn cell_mut(&mut self, coord: CellCoord) -> Option<&mut Cell> {
        self.index(coord).and_then(|index| self.cells.get_mut(index))
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        if coord.row() < self.size && coord.col() < self.size {
            let row = usize::try_from(coord.row()).ok()?;
            let col = usize::try_from(coord.col()).ok()?;
            let width = usize::try_from(self.size).ok()?;
            Some(row * width + col)
        } else {
            None
        }
    }
}
