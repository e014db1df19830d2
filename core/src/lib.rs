#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Pipe Flow engine.
//!
//! This crate defines the vocabulary that connects adapters, the authoritative
//! grid, and the pure systems. Adapters submit [`Command`] values describing
//! desired grid mutations, the world executes them through its `apply` entry
//! point, and then reports [`Event`] values. The flow and session systems emit
//! further events as water moves through the grid and the round progresses.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cardinal directions water may travel in, and the sides a pipe may open on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward decreasing row indices.
    Up,
    /// Toward increasing column indices.
    Right,
    /// Toward increasing row indices.
    Down,
    /// Toward decreasing column indices.
    Left,
}

impl Direction {
    /// Every direction in clockwise order starting from [`Direction::Up`].
    pub const CLOCKWISE: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    const fn clockwise_index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Right => 1,
            Self::Down => 2,
            Self::Left => 3,
        }
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Right => Self::Left,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
        }
    }

    /// Direction reached after turning clockwise the given number of quarter turns.
    #[must_use]
    pub const fn rotated_clockwise(self, quarter_turns: u8) -> Self {
        Self::CLOCKWISE[(self.clockwise_index() + quarter_turns as usize) % 4]
    }

    /// Row and column delta of a single step, expressed as `(Δrow, Δcol)`.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (-1, 0),
            Self::Right => (0, 1),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
        }
    }

    /// Lowercase name used in level files and log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Right => "right",
            Self::Down => "down",
            Self::Left => "left",
        }
    }
}

/// Orientation of a pipe piece, restricted to whole quarter turns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    /// Base orientation.
    #[default]
    Deg0,
    /// One clockwise quarter turn.
    Deg90,
    /// Half turn.
    Deg180,
    /// Three clockwise quarter turns.
    Deg270,
}

impl Rotation {
    /// Every rotation in increasing order.
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Builds a rotation from a degree value.
    ///
    /// Any multiple of 90 is accepted and normalized modulo 360, so `450`
    /// yields [`Rotation::Deg90`].
    pub const fn from_degrees(degrees: u32) -> Result<Self, RotationError> {
        if degrees % 90 != 0 {
            return Err(RotationError::NotQuarterTurn(degrees));
        }
        Ok(Self::from_quarter_turns(((degrees / 90) % 4) as u8))
    }

    /// Builds a rotation from a count of clockwise quarter turns.
    #[must_use]
    pub const fn from_quarter_turns(quarter_turns: u8) -> Self {
        match quarter_turns % 4 {
            0 => Self::Deg0,
            1 => Self::Deg90,
            2 => Self::Deg180,
            _ => Self::Deg270,
        }
    }

    /// Number of clockwise quarter turns relative to the base orientation.
    #[must_use]
    pub const fn quarter_turns(self) -> u8 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }

    /// Rotation angle in degrees.
    #[must_use]
    pub const fn degrees(self) -> u32 {
        self.quarter_turns() as u32 * 90
    }

    /// Rotation reached after one further clockwise quarter turn.
    #[must_use]
    pub const fn clockwise(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 1)
    }
}

impl TryFrom<u32> for Rotation {
    type Error = RotationError;

    fn try_from(degrees: u32) -> Result<Self, Self::Error> {
        Self::from_degrees(degrees)
    }
}

impl From<Rotation> for u32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Rejection raised when a rotation is not a whole number of quarter turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RotationError {
    /// The provided angle is not divisible by 90.
    #[error("rotation of {0} degrees is not a multiple of 90")]
    NotQuarterTurn(u32),
}

/// Shapes of pipe pieces that can be drawn from the queue and placed by the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceShape {
    /// Two opposite openings.
    Straight,
    /// Two adjacent openings.
    Curve,
    /// Three openings.
    #[serde(rename = "t")]
    Tee,
    /// Four openings.
    Cross,
}

impl PieceShape {
    /// Every placeable shape in generation order.
    pub const ALL: [PieceShape; 4] = [
        PieceShape::Straight,
        PieceShape::Curve,
        PieceShape::Tee,
        PieceShape::Cross,
    ];

    /// Openings of the shape at [`Rotation::Deg0`], in their canonical order.
    ///
    /// The order is significant: multi-exit pieces send water through the
    /// first opening that is not the entry side.
    #[must_use]
    pub const fn base_connections(self) -> &'static [Direction] {
        match self {
            Self::Straight => &[Direction::Up, Direction::Down],
            Self::Curve => &[Direction::Up, Direction::Right],
            Self::Tee => &[Direction::Up, Direction::Left, Direction::Right],
            Self::Cross => &[
                Direction::Up,
                Direction::Down,
                Direction::Left,
                Direction::Right,
            ],
        }
    }

    /// Lowercase name used in level files and log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Straight => "straight",
            Self::Curve => "curve",
            Self::Tee => "t",
            Self::Cross => "cross",
        }
    }
}

/// Shape and orientation of a piece waiting in the queue or requested for placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipeDescriptor {
    /// Shape of the piece.
    #[serde(rename = "type")]
    pub shape: PieceShape,
    /// Orientation of the piece.
    #[serde(default)]
    pub rotation: Rotation,
}

impl PipeDescriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub const fn new(shape: PieceShape, rotation: Rotation) -> Self {
        Self { shape, rotation }
    }

    /// Same piece turned one further quarter turn clockwise.
    #[must_use]
    pub const fn rotated(self) -> Self {
        Self {
            shape: self.shape,
            rotation: self.rotation.clockwise(),
        }
    }
}

/// Location of a single grid cell expressed as zero-based row and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    row: u32,
    col: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn col(&self) -> u32 {
        self.col
    }

    /// Adjacent cell one step in `direction` on a `size × size` grid.
    ///
    /// Returns `None` when the step would leave the grid.
    #[must_use]
    pub fn step(self, direction: Direction, size: u32) -> Option<CellCoord> {
        let (row_delta, col_delta) = direction.offset();
        let row = self.row.checked_add_signed(row_delta)?;
        let col = self.col.checked_add_signed(col_delta)?;
        (row < size && col < size).then_some(CellCoord { row, col })
    }
}

/// Fixed endpoint of a level: the start source or the end drain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Zero-based row of the endpoint cell.
    pub row: u32,
    /// Zero-based column of the endpoint cell.
    pub col: u32,
    /// Side the endpoint opens on; start defaults to right and end to left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl Endpoint {
    /// Creates an endpoint with an explicit direction.
    #[must_use]
    pub const fn new(row: u32, col: u32, direction: Direction) -> Self {
        Self {
            row,
            col,
            direction: Some(direction),
        }
    }

    /// Coordinate of the endpoint cell.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        CellCoord::new(self.row, self.col)
    }
}

/// Largest edge length a level grid may have.
pub const MAX_GRID_SIZE: u32 = 64;

/// Static layout of a level: grid size and the two fixed endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    /// Edge length of the square grid.
    pub size: u32,
    /// Cell that sources the water.
    pub start: Endpoint,
    /// Cell the water must reach.
    pub end: Endpoint,
}

impl LevelDescriptor {
    /// Direction water leaves the start cell in.
    #[must_use]
    pub fn start_direction(&self) -> Direction {
        self.start.direction.unwrap_or(Direction::Right)
    }

    /// Side the end cell accepts water from.
    #[must_use]
    pub fn end_direction(&self) -> Direction {
        self.end.direction.unwrap_or(Direction::Left)
    }
}

/// Difficulty setting that governs how fast water flows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Slowest flow.
    Easy,
    /// Default flow speed.
    #[default]
    Medium,
    /// Fastest flow.
    Hard,
}

impl Difficulty {
    /// Next difficulty in the `easy → medium → hard → easy` cycle.
    #[must_use]
    pub const fn cycle(self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            Self::Medium => Self::Hard,
            Self::Hard => Self::Easy,
        }
    }
}

/// Lifecycle phases of a single level attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Pipes may be placed and rotated while the setup window runs.
    Setup,
    /// Water is moving through the grid.
    Flowing,
    /// The clock is halted; resumes into the phase it interrupted.
    Paused,
    /// Water reached the end cell.
    Success,
    /// Water leaked.
    Fail,
}

impl Phase {
    /// Reports whether the attempt has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }
}

/// Commands that express all permissible grid mutations after level load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Places a new pipe into an empty cell.
    PlacePipe {
        /// Target cell.
        cell: CellCoord,
        /// Piece to construct in the cell.
        piece: PipeDescriptor,
    },
    /// Turns an already placed pipe a quarter turn clockwise.
    RotatePipe {
        /// Cell holding the pipe.
        cell: CellCoord,
    },
    /// Removes a player placed pipe.
    RemovePipe {
        /// Cell holding the pipe.
        cell: CellCoord,
    },
    /// Removes every player placed pipe, keeping the endpoints.
    ClearPipes,
}

/// Events reported after processing commands and while water flows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a pipe was placed.
    PipePlaced {
        /// Cell that received the pipe.
        cell: CellCoord,
        /// Piece that was constructed.
        piece: PipeDescriptor,
    },
    /// Reports that a placement request was rejected.
    PipePlacementRejected {
        /// Cell provided in the request.
        cell: CellCoord,
        /// Piece provided in the request.
        piece: PipeDescriptor,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a placed pipe was rotated.
    PipeRotated {
        /// Cell holding the pipe.
        cell: CellCoord,
        /// Orientation after the turn.
        rotation: Rotation,
    },
    /// Confirms that a placed pipe was removed.
    PipeRemoved {
        /// Cell that held the pipe.
        cell: CellCoord,
    },
    /// Reports that a rotate or remove request was rejected.
    PipeEditRejected {
        /// Cell provided in the request.
        cell: CellCoord,
        /// Specific reason the edit failed.
        reason: PipeEditError,
    },
    /// Confirms that every player placed pipe was removed.
    GridCleared,
    /// Water entered one further cell.
    WaterAdvanced,
    /// Water reached the end cell.
    FlowCompleted,
    /// Water leaked out of the network.
    FlowLeaked,
    /// The level attempt moved to a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: Phase,
    },
}

/// Reasons a placement request may be rejected by the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The cell lies outside the grid.
    #[error("cell is outside the grid")]
    OutOfBounds,
    /// The cell is the start or the end of the level.
    #[error("cell holds a fixed endpoint")]
    FixedCell,
    /// The cell already holds a pipe.
    #[error("cell is already occupied")]
    Occupied,
}

/// Reasons a rotate or remove request may be rejected by the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PipeEditError {
    /// The cell lies outside the grid.
    #[error("cell is outside the grid")]
    OutOfBounds,
    /// The cell is the start or the end of the level.
    #[error("cell holds a fixed endpoint")]
    FixedCell,
    /// The cell holds no pipe.
    #[error("cell holds no pipe")]
    NoPipe,
}

/// Reasons a level layout cannot be loaded into a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LevelError {
    /// The grid has no cells.
    #[error("grid size must be at least 1")]
    EmptyGrid,
    /// The grid is larger than [`MAX_GRID_SIZE`].
    #[error("grid size {0} exceeds the maximum of {max}", max = MAX_GRID_SIZE)]
    TooLarge(u32),
    /// An endpoint lies outside the grid.
    #[error("cell {cell:?} is outside a grid of size {size}")]
    OutOfBounds {
        /// Offending cell.
        cell: CellCoord,
        /// Edge length of the grid.
        size: u32,
    },
    /// A start cell was already assigned.
    #[error("level already has a start cell")]
    StartAlreadySet,
    /// An end cell was already assigned.
    #[error("level already has an end cell")]
    EndAlreadySet,
    /// The endpoint cell is already used by the other endpoint.
    #[error("cell {0:?} already holds an endpoint")]
    CellTaken(CellCoord),
}
