#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid state for Pipe Flow.
//!
//! The [`Grid`] owns every [`Cell`] and the [`Pipe`] it may hold. After level
//! load the grid only changes through [`apply`], which reports each accepted
//! or rejected mutation as an [`Event`], and through the flow system marking
//! pipes wet via [`Grid::mark_water`].

mod grid;
mod pipe;

pub use grid::{Cell, CellRole, Grid};
pub use pipe::{Connections, Pipe, PipeKind};

use pipeflow_core::{Command, Event};

/// Applies the provided command to the grid, reporting the outcome as events.
pub fn apply(grid: &mut Grid, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::PlacePipe { cell, piece } => match grid.place_pipe(cell, piece) {
            Ok(()) => {
                log::debug!(
                    "placed {} at {} degrees in ({}, {})",
                    piece.shape.name(),
                    piece.rotation.degrees(),
                    cell.row(),
                    cell.col()
                );
                out_events.push(Event::PipePlaced { cell, piece });
            }
            Err(reason) => {
                log::debug!("rejected placement at ({}, {}): {reason}", cell.row(), cell.col());
                out_events.push(Event::PipePlacementRejected {
                    cell,
                    piece,
                    reason,
                });
            }
        },
        Command::RotatePipe { cell } => match grid.rotate_pipe(cell) {
            Ok(rotation) => out_events.push(Event::PipeRotated { cell, rotation }),
            Err(reason) => out_events.push(Event::PipeEditRejected { cell, reason }),
        },
        Command::RemovePipe { cell } => match grid.remove_pipe(cell) {
            Ok(_) => out_events.push(Event::PipeRemoved { cell }),
            Err(reason) => out_events.push(Event::PipeEditRejected { cell, reason }),
        },
        Command::ClearPipes => {
            let removed = grid.clear();
            log::debug!("cleared {removed} pipes");
            out_events.push(Event::GridCleared);
        }
    }
}

/// Query functions that provide read-only views of the grid.
pub mod query {
    use pipeflow_core::{CellCoord, PipeDescriptor};

    use super::Grid;

    /// Player pipes currently on the grid, in row-major order.
    #[must_use]
    pub fn placed_pipes(grid: &Grid) -> Vec<(CellCoord, PipeDescriptor)> {
        grid.cells()
            .filter_map(|cell| {
                cell.pipe()
                    .and_then(|pipe| pipe.descriptor())
                    .map(|piece| (cell.coord(), piece))
            })
            .collect()
    }

    /// Cells whose pipe has carried water, in row-major order.
    #[must_use]
    pub fn wet_cells(grid: &Grid) -> Vec<CellCoord> {
        grid.cells()
            .filter(|cell| cell.pipe().is_some_and(|pipe| pipe.has_water()))
            .map(|cell| cell.coord())
            .collect()
    }

    /// Number of cells that can still receive a player pipe.
    #[must_use]
    pub fn empty_cell_count(grid: &Grid) -> usize {
        grid.cells().filter(|cell| cell.is_empty()).count()
    }
}
