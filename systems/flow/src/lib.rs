#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Flow system that walks water from the start cell through the placed pipes.
//!
//! [`flow_step`] is the pure discrete transition: given the grid and the
//! water's cursor it either advances one cell, completes at the end cell, or
//! leaks. [`FlowEngine`] wraps it in the `idle → flowing ⇄ paused →
//! completed | leaked | stopped` lifecycle and a timer fed with simulated
//! time, reporting progress through a [`FlowListener`].

use std::{collections::HashSet, time::Duration};

use pipeflow_core::{CellCoord, Direction, Event};
use pipeflow_world::{Grid, PipeKind};
use thiserror::Error;

/// Interval between steps used when no level speed is supplied.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Position of the water front and the direction it is moving in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cursor {
    /// Cell the water most recently entered.
    pub position: CellCoord,
    /// Direction the water moves in when leaving `position`.
    pub direction: Direction,
}

/// Why water escaped the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeakReason {
    /// The next cell lies beyond the grid boundary.
    OffGrid,
    /// The next cell holds no pipe.
    EmptyCell,
    /// The next pipe has no opening facing the incoming water.
    Misaligned,
    /// The water entered a pipe that offers no further exit.
    DeadEnd,
}

/// Result of a single discrete flow transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Water entered a new cell and keeps moving.
    Advanced(Cursor),
    /// Water entered the end cell.
    Completed(CellCoord),
    /// Water leaked. `entered` holds the cell it reached first, if any.
    Leaked {
        /// Why the water escaped.
        reason: LeakReason,
        /// Cell the water entered before finding no exit.
        entered: Option<CellCoord>,
    },
}

/// Advances the water front by one cell, wetting the pipe it enters.
pub fn flow_step(grid: &mut Grid, cursor: Cursor) -> Step {
    let Some(next) = grid.neighbor(cursor.position, cursor.direction) else {
        return Step::Leaked {
            reason: LeakReason::OffGrid,
            entered: None,
        };
    };
    let Some(pipe) = next.pipe() else {
        return Step::Leaked {
            reason: LeakReason::EmptyCell,
            entered: None,
        };
    };
    if !pipe.can_receive_from(cursor.direction) {
        return Step::Leaked {
            reason: LeakReason::Misaligned,
            entered: None,
        };
    }

    let cell = next.coord();
    let is_end = next.is_end();
    let exit = pipe.next_direction(cursor.direction);
    let _ = grid.mark_water(cell);

    if is_end {
        return Step::Completed(cell);
    }
    match exit {
        Some(direction) => Step::Advanced(Cursor {
            position: cell,
            direction,
        }),
        None => Step::Leaked {
            reason: LeakReason::DeadEnd,
            entered: Some(cell),
        },
    }
}

/// Observer notified as water moves.
pub trait FlowListener {
    /// Water entered one further cell.
    fn on_flow_step(&mut self) {}

    /// Water leaked; the run is over.
    fn on_leak(&mut self) {}

    /// Water reached the end cell; the run is over.
    fn on_complete(&mut self) {}
}

impl FlowListener for () {}

impl FlowListener for Vec<Event> {
    fn on_flow_step(&mut self) {
        self.push(Event::WaterAdvanced);
    }

    fn on_leak(&mut self) {
        self.push(Event::FlowLeaked);
    }

    fn on_complete(&mut self) {
        self.push(Event::FlowCompleted);
    }
}

impl<L: FlowListener + ?Sized> FlowListener for &mut L {
    fn on_flow_step(&mut self) {
        (**self).on_flow_step();
    }

    fn on_leak(&mut self) {
        (**self).on_leak();
    }

    fn on_complete(&mut self) {
        (**self).on_complete();
    }
}

/// Lifecycle of a single flow run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowState {
    /// Not started yet.
    Idle,
    /// The timer is running.
    Flowing,
    /// The timer is cancelled; resuming continues the same walk.
    Paused,
    /// Water reached the end cell.
    Completed,
    /// Water leaked.
    Leaked,
    /// The run was abandoned without an outcome.
    Stopped,
}

impl FlowState {
    /// Reports whether the run is over.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Leaked | Self::Stopped)
    }
}

/// Reasons a flow run cannot be started or reconfigured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The grid has no start cell.
    #[error("grid has no start cell")]
    MissingStart,
    /// The engine already ran; a new attempt needs a new engine.
    #[error("flow engine was already started")]
    AlreadyStarted,
    /// The step interval, after the speed multiplier, rounds down to zero.
    #[error("step interval must be positive")]
    ZeroInterval,
    /// A zero multiplier would stop the timer forever.
    #[error("speed multiplier must be positive")]
    ZeroSpeed,
}

/// Timer-driven state machine that walks water through a grid.
#[derive(Clone, Debug)]
pub struct FlowEngine {
    state: FlowState,
    cursor: Option<Cursor>,
    path: Vec<CellCoord>,
    visited: HashSet<Cursor>,
    circulating: bool,
    base_interval: Duration,
    speed_multiplier: u32,
    elapsed: Duration,
}

impl Default for FlowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowEngine {
    /// Creates an idle engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: FlowState::Idle,
            cursor: None,
            path: Vec::new(),
            visited: HashSet::new(),
            circulating: false,
            base_interval: DEFAULT_INTERVAL,
            speed_multiplier: 1,
            elapsed: Duration::ZERO,
        }
    }

    /// Seeds the water at the start cell and starts the step timer.
    ///
    /// Fails with [`FlowError::MissingStart`] when the grid has no start;
    /// the engine stays idle in that case.
    pub fn start(&mut self, grid: &mut Grid, base_interval: Duration) -> Result<(), FlowError> {
        if self.state != FlowState::Idle {
            return Err(FlowError::AlreadyStarted);
        }
        if (base_interval / self.speed_multiplier).is_zero() {
            return Err(FlowError::ZeroInterval);
        }

        let Some((position, direction)) = grid.find_start().and_then(|cell| {
            match cell.pipe().map(|pipe| pipe.kind()) {
                Some(PipeKind::Start(direction)) => Some((cell.coord(), direction)),
                _ => None,
            }
        }) else {
            log::warn!("flow requested on a grid without a start cell");
            return Err(FlowError::MissingStart);
        };

        let cursor = Cursor {
            position,
            direction,
        };
        let _ = grid.mark_water(position);
        self.cursor = Some(cursor);
        self.path.clear();
        self.visited.clear();
        let _ = self.visited.insert(cursor);
        self.base_interval = base_interval;
        self.elapsed = Duration::ZERO;
        self.state = FlowState::Flowing;
        log::info!(
            "water released at ({}, {}) heading {} every {:?}",
            position.row(),
            position.col(),
            direction.name(),
            self.interval()
        );
        Ok(())
    }

    /// Feeds simulated time into the timer, stepping once per elapsed interval.
    ///
    /// Returns the number of steps taken.
    pub fn advance<L>(&mut self, grid: &mut Grid, dt: Duration, listener: &mut L) -> usize
    where
        L: FlowListener + ?Sized,
    {
        if self.state != FlowState::Flowing {
            return 0;
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        let interval = self.interval();
        let mut steps = 0;
        while self.state == FlowState::Flowing && self.elapsed >= interval {
            self.elapsed -= interval;
            let _ = self.step(grid, listener);
            steps += 1;
        }
        steps
    }

    /// Runs one flow step immediately. Returns `None` unless the engine is flowing.
    pub fn step<L>(&mut self, grid: &mut Grid, listener: &mut L) -> Option<Step>
    where
        L: FlowListener + ?Sized,
    {
        if self.state != FlowState::Flowing {
            return None;
        }
        let cursor = self.cursor?;

        let step = flow_step(grid, cursor);
        match step {
            Step::Advanced(next) => {
                log::debug!(
                    "water entered ({}, {}) heading {}",
                    next.position.row(),
                    next.position.col(),
                    next.direction.name()
                );
                self.path.push(next.position);
                listener.on_flow_step();
                self.cursor = Some(next);
                if !self.visited.insert(next) && !self.circulating {
                    log::info!("water is circulating in a closed loop");
                    self.circulating = true;
                }
            }
            Step::Completed(cell) => {
                self.path.push(cell);
                listener.on_flow_step();
                self.finish(FlowState::Completed);
                log::info!("water reached the end after {} cells", self.path.len());
                listener.on_complete();
            }
            Step::Leaked { reason, entered } => {
                if let Some(cell) = entered {
                    self.path.push(cell);
                    listener.on_flow_step();
                }
                self.finish(FlowState::Leaked);
                log::info!("water leaked ({reason:?}) after {} cells", self.path.len());
                listener.on_leak();
            }
        }
        Some(step)
    }

    fn finish(&mut self, state: FlowState) {
        self.state = state;
        self.elapsed = Duration::ZERO;
    }

    /// Cancels the timer without altering the walk. Returns `false` unless flowing.
    pub fn pause(&mut self) -> bool {
        if self.state != FlowState::Flowing {
            return false;
        }
        self.state = FlowState::Paused;
        self.elapsed = Duration::ZERO;
        true
    }

    /// Restarts the timer after a pause. Returns `false` unless paused.
    pub fn resume(&mut self) -> bool {
        if self.state != FlowState::Paused {
            return false;
        }
        self.state = FlowState::Flowing;
        self.elapsed = Duration::ZERO;
        true
    }

    /// Abandons the run without notifying the listener.
    pub fn stop(&mut self) {
        if !self.state.is_terminal() {
            self.finish(FlowState::Stopped);
        }
    }

    /// Changes the speed multiplier, restarting a running timer at the new interval.
    ///
    /// A multiplier that would shrink the interval below one nanosecond is
    /// refused and the previous speed stays in effect.
    pub fn set_speed(&mut self, multiplier: u32) -> Result<(), FlowError> {
        if multiplier == 0 {
            return Err(FlowError::ZeroSpeed);
        }
        if (self.base_interval / multiplier).is_zero() {
            return Err(FlowError::ZeroInterval);
        }
        self.speed_multiplier = multiplier;
        if self.state == FlowState::Flowing {
            self.elapsed = Duration::ZERO;
        }
        Ok(())
    }

    /// Effective time between steps.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.base_interval / self.speed_multiplier
    }

    /// Active speed multiplier.
    #[must_use]
    pub const fn speed_multiplier(&self) -> u32 {
        self.speed_multiplier
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> FlowState {
        self.state
    }

    /// Reports whether a run is in progress, paused or not.
    #[must_use]
    pub const fn is_flowing(&self) -> bool {
        matches!(self.state, FlowState::Flowing | FlowState::Paused)
    }

    /// Reports whether the water revisited a cell in the same direction,
    /// which means it will keep circling forever.
    #[must_use]
    pub const fn is_circulating(&self) -> bool {
        self.circulating
    }

    /// Water front, once started.
    #[must_use]
    pub const fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    /// Cells the water entered, in order. The start cell is not included.
    #[must_use]
    pub fn path(&self) -> &[CellCoord] {
        &self.path
    }

    /// Number of cells the water entered.
    #[must_use]
    pub fn path_length(&self) -> usize {
        self.path.len()
    }
}
