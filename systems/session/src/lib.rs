#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level attempt lifecycle: the setup countdown, the flow run and scoring.
//!
//! A [`Session`] owns the grid, the piece factory and the flow engine for one
//! attempt. Callers feed simulated time through [`Session::tick`]; the level
//! clock counts down in whole seconds, the setup phase ends once
//! [`SessionConfig::setup_window`] has elapsed and the water then runs until
//! it reaches the end or leaks.

mod levels;

pub use levels::{ByDifficulty, Level, LevelCatalog, DEFAULT_SETUP_TIME};

use std::time::Duration;

use pipeflow_core::{
    CellCoord, Command, Difficulty, Event, LevelError, Phase, PipeDescriptor, PipeEditError,
    PlacementError, Rotation,
};
use pipeflow_system_flow::{FlowEngine, FlowError, FlowState};
use pipeflow_system_pipe_factory::PipeFactory;
use pipeflow_world::Grid;
use thiserror::Error;

const CLOCK_TICK: Duration = Duration::from_secs(1);
const POINTS_PER_CELL: u32 = 10;

/// Tunables shared by every attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Time the player gets to lay pipes before the water is released.
    pub setup_window: Duration,
    /// Multiplier applied while the speed boost is toggled on.
    pub speed_boost: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            setup_window: Duration::from_secs(30),
            speed_boost: 2,
        }
    }
}

/// Reasons a session request is refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The request is not available in the current phase.
    #[error("cannot {action} during the {phase:?} phase")]
    WrongPhase {
        /// What was attempted.
        action: &'static str,
        /// Phase the session was in.
        phase: Phase,
    },
    /// The grid refused a placement.
    #[error("placement rejected: {0}")]
    Placement(#[from] PlacementError),
    /// The grid refused to rotate a pipe.
    #[error("rotation rejected: {0}")]
    Edit(#[from] PipeEditError),
    /// The level layout cannot be loaded.
    #[error("invalid level: {0}")]
    Level(#[from] LevelError),
    /// The flow engine refused a request.
    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// One attempt at a level.
#[derive(Clone, Debug)]
pub struct Session {
    config: SessionConfig,
    level_id: u32,
    difficulty: Difficulty,
    grid: Grid,
    factory: PipeFactory,
    engine: FlowEngine,
    flow_interval: Duration,
    phase: Phase,
    resume_phase: Option<Phase>,
    time_remaining: u32,
    flow_release_at: u32,
    clock_elapsed: Duration,
    speed_multiplier: u32,
    score: Option<u32>,
}

impl Session {
    /// Loads `level` into a fresh grid and enters the setup phase.
    pub fn new(
        level: &Level,
        difficulty: Difficulty,
        factory: PipeFactory,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let grid = Grid::from_level(level.descriptor())?;
        let time_remaining = level.setup_time(difficulty);
        let window = u32::try_from(config.setup_window.as_secs()).unwrap_or(u32::MAX);

        log::info!(
            "level {} loaded on {difficulty:?}: {}×{} grid, {time_remaining}s on the clock",
            level.id(),
            grid.size(),
            grid.size()
        );

        Ok(Self {
            config,
            level_id: level.id(),
            difficulty,
            grid,
            factory,
            engine: FlowEngine::new(),
            flow_interval: level.flow_speed(difficulty),
            phase: Phase::Setup,
            resume_phase: None,
            time_remaining,
            flow_release_at: time_remaining.saturating_sub(window),
            clock_elapsed: Duration::ZERO,
            speed_multiplier: 1,
            score: None,
        })
    }

    /// Advances the attempt by `dt` of simulated time.
    ///
    /// The clock and the flow engine share the same time line: within each
    /// second the water moves first and the clock ticks after it.
    pub fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let mut remaining = dt;
        while !remaining.is_zero() && matches!(self.phase, Phase::Setup | Phase::Flowing) {
            let slice = remaining.min(CLOCK_TICK - self.clock_elapsed);
            remaining -= slice;

            if self.phase == Phase::Flowing {
                self.advance_flow(slice, out_events);
                if self.phase.is_terminal() {
                    break;
                }
            }

            self.clock_elapsed += slice;
            if self.clock_elapsed >= CLOCK_TICK {
                self.clock_elapsed = Duration::ZERO;
                self.count_down(out_events);
            }
        }
    }

    fn count_down(&mut self, out_events: &mut Vec<Event>) {
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.phase == Phase::Setup && self.time_remaining <= self.flow_release_at {
            self.release_water(out_events);
        }
    }

    fn release_water(&mut self, out_events: &mut Vec<Event>) {
        match self.engine.start(&mut self.grid, self.flow_interval) {
            Ok(()) => self.enter(Phase::Flowing, out_events),
            Err(error) => {
                log::warn!("water could not be released: {error}");
                self.finish(Phase::Fail, out_events);
            }
        }
    }

    fn advance_flow(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let _ = self.engine.advance(&mut self.grid, dt, out_events);
        match self.engine.state() {
            FlowState::Completed => self.finish(Phase::Success, out_events),
            FlowState::Leaked => self.finish(Phase::Fail, out_events),
            FlowState::Flowing if self.engine.is_circulating() => {
                log::info!("water trapped in a loop, ending the attempt");
                self.finish(Phase::Fail, out_events);
            }
            _ => {}
        }
    }

    fn finish(&mut self, phase: Phase, out_events: &mut Vec<Event>) {
        self.engine.stop();
        let path = u32::try_from(self.engine.path_length()).unwrap_or(u32::MAX);
        let mut score = path.saturating_mul(POINTS_PER_CELL);
        if phase == Phase::Success {
            score = score.saturating_add(self.time_remaining);
        }
        self.score = Some(score);
        log::info!("level {} ended in {phase:?} with {score} points", self.level_id);
        self.enter(phase, out_events);
    }

    fn enter(&mut self, phase: Phase, out_events: &mut Vec<Event>) {
        log::debug!("phase {:?} -> {phase:?}", self.phase);
        self.phase = phase;
        out_events.push(Event::PhaseChanged { phase });
    }

    fn require(&self, phase: Phase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }

    /// Places the held piece into `cell`. The piece is consumed only when the
    /// grid accepts it.
    pub fn place_current(&mut self, cell: CellCoord) -> Result<PipeDescriptor, SessionError> {
        self.require(Phase::Setup, "place a pipe")?;
        let piece = self.factory.current();
        self.grid.place_pipe(cell, piece)?;
        let _ = self.factory.next_piece();
        Ok(piece)
    }

    /// Turns the held piece a quarter turn clockwise.
    pub fn rotate_current(&mut self) -> Result<PipeDescriptor, SessionError> {
        self.require(Phase::Setup, "rotate the held piece")?;
        Ok(self.factory.rotate_current())
    }

    /// Turns the pipe already placed in `cell` a quarter turn clockwise.
    pub fn rotate_placed(&mut self, cell: CellCoord) -> Result<Rotation, SessionError> {
        self.require(Phase::Setup, "rotate a placed pipe")?;
        Ok(self.grid.rotate_pipe(cell)?)
    }

    /// Applies a grid command during setup, bypassing the piece queue.
    ///
    /// Rejections by the grid are reported as events, not errors.
    pub fn apply(
        &mut self,
        command: Command,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SessionError> {
        self.require(Phase::Setup, "edit the grid")?;
        pipeflow_world::apply(&mut self.grid, command, out_events);
        Ok(())
    }

    /// Switches the flow between normal speed and the configured boost.
    ///
    /// Returns the multiplier now in effect.
    pub fn toggle_speed(&mut self) -> Result<u32, SessionError> {
        self.require(Phase::Flowing, "change speed")?;
        let multiplier = if self.speed_multiplier == 1 {
            self.config.speed_boost
        } else {
            1
        };
        self.engine.set_speed(multiplier)?;
        self.speed_multiplier = multiplier;
        Ok(multiplier)
    }

    /// Halts the clock and the water.
    pub fn pause(&mut self, out_events: &mut Vec<Event>) -> Result<(), SessionError> {
        if !matches!(self.phase, Phase::Setup | Phase::Flowing) {
            return Err(SessionError::WrongPhase {
                action: "pause",
                phase: self.phase,
            });
        }
        if self.phase == Phase::Flowing {
            let _ = self.engine.pause();
        }
        self.resume_phase = Some(self.phase);
        self.clock_elapsed = Duration::ZERO;
        self.enter(Phase::Paused, out_events);
        Ok(())
    }

    /// Continues the phase that was paused. Partial seconds are not carried over.
    pub fn resume(&mut self, out_events: &mut Vec<Event>) -> Result<(), SessionError> {
        self.require(Phase::Paused, "resume")?;
        let phase = self.resume_phase.take().unwrap_or(Phase::Setup);
        if phase == Phase::Flowing {
            let _ = self.engine.resume();
        }
        self.clock_elapsed = Duration::ZERO;
        self.enter(phase, out_events);
        Ok(())
    }

    /// Identifier of the level being played.
    #[must_use]
    pub const fn level_id(&self) -> u32 {
        self.level_id
    }

    /// Difficulty of the attempt.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Whole seconds left on the level clock.
    #[must_use]
    pub const fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    /// Final score once the attempt has ended.
    #[must_use]
    pub const fn score(&self) -> Option<u32> {
        self.score
    }

    /// Active flow speed multiplier.
    #[must_use]
    pub const fn speed_multiplier(&self) -> u32 {
        self.speed_multiplier
    }

    /// Grid being played.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Queue of pieces available for placement.
    #[must_use]
    pub const fn factory(&self) -> &PipeFactory {
        &self.factory
    }

    /// Flow engine driving the water.
    #[must_use]
    pub const fn engine(&self) -> &FlowEngine {
        &self.engine
    }
}
