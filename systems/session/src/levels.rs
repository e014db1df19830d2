use std::time::Duration;

use pipeflow_core::{Difficulty, Direction, Endpoint, LevelDescriptor};

/// Seconds on the level clock when an attempt begins.
pub const DEFAULT_SETUP_TIME: u32 = 300;

/// A value that varies with the selected difficulty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByDifficulty<T> {
    /// Value used on easy.
    pub easy: T,
    /// Value used on medium.
    pub medium: T,
    /// Value used on hard.
    pub hard: T,
}

impl<T: Copy> ByDifficulty<T> {
    /// Uses the same value on every difficulty.
    #[must_use]
    pub const fn uniform(value: T) -> Self {
        Self {
            easy: value,
            medium: value,
            hard: value,
        }
    }

    /// Value for `difficulty`.
    #[must_use]
    pub const fn get(&self, difficulty: Difficulty) -> T {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

/// Playable level: layout plus the timings that apply to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Level {
    id: u32,
    descriptor: LevelDescriptor,
    setup_time: ByDifficulty<u32>,
    flow_speed: ByDifficulty<Duration>,
}

impl Level {
    /// Creates a level with the standard clock and flow speeds.
    #[must_use]
    pub const fn new(id: u32, descriptor: LevelDescriptor) -> Self {
        Self {
            id,
            descriptor,
            setup_time: ByDifficulty::uniform(DEFAULT_SETUP_TIME),
            flow_speed: ByDifficulty {
                easy: Duration::from_millis(5_000),
                medium: Duration::from_millis(3_000),
                hard: Duration::from_millis(1_000),
            },
        }
    }

    /// Replaces the per-difficulty interval between flow steps.
    #[must_use]
    pub const fn with_flow_speed(mut self, flow_speed: ByDifficulty<Duration>) -> Self {
        self.flow_speed = flow_speed;
        self
    }

    /// Replaces the per-difficulty clock, in whole seconds.
    #[must_use]
    pub const fn with_setup_time(mut self, setup_time: ByDifficulty<u32>) -> Self {
        self.setup_time = setup_time;
        self
    }

    /// One-based identifier of the level.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Grid layout of the level.
    #[must_use]
    pub const fn descriptor(&self) -> &LevelDescriptor {
        &self.descriptor
    }

    /// Seconds on the clock when an attempt on `difficulty` begins.
    #[must_use]
    pub const fn setup_time(&self, difficulty: Difficulty) -> u32 {
        self.setup_time.get(difficulty)
    }

    /// Time between flow steps on `difficulty`.
    #[must_use]
    pub const fn flow_speed(&self, difficulty: Difficulty) -> Duration {
        self.flow_speed.get(difficulty)
    }
}

const fn builtin(id: u32, size: u32, start: Endpoint, end: Endpoint) -> Level {
    Level::new(id, LevelDescriptor { size, start, end })
}

/// Ordered collection of levels, numbered from one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelCatalog {
    levels: Vec<Level>,
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LevelCatalog {
    /// The ten levels shipped with the game, growing from 10×10 to 16×16.
    #[must_use]
    pub fn builtin() -> Self {
        use Direction::{Down, Left, Right, Up};

        Self::new(vec![
            builtin(1, 10, Endpoint::new(2, 2, Right), Endpoint::new(2, 7, Left)),
            builtin(2, 10, Endpoint::new(1, 1, Down), Endpoint::new(5, 1, Up)),
            builtin(3, 10, Endpoint::new(3, 1, Right), Endpoint::new(6, 8, Left)),
            builtin(4, 12, Endpoint::new(2, 2, Right), Endpoint::new(9, 9, Left)),
            builtin(5, 12, Endpoint::new(1, 6, Down), Endpoint::new(10, 5, Up)),
            builtin(6, 12, Endpoint::new(5, 1, Right), Endpoint::new(6, 10, Left)),
            builtin(7, 14, Endpoint::new(2, 2, Down), Endpoint::new(11, 11, Up)),
            builtin(8, 14, Endpoint::new(1, 7, Down), Endpoint::new(12, 6, Up)),
            builtin(9, 14, Endpoint::new(6, 1, Right), Endpoint::new(7, 12, Left)),
            builtin(10, 16, Endpoint::new(3, 3, Right), Endpoint::new(12, 12, Left)),
        ])
    }

    /// Wraps an ordered list of levels.
    #[must_use]
    pub fn new(levels: Vec<Level>) -> Self {
        Self { levels }
    }

    /// Every level in order.
    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Looks up a level by its identifier.
    #[must_use]
    pub fn level(&self, id: u32) -> Option<&Level> {
        self.levels.iter().find(|level| level.id == id)
    }

    /// Reports whether a level follows `id`.
    #[must_use]
    pub fn has_next(&self, id: u32) -> bool {
        self.next_level(id).is_some()
    }

    /// Level that follows `id`, if any.
    #[must_use]
    pub fn next_level(&self, id: u32) -> Option<&Level> {
        self.level(id.checked_add(1)?)
    }
}
