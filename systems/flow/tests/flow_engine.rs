use std::time::Duration;

use pipeflow_core::{
    CellCoord, Direction, Endpoint, Event, LevelDescriptor, PieceShape, PipeDescriptor, Rotation,
};
use pipeflow_system_flow::{
    FlowEngine, FlowError, FlowListener, FlowState, LeakReason, Step,
};
use pipeflow_world::{query, Grid};

const INTERVAL: Duration = Duration::from_millis(1_000);

#[derive(Debug, Default)]
struct Tally {
    steps: usize,
    leaks: usize,
    completions: usize,
}

impl FlowListener for Tally {
    fn on_flow_step(&mut self) {
        self.steps += 1;
    }

    fn on_leak(&mut self) {
        self.leaks += 1;
    }

    fn on_complete(&mut self) {
        self.completions += 1;
    }
}

fn grid_with(level: LevelDescriptor, pipes: &[(u32, u32, PieceShape, Rotation)]) -> Grid {
    let mut grid = Grid::from_level(&level).expect("valid level");
    for (row, col, shape, rotation) in pipes {
        grid.place_pipe(
            CellCoord::new(*row, *col),
            PipeDescriptor::new(*shape, *rotation),
        )
        .expect("cell is empty");
    }
    grid
}

fn corridor(middle: Rotation) -> Grid {
    grid_with(
        LevelDescriptor {
            size: 3,
            start: Endpoint::new(1, 0, Direction::Right),
            end: Endpoint::new(1, 2, Direction::Left),
        },
        &[(1, 1, PieceShape::Straight, middle)],
    )
}

/// Hand-solved 5×5 level whose path snakes from the top-left to the bottom-right.
fn snake() -> Grid {
    grid_with(
        LevelDescriptor {
            size: 5,
            start: Endpoint::new(0, 0, Direction::Down),
            end: Endpoint::new(4, 4, Direction::Left),
        },
        &[
            (1, 0, PieceShape::Straight, Rotation::Deg0),
            (2, 0, PieceShape::Curve, Rotation::Deg0),
            (2, 1, PieceShape::Straight, Rotation::Deg90),
            (2, 2, PieceShape::Straight, Rotation::Deg90),
            (2, 3, PieceShape::Curve, Rotation::Deg180),
            (3, 3, PieceShape::Straight, Rotation::Deg0),
            (4, 3, PieceShape::Curve, Rotation::Deg0),
            (0, 4, PieceShape::Cross, Rotation::Deg0),
        ],
    )
}

fn snake_path() -> Vec<CellCoord> {
    [(1, 0), (2, 0), (2, 1), (2, 2), (2, 3), (3, 3), (4, 3), (4, 4)]
        .into_iter()
        .map(|(row, col)| CellCoord::new(row, col))
        .collect()
}

fn run_to_end(engine: &mut FlowEngine, grid: &mut Grid, listener: &mut Tally) {
    for _ in 0..1_000 {
        if engine.step(grid, listener).is_none() {
            return;
        }
    }
    panic!("flow did not terminate");
}

#[test]
fn straight_corridor_completes_in_two_steps() {
    let mut grid = corridor(Rotation::Deg90);
    let mut engine = FlowEngine::new();
    let mut events: Vec<Event> = Vec::new();

    engine.start(&mut grid, INTERVAL).expect("grid has a start");
    while engine.step(&mut grid, &mut events).is_some() {}

    assert_eq!(engine.state(), FlowState::Completed);
    assert_eq!(engine.path_length(), 2);
    assert_eq!(
        engine.path(),
        &[CellCoord::new(1, 1), CellCoord::new(1, 2)]
    );
    assert_eq!(
        events,
        vec![
            Event::WaterAdvanced,
            Event::WaterAdvanced,
            Event::FlowCompleted
        ]
    );
    assert_eq!(
        query::wet_cells(&grid),
        vec![
            CellCoord::new(1, 0),
            CellCoord::new(1, 1),
            CellCoord::new(1, 2)
        ]
    );
}

#[test]
fn solved_level_completes_exactly_once() {
    let mut grid = snake();
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();

    engine.start(&mut grid, INTERVAL).expect("grid has a start");
    run_to_end(&mut engine, &mut grid, &mut tally);

    assert_eq!(tally.completions, 1);
    assert_eq!(tally.leaks, 0);
    assert_eq!(tally.steps, snake_path().len());
    assert_eq!(engine.path(), snake_path().as_slice());
    assert!(
        grid.cell(CellCoord::new(0, 4))
            .and_then(|cell| cell.pipe())
            .is_some_and(|pipe| !pipe.has_water()),
        "pipes off the route stay dry"
    );
}

#[test]
fn start_facing_the_boundary_leaks_on_first_tick() {
    let mut grid = grid_with(
        LevelDescriptor {
            size: 3,
            start: Endpoint::new(0, 1, Direction::Up),
            end: Endpoint::new(2, 1, Direction::Up),
        },
        &[],
    );
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();

    engine.start(&mut grid, INTERVAL).expect("grid has a start");
    let taken = engine.advance(&mut grid, INTERVAL, &mut tally);

    assert_eq!(taken, 1);
    assert_eq!(engine.state(), FlowState::Leaked);
    assert_eq!(tally.leaks, 1);
    assert_eq!(tally.steps, 0);
    assert_eq!(engine.path_length(), 0);
}

#[test]
fn perpendicular_straight_leaks() {
    let mut grid = corridor(Rotation::Deg0);
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();

    engine.start(&mut grid, INTERVAL).expect("grid has a start");
    let step = engine.step(&mut grid, &mut tally);

    assert_eq!(
        step,
        Some(Step::Leaked {
            reason: LeakReason::Misaligned,
            entered: None
        })
    );
    assert_eq!(tally.leaks, 1);
    assert_eq!(tally.completions, 0);
    assert_eq!(engine.path_length(), 0);
}

#[test]
fn timer_steps_once_per_interval() {
    let mut grid = snake();
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();
    engine.start(&mut grid, INTERVAL).expect("grid has a start");

    assert_eq!(
        engine.advance(&mut grid, Duration::from_millis(999), &mut tally),
        0
    );
    assert_eq!(
        engine.advance(&mut grid, Duration::from_millis(1), &mut tally),
        1
    );
    assert_eq!(
        engine.advance(&mut grid, Duration::from_millis(2_500), &mut tally),
        2
    );
    assert_eq!(engine.path_length(), 3);
}

#[test]
fn long_advance_stops_at_terminal_state() {
    let mut grid = snake();
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();
    engine.start(&mut grid, INTERVAL).expect("grid has a start");

    let taken = engine.advance(&mut grid, Duration::from_secs(600), &mut tally);

    assert_eq!(taken, snake_path().len());
    assert_eq!(engine.state(), FlowState::Completed);
    assert_eq!(
        engine.advance(&mut grid, Duration::from_secs(600), &mut tally),
        0
    );
    assert_eq!(tally.completions, 1);
}

#[test]
fn pause_and_resume_continue_the_same_walk() {
    let mut control_grid = snake();
    let mut control = FlowEngine::new();
    let mut control_tally = Tally::default();
    control
        .start(&mut control_grid, INTERVAL)
        .expect("grid has a start");
    let _ = control.advance(&mut control_grid, Duration::from_secs(60), &mut control_tally);

    let mut grid = snake();
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();
    engine.start(&mut grid, INTERVAL).expect("grid has a start");
    assert_eq!(engine.advance(&mut grid, INTERVAL * 3, &mut tally), 3);

    let cursor = engine.cursor();
    let path = engine.path().to_vec();
    assert!(engine.pause());
    assert!(engine.is_flowing());
    assert_eq!(
        engine.advance(&mut grid, Duration::from_secs(60), &mut tally),
        0
    );
    assert_eq!(engine.step(&mut grid, &mut tally), None);
    assert_eq!(engine.cursor(), cursor);
    assert_eq!(engine.path(), path.as_slice());

    assert!(engine.resume());
    let _ = engine.advance(&mut grid, Duration::from_secs(60), &mut tally);

    assert_eq!(engine.state(), FlowState::Completed);
    assert_eq!(engine.path(), control.path());
    assert_eq!(tally.steps, control_tally.steps);
    assert_eq!(tally.completions, 1);
}

#[test]
fn resume_restarts_the_interval() {
    let mut grid = snake();
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();
    engine.start(&mut grid, INTERVAL).expect("grid has a start");

    assert_eq!(
        engine.advance(&mut grid, Duration::from_millis(600), &mut tally),
        0
    );
    assert!(engine.pause());
    assert!(!engine.pause());
    assert!(engine.resume());
    assert!(!engine.resume());
    assert_eq!(
        engine.advance(&mut grid, Duration::from_millis(600), &mut tally),
        0
    );
    assert_eq!(
        engine.advance(&mut grid, Duration::from_millis(400), &mut tally),
        1
    );
}

#[test]
fn speed_change_restarts_the_timer_at_the_new_interval() {
    let mut grid = snake();
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();
    engine.start(&mut grid, INTERVAL).expect("grid has a start");

    assert_eq!(
        engine.advance(&mut grid, Duration::from_millis(900), &mut tally),
        0
    );
    engine.set_speed(2).expect("positive multiplier");
    assert_eq!(engine.interval(), Duration::from_millis(500));
    assert_eq!(
        engine.advance(&mut grid, Duration::from_millis(499), &mut tally),
        0
    );
    assert_eq!(
        engine.advance(&mut grid, Duration::from_millis(1), &mut tally),
        1
    );
    assert_eq!(engine.path(), &snake_path()[..1]);
}

#[test]
fn stop_is_silent_and_final() {
    let mut grid = snake();
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();
    engine.start(&mut grid, INTERVAL).expect("grid has a start");
    let _ = engine.advance(&mut grid, INTERVAL, &mut tally);

    engine.stop();

    assert_eq!(engine.state(), FlowState::Stopped);
    assert!(!engine.is_flowing());
    assert!(!engine.resume());
    assert_eq!(
        engine.advance(&mut grid, Duration::from_secs(60), &mut tally),
        0
    );
    assert_eq!(tally.leaks + tally.completions, 0);
    assert_eq!(engine.path_length(), 1);
}

#[test]
fn water_returning_into_the_start_dead_ends() {
    let mut grid = grid_with(
        LevelDescriptor {
            size: 4,
            start: Endpoint::new(0, 0, Direction::Right),
            end: Endpoint::new(3, 3, Direction::Up),
        },
        &[
            (0, 1, PieceShape::Tee, Rotation::Deg270),
            (1, 1, PieceShape::Cross, Rotation::Deg0),
            (2, 1, PieceShape::Curve, Rotation::Deg0),
            (2, 2, PieceShape::Curve, Rotation::Deg270),
            (1, 2, PieceShape::Curve, Rotation::Deg180),
        ],
    );
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();
    engine.start(&mut grid, INTERVAL).expect("grid has a start");

    run_to_end(&mut engine, &mut grid, &mut tally);

    assert_eq!(engine.state(), FlowState::Leaked);
    assert_eq!(engine.path_length(), 8);
    assert_eq!(engine.path().last(), Some(&CellCoord::new(0, 0)));
    assert_eq!(tally.steps, 8);
    assert_eq!(tally.leaks, 1);
}

/// Water entering (0, 1) circles through the four pipes forever.
fn closed_loop() -> Grid {
    grid_with(
        LevelDescriptor {
            size: 4,
            start: Endpoint::new(0, 0, Direction::Right),
            end: Endpoint::new(3, 3, Direction::Up),
        },
        &[
            (0, 1, PieceShape::Tee, Rotation::Deg180),
            (1, 1, PieceShape::Curve, Rotation::Deg0),
            (1, 2, PieceShape::Curve, Rotation::Deg270),
            (0, 2, PieceShape::Curve, Rotation::Deg180),
        ],
    )
}

#[test]
fn closed_loops_are_detected() {
    let mut grid = closed_loop();
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();
    engine.start(&mut grid, INTERVAL).expect("grid has a start");

    assert_eq!(engine.advance(&mut grid, INTERVAL * 4, &mut tally), 4);
    assert!(!engine.is_circulating());
    assert_eq!(engine.advance(&mut grid, INTERVAL, &mut tally), 1);

    assert!(engine.is_circulating());
    assert_eq!(engine.state(), FlowState::Flowing);
    assert_eq!(engine.path().first(), engine.path().last());
}

#[test]
fn speeds_that_round_the_interval_to_zero_are_refused() {
    let mut grid = closed_loop();
    let mut engine = FlowEngine::new();
    let mut tally = Tally::default();
    engine
        .start(&mut grid, Duration::from_millis(3_000))
        .expect("grid has a start");

    assert_eq!(engine.set_speed(u32::MAX), Err(FlowError::ZeroInterval));
    assert_eq!(engine.speed_multiplier(), 1);
    assert_eq!(engine.interval(), Duration::from_millis(3_000));

    // The loop keeps stepping once per interval instead of spinning.
    assert_eq!(
        engine.advance(&mut grid, Duration::from_millis(1), &mut tally),
        0
    );
    assert_eq!(
        engine.advance(&mut grid, Duration::from_secs(30), &mut tally),
        10
    );
    assert!(engine.is_circulating());
}

#[test]
fn start_refuses_an_interval_the_multiplier_rounds_to_zero() {
    let mut grid = closed_loop();
    let mut engine = FlowEngine::new();
    engine.set_speed(2).expect("default interval halves");

    assert_eq!(
        engine.start(&mut grid, Duration::from_nanos(1)),
        Err(FlowError::ZeroInterval)
    );
    assert_eq!(engine.state(), FlowState::Idle);
    assert_eq!(engine.start(&mut grid, Duration::from_nanos(2)), Ok(()));
    assert_eq!(engine.interval(), Duration::from_nanos(1));
}
