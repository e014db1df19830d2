#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weighted random generator for the queue of upcoming pipe pieces.
//!
//! The factory keeps exactly [`QUEUE_LEN`] pieces in view: the head is the
//! piece the player currently holds, the rest are previews. Consuming the
//! head always appends one freshly generated piece.

use pipeflow_core::{PieceShape, PipeDescriptor, Rotation};
use rand::{
    distributions::{Distribution, WeightedError, WeightedIndex},
    Rng, SeedableRng,
};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Number of pieces held in the queue: one current plus three upcoming.
pub const QUEUE_LEN: usize = 4;

/// Relative likelihood of each shape being generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PieceWeights {
    /// Weight of straight pieces.
    pub straight: u32,
    /// Weight of curve pieces.
    pub curve: u32,
    /// Weight of T pieces.
    pub tee: u32,
    /// Weight of cross pieces.
    pub cross: u32,
}

impl Default for PieceWeights {
    fn default() -> Self {
        Self {
            straight: 3,
            curve: 3,
            tee: 2,
            cross: 1,
        }
    }
}

impl PieceWeights {
    /// Weight assigned to `shape`.
    #[must_use]
    pub const fn weight(&self, shape: PieceShape) -> u32 {
        match shape {
            PieceShape::Straight => self.straight,
            PieceShape::Curve => self.curve,
            PieceShape::Tee => self.tee,
            PieceShape::Cross => self.cross,
        }
    }

    /// Sum of every weight, widened so that it cannot overflow.
    #[must_use]
    pub fn total(&self) -> u64 {
        PieceShape::ALL
            .iter()
            .map(|shape| u64::from(self.weight(*shape)))
            .sum()
    }

    /// Expected share of generated pieces with `shape`.
    #[must_use]
    pub fn probability(&self, shape: PieceShape) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.weight(shape)) / total as f64
    }

    fn sampler(&self) -> Result<WeightedIndex<u32>, FactoryError> {
        let total = self.total();
        if total > u64::from(u32::MAX) {
            return Err(FactoryError::WeightOverflow(total));
        }
        Ok(WeightedIndex::new(
            PieceShape::ALL.iter().map(|shape| self.weight(*shape)),
        )?)
    }
}

/// Reasons a factory cannot be constructed.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// Every weight is zero, so no shape could ever be drawn.
    #[error("piece weights cannot be sampled: {0}")]
    InvalidWeights(#[from] WeightedError),
    /// The weights add up to more than the sampler can accumulate.
    #[error("piece weights sum to {0}, above the supported maximum of {max}", max = u32::MAX)]
    WeightOverflow(u64),
}

/// Lookahead queue of randomly generated pipe pieces.
#[derive(Clone, Debug)]
pub struct PipeFactory<R = ChaCha8Rng> {
    rng: R,
    weights: PieceWeights,
    shapes: WeightedIndex<u32>,
    queue: [PipeDescriptor; QUEUE_LEN],
}

impl PipeFactory<ChaCha8Rng> {
    /// Creates a reproducible factory with the default weights.
    pub fn from_seed(seed: u64) -> Result<Self, FactoryError> {
        Self::new(ChaCha8Rng::seed_from_u64(seed), PieceWeights::default())
    }

    /// Creates a factory seeded from the operating system.
    pub fn from_entropy() -> Result<Self, FactoryError> {
        Self::new(ChaCha8Rng::from_entropy(), PieceWeights::default())
    }
}

impl<R: Rng> PipeFactory<R> {
    /// Creates a factory drawing from `rng` with the provided weights and fills its queue.
    pub fn new(rng: R, weights: PieceWeights) -> Result<Self, FactoryError> {
        let shapes = weights.sampler()?;
        let placeholder = PipeDescriptor::new(PieceShape::Straight, Rotation::Deg0);
        let mut factory = Self {
            rng,
            weights,
            shapes,
            queue: [placeholder; QUEUE_LEN],
        };
        let _ = factory.generate_initial_queue();
        Ok(factory)
    }

    /// Weights the factory draws shapes with.
    #[must_use]
    pub const fn weights(&self) -> &PieceWeights {
        &self.weights
    }

    /// Replaces every queued piece with a fresh draw.
    pub fn generate_initial_queue(&mut self) -> &[PipeDescriptor; QUEUE_LEN] {
        for index in 0..QUEUE_LEN {
            self.queue[index] = self.generate_pipe();
        }
        &self.queue
    }

    /// Draws one piece: a weighted shape and an independent uniform rotation.
    pub fn generate_pipe(&mut self) -> PipeDescriptor {
        let shape = PieceShape::ALL[self.shapes.sample(&mut self.rng)];
        let rotation = Rotation::from_quarter_turns(self.rng.gen_range(0..4));
        PipeDescriptor::new(shape, rotation)
    }

    /// Removes and returns the current piece, appending a fresh one to the queue.
    pub fn next_piece(&mut self) -> PipeDescriptor {
        let current = self.queue[0];
        self.queue.rotate_left(1);
        self.queue[QUEUE_LEN - 1] = self.generate_pipe();
        log::debug!(
            "dispensed {} at {} degrees",
            current.shape.name(),
            current.rotation.degrees()
        );
        current
    }

    /// Piece the player currently holds.
    #[must_use]
    pub const fn current(&self) -> PipeDescriptor {
        self.queue[0]
    }

    /// The previews following the current piece.
    #[must_use]
    pub fn upcoming(&self) -> &[PipeDescriptor] {
        &self.queue[1..]
    }

    /// Every queued piece, current first.
    #[must_use]
    pub const fn queue(&self) -> &[PipeDescriptor; QUEUE_LEN] {
        &self.queue
    }

    /// Turns the current piece a quarter turn clockwise before it is placed.
    pub fn rotate_current(&mut self) -> PipeDescriptor {
        self.queue[0] = self.queue[0].rotated();
        self.queue[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_piece_shifts_the_queue() {
        let mut factory = PipeFactory::from_seed(11).expect("default weights");
        let before = *factory.queue();

        let dispensed = factory.next_piece();

        assert_eq!(dispensed, before[0]);
        assert_eq!(&factory.queue()[..QUEUE_LEN - 1], &before[1..]);
        assert_eq!(factory.upcoming().len(), QUEUE_LEN - 1);
    }

    #[test]
    fn rotate_current_only_turns_the_head() {
        let mut factory = PipeFactory::from_seed(3).expect("default weights");
        let before = *factory.queue();

        let rotated = factory.rotate_current();

        assert_eq!(rotated.shape, before[0].shape);
        assert_eq!(rotated.rotation, before[0].rotation.clockwise());
        assert_eq!(factory.current(), rotated);
        assert_eq!(factory.upcoming(), &before[1..]);
    }

    #[test]
    fn zero_weights_are_rejected() {
        let weights = PieceWeights {
            straight: 0,
            curve: 0,
            tee: 0,
            cross: 0,
        };
        let result = PipeFactory::new(ChaCha8Rng::seed_from_u64(1), weights);
        assert!(matches!(result, Err(FactoryError::InvalidWeights(_))));
    }

    #[test]
    fn overflowing_weights_are_rejected() {
        let weights = PieceWeights {
            straight: u32::MAX,
            curve: 1,
            tee: 0,
            cross: 0,
        };
        assert_eq!(weights.total(), u64::from(u32::MAX) + 1);
        assert!((weights.probability(PieceShape::Curve) - 2f64.powi(-32)).abs() < 1e-15);

        let result = PipeFactory::new(ChaCha8Rng::seed_from_u64(1), weights);
        assert!(matches!(
            result,
            Err(FactoryError::WeightOverflow(total)) if total == 1 << 32
        ));

        let largest = PieceWeights {
            curve: 0,
            ..weights
        };
        assert!(PipeFactory::new(ChaCha8Rng::seed_from_u64(1), largest).is_ok());
    }

    #[test]
    fn default_weights_favor_simple_pieces() {
        let weights = PieceWeights::default();
        assert_eq!(weights.total(), 9);
        assert!((weights.probability(PieceShape::Straight) - 1.0 / 3.0).abs() < 1e-12);
        assert!((weights.probability(PieceShape::Cross) - 1.0 / 9.0).abs() < 1e-12);
    }
}
