use pipeflow_core::{Direction, PieceShape, PipeDescriptor, Rotation};

/// What a pipe is: a placeable piece or one of the fixed level endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipeKind {
    /// Player placed piece.
    Piece(PieceShape),
    /// Level source with its single forced exit.
    Start(Direction),
    /// Level drain with its single forced entry side.
    End(Direction),
}

/// Connector occupying a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pipe {
    kind: PipeKind,
    rotation: Rotation,
    has_water: bool,
}

impl Pipe {
    /// Constructs a dry player piece from its descriptor.
    #[must_use]
    pub const fn from_descriptor(descriptor: PipeDescriptor) -> Self {
        Self {
            kind: PipeKind::Piece(descriptor.shape),
            rotation: descriptor.rotation,
            has_water: false,
        }
    }

    /// Constructs the level source opening toward `direction`.
    #[must_use]
    pub const fn start(direction: Direction) -> Self {
        Self {
            kind: PipeKind::Start(direction),
            rotation: Rotation::Deg0,
            has_water: false,
        }
    }

    /// Constructs the level drain opening toward `direction`.
    #[must_use]
    pub const fn end(direction: Direction) -> Self {
        Self {
            kind: PipeKind::End(direction),
            rotation: Rotation::Deg0,
            has_water: false,
        }
    }

    /// Kind of the pipe.
    #[must_use]
    pub const fn kind(&self) -> PipeKind {
        self.kind
    }

    /// Current orientation. Always [`Rotation::Deg0`] for endpoints.
    #[must_use]
    pub const fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Reports whether water has passed through the pipe.
    #[must_use]
    pub const fn has_water(&self) -> bool {
        self.has_water
    }

    /// Reports whether the pipe is a level endpoint.
    #[must_use]
    pub const fn is_fixed(&self) -> bool {
        matches!(self.kind, PipeKind::Start(_) | PipeKind::End(_))
    }

    /// Descriptor of a player piece, or `None` for endpoints.
    #[must_use]
    pub const fn descriptor(&self) -> Option<PipeDescriptor> {
        match self.kind {
            PipeKind::Piece(shape) => Some(PipeDescriptor::new(shape, self.rotation)),
            PipeKind::Start(_) | PipeKind::End(_) => None,
        }
    }

    /// Turns the pipe a quarter turn clockwise. Endpoints keep their orientation.
    pub fn rotate(&mut self) {
        if !self.is_fixed() {
            self.rotation = self.rotation.clockwise();
        }
    }

    pub(crate) fn fill(&mut self) {
        self.has_water = true;
    }

    /// Sides the pipe is open on, in rotated canonical order.
    #[must_use]
    pub fn connections(&self) -> Connections {
        match self.kind {
            PipeKind::Piece(shape) => {
                Connections::rotated(shape.base_connections(), self.rotation.quarter_turns())
            }
            PipeKind::Start(direction) | PipeKind::End(direction) => {
                Connections::rotated(&[direction], self.rotation.quarter_turns())
            }
        }
    }

    /// Reports whether water travelling in `direction` can enter this pipe.
    ///
    /// Water moving down enters through the top side, so the pipe must be
    /// open on the side opposite the direction of travel.
    #[must_use]
    pub fn can_receive_from(&self, direction: Direction) -> bool {
        self.connections().contains(direction.opposite())
    }

    /// Direction water leaves in after entering while travelling in `direction`.
    ///
    /// Multi-exit pieces never branch: the first open side after the entry
    /// side is removed wins.
    #[must_use]
    pub fn next_direction(&self, direction: Direction) -> Option<Direction> {
        if !self.can_receive_from(direction) {
            return None;
        }
        let entry = direction.opposite();
        self.connections().iter().find(|side| *side != entry)
    }
}

/// Ordered set of open sides of a pipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connections {
    sides: [Direction; 4],
    len: usize,
}

impl Connections {
    fn rotated(base: &[Direction], quarter_turns: u8) -> Self {
        let mut sides = [Direction::Up; 4];
        for (slot, side) in sides.iter_mut().zip(base) {
            *slot = side.rotated_clockwise(quarter_turns);
        }
        Self {
            sides,
            len: base.len().min(4),
        }
    }

    /// Iterates the open sides in order.
    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        self.sides[..self.len].iter().copied()
    }

    /// Reports whether the pipe is open on `side`.
    #[must_use]
    pub fn contains(&self, side: Direction) -> bool {
        self.iter().any(|open| open == side)
    }

    /// Number of open sides.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Reports whether the pipe has no open side.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Open sides collected in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Direction> {
        self.iter().collect()
    }
}
