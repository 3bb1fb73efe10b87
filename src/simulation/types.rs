//! Core types for the city traffic simulation
//!
//! Coordinates, compass directions and the id wrappers shared by every
//! other simulation module.

use std::fmt;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for car IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarId(pub SimId);

/// A wrapper type for traffic light IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub SimId);

/// A wrapper type for light pair IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairId(pub usize);

/// Identifier printed on a parking lot, unique per lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParkingId(pub u32);

/// Width of the reference city grid
pub const CITY_WIDTH: i32 = 24;

/// Height of the reference city grid
pub const CITY_HEIGHT: i32 = 24;

/// Number of cars in the reference run
pub const DEFAULT_CAR_COUNT: usize = 25;

/// Number of cells a light looks upstream when counting cars
pub const UPSTREAM_CELLS: i32 = 3;

/// A single grid cell addressed by integer coordinates.
///
/// `y` grows upwards: `Direction::Up` is `y + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell one step in `direction`
    pub fn step(&self, direction: Direction) -> Cell {
        self.offset(direction, 1)
    }

    /// The cell `distance` steps away in `direction`
    pub fn offset(&self, direction: Direction, distance: i32) -> Cell {
        let (dx, dy) = direction.delta();
        Cell::new(self.x + dx * distance, self.y + dy * distance)
    }

    /// The four orthogonal neighbours, paired with the direction that leads to them.
    /// Bounds are not checked here.
    pub fn neighbors(&self) -> [(Direction, Cell); 4] {
        Direction::ALL.map(|direction| (direction, self.step(direction)))
    }

    /// Straight-line distance to another cell
    pub fn distance(&self, other: &Cell) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn manhattan_distance(&self, other: &Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Compass direction on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Neighbour enumeration order: horizontal first, then vertical
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Down,
        Direction::Up,
    ];

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Label a move between two cells. Returns `None` unless the cells are
    /// orthogonal neighbours.
    pub fn between(from: Cell, to: Cell) -> Option<Direction> {
        match (to.x - from.x, to.y - from.y) {
            (1, 0) => Some(Direction::Right),
            (-1, 0) => Some(Direction::Left),
            (0, 1) => Some(Direction::Up),
            (0, -1) => Some(Direction::Down),
            _ => None,
        }
    }

    fn bit(&self) -> u8 {
        match self {
            Direction::Up => 0b0001,
            Direction::Down => 0b0010,
            Direction::Left => 0b0100,
            Direction::Right => 0b1000,
        }
    }

    /// Arrow glyph used by the terminal map
    pub fn arrow(&self) -> char {
        match self {
            Direction::Up => '^',
            Direction::Down => 'v',
            Direction::Left => '<',
            Direction::Right => '>',
        }
    }
}

/// A small set of compass directions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DirectionSet(u8);

impl DirectionSet {
    pub const EMPTY: DirectionSet = DirectionSet(0);

    pub fn of(directions: &[Direction]) -> Self {
        let mut set = Self::EMPTY;
        for direction in directions {
            set.insert(*direction);
        }
        set
    }

    pub fn insert(&mut self, direction: Direction) {
        self.0 |= direction.bit();
    }

    pub fn contains(&self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    pub fn union(&self, other: DirectionSet) -> DirectionSet {
        DirectionSet(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Direction> {
        let set = *self;
        Direction::ALL.into_iter().filter(move |d| set.contains(*d))
    }
}

impl From<Direction> for DirectionSet {
    fn from(direction: Direction) -> Self {
        DirectionSet(direction.bit())
    }
}
