//! Traffic light controller
//!
//! Lights come in rival pairs that gate perpendicular approaches to the same
//! junction. Once per tick, after every car has moved, each pair compares
//! the number of cars queued upstream of its two members and hands green to
//! the busier side.

use log::debug;
use rand::Rng;
use std::collections::BTreeMap;

use super::config::LightTiming;
use super::grid::Grid;
use super::types::{Cell, Direction, LightId, PairId, UPSTREAM_CELLS};

/// Lower bound of a light's change threshold
pub const MIN_CHANGE_THRESHOLD: u32 = 5;

/// Upper bound (inclusive) of a light's change threshold
pub const MAX_CHANGE_THRESHOLD: u32 = 15;

/// Colour of a light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightState {
    #[default]
    Red,
    Green,
}

impl LightState {
    pub fn is_green(&self) -> bool {
        matches!(self, LightState::Green)
    }
}

/// One logical traffic light spanning several cells
#[derive(Debug, Clone)]
pub struct SimTrafficLight {
    pub id: LightId,
    /// Cells gated by this light
    pub positions: Vec<Cell>,
    /// Direction cars face while stopped at the light
    pub orientation: Direction,
    pub state: LightState,
    /// Controller updates since the last state change
    pub timer: u32,
    pub change_threshold: u32,
}

impl SimTrafficLight {
    pub fn new(id: LightId, positions: Vec<Cell>, orientation: Direction, change_threshold: u32) -> Self {
        Self {
            id,
            positions,
            orientation,
            state: LightState::Red,
            timer: 0,
            change_threshold,
        }
    }

    /// Side of the light that queued cars are counted on.
    ///
    /// Vertical orientations name the travel direction, so `Up` looks below
    /// the light. Horizontal orientations name the side traffic arrives
    /// from, so `Right` looks to the right.
    pub fn upstream_direction(&self) -> Direction {
        match self.orientation {
            Direction::Up | Direction::Down => self.orientation.opposite(),
            Direction::Left | Direction::Right => self.orientation,
        }
    }

    /// The cells inspected when counting queued cars: up to three cells
    /// upstream of each gated position. Out-of-bounds cells are skipped.
    pub fn upstream_cells(&self, grid: &Grid) -> Vec<Cell> {
        let behind = self.upstream_direction();
        self.positions
            .iter()
            .flat_map(|position| (1..=UPSTREAM_CELLS).map(move |i| position.offset(behind, i)))
            .filter(|cell| grid.in_bounds(*cell))
            .collect()
    }

    /// Number of cars queued upstream of this light
    pub fn count_cars(&self, grid: &Grid) -> usize {
        self.upstream_cells(grid)
            .into_iter()
            .map(|cell| grid.car_count(cell))
            .sum()
    }

    fn set_state(&mut self, state: LightState) {
        if self.state != state {
            self.state = state;
            self.timer = 0;
        }
    }

    /// Whether a green light is still inside its minimum green period
    fn holding_green(&self) -> bool {
        self.state.is_green() && self.timer < self.change_threshold
    }
}

/// Two rival lights whose states are always set together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightPair {
    pub id: PairId,
    pub first: LightId,
    pub second: LightId,
}

/// Decide a pair's states from the queue lengths on either side.
///
/// The busier side gets green. Equal nonzero queues are settled by a coin
/// flip; two empty approaches both stay red.
pub fn arbitrate<R: Rng + ?Sized>(first: usize, second: usize, rng: &mut R) -> (LightState, LightState) {
    use LightState::*;
    match first.cmp(&second) {
        std::cmp::Ordering::Greater => (Green, Red),
        std::cmp::Ordering::Less => (Red, Green),
        std::cmp::Ordering::Equal if first == 0 => (Red, Red),
        std::cmp::Ordering::Equal => {
            if rng.random_bool(0.5) {
                (Green, Red)
            } else {
                (Red, Green)
            }
        }
    }
}

/// Owns every light and the explicit pairing between them
#[derive(Debug, Clone, Default)]
pub struct LightController {
    lights: BTreeMap<LightId, SimTrafficLight>,
    pairs: BTreeMap<PairId, LightPair>,
    timing: LightTiming,
}

impl LightController {
    pub fn new(timing: LightTiming) -> Self {
        Self {
            timing,
            ..Self::default()
        }
    }

    pub fn add_light(&mut self, light: SimTrafficLight) {
        self.lights.insert(light.id, light);
    }

    pub fn add_pair(&mut self, pair: LightPair) {
        self.pairs.insert(pair.id, pair);
    }

    pub fn light(&self, id: LightId) -> Option<&SimTrafficLight> {
        self.lights.get(&id)
    }

    pub fn state(&self, id: LightId) -> Option<LightState> {
        self.lights.get(&id).map(|light| light.state)
    }

    pub fn lights(&self) -> impl Iterator<Item = &SimTrafficLight> {
        self.lights.values()
    }

    pub fn pair(&self, id: PairId) -> Option<&LightPair> {
        self.pairs.get(&id)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &LightPair> {
        self.pairs.values()
    }

    pub fn pair_states(&self, id: PairId) -> Option<(LightState, LightState)> {
        let pair = self.pairs.get(&id)?;
        Some((self.state(pair.first)?, self.state(pair.second)?))
    }

    pub fn timing(&self) -> LightTiming {
        self.timing
    }

    /// Re-evaluate every pair against the current grid
    pub fn update<R: Rng + ?Sized>(&mut self, grid: &Grid, rng: &mut R) {
        if self.timing == LightTiming::MinimumGreen {
            for light in self.lights.values_mut() {
                light.timer = light.timer.saturating_add(1);
            }
        }

        let pairs: Vec<LightPair> = self.pairs.values().copied().collect();
        for pair in pairs {
            let (Some(first), Some(second)) = (self.lights.get(&pair.first), self.lights.get(&pair.second))
            else {
                continue;
            };

            if self.timing == LightTiming::MinimumGreen
                && (first.holding_green() || second.holding_green())
            {
                continue;
            }

            let first_count = first.count_cars(grid);
            let second_count = second.count_cars(grid);
            let (first_state, second_state) = arbitrate(first_count, second_count, rng);

            debug!(
                "Pair {:?}: {} vs {} cars -> {:?}/{:?}",
                pair.id, first_count, second_count, first_state, second_state
            );

            if let Some(light) = self.lights.get_mut(&pair.first) {
                light.set_state(first_state);
            }
            if let Some(light) = self.lights.get_mut(&pair.second) {
                light.set_state(second_state);
            }
        }
    }
}
