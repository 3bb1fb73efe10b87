//! Car decision logic
//!
//! A car asks navigation for its ranked candidates and takes the first one
//! it is allowed into: its own destination lot always, any other lot never,
//! a light cell only on green, and a plain street cell unconditionally.

use anyhow::Result;
use log::debug;
use rand::Rng;

use super::grid::{Grid, Occupant};
use super::navigation::ranked_successors;
use super::traffic_light::LightController;
use super::types::{CarId, Cell, ParkingId};

/// Lifecycle of a car
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarState {
    Traveling,
    /// Terminal: the car has left the world
    Arrived,
}

/// What a car wants to do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarIntent {
    /// No permitted candidate, stay put
    Hold,
    /// Move onto a street cell
    Move(Cell),
    /// Move onto the destination lot and leave the world
    Arrive(Cell),
}

impl CarIntent {
    pub fn target(&self) -> Option<Cell> {
        match self {
            CarIntent::Hold => None,
            CarIntent::Move(cell) | CarIntent::Arrive(cell) => Some(*cell),
        }
    }
}

/// Result of committing a car's intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarUpdateResult {
    Held,
    Moved(Cell),
    Arrived(Cell),
}

/// A car in the city
#[derive(Debug, Clone)]
pub struct SimCar {
    pub id: CarId,
    /// Cell the car started from
    pub origin: Cell,
    /// Destination lot cell, fixed for the car's lifetime
    pub destination: Cell,
    pub destination_lot: ParkingId,
    pub position: Cell,
    pub state: CarState,
    /// Ticks spent moving
    pub moves: u32,
    /// Ticks spent holding
    pub holds: u32,
}

impl SimCar {
    pub fn new(id: CarId, origin: Cell, destination: Cell, destination_lot: ParkingId) -> Self {
        Self {
            id,
            origin,
            destination,
            destination_lot,
            position: origin,
            state: CarState::Traveling,
            moves: 0,
            holds: 0,
        }
    }

    pub fn is_traveling(&self) -> bool {
        self.state == CarState::Traveling
    }

    /// Whether `cell` is this car's destination lot
    pub fn is_goal(&self, grid: &Grid, cell: Cell) -> bool {
        cell == self.destination && grid.parking(cell).is_some()
    }

    /// Decide this tick's action against the grid as it currently stands.
    /// Reads only; nothing is mutated.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        grid: &Grid,
        lights: &LightController,
        exploration: bool,
        rng: &mut R,
    ) -> CarIntent {
        if !self.is_traveling() {
            return CarIntent::Hold;
        }

        let candidates = ranked_successors(grid, self.position, self.destination, exploration, rng);

        for candidate in candidates {
            if self.is_goal(grid, candidate) {
                return CarIntent::Arrive(candidate);
            }
            if grid.parking(candidate).is_some() {
                continue;
            }
            match grid.light(candidate) {
                Some(light) if lights.state(light).is_some_and(|s| s.is_green()) => {
                    return CarIntent::Move(candidate);
                }
                Some(light) => {
                    debug!("Car {:?} skips red light {:?} at {}", self.id.0, light.0, candidate);
                }
                None => return CarIntent::Move(candidate),
            }
        }

        CarIntent::Hold
    }

    /// Apply an intent to the grid, updating the car's own position and state
    pub fn commit(&mut self, grid: &mut Grid, intent: CarIntent) -> Result<CarUpdateResult> {
        match intent {
            CarIntent::Hold => {
                self.holds += 1;
                Ok(CarUpdateResult::Held)
            }
            CarIntent::Move(target) => {
                grid.move_car(self.id, self.position, target)?;
                self.position = target;
                self.moves += 1;
                Ok(CarUpdateResult::Moved(target))
            }
            CarIntent::Arrive(target) => {
                grid.move_car(self.id, self.position, target)?;
                grid.remove(Occupant::Car(self.id), target)?;
                self.position = target;
                self.moves += 1;
                self.state = CarState::Arrived;
                Ok(CarUpdateResult::Arrived(target))
            }
        }
    }
}
