//! City traffic simulation engine
//!
//! This module contains the whole simulation: the grid world, street
//! topology, greedy car navigation, the light controller and the tick
//! scheduler. It runs headless and can be tested without any front end.

mod car;
mod city_map;
mod config;
mod grid;
mod navigation;
mod stats;
mod street;
mod traffic_light;
mod types;
mod world;

// Re-export public types for external use
pub use car::{CarIntent, CarState, CarUpdateResult, SimCar};
pub use city_map::{CityLayout, LightSpec};
pub use config::{ActivationMode, LightTiming, SimConfig};
pub use grid::{Grid, GridCell, Occupant};
pub use navigation::{
    heuristic, rank_by_distance, ranked_successors, should_explore, successors, unique_successors,
    EXPLORATION_DRAW_MAX, EXPLORATION_THRESHOLD,
};
pub use stats::SimulationStats;
pub use street::{Street, StreetTopology};
pub use traffic_light::{
    arbitrate, LightController, LightPair, LightState, SimTrafficLight, MAX_CHANGE_THRESHOLD,
    MIN_CHANGE_THRESHOLD,
};
pub use types::{
    CarId, Cell, Direction, DirectionSet, LightId, PairId, ParkingId, SimId, CITY_HEIGHT, CITY_WIDTH,
    DEFAULT_CAR_COUNT, UPSTREAM_CELLS,
};
pub use world::{EntityKind, EntityView, SimWorld};
