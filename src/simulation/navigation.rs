//! Local greedy navigation
//!
//! Cars never plan a full route. Every tick they look at the cells around
//! them, keep the ones they may legally enter, and try them in order of
//! straight-line distance to their destination lot. When a draw from 0..=10
//! lands on 7 or above a random successor is tried instead, which breaks up gridlock at contested
//! intersections.

use ordered_float::OrderedFloat;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;

use super::grid::Grid;
use super::types::Cell;

/// Upper bound (inclusive) of the exploration draw
pub const EXPLORATION_DRAW_MAX: u32 = 10;

/// Draws at or above this value trigger exploration
pub const EXPLORATION_THRESHOLD: u32 = 7;

/// Raw successor list of a cell, duplicates included.
///
/// A neighbouring parking lot is always a successor. For every neighbour
/// that holds no car and no building, each exit of the current street whose
/// target is a car-free street is appended again, so well-connected cells
/// appear several times. The duplicates weight the exploration draw.
pub fn successors(grid: &Grid, cell: Cell) -> Vec<Cell> {
    let own_street = grid.street(cell).copied();
    let mut successors = Vec::new();

    for (_, neighbour) in cell.neighbors() {
        let Some(contents) = grid.get(neighbour) else {
            continue;
        };

        if contents.parking().is_some() {
            successors.push(neighbour);
        }

        if contents.has_car() || contents.has_building() {
            continue;
        }

        let Some(street) = own_street else {
            continue;
        };

        for (direction, next) in cell.neighbors() {
            if !street.allows(direction) {
                continue;
            }
            let Some(next_contents) = grid.get(next) else {
                continue;
            };
            if next_contents.street().is_some() && !next_contents.has_car() {
                successors.push(next);
            }
        }
    }

    successors
}

/// Straight-line distance heuristic
pub fn heuristic(cell: Cell, destination: Cell) -> OrderedFloat<f32> {
    OrderedFloat(cell.distance(&destination))
}

/// Deduplicate, keeping the first occurrence of each cell
pub fn unique_successors(successors: &[Cell]) -> Vec<Cell> {
    let mut seen = HashSet::new();
    successors
        .iter()
        .copied()
        .filter(|cell| seen.insert(*cell))
        .collect()
}

/// Candidates ordered by ascending heuristic. Ties keep their input order.
pub fn rank_by_distance(candidates: &[Cell], destination: Cell) -> Vec<Cell> {
    let mut ranked = candidates.to_vec();
    ranked.sort_by_key(|cell| heuristic(*cell, destination));
    ranked
}

/// Roll the exploration override
pub fn should_explore<R: Rng + ?Sized>(rng: &mut R) -> bool {
    rng.random_range(0..=EXPLORATION_DRAW_MAX) >= EXPLORATION_THRESHOLD
}

/// The ordered list of cells a car at `position` should try this tick.
///
/// Empty when the car is boxed in. When exploration triggers the list holds
/// a single cell drawn uniformly from the raw (non-deduplicated) successors.
pub fn ranked_successors<R: Rng + ?Sized>(
    grid: &Grid,
    position: Cell,
    destination: Cell,
    exploration: bool,
    rng: &mut R,
) -> Vec<Cell> {
    let raw = successors(grid, position);
    let unique = unique_successors(&raw);
    if unique.is_empty() {
        return unique;
    }

    let ranked = rank_by_distance(&unique, destination);

    if exploration && should_explore(rng) {
        if let Some(choice) = raw.choose(rng) {
            return vec![*choice];
        }
    }

    ranked
}
