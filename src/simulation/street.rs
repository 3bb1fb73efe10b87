//! Street topology
//!
//! Each street cell carries the set of compass directions a car may leave
//! it by. `StreetTopology` lifts those local rules into a directed
//! connectivity graph used for setup diagnostics.

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use super::grid::Grid;
use super::types::{Cell, Direction, DirectionSet, ParkingId};

/// A street cell with its legal exit directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Street {
    exits: DirectionSet,
}

impl Street {
    pub fn new(exits: DirectionSet) -> Self {
        Self { exits }
    }

    pub fn one_way(direction: Direction) -> Self {
        Self::new(direction.into())
    }

    pub fn exits(&self) -> DirectionSet {
        self.exits
    }

    pub fn allows(&self, direction: Direction) -> bool {
        self.exits.contains(direction)
    }

    pub fn merged(&self, other: Street) -> Street {
        Street::new(self.exits.union(other.exits))
    }
}

/// Directed graph of single-step moves a car could ever make, ignoring
/// other cars and lights.
///
/// An edge `a -> b` exists when `b` is a parking lot next to `a`, or when
/// `a` is a street whose exits include the direction of `b` and `b` is a
/// street.
#[derive(Default)]
pub struct StreetTopology {
    graph: DiGraph<Cell, Direction>,
    cell_to_node: HashMap<Cell, NodeIndex>,
    lots: Vec<(ParkingId, Cell)>,
}

impl StreetTopology {
    pub fn from_grid(grid: &Grid) -> Self {
        let mut topology = Self::default();

        for (cell, contents) in grid.cells() {
            if contents.street().is_some() || contents.parking().is_some() {
                topology.node(cell);
            }
            if let Some(id) = contents.parking() {
                topology.lots.push((id, cell));
            }
        }

        for (cell, contents) in grid.cells() {
            if contents.street().is_none() && contents.parking().is_none() {
                continue;
            }
            for (direction, next) in cell.neighbors() {
                let Some(next_contents) = grid.get(next) else {
                    continue;
                };
                let legal_turn = contents.street().is_some_and(|s| s.allows(direction))
                    && next_contents.street().is_some();
                if next_contents.parking().is_some() || legal_turn {
                    let from = topology.node(cell);
                    let to = topology.node(next);
                    topology.graph.update_edge(from, to, direction);
                }
            }
        }

        topology
    }

    fn node(&mut self, cell: Cell) -> NodeIndex {
        if let Some(index) = self.cell_to_node.get(&cell) {
            return *index;
        }
        let index = self.graph.add_node(cell);
        self.cell_to_node.insert(cell, index);
        index
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Legal single-step moves out of a cell
    pub fn exits_from(&self, cell: Cell) -> Vec<(Direction, Cell)> {
        let Some(index) = self.cell_to_node.get(&cell) else {
            return Vec::new();
        };
        self.graph
            .edges(*index)
            .map(|edge| (*edge.weight(), self.graph[edge.target()]))
            .collect()
    }

    /// Whether any sequence of legal moves leads from one cell to another
    pub fn has_route(&self, from: Cell, to: Cell) -> bool {
        match (self.cell_to_node.get(&from), self.cell_to_node.get(&to)) {
            (Some(a), Some(b)) => has_path_connecting(&self.graph, *a, *b, None),
            _ => false,
        }
    }

    /// Ordered pairs of parking lots with no route between them
    pub fn unreachable_lot_pairs(&self) -> Vec<(ParkingId, ParkingId)> {
        let mut pairs = Vec::new();
        for (origin_id, origin) in &self.lots {
            for (destination_id, destination) in &self.lots {
                if origin_id != destination_id && !self.has_route(*origin, *destination) {
                    pairs.push((*origin_id, *destination_id));
                }
            }
        }
        pairs
    }
}
