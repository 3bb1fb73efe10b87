//! Static city layout
//!
//! `CityLayout` is the already-validated map a world is built from: street
//! cells with their exits, building footprints, parking lots, light groups
//! and the rival pairing between lights. `CityLayout::downtown` is the
//! reference 24x24 city.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::street::Street;
use super::types::{Cell, Direction, DirectionSet, ParkingId, CITY_HEIGHT, CITY_WIDTH};

/// A light group before it is placed: the cells it gates and its orientation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightSpec {
    pub positions: Vec<Cell>,
    pub orientation: Direction,
}

/// Static map description
#[derive(Debug, Clone)]
pub struct CityLayout {
    width: i32,
    height: i32,
    streets: BTreeMap<Cell, Street>,
    buildings: Vec<Cell>,
    parking_lots: Vec<(ParkingId, Cell)>,
    lights: Vec<LightSpec>,
    /// Rival pairs as indices into `lights`
    pairs: Vec<(usize, usize)>,
}

/// Cells of a rectangle given by its top-left corner, listed column by
/// column from the top
fn block(corner: Cell, width: i32, height: i32) -> impl Iterator<Item = Cell> {
    (0..width).flat_map(move |x| (0..height).map(move |y| Cell::new(corner.x + x, corner.y - y)))
}

impl CityLayout {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            streets: BTreeMap::new(),
            buildings: Vec::new(),
            parking_lots: Vec::new(),
            lights: Vec::new(),
            pairs: Vec::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Add a street cell. Exits of an existing street on the cell are kept.
    pub fn street(&mut self, cell: Cell, exits: &[Direction]) -> &mut Self {
        let street = Street::new(DirectionSet::of(exits));
        self.streets
            .entry(cell)
            .and_modify(|existing| *existing = existing.merged(street))
            .or_insert(street);
        self
    }

    /// Add a rectangle of one-way street cells
    pub fn street_block(&mut self, corner: Cell, width: i32, height: i32, exit: Direction) -> &mut Self {
        for cell in block(corner, width, height) {
            self.street(cell, &[exit]);
        }
        self
    }

    /// Add an extra exit to a cell that is already a street. Other cells are ignored.
    pub fn turn(&mut self, cell: Cell, exit: Direction) -> &mut Self {
        if let Some(street) = self.streets.get_mut(&cell) {
            *street = street.merged(Street::one_way(exit));
        }
        self
    }

    pub fn building(&mut self, cell: Cell) -> &mut Self {
        self.buildings.push(cell);
        self
    }

    pub fn building_block(&mut self, corner: Cell, width: i32, height: i32) -> &mut Self {
        self.buildings.extend(block(corner, width, height));
        self
    }

    pub fn parking_lot(&mut self, id: ParkingId, cell: Cell) -> &mut Self {
        self.parking_lots.push((id, cell));
        self
    }

    /// Add a light group. Lights are referenced by pairs in the order they were added.
    pub fn light(&mut self, positions: Vec<Cell>, orientation: Direction) -> &mut Self {
        self.lights.push(LightSpec { positions, orientation });
        self
    }

    /// Pair two lights by the order they were added
    pub fn pair(&mut self, first: usize, second: usize) -> &mut Self {
        self.pairs.push((first, second));
        self
    }

    pub fn streets(&self) -> impl Iterator<Item = (Cell, Street)> + '_ {
        self.streets.iter().map(|(cell, street)| (*cell, *street))
    }

    pub fn buildings(&self) -> &[Cell] {
        &self.buildings
    }

    pub fn parking_lots(&self) -> &[(ParkingId, Cell)] {
        &self.parking_lots
    }

    pub fn lights(&self) -> &[LightSpec] {
        &self.lights
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    fn check_bounds(&self, cell: Cell, what: &str) -> Result<()> {
        if !(0..self.width).contains(&cell.x) || !(0..self.height).contains(&cell.y) {
            anyhow::bail!(
                "{} at {} lies outside the {}x{} map",
                what,
                cell,
                self.width,
                self.height
            );
        }
        Ok(())
    }

    /// Check map integrity. Every failure here is fatal for world construction.
    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            anyhow::bail!("Map dimensions must be positive, got {}x{}", self.width, self.height);
        }

        for cell in self.streets.keys() {
            self.check_bounds(*cell, "Street")?;
        }
        for cell in &self.buildings {
            self.check_bounds(*cell, "Building")?;
        }

        let mut lot_ids = HashSet::new();
        let mut lot_cells = HashSet::new();
        for (id, cell) in &self.parking_lots {
            self.check_bounds(*cell, "Parking lot")?;
            if !lot_ids.insert(*id) {
                anyhow::bail!("Parking lot {:?} is defined more than once", id);
            }
            if !lot_cells.insert(*cell) {
                anyhow::bail!("Cell {} holds more than one parking lot", cell);
            }
        }

        let mut gated: HashMap<Cell, usize> = HashMap::new();
        for (index, light) in self.lights.iter().enumerate() {
            if light.positions.is_empty() {
                anyhow::bail!("Light {} gates no cells", index);
            }
            for cell in &light.positions {
                self.check_bounds(*cell, "Light")?;
                if let Some(other) = gated.insert(*cell, index) {
                    if other != index {
                        anyhow::bail!("Cell {} is gated by lights {} and {}", cell, other, index);
                    }
                }
            }
        }

        let mut paired = HashSet::new();
        for (first, second) in &self.pairs {
            for index in [first, second] {
                self.lights
                    .get(*index)
                    .with_context(|| format!("Light pair references undefined light {}", index))?;
                if !paired.insert(*index) {
                    anyhow::bail!("Light {} belongs to more than one pair", index);
                }
            }
        }

        Ok(())
    }

    /// The reference 24x24 downtown
    pub fn downtown() -> Self {
        use Direction::*;

        let mut layout = CityLayout::new(CITY_WIDTH, CITY_HEIGHT);

        // Street blocks: (top-left corner, width, height, default exit)
        let street_blocks = [
            ((0, 23), 2, 24, Down),
            ((2, 23), 22, 2, Left),
            ((2, 1), 22, 2, Right),
            ((22, 21), 2, 20, Up),
            ((2, 17), 10, 2, Left),
            ((5, 15), 2, 4, Up),
            ((2, 9), 10, 2, Right),
            ((2, 11), 10, 2, Left),
            ((6, 7), 2, 6, Down),
            ((12, 21), 2, 10, Down),
            ((14, 21), 2, 10, Up),
            ((12, 7), 2, 6, Down),
            ((14, 7), 2, 6, Up),
            ((16, 5), 6, 2, Left),
            ((16, 9), 6, 2, Right),
            ((16, 11), 6, 2, Left),
            ((16, 17), 6, 2, Right),
            ((18, 15), 2, 4, Up),
            ((18, 21), 2, 4, Down),
        ];
        for ((x, y), width, height, exit) in street_blocks {
            layout.street_block(Cell::new(x, y), width, height, exit);
        }

        // Roundabout ring around the central island
        let roundabout = [
            ((12, 11), [Down, Left]),
            ((12, 10), [Down, Left]),
            ((12, 9), [Down, Right]),
            ((12, 8), [Down, Right]),
            ((13, 11), [Down, Left]),
            ((13, 8), [Down, Right]),
            ((14, 11), [Up, Left]),
            ((14, 8), [Up, Right]),
            ((15, 11), [Up, Left]),
            ((15, 10), [Up, Left]),
            ((15, 9), [Up, Right]),
            ((15, 8), [Up, Right]),
        ];
        for ((x, y), exits) in roundabout {
            layout.street(Cell::new(x, y), &exits);
        }

        // Parking lots with the single exit of their approach street
        let lots = [
            ((2, 20), Left),
            ((6, 18), Down),
            ((9, 21), Up),
            ((11, 19), Right),
            ((2, 6), Left),
            ((5, 3), Right),
            ((4, 13), Right),
            ((8, 15), Up),
            ((11, 13), Right),
            ((8, 3), Left),
            ((17, 20), Right),
            ((20, 19), Left),
            ((16, 13), Left),
            ((17, 6), Down),
            ((19, 6), Down),
            ((19, 3), Up),
            ((21, 14), Right),
        ];
        for (index, ((x, y), exit)) in lots.into_iter().enumerate() {
            let cell = Cell::new(x, y);
            layout.street(cell, &[exit]);
            layout.parking_lot(ParkingId(index as u32 + 1), cell);
        }

        // Extra exits at junctions. A cell listed under several directions
        // takes only the first.
        let turns: [(Direction, &[(i32, i32)]); 4] = [
            (
                Right,
                &[
                    (0, 0), (0, 1), (1, 0), (1, 1), (1, 8), (1, 9), (12, 9), (15, 9),
                    (15, 16), (15, 17), (14, 16), (14, 17),
                ],
            ),
            (
                Left,
                &[
                    (1, 23), (1, 22), (22, 4), (23, 4), (22, 5), (23, 5), (22, 10), (22, 11),
                    (23, 10), (23, 11), (12, 11), (12, 10), (15, 10), (15, 11), (15, 13),
                    (15, 4), (15, 5), (12, 16), (12, 17), (13, 16), (13, 17),
                ],
            ),
            (
                Up,
                &[
                    (22, 0), (23, 0), (22, 1), (23, 1), (22, 22), (22, 23), (23, 22), (23, 23),
                    (14, 1), (15, 1), (14, 22), (15, 22), (14, 23), (15, 23), (14, 8), (15, 8),
                    (14, 11), (5, 11), (6, 11), (5, 10), (6, 10), (18, 10), (18, 11), (19, 10),
                    (19, 11),
                ],
            ),
            (
                Down,
                &[
                    (8, 17), (6, 1), (7, 1), (12, 1), (13, 1), (12, 22), (13, 22), (12, 23),
                    (13, 23), (12, 0), (13, 0), (6, 0), (7, 0), (18, 22), (19, 22), (13, 8),
                    (13, 11), (6, 8), (6, 9), (7, 8), (7, 9), (9, 22),
                ],
            ),
        ];
        let mut turned = HashSet::new();
        for (exit, cells) in turns {
            for (x, y) in cells {
                let cell = Cell::new(*x, *y);
                if turned.insert(cell) {
                    layout.turn(cell, exit);
                }
            }
        }

        // Building footprints; parking lots sit inside them
        let building_blocks = [
            ((2, 21), 10, 4),
            ((2, 7), 4, 6),
            ((2, 15), 3, 4),
            ((7, 15), 5, 4),
            ((8, 7), 4, 6),
            ((16, 21), 2, 4),
            ((20, 21), 2, 4),
            ((16, 15), 2, 4),
            ((16, 7), 6, 2),
            ((16, 3), 6, 2),
            ((20, 15), 2, 4),
            // roundabout island
            ((13, 10), 2, 2),
        ];
        for ((x, y), width, height) in building_blocks {
            layout.building_block(Cell::new(x, y), width, height);
        }

        // Light groups, then the six rival pairs by index
        let lights = [
            ([(22, 7), (23, 7)], Up),
            ([(21, 9), (21, 8)], Left),
            ([(16, 5), (16, 4)], Right),
            ([(16, 23), (16, 22)], Right),
            ([(14, 21), (15, 21)], Up),
            ([(14, 3), (15, 3)], Up),
            ([(12, 2), (13, 2)], Down),
            ([(11, 1), (11, 0)], Left),
            ([(7, 17), (7, 16)], Right),
            ([(5, 15), (6, 15)], Up),
            ([(2, 11), (2, 10)], Right),
            ([(0, 12), (1, 12)], Down),
        ];
        for (positions, orientation) in lights {
            layout.light(
                positions.iter().map(|(x, y)| Cell::new(*x, *y)).collect(),
                orientation,
            );
        }
        for (first, second) in [(11, 10), (9, 8), (7, 6), (5, 2), (3, 4), (1, 0)] {
            layout.pair(first, second);
        }

        layout
    }
}
