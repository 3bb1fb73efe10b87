//! Grid world storage
//!
//! A fixed-size multi-occupancy cell space. Every cell carries a small fixed
//! set of static fixtures (at most one street, building flag, parking lot and
//! light) plus the list of cars currently standing on it. Only the car list
//! changes after setup.

use anyhow::{Context, Result};

use super::street::Street;
use super::types::{CarId, Cell, LightId, ParkingId};

/// Anything that can occupy a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Street(Street),
    Building,
    ParkingLot(ParkingId),
    TrafficLight(LightId),
    Car(CarId),
}

/// Contents of a single cell
#[derive(Debug, Clone, Default)]
pub struct GridCell {
    street: Option<Street>,
    building: bool,
    parking: Option<ParkingId>,
    light: Option<LightId>,
    /// Cars on this cell. Only parking lots ever hold more than one.
    cars: Vec<CarId>,
}

impl GridCell {
    pub fn street(&self) -> Option<&Street> {
        self.street.as_ref()
    }

    pub fn has_building(&self) -> bool {
        self.building
    }

    pub fn parking(&self) -> Option<ParkingId> {
        self.parking
    }

    pub fn light(&self) -> Option<LightId> {
        self.light
    }

    pub fn cars(&self) -> &[CarId] {
        &self.cars
    }

    pub fn has_car(&self) -> bool {
        !self.cars.is_empty()
    }

    /// All occupants in a fixed order: street, building, lot, light, cars
    pub fn occupants(&self) -> Vec<Occupant> {
        let mut occupants = Vec::with_capacity(4 + self.cars.len());
        if let Some(street) = self.street {
            occupants.push(Occupant::Street(street));
        }
        if self.building {
            occupants.push(Occupant::Building);
        }
        if let Some(parking) = self.parking {
            occupants.push(Occupant::ParkingLot(parking));
        }
        if let Some(light) = self.light {
            occupants.push(Occupant::TrafficLight(light));
        }
        occupants.extend(self.cars.iter().map(|car| Occupant::Car(*car)));
        occupants
    }

    fn is_vacant(&self) -> bool {
        self.street.is_none()
            && !self.building
            && self.parking.is_none()
            && self.light.is_none()
            && self.cars.is_empty()
    }
}

/// The grid world
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<GridCell>,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            anyhow::bail!("Grid dimensions must be positive, got {}x{}", width, height);
        }
        Ok(Self {
            width,
            height,
            cells: vec![GridCell::default(); (width * height) as usize],
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        (0..self.width).contains(&cell.x) && (0..self.height).contains(&cell.y)
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.y * self.width + cell.x) as usize)
    }

    /// Contents of a cell, or `None` when it lies outside the grid
    pub fn get(&self, cell: Cell) -> Option<&GridCell> {
        self.index(cell).map(|index| &self.cells[index])
    }

    fn get_mut(&mut self, cell: Cell) -> Result<&mut GridCell> {
        let index = self
            .index(cell)
            .with_context(|| format!("Cell {} is outside the {}x{} grid", cell, self.width, self.height))?;
        Ok(&mut self.cells[index])
    }

    /// Everything standing on a cell. Off-grid cells have no occupants.
    pub fn occupants(&self, cell: Cell) -> Vec<Occupant> {
        self.get(cell).map(GridCell::occupants).unwrap_or_default()
    }

    /// True iff the cell is on the grid and nothing occupies it
    pub fn is_empty(&self, cell: Cell) -> bool {
        self.get(cell).is_some_and(GridCell::is_vacant)
    }

    pub fn street(&self, cell: Cell) -> Option<&Street> {
        self.get(cell).and_then(GridCell::street)
    }

    pub fn parking(&self, cell: Cell) -> Option<ParkingId> {
        self.get(cell).and_then(GridCell::parking)
    }

    pub fn light(&self, cell: Cell) -> Option<LightId> {
        self.get(cell).and_then(GridCell::light)
    }

    pub fn has_building(&self, cell: Cell) -> bool {
        self.get(cell).is_some_and(GridCell::has_building)
    }

    pub fn has_car(&self, cell: Cell) -> bool {
        self.get(cell).is_some_and(GridCell::has_car)
    }

    pub fn car_count(&self, cell: Cell) -> usize {
        self.get(cell).map_or(0, |c| c.cars.len())
    }

    /// Place an occupant on a cell.
    ///
    /// A second street on the same cell merges its exits into the first.
    /// Cars may not be placed on buildings unless the cell is a parking lot.
    pub fn place(&mut self, occupant: Occupant, cell: Cell) -> Result<()> {
        let contents = self.get_mut(cell)?;
        match occupant {
            Occupant::Street(street) => {
                contents.street = Some(match contents.street {
                    Some(existing) => existing.merged(street),
                    None => street,
                });
            }
            Occupant::Building => contents.building = true,
            Occupant::ParkingLot(id) => {
                if let Some(existing) = contents.parking {
                    anyhow::bail!("Cell {} already holds parking lot {:?}, cannot add {:?}", cell, existing, id);
                }
                contents.parking = Some(id);
            }
            Occupant::TrafficLight(id) => match contents.light {
                Some(existing) if existing != id => {
                    anyhow::bail!("Cell {} already gated by light {:?}, cannot add {:?}", cell, existing, id);
                }
                _ => contents.light = Some(id),
            },
            Occupant::Car(id) => {
                if contents.building && contents.parking.is_none() {
                    anyhow::bail!("Cannot place car {:?} on building cell {}", id, cell);
                }
                if contents.cars.contains(&id) {
                    anyhow::bail!("Car {:?} is already on cell {}", id, cell);
                }
                contents.cars.push(id);
            }
        }
        Ok(())
    }

    /// Move a car between cells: removed from the source list, appended to the destination's
    pub fn move_car(&mut self, car: CarId, from: Cell, to: Cell) -> Result<()> {
        if !self.in_bounds(to) {
            anyhow::bail!("Cannot move car {:?} off the grid to {}", car, to);
        }
        self.remove(Occupant::Car(car), from)?;
        self.get_mut(to)?.cars.push(car);
        Ok(())
    }

    /// Remove an occupant from a cell. Only cars are ever removed.
    pub fn remove(&mut self, occupant: Occupant, cell: Cell) -> Result<()> {
        let Occupant::Car(car) = occupant else {
            anyhow::bail!("Static occupant {:?} on {} cannot be removed", occupant, cell);
        };
        let contents = self.get_mut(cell)?;
        let slot = contents
            .cars
            .iter()
            .position(|c| *c == car)
            .with_context(|| format!("Car {:?} not found on cell {}", car, cell))?;
        contents.cars.remove(slot);
        Ok(())
    }

    /// Iterate every cell with its coordinate, row by row from `y = 0`
    pub fn cells(&self) -> impl Iterator<Item = (Cell, &GridCell)> {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(index, contents)| {
            let index = index as i32;
            (Cell::new(index % width, index / width), contents)
        })
    }
}
