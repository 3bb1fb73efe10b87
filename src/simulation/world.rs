//! Main simulation world that ties everything together
//!
//! `SimWorld` owns the grid, the cars and the light controller and drives
//! the tick: every car acts once, then the lights re-arbitrate, then the
//! tick counter advances.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap};

use super::car::{CarIntent, CarUpdateResult, SimCar};
use super::city_map::CityLayout;
use super::config::{ActivationMode, SimConfig};
use super::grid::{Grid, Occupant};
use super::stats::SimulationStats;
use super::street::StreetTopology;
use super::traffic_light::{
    LightController, LightPair, LightState, SimTrafficLight, MAX_CHANGE_THRESHOLD, MIN_CHANGE_THRESHOLD,
};
use super::types::{CarId, Cell, DirectionSet, LightId, PairId, ParkingId, SimId};

/// What an entity is, with its render attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Street { exits: DirectionSet },
    Building,
    ParkingLot { id: ParkingId },
    TrafficLight { id: LightId, state: LightState },
    Car { id: CarId, origin: Cell, destination: Cell },
}

/// One entity on one cell, as seen after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityView {
    pub position: Cell,
    pub kind: EntityKind,
}

/// The main simulation world
pub struct SimWorld {
    grid: Grid,

    /// All lights and their rival pairing
    lights: LightController,

    /// Active cars, iterated in id order every tick
    cars: BTreeMap<CarId, SimCar>,

    /// Parking lot cells by id
    parking_lots: BTreeMap<ParkingId, Cell>,

    /// Connectivity of the static street network
    topology: StreetTopology,

    config: SimConfig,

    rng: StdRng,

    /// Next ID to assign
    next_id: usize,

    /// Ticks completed
    ticks: u64,

    /// False once no active cars remain
    running: bool,

    pub stats: SimulationStats,
}

impl SimWorld {
    /// Build a world from a layout and spawn `config.cars` cars
    pub fn from_layout(layout: &CityLayout, config: SimConfig) -> Result<Self> {
        layout.validate().context("Invalid city layout")?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut grid = Grid::new(layout.width(), layout.height())?;
        for (cell, street) in layout.streets() {
            grid.place(Occupant::Street(street), cell)?;
        }
        for cell in layout.buildings() {
            grid.place(Occupant::Building, *cell)?;
        }

        let mut parking_lots = BTreeMap::new();
        for (id, cell) in layout.parking_lots() {
            grid.place(Occupant::ParkingLot(*id), *cell)?;
            parking_lots.insert(*id, *cell);
        }

        let mut world = Self {
            grid,
            lights: LightController::new(config.light_timing),
            cars: BTreeMap::new(),
            parking_lots,
            topology: StreetTopology::default(),
            config,
            rng,
            next_id: 0,
            ticks: 0,
            running: true,
            stats: SimulationStats::default(),
        };

        let mut light_ids = Vec::with_capacity(layout.lights().len());
        for spec in layout.lights() {
            let id = LightId(world.next_sim_id());
            for cell in &spec.positions {
                world.grid.place(Occupant::TrafficLight(id), *cell)?;
            }
            let threshold = world.rng.random_range(MIN_CHANGE_THRESHOLD..=MAX_CHANGE_THRESHOLD);
            world
                .lights
                .add_light(SimTrafficLight::new(id, spec.positions.clone(), spec.orientation, threshold));
            light_ids.push(id);
        }

        for (index, (first, second)) in layout.pairs().iter().enumerate() {
            world.lights.add_pair(LightPair {
                id: PairId(index),
                first: light_ids[*first],
                second: light_ids[*second],
            });
        }

        world.topology = StreetTopology::from_grid(&world.grid);
        let unreachable = world.topology.unreachable_lot_pairs();
        if !unreachable.is_empty() {
            warn!(
                "{} ordered parking lot pairs have no legal route between them",
                unreachable.len()
            );
        }

        info!(
            "Built {}x{} city: {} parking lots, {} lights in {} pairs, {} street links",
            world.grid.width(),
            world.grid.height(),
            world.parking_lots.len(),
            light_ids.len(),
            layout.pairs().len(),
            world.topology.edge_count()
        );

        let cars = world.config.cars;
        if cars > 0 {
            world.spawn_cars(cars)?;
            info!("Spawned {} cars", cars);
        }

        Ok(world)
    }

    /// Build the reference downtown
    pub fn downtown(config: SimConfig) -> Result<Self> {
        Self::from_layout(&CityLayout::downtown(), config)
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Spawn cars with random origin and destination lots. Each car's
    /// destination is drawn from the lots other than its origin.
    pub fn spawn_cars(&mut self, count: usize) -> Result<Vec<CarId>> {
        let lots: Vec<(ParkingId, Cell)> = self.parking_lots.iter().map(|(id, cell)| (*id, *cell)).collect();
        if lots.len() < 2 {
            anyhow::bail!("Need at least two parking lots to spawn cars, found {}", lots.len());
        }

        let mut spawned = Vec::with_capacity(count);
        for _ in 0..count {
            let (origin_id, origin) = *lots.choose(&mut self.rng).context("No parking lots")?;
            let remaining: Vec<(ParkingId, Cell)> =
                lots.iter().copied().filter(|(id, _)| *id != origin_id).collect();
            let (destination_id, _) = *remaining
                .choose(&mut self.rng)
                .context("No destination lot left")?;
            spawned.push(self.add_car(origin, destination_id)?);
        }
        Ok(spawned)
    }

    /// Place a car on a street or parking lot cell, heading for a lot
    pub fn add_car(&mut self, origin: Cell, destination: ParkingId) -> Result<CarId> {
        let destination_cell = *self
            .parking_lots
            .get(&destination)
            .with_context(|| format!("Destination {:?} is not a parking lot", destination))?;

        if origin == destination_cell {
            anyhow::bail!("Car origin {} equals its destination", origin);
        }

        let contents = self
            .grid
            .get(origin)
            .with_context(|| format!("Car origin {} is outside the grid", origin))?;
        if contents.street().is_none() && contents.parking().is_none() {
            anyhow::bail!("Car origin {} is neither a street nor a parking lot", origin);
        }
        if contents.parking().is_none() && contents.has_car() {
            anyhow::bail!("Street cell {} is already occupied", origin);
        }

        let id = CarId(self.next_sim_id());
        self.grid.place(Occupant::Car(id), origin)?;
        self.cars
            .insert(id, SimCar::new(id, origin, destination_cell, destination));
        self.stats.cars_spawned += 1;
        self.running = true;
        debug!("Car {:?}: origin {}, destination {}", id.0, origin, destination_cell);
        Ok(id)
    }

    /// Run one simulation tick.
    ///
    /// Once the world has stopped running this is a no-op, so the tick
    /// counter keeps the tick at which the run ended.
    pub fn tick(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }

        match self.config.activation {
            ActivationMode::Sequential => self.update_cars_sequential()?,
            ActivationMode::Batched => self.update_cars_batched()?,
        }

        self.update_lights();

        self.ticks += 1;
        self.stats.ticks = self.ticks;

        if self.cars.is_empty() {
            self.running = false;
            info!("All cars arrived after {} ticks", self.ticks);
        }

        Ok(())
    }

    /// Tick until the world stops running or `max_ticks` ticks have completed
    pub fn run(&mut self, max_ticks: u64) -> Result<u64> {
        while self.running && self.ticks < max_ticks {
            self.tick()?;
        }
        Ok(self.ticks)
    }

    /// Every car plans against the grid as left by the cars before it
    fn update_cars_sequential(&mut self) -> Result<()> {
        let car_ids: Vec<CarId> = self.cars.keys().copied().collect();

        for car_id in car_ids {
            let Some(car) = self.cars.get(&car_id) else {
                continue;
            };
            let intent = car.plan(&self.grid, &self.lights, self.config.exploration, &mut self.rng);
            self.commit(car_id, intent)?;
        }

        Ok(())
    }

    /// Every car plans against the start-of-tick grid, then moves are committed.
    /// A street cell claimed by several cars goes to the lowest id.
    fn update_cars_batched(&mut self) -> Result<()> {
        let mut intents = Vec::with_capacity(self.cars.len());
        for car in self.cars.values() {
            let intent = car.plan(&self.grid, &self.lights, self.config.exploration, &mut self.rng);
            intents.push((car.id, intent));
        }

        let mut claims: HashMap<Cell, CarId> = HashMap::new();
        for (car_id, intent) in &intents {
            if matches!(intent, CarIntent::Arrive(_)) {
                continue;
            }
            if let Some(target) = intent.target() {
                claims
                    .entry(target)
                    .and_modify(|winner| *winner = (*winner).min(*car_id))
                    .or_insert(*car_id);
            }
        }

        for (car_id, intent) in intents {
            let intent = match intent {
                CarIntent::Move(target) if claims.get(&target) != Some(&car_id) => {
                    debug!("Car {:?} lost {} to {:?}", car_id.0, target, claims.get(&target));
                    self.stats.conflicts += 1;
                    CarIntent::Hold
                }
                other => other,
            };
            self.commit(car_id, intent)?;
        }

        Ok(())
    }

    /// Apply one car's intent and retire it on arrival
    fn commit(&mut self, car_id: CarId, intent: CarIntent) -> Result<()> {
        let car = self.cars.get_mut(&car_id).context("Car not found")?;
        let result = car.commit(&mut self.grid, intent)?;
        let moves = car.moves;

        match result {
            CarUpdateResult::Held => self.stats.holds += 1,
            CarUpdateResult::Moved(_) => self.stats.moves += 1,
            CarUpdateResult::Arrived(cell) => {
                self.stats.moves += 1;
                self.stats.cars_arrived += 1;
                self.cars.remove(&car_id);
                info!("Car {:?} arrived at {} after {} moves", car_id.0, cell, moves);
            }
        }

        Ok(())
    }

    /// Re-arbitrate every light pair against the current grid
    pub fn update_lights(&mut self) {
        self.lights.update(&self.grid, &mut self.rng);
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn lights(&self) -> &LightController {
        &self.lights
    }

    pub fn topology(&self) -> &StreetTopology {
        &self.topology
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Everything standing on a cell
    pub fn occupants(&self, cell: Cell) -> Vec<Occupant> {
        self.grid.occupants(cell)
    }

    pub fn light_state(&self, id: LightId) -> Option<LightState> {
        self.lights.state(id)
    }

    pub fn pair_states(&self, id: PairId) -> Option<(LightState, LightState)> {
        self.lights.pair_states(id)
    }

    pub fn car(&self, id: CarId) -> Option<&SimCar> {
        self.cars.get(&id)
    }

    pub fn cars(&self) -> impl Iterator<Item = &SimCar> {
        self.cars.values()
    }

    pub fn active_car_count(&self) -> usize {
        self.cars.len()
    }

    pub fn parking_lot(&self, id: ParkingId) -> Option<Cell> {
        self.parking_lots.get(&id).copied()
    }

    pub fn parking_lots(&self) -> impl Iterator<Item = (ParkingId, Cell)> + '_ {
        self.parking_lots.iter().map(|(id, cell)| (*id, *cell))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Every entity on the grid with its render attributes
    pub fn snapshot(&self) -> Vec<EntityView> {
        let mut views = Vec::new();
        for (position, contents) in self.grid.cells() {
            for occupant in contents.occupants() {
                let kind = match occupant {
                    Occupant::Street(street) => EntityKind::Street { exits: street.exits() },
                    Occupant::Building => EntityKind::Building,
                    Occupant::ParkingLot(id) => EntityKind::ParkingLot { id },
                    Occupant::TrafficLight(id) => EntityKind::TrafficLight {
                        id,
                        state: self.lights.state(id).unwrap_or_default(),
                    },
                    Occupant::Car(id) => match self.cars.get(&id) {
                        Some(car) => EntityKind::Car {
                            id,
                            origin: car.origin,
                            destination: car.destination,
                        },
                        None => continue,
                    },
                };
                views.push(EntityView { position, kind });
            }
        }
        views
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== City Traffic Summary ===");
        println!("Tick: {}", self.ticks);
        println!(
            "Grid: {}x{}, Parking lots: {}, Lights: {}",
            self.grid.width(),
            self.grid.height(),
            self.parking_lots.len(),
            self.lights.lights().count()
        );
        println!(
            "Cars: {} active, {} arrived of {} spawned",
            self.cars.len(),
            self.stats.cars_arrived,
            self.stats.cars_spawned
        );
        println!();

        println!("--- Light Pairs ---");
        for pair in self.lights.pairs() {
            let count = |id| {
                self.lights
                    .light(id)
                    .map_or(0, |light: &SimTrafficLight| light.count_cars(&self.grid))
            };
            println!(
                "  Pair {}: {:?} ({} queued) / {:?} ({} queued)",
                pair.id.0,
                self.lights.state(pair.first).unwrap_or_default(),
                count(pair.first),
                self.lights.state(pair.second).unwrap_or_default(),
                count(pair.second)
            );
        }

        if !self.cars.is_empty() {
            println!("--- Active Cars ---");
            for car in self.cars.values() {
                println!(
                    "  Car {:?}: at {}, heading to lot {} at {}, moves={}, holds={}",
                    car.id.0 .0,
                    car.position,
                    car.destination_lot.0,
                    car.destination,
                    car.moves,
                    car.holds
                );
            }
        }
    }

    /// Render the grid as text, top row first
    pub fn render_map(&self) -> String {
        let mut out = String::new();
        for y in (0..self.grid.height()).rev() {
            for x in 0..self.grid.width() {
                let cell = Cell::new(x, y);
                let glyph = match self.grid.get(cell) {
                    Some(contents) if contents.has_car() => 'C',
                    Some(contents) if contents.light().is_some() => {
                        match contents.light().and_then(|id| self.lights.state(id)) {
                            Some(LightState::Green) => 'G',
                            _ => 'R',
                        }
                    }
                    Some(contents) if contents.parking().is_some() => 'P',
                    Some(contents) if contents.has_building() => '#',
                    Some(contents) => match contents.street() {
                        Some(street) if street.exits().len() == 1 => {
                            street.exits().iter().next().map_or('+', |d| d.arrow())
                        }
                        Some(_) => '+',
                        None => ' ',
                    },
                    None => ' ',
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }

    /// Draw a visual map of the world in the terminal
    pub fn draw_map(&self) {
        println!("\n=== City Map (tick {}) ===", self.ticks);
        println!("Legend: C=Car, G/R=Light, P=Parking, #=Building, ^v<>=Street exit, +=Junction");
        println!();
        print!("{}", self.render_map());
        println!();
    }
}
