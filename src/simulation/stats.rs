//! Run statistics for the simulation driver

use log::info;

/// Counters accumulated over a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationStats {
    pub ticks: u64,
    pub cars_spawned: usize,
    pub cars_arrived: usize,
    /// Single-cell moves committed, arrivals included
    pub moves: u64,
    /// Car-ticks spent holding in place
    pub holds: u64,
    /// Moves dropped because another car claimed the same cell
    pub conflicts: u64,
}

impl SimulationStats {
    pub fn active_cars(&self) -> usize {
        self.cars_spawned.saturating_sub(self.cars_arrived)
    }

    /// Percentage of spawned cars that reached their destination
    pub fn success_rate(&self) -> f32 {
        if self.cars_spawned > 0 {
            (self.cars_arrived as f32 / self.cars_spawned as f32) * 100.0
        } else {
            0.0
        }
    }

    /// Emit the end-of-run report
    pub fn log_report(&self) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Ticks run: {}", self.ticks);
        info!("Total cars spawned: {}", self.cars_spawned);
        info!("Total cars arrived: {}", self.cars_arrived);
        info!("Active cars: {}", self.active_cars());
        info!("Moves: {}, holds: {}, conflicts: {}", self.moves, self.holds, self.conflicts);
        info!("Success rate: {:.1}%", self.success_rate());
    }
}
