//! Simulation configuration

use super::types::DEFAULT_CAR_COUNT;

/// How the cars of one tick are committed to the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationMode {
    /// Each car decides and moves before the next car looks at the grid.
    /// Contested cells go to whichever car comes first in id order.
    Sequential,
    /// Every car decides against the grid as it stood at the start of the
    /// tick, then all moves are committed together. A street cell claimed by
    /// several cars goes to the lowest car id; the others hold.
    #[default]
    Batched,
}

/// How a light's countdown interacts with pair arbitration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightTiming {
    /// The countdown is kept but never read
    #[default]
    Inert,
    /// A green light stays green until it has been green for at least its
    /// change threshold in controller updates
    MinimumGreen,
}

/// Tunables for a simulation run
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Cars spawned at setup
    pub cars: usize,
    /// Seed for reproducible runs; `None` seeds from the OS
    pub seed: Option<u64>,
    /// Enables the random exploration override in navigation
    pub exploration: bool,
    pub activation: ActivationMode,
    pub light_timing: LightTiming,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cars: DEFAULT_CAR_COUNT,
            seed: None,
            exploration: true,
            activation: ActivationMode::default(),
            light_timing: LightTiming::default(),
        }
    }
}

impl SimConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}
