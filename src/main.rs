use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::info;

use city_traffic::simulation::{ActivationMode, LightTiming, SimConfig, SimWorld, DEFAULT_CAR_COUNT};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Activation {
    /// Each car moves before the next one decides
    Sequential,
    /// All cars decide on the start-of-tick grid, then move together
    Batched,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Timing {
    /// Light countdowns are ignored
    Inert,
    /// Green lights hold for their change threshold
    MinimumGreen,
}

#[derive(Parser)]
#[command(name = "city_traffic")]
#[command(about = "Grid city traffic simulation with congestion-controlled lights")]
struct Cli {
    /// Maximum number of ticks to run
    #[arg(long, default_value = "500")]
    ticks: u64,

    /// Number of cars spawned at setup
    #[arg(long, default_value_t = DEFAULT_CAR_COUNT)]
    cars: usize,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Disable random exploration moves
    #[arg(long)]
    no_explore: bool,

    /// How car moves are committed each tick
    #[arg(long, value_enum, default_value = "batched")]
    activation: Activation,

    /// How light countdowns affect arbitration
    #[arg(long, value_enum, default_value = "inert")]
    light_timing: Timing,

    /// Draw the map every N ticks (0 draws only the first and last frame)
    #[arg(long, default_value = "0")]
    map_every: u64,

    /// Pause between map frames in milliseconds
    #[arg(long, default_value = "0")]
    delay_ms: u64,
}

impl Cli {
    fn config(&self) -> SimConfig {
        SimConfig {
            cars: self.cars,
            seed: self.seed,
            exploration: !self.no_explore,
            activation: match self.activation {
                Activation::Sequential => ActivationMode::Sequential,
                Activation::Batched => ActivationMode::Batched,
            },
            light_timing: match self.light_timing {
                Timing::Inert => LightTiming::Inert,
                Timing::MinimumGreen => LightTiming::MinimumGreen,
            },
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    run_headless(&cli)
}

/// Run the simulation in the terminal
fn run_headless(cli: &Cli) -> Result<()> {
    info!(
        "Running city traffic simulation: {} cars, up to {} ticks",
        cli.cars, cli.ticks
    );

    let mut world = SimWorld::downtown(cli.config())?;
    info!(
        "Activation: {:?}, light timing: {:?}, exploration: {}",
        world.config().activation,
        world.lights().timing(),
        world.config().exploration
    );

    println!("Initial state:");
    world.print_summary();
    world.draw_map();

    while world.is_running() && world.tick_count() < cli.ticks {
        world.tick()?;

        if cli.map_every > 0 && world.tick_count() % cli.map_every == 0 {
            world.draw_map();
            if cli.delay_ms > 0 {
                std::thread::sleep(std::time::Duration::from_millis(cli.delay_ms));
            }
        }
    }

    println!("=== Final State ===");
    world.print_summary();
    world.draw_map();

    world.stats.log_report();
    Ok(())
}
