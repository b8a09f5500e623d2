use anyhow::Result;
use log::{debug, error, info};
use std::path::Path;

mod accumulator;
mod agents;
mod eligibility;
mod grid;
mod init;
mod interaction;
mod kernel;
mod movement;
mod output;
mod patch;
mod simulation;
mod status;
#[cfg(test)]
mod testing;

use epi_common::SimulationConfig;
use simulation::EpiSimulation;

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting Epidemic Engine (CPU Parallel)...");

    // --- Load Configuration ---
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = SimulationConfig::load(&config_path)?;
    info!("Loaded configuration from {}.", config_path);

    // --- Configure Rayon Thread Pool (Optional) ---
    if config.threads > 0 {
        rayon::ThreadPoolBuilder::new().num_threads(config.threads).build_global()?;
    }
    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Simulation ---
    info!("Initializing population...");
    let mut sim = EpiSimulation::new(config)?;
    info!(
        "Population initialized with {} agents in {} patches.",
        sim.num_agents(),
        sim.domain.patches.len()
    );
    debug!("Domain geometry: {:#?}", sim.domain.geom);

    // --- Simulation Loop ---
    if let Err(e) = sim.run() {
        error!("Error after step {}: {:#}", sim.current_step(), e);
        anyhow::bail!("Simulation step failed.");
    }

    // --- Save Recorded Data ---
    let out = &sim.config().output;
    if out.save_stats {
        if let Err(e) = output::save_snapshots(Path::new("."), out, sim.get_recorded_snapshots()) {
            error!("Error saving snapshots: {:#}", e);
        }
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }
    if out.save_totals_csv {
        if let Err(e) = output::save_totals_csv(Path::new("."), out, &sim.config().diseases, sim.get_recorded_snapshots()) {
            error!("Error saving totals CSV: {:#}", e);
        }
    }

    info!("Simulation Complete.");
    Ok(())
}
