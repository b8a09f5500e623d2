use crate::init;
use crate::kernel::InteractionContext;
use crate::movement;
use crate::patch::Domain;
use crate::status::{self, StatusChanges};
use anyhow::Result;
use epi_common::{DiseaseTotals, InteractionConfig, SimulationConfig, Snapshot};
use log::{debug, info, trace, warn};
use std::time::Instant;

/// Manages the state and execution of the agent-based epidemic simulation.
pub struct EpiSimulation {
    /// The simulation configuration, including the disease tables.
    config: SimulationConfig,
    /// All agents, split into patches.
    pub domain: Domain,
    /// Number of completed steps.
    current_step: u32,
    /// Snapshots collected at record intervals.
    recorded_snapshots: Vec<Snapshot>,
}

impl EpiSimulation {
    /// Builds the domain and fills it with the configured population.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        for params in &config.diseases {
            for context in InteractionContext::ALL {
                let worst = params.max_contact_product(context_scale(&config.interaction, context));
                if worst > 1.0 {
                    warn!(
                        "Disease '{}': {} contacts can reduce the escape probability by {:.3}; factors will go negative.",
                        params.name,
                        context.name(),
                        worst
                    );
                }
            }
            debug!("Disease parameters: {:#?}", params);
        }

        let mut domain = Domain::new(config.geometry(), config.domain.max_patch_size, config.diseases.len());
        init::populate(&mut domain, &config)?;

        Ok(EpiSimulation { config, domain, current_step: 0, recorded_snapshots: Vec::new() })
    }

    /// Advances the simulation by one day.
    pub fn step(&mut self) -> Result<StatusChanges> {
        let step = self.current_step;
        let diseases = &self.config.diseases;

        let start = Instant::now();
        self.domain.reset_probabilities();
        for context in InteractionContext::ALL {
            let scale = context_scale(&self.config.interaction, context);
            self.domain.interact_agents(context, diseases, scale);
        }
        let interact_time = start.elapsed();

        let changes = status::update_status(
            &mut self.domain,
            diseases,
            self.config.population.isolation_compliance,
            self.config.population.seed,
            step,
        );

        let start = Instant::now();
        let moved = movement::move_agents(
            &mut self.domain,
            &self.config.movement,
            self.config.timing.travel_interval_steps,
            self.config.population.seed,
            step,
        )?;
        trace!(
            "Step {}: interactions {:.2} ms, movement {:.2} ms, {} agents changed patch.",
            step + 1,
            interact_time.as_secs_f64() * 1000.0,
            start.elapsed().as_secs_f64() * 1000.0,
            moved
        );

        self.current_step += 1;
        for (params, totals) in self.config.diseases.iter().zip(self.totals()) {
            info!(
                "Step {} [{}] S: {} I: {} R: {} D: {}",
                self.current_step, params.name, totals.susceptible, totals.infected, totals.immune, totals.dead
            );
        }
        debug!(
            "Step {}: {} new infections, {} recoveries, {} deaths, {} isolations.",
            self.current_step, changes.infections, changes.recoveries, changes.deaths, changes.isolations
        );
        Ok(changes)
    }

    /// Runs the configured number of steps, recording the initial state and a
    /// snapshot every `record_interval_steps` plus the last step.
    pub fn run(&mut self) -> Result<()> {
        let total_steps = self.config.timing.nsteps;
        let interval = self.config.output.record_interval_steps.max(1);
        info!("Starting simulation loop for {} steps, recording every {} steps.", total_steps, interval);
        let start_time = Instant::now();

        self.record_snapshot();
        for _ in 0..total_steps {
            let step_start_time = Instant::now();
            self.step()?;
            let step_duration = step_start_time.elapsed();

            if self.current_step % interval == 0 || self.current_step == total_steps {
                self.record_snapshot();
                info!(
                    "Step [{}/{}] | Agents: {} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                    self.current_step,
                    total_steps,
                    self.num_agents(),
                    step_duration.as_secs_f64() * 1000.0,
                    start_time.elapsed().as_secs_f64()
                );
            } else {
                trace!(
                    "Step [{}/{}] completed in {:.2} ms",
                    self.current_step,
                    total_steps,
                    step_duration.as_secs_f64() * 1000.0
                );
            }
        }
        info!("Simulation finished in {:.3} seconds.", start_time.elapsed().as_secs_f64());
        Ok(())
    }

    pub fn totals(&self) -> Vec<DiseaseTotals> {
        self.domain.totals()
    }

    /// Appends the current population totals to the recorded snapshots.
    pub fn record_snapshot(&mut self) {
        let snapshot = Snapshot {
            step: self.current_step,
            total_agents: self.domain.num_agents() as u64,
            totals: self.domain.totals(),
            withdrawn: self.domain.num_withdrawn() as u64,
        };
        trace!("Recorded snapshot {:?}", snapshot);
        self.recorded_snapshots.push(snapshot);
    }

    pub fn get_recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn num_agents(&self) -> usize {
        self.domain.num_agents()
    }
}

/// Transmission scale configured for `context`.
fn context_scale(interaction: &InteractionConfig, context: InteractionContext) -> f64 {
    match context {
        InteractionContext::Workplace => interaction.work_scale,
        InteractionContext::Neighborhood => interaction.social_scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_config;

    #[test]
    fn population_is_conserved_across_steps() {
        let mut sim = EpiSimulation::new(sample_config()).unwrap();
        let n = sim.num_agents();
        for _ in 0..5 {
            sim.step().unwrap();
            assert_eq!(sim.num_agents(), n);
            for t in sim.totals() {
                assert_eq!(t.total(), n as u64);
            }
        }
        assert_eq!(sim.current_step(), 5);
    }

    #[test]
    fn seeded_outbreak_spreads() {
        let mut config = sample_config();
        config.diseases[0].infect = 1.0;
        config.diseases[0].initial_infected = 40;
        let mut sim = EpiSimulation::new(config).unwrap();
        let mut infections = 0;
        for _ in 0..3 {
            infections += sim.step().unwrap().infections;
        }
        assert!(infections > 0);
        let t = &sim.totals()[0];
        assert!(t.susceptible < sim.num_agents() as u64 - 40);
    }

    #[test]
    fn no_infectious_agents_means_no_infections() {
        let mut config = sample_config();
        for d in &mut config.diseases {
            d.initial_infected = 0;
        }
        let mut sim = EpiSimulation::new(config).unwrap();
        for _ in 0..3 {
            assert_eq!(sim.step().unwrap().infections, 0);
        }
        for t in sim.totals() {
            assert_eq!(t.susceptible, sim.num_agents() as u64);
        }
    }

    #[test]
    fn same_seed_same_epidemic() {
        let run = || {
            let mut sim = EpiSimulation::new(sample_config()).unwrap();
            sim.run().unwrap();
            sim.get_recorded_snapshots()
                .iter()
                .map(|s| s.totals.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn run_records_initial_and_interval_snapshots() {
        let mut config = sample_config();
        config.timing.nsteps = 5;
        config.output.record_interval_steps = 2;
        let mut sim = EpiSimulation::new(config).unwrap();
        sim.run().unwrap();
        let steps: Vec<u32> = sim.get_recorded_snapshots().iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![0, 2, 4, 5]);
    }

    #[test]
    fn each_context_uses_its_own_scale() {
        let interaction = InteractionConfig { work_scale: 0.25, social_scale: 2.0 };
        assert_eq!(context_scale(&interaction, InteractionContext::Workplace), 0.25);
        assert_eq!(context_scale(&interaction, InteractionContext::Neighborhood), 2.0);
    }
}
