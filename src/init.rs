use crate::agents::{AgentRecord, Status};
use crate::patch::Domain;
use anyhow::Result;
use epi_common::{DiseaseParameters, SimulationConfig, Vec2, NUM_AGE_GROUPS, SCHOOL_AGE_GROUP, WORKING_AGE_GROUPS};
use log::{info, warn};
use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;

/// Population share of each age group in the demo population.
const AGE_SHARES: [f64; NUM_AGE_GROUPS] = [0.06, 0.17, 0.16, 0.45, 0.16];

/// Fills `domain` with the demo population described by `config.population`
/// and seeds each disease's initial infections. Deterministic in the seed.
pub fn populate(domain: &mut Domain, config: &SimulationConfig) -> Result<()> {
    let pop = &config.population;
    let mut rng = StdRng::seed_from_u64(pop.seed);
    let ages = WeightedIndex::new(AGE_SHARES)?;

    let working_share: f64 = WORKING_AGE_GROUPS.iter().map(|&g| AGE_SHARES[g as usize]).sum();
    let workers_per_cell = pop.agents_per_cell as f64 * working_share * pop.work_fraction;
    let n_workgroups = ((workers_per_cell / pop.workgroup_size as f64).ceil() as u32).max(1);

    let geom = domain.geom.clone();
    let cells = geom.domain;
    let num_diseases = config.diseases.len();
    let mut next_id = 0u64;

    for cy in cells.lo[1]..=cells.hi[1] {
        for cx in cells.lo[0]..=cells.hi[0] {
            let corner = geom.cell_lo([cx, cy]);
            for _ in 0..pop.agents_per_cell {
                // Stay clear of the cell edges so rounding cannot move the agent next door.
                let offset = Vec2::new(0.05 + 0.9 * rng.random::<f32>(), 0.05 + 0.9 * rng.random::<f32>())
                    .hadamard(Vec2::new(geom.dx[0], geom.dx[1]));
                let mut agent = AgentRecord::new(next_id, corner + offset, num_diseases);
                next_id += 1;

                agent.age_group = ages.sample(&mut rng) as u8;
                agent.home = [cx, cy];
                agent.nborhood = rng.random_range(0..pop.num_nborhoods) as i32;

                if agent.age_group == SCHOOL_AGE_GROUP && rng.random_bool(pop.school_attendance) {
                    // One school per home cell.
                    agent.school = cells.flat_index([cx, cy]) as i32;
                }
                if WORKING_AGE_GROUPS.contains(&agent.age_group) && rng.random_bool(pop.work_fraction) {
                    let work = [
                        rng.random_range(cells.lo[0]..=cells.hi[0]),
                        rng.random_range(cells.lo[1]..=cells.hi[1]),
                    ];
                    agent.work = work;
                    // Workgroup ids are unique across work cells and never 0.
                    agent.workgroup = cells.flat_index(work) as u32 * n_workgroups + rng.random_range(1..=n_workgroups);
                }
                domain.insert(agent);
            }
        }
    }

    seed_infections(domain, &config.diseases, pop.isolation_compliance, &mut rng);

    info!(
        "Initialized {} agents in {} patches ({} workgroups per work cell).",
        domain.num_agents(),
        domain.patches.len(),
        n_workgroups
    );
    Ok(())
}

/// Marks `initial_infected` distinct random agents per disease as infectious.
/// Seeded agents start past incubation, so their isolation draw happens here.
fn seed_infections(domain: &mut Domain, diseases: &[DiseaseParameters], isolation_compliance: f64, rng: &mut StdRng) {
    let locations: Vec<(usize, usize)> = domain
        .patches
        .iter()
        .flat_map(|p| (0..p.num_agents()).map(move |i| (p.index, i)))
        .collect();

    for (d, params) in diseases.iter().enumerate() {
        let wanted = params.initial_infected as usize;
        let amount = wanted.min(locations.len());
        if amount < wanted {
            warn!(
                "Disease '{}': {} initial infections requested but only {} agents exist.",
                params.name, wanted, amount
            );
        }
        for k in rand::seq::index::sample(rng, locations.len(), amount) {
            let (p, i) = locations[k];
            let store = &mut domain.patches[p].store;
            store.disease[d].status[i] = Status::Infected;
            // Past incubation, so infectious from the first step.
            store.disease[d].counter[i] = params.incubation_length;
            if !store.withdrawn[i] && rng.random_bool(isolation_compliance) {
                store.withdrawn[i] = true;
            }
        }
    }
}
