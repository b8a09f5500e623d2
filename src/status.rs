use crate::accumulator::ProbabilityAccumulator;
use crate::agents::{agent_rng, AgentStore, Status};
use crate::patch::Domain;
use epi_common::DiseaseParameters;
use rand::prelude::*;
use rayon::prelude::*;

const STATUS_STREAM: u64 = 1;

/// Transitions counted during one status update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusChanges {
    pub infections: u64,
    pub recoveries: u64,
    pub deaths: u64,
    pub isolations: u64,
}

impl StatusChanges {
    fn merge(mut self, other: StatusChanges) -> StatusChanges {
        self.infections += other.infections;
        self.recoveries += other.recoveries;
        self.deaths += other.deaths;
        self.isolations += other.isolations;
        self
    }
}

/// Turns this step's accumulated escape probabilities into infections and
/// advances every ongoing infection by one day. Patches run in parallel.
pub fn update_status(
    domain: &mut Domain,
    diseases: &[DiseaseParameters],
    isolation_compliance: f64,
    seed: u64,
    step: u32,
) -> StatusChanges {
    domain
        .patches
        .par_iter_mut()
        .map(|patch| update_store(&mut patch.store, &patch.prob, diseases, isolation_compliance, seed, step))
        .reduce(StatusChanges::default, StatusChanges::merge)
}

/// Status update for the agents of one store. `prob[d]` holds disease `d`'s
/// escape probability for every agent.
pub fn update_store(
    store: &mut AgentStore,
    prob: &[ProbabilityAccumulator],
    diseases: &[DiseaseParameters],
    isolation_compliance: f64,
    seed: u64,
    step: u32,
) -> StatusChanges {
    assert_eq!(prob.len(), diseases.len(), "{} accumulators for {} diseases", prob.len(), diseases.len());
    for acc in prob {
        assert_eq!(acc.len(), store.len(), "accumulator covers {} agents, store holds {}", acc.len(), store.len());
    }

    let mut changes = StatusChanges::default();
    for i in 0..store.len() {
        if store.is_dead(i) {
            store.withdrawn[i] = true;
            continue;
        }
        let mut rng = agent_rng(seed, store.id[i], step, STATUS_STREAM);
        let mut became_infectious = false;
        let mut died = false;

        for (d, params) in diseases.iter().enumerate() {
            let state = &mut store.disease[d];
            match state.status[i] {
                Status::Susceptible => {
                    if prob[d].infection_probability(i) > rng.random::<f64>() {
                        state.status[i] = Status::Infected;
                        state.counter[i] = 0.0;
                        changes.infections += 1;
                        became_infectious |= params.incubation_length <= 0.0;
                    }
                }
                Status::Infected => {
                    let was_infectious = state.counter[i] >= params.incubation_length;
                    state.counter[i] += 1.0;
                    if state.counter[i] >= params.course_length() {
                        if rng.random_bool(params.mortality) {
                            state.status[i] = Status::Dead;
                            changes.deaths += 1;
                            died = true;
                        } else {
                            state.status[i] = Status::Immune;
                            changes.recoveries += 1;
                        }
                    } else if !was_infectious && state.counter[i] >= params.incubation_length {
                        became_infectious = true;
                    }
                }
                Status::Immune | Status::Dead => {}
            }
            if died {
                break;
            }
        }

        if died {
            // Infections still running in a dead agent end with it.
            for state in &mut store.disease {
                if state.status[i] == Status::Infected {
                    state.status[i] = Status::Dead;
                }
            }
        }

        if store.is_dead(i) {
            store.withdrawn[i] = true;
        } else if became_infectious && !store.withdrawn[i] && rng.random_bool(isolation_compliance) {
            store.withdrawn[i] = true;
            changes.isolations += 1;
        } else if !store.disease.iter().any(|s| s.status[i] == Status::Infected) {
            store.withdrawn[i] = false;
        }
    }
    changes
}
