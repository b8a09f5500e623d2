//! Read-only tests on an agent's state for one disease.

use crate::agents::{AgentStore, Status};
use epi_common::DiseaseParameters;

/// `true` if `agent` cannot be newly infected with `disease` this step: it is
/// immune, or infected but still incubating.
#[inline(always)]
pub fn not_susceptible(store: &AgentStore, agent: usize, disease: usize, params: &DiseaseParameters) -> bool {
    match store.status(agent, disease) {
        Status::Immune => true,
        Status::Infected => store.counter(agent, disease) < params.incubation_length,
        _ => false,
    }
}

/// `true` if `agent` can transmit `disease`: infected and past incubation.
#[inline(always)]
pub fn is_infectious(store: &AgentStore, agent: usize, disease: usize, params: &DiseaseParameters) -> bool {
    store.status(agent, disease) == Status::Infected
        && store.counter(agent, disease) >= params.incubation_length
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_disease, store_from};
    use crate::agents::AgentRecord;
    use epi_common::Vec2;

    fn agent(status: [Status; 2], counter: [f32; 2]) -> AgentRecord {
        let mut r = AgentRecord::new(0, Vec2::new(0.5, 0.5), 2);
        r.status = status.to_vec();
        r.counter = counter.to_vec();
        r
    }

    #[test]
    fn incubating_agent_is_neither_target_nor_source() {
        let params = sample_disease(); // incubation 3 days
        let store = store_from(vec![agent([Status::Infected, Status::Susceptible], [1.0, 0.0])]);
        assert!(not_susceptible(&store, 0, 0, &params));
        assert!(!is_infectious(&store, 0, 0, &params));
    }

    #[test]
    fn infectious_at_exactly_incubation_length() {
        let params = sample_disease();
        let store = store_from(vec![agent([Status::Infected, Status::Susceptible], [3.0, 0.0])]);
        assert!(is_infectious(&store, 0, 0, &params));
        assert!(!not_susceptible(&store, 0, 0, &params));
    }

    #[test]
    fn immune_is_excluded_and_never_infectious() {
        let params = sample_disease();
        let store = store_from(vec![agent([Status::Immune, Status::Susceptible], [20.0, 0.0])]);
        assert!(not_susceptible(&store, 0, 0, &params));
        assert!(!is_infectious(&store, 0, 0, &params));
    }

    #[test]
    fn diseases_are_evaluated_independently() {
        let params = sample_disease();
        let store = store_from(vec![agent([Status::Infected, Status::Susceptible], [5.0, 0.0])]);
        assert!(is_infectious(&store, 0, 0, &params));
        assert!(!not_susceptible(&store, 0, 1, &params));
        assert!(!is_infectious(&store, 0, 1, &params));
    }
}
