//! Pairwise transmission between one infectious source and one susceptible
//! target, for each interaction context.

use crate::accumulator::ProbabilitySink;
use crate::agents::{AgentStore, NO_WORKGROUP};
use epi_common::DiseaseParameters;
use serde::{Deserialize, Serialize};

/// Where an interaction pass takes place. Each context has its own bin index
/// and its own transmission formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionContext {
    Workplace,
    Neighborhood,
}

impl InteractionContext {
    /// Contexts in the order they run within a step.
    pub const ALL: [InteractionContext; 2] = [InteractionContext::Workplace, InteractionContext::Neighborhood];

    pub fn name(self) -> &'static str {
        match self {
            InteractionContext::Workplace => "work",
            InteractionContext::Neighborhood => "nborhood",
        }
    }

    /// Dense index, used to address per-context storage.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Escape-probability factor `target` picks up from `source` in this
    /// context, or `None` if the pair does not interact here.
    #[inline(always)]
    pub fn escape_factor(
        self,
        source: usize,
        target: usize,
        store: &AgentStore,
        params: &DiseaseParameters,
        scale: f64,
    ) -> Option<f64> {
        if store.withdrawn[source] || store.withdrawn[target] {
            return None;
        }
        let hazard = params.hazard();
        match self {
            InteractionContext::Workplace => workplace_factor(source, target, store, params, hazard, scale),
            InteractionContext::Neighborhood => Some(neighborhood_factor(source, target, store, params, hazard, scale)),
        }
    }

    /// Applies one pairwise interaction to the target's accumulator. Issues at
    /// most one multiply.
    #[inline(always)]
    pub fn transmit<S: ProbabilitySink + ?Sized>(
        self,
        source: usize,
        target: usize,
        store: &AgentStore,
        params: &DiseaseParameters,
        scale: f64,
        sink: &S,
    ) {
        if let Some(factor) = self.escape_factor(source, target, store, params, scale) {
            sink.multiply(target, factor);
        }
    }
}

/// Coworkers only: the source must be at a work location with a workgroup,
/// the target at a work location in the same workgroup.
#[inline(always)]
fn workplace_factor(
    source: usize,
    target: usize,
    store: &AgentStore,
    params: &DiseaseParameters,
    hazard: f64,
    scale: f64,
) -> Option<f64> {
    let source_at_work = store.workgroup[source] != NO_WORKGROUP && store.work_i[source] >= 0;
    let coworker = store.work_i[target] >= 0 && store.workgroup[source] == store.workgroup[target];
    if source_at_work && coworker {
        Some(1.0 - hazard * params.xmit_work * scale)
    } else {
        None
    }
}

/// Community term always, neighborhood term when both share a neighborhood.
/// Rates are picked by whether the source attends school today and indexed by
/// the target's age group.
#[inline(always)]
fn neighborhood_factor(
    source: usize,
    target: usize,
    store: &AgentStore,
    params: &DiseaseParameters,
    hazard: f64,
    scale: f64,
) -> f64 {
    let age = store.age_group[target] as usize;
    let at_school = store.school[source] >= 0;

    let comm = if at_school { params.xmit_comm[age] } else { params.xmit_comm_sc[age] };
    let mut prob = 1.0 - hazard * comm * scale;

    if store.nborhood[source] == store.nborhood[target] {
        let hood = if at_school { params.xmit_hood[age] } else { params.xmit_hood_sc[age] };
        prob *= 1.0 - hazard * hood * scale;
    }
    prob
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::ProbabilityAccumulator;
    use crate::agents::AgentRecord;
    use crate::testing::{sample_disease, store_from, CountingSink};
    use approx::assert_relative_eq;
    use epi_common::Vec2;

    fn coworker(workgroup: u32) -> AgentRecord {
        let mut r = AgentRecord::new(0, Vec2::new(0.5, 0.5), 1);
        r.work = [0, 0];
        r.workgroup = workgroup;
        r
    }

    #[test]
    fn workplace_mismatched_workgroup_has_no_effect() {
        let store = store_from(vec![coworker(5), coworker(7)]);
        let acc = ProbabilityAccumulator::new(2);
        InteractionContext::Workplace.transmit(0, 1, &store, &sample_disease(), 1.0, &acc);
        assert_eq!(acc.get(1), 1.0);
    }

    #[test]
    fn workplace_shared_workgroup() {
        let store = store_from(vec![coworker(5), coworker(5)]);
        let mut params = sample_disease();
        params.infect = 0.5;
        params.vac_eff = 1.0;
        params.xmit_work = 0.1;
        let acc = ProbabilityAccumulator::new(2);
        InteractionContext::Workplace.transmit(0, 1, &store, &params, 1.0, &acc);
        assert_relative_eq!(acc.get(1), 0.95);
        assert_eq!(acc.get(0), 1.0);
    }

    #[test]
    fn workplace_requires_source_workgroup_and_work_location() {
        let params = sample_disease();
        let store = store_from(vec![coworker(NO_WORKGROUP), coworker(NO_WORKGROUP)]);
        assert!(InteractionContext::Workplace.escape_factor(0, 1, &store, &params, 1.0).is_none());

        let mut off_site = coworker(5);
        off_site.work = [-1, -1];
        let store = store_from(vec![off_site, coworker(5)]);
        assert!(InteractionContext::Workplace.escape_factor(0, 1, &store, &params, 1.0).is_none());
    }

    #[test]
    fn withdrawn_party_blocks_every_context() {
        let params = sample_disease();
        for withdrawn in [0usize, 1] {
            let mut agents = vec![coworker(5), coworker(5)];
            agents[withdrawn].withdrawn = true;
            let store = store_from(agents);
            let sink = CountingSink::new(2);
            for ctx in InteractionContext::ALL {
                ctx.transmit(0, 1, &store, &params, 1.0, &sink);
            }
            assert_eq!(sink.count(), 0);
            assert_eq!(sink.value(1), 1.0);
        }
    }

    fn neighbor(age_group: u8, nborhood: i32, school: i32) -> AgentRecord {
        let mut r = AgentRecord::new(0, Vec2::new(0.5, 0.5), 1);
        r.age_group = age_group;
        r.nborhood = nborhood;
        r.school = school;
        r
    }

    #[test]
    fn neighborhood_same_hood_source_at_school() {
        let params = sample_disease();
        let store = store_from(vec![neighbor(1, 2, 0), neighbor(3, 2, -1)]);
        let acc = ProbabilityAccumulator::new(2);
        InteractionContext::Neighborhood.transmit(0, 1, &store, &params, 1.0, &acc);

        let h = params.hazard();
        let expected = (1.0 - h * params.xmit_comm[3]) * (1.0 - h * params.xmit_hood[3]);
        assert_relative_eq!(acc.get(1), expected, max_relative = 1e-12);
    }

    #[test]
    fn neighborhood_different_hoods_only_community_term() {
        let params = sample_disease();
        let store = store_from(vec![neighbor(1, 2, 0), neighbor(4, 3, -1)]);
        let acc = ProbabilityAccumulator::new(2);
        InteractionContext::Neighborhood.transmit(0, 1, &store, &params, 1.0, &acc);
        assert_relative_eq!(acc.get(1), 1.0 - params.hazard() * params.xmit_comm[4], max_relative = 1e-12);
    }

    #[test]
    fn neighborhood_source_out_of_school_uses_closure_rates() {
        let params = sample_disease();
        // Only the source's attendance matters, not the target's.
        let store = store_from(vec![neighbor(1, 2, -1), neighbor(0, 2, 4)]);
        let acc = ProbabilityAccumulator::new(2);
        InteractionContext::Neighborhood.transmit(0, 1, &store, &params, 1.0, &acc);

        let h = params.hazard();
        let expected = (1.0 - h * params.xmit_comm_sc[0]) * (1.0 - h * params.xmit_hood_sc[0]);
        assert_relative_eq!(acc.get(1), expected, max_relative = 1e-12);
    }

    #[test]
    fn neighborhood_issues_one_multiply_per_pair() {
        let params = sample_disease();
        let store = store_from(vec![neighbor(1, 2, 0), neighbor(3, 2, 0)]);
        let sink = CountingSink::new(2);
        InteractionContext::Neighborhood.transmit(0, 1, &store, &params, 1.0, &sink);
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn oversized_hazard_is_not_clamped() {
        let mut params = sample_disease();
        params.infect = 20.0;
        let store = store_from(vec![coworker(5), coworker(5)]);
        let factor = InteractionContext::Workplace.escape_factor(0, 1, &store, &params, 1.0).unwrap();
        assert_relative_eq!(factor, 1.0 - 20.0 * params.xmit_work);
        assert!(factor < 0.0);
    }

    #[test]
    fn scale_multiplies_the_hazard() {
        let params = sample_disease();
        let store = store_from(vec![coworker(5), coworker(5)]);
        let factor = InteractionContext::Workplace.escape_factor(0, 1, &store, &params, 0.5).unwrap();
        assert_relative_eq!(factor, 1.0 - params.hazard() * params.xmit_work * 0.5);
    }
}
