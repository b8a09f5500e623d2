use crate::accumulator::ProbabilitySink;
use crate::agents::AgentStore;
use crate::eligibility::{is_infectious, not_susceptible};
use crate::grid::SpatialBinIndex;
use crate::kernel::InteractionContext;
use epi_common::DiseaseParameters;
use rayon::prelude::*;

/// Runs one interaction context over a patch, every disease in turn.
///
/// `sinks[d]` is disease `d`'s accumulator. It must already hold this step's
/// running value; nothing here resets it. `bins` must be current for the
/// positions in `store`.
pub fn interact_agents<S: ProbabilitySink>(
    store: &AgentStore,
    bins: &SpatialBinIndex,
    context: InteractionContext,
    diseases: &[DiseaseParameters],
    scale: f64,
    sinks: &[S],
) {
    assert_eq!(
        sinks.len(),
        diseases.len(),
        "{} accumulators supplied for {} diseases",
        sinks.len(),
        diseases.len()
    );
    for (disease, (params, sink)) in diseases.iter().zip(sinks).enumerate() {
        interact_disease(store, bins, context, disease, params, scale, sink);
    }
}

/// One (patch, context, disease) pass: one task per bin-sorted agent, each
/// scanning the agents of its own bin. Returns once every task has finished.
pub fn interact_disease<S: ProbabilitySink + ?Sized>(
    store: &AgentStore,
    bins: &SpatialBinIndex,
    context: InteractionContext,
    disease: usize,
    params: &DiseaseParameters,
    scale: f64,
    sink: &S,
) {
    let np = store.len();
    assert_eq!(
        bins.num_items(),
        np,
        "{} bin index covers {} agents, patch holds {}",
        context.name(),
        bins.num_items(),
        np
    );
    if np == 0 {
        return;
    }
    let binner = bins.binner();
    let inds = bins.permutation();

    (0..bins.num_items()).into_par_iter().for_each(|ii| {
        let i = inds[ii] as usize;
        assert!(i < np, "agent index {} out of bounds for patch of {} agents", i, np);
        if not_susceptible(store, i, disease, params) {
            return;
        }

        let i_bin = binner.bin_of(store.position(i));
        for &j in bins.members(i_bin) {
            let j = j as usize;
            assert!(j < np, "agent index {} out of bounds for patch of {} agents", j, np);
            if i == j {
                continue;
            }
            if is_infectious(store, j, disease, params) {
                context.transmit(j, i, store, params, scale, sink);
            }
        }
    });
}
