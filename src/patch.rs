use crate::accumulator::ProbabilityAccumulator;
use crate::agents::{AgentRecord, AgentStore, Status};
use crate::grid::{Binner, SpatialBinIndex};
use crate::interaction;
use crate::kernel::InteractionContext;
use epi_common::{DiseaseParameters, DiseaseTotals, Geometry, IndexBox, Vec2};
use log::{debug, trace};
use rayon::prelude::*;

/// A rectangular tile of the domain with the agents whose cell lies inside it.
#[derive(Debug)]
pub struct Patch {
    pub index: usize,
    pub valid: IndexBox,
    pub store: AgentStore,
    /// One accumulator per disease.
    pub prob: Vec<ProbabilityAccumulator>,
    bins: [SpatialBinIndex; 2],
    binner: Binner,
    /// Bumped whenever agent positions or membership change.
    position_epoch: u64,
}

impl Patch {
    pub fn new(index: usize, valid: IndexBox, geom: &Geometry, num_diseases: usize) -> Self {
        Self {
            index,
            valid,
            store: AgentStore::new(num_diseases),
            prob: (0..num_diseases).map(|_| ProbabilityAccumulator::new(0)).collect(),
            bins: [SpatialBinIndex::new(), SpatialBinIndex::new()],
            binner: Binner::new(geom, valid),
            position_epoch: 0,
        }
    }

    pub fn num_agents(&self) -> usize {
        self.store.len()
    }

    /// Invalidates the bin indices of every context.
    pub fn mark_moved(&mut self) {
        self.position_epoch += 1;
    }

    /// Rebuilds the bin index for `context` if positions changed since it was
    /// last built.
    pub fn ensure_bins(&mut self, context: InteractionContext) -> &SpatialBinIndex {
        let bins = &mut self.bins[context.index()];
        if !bins.is_current(self.position_epoch) {
            trace!(
                "Patch {}: rebuilding {} bins for {} agents.",
                self.index,
                context.name(),
                self.store.len()
            );
            bins.build(&self.store.pos_x, &self.store.pos_y, self.binner, self.position_epoch);
        }
        bins
    }

    #[cfg(test)]
    pub fn bins(&self, context: InteractionContext) -> &SpatialBinIndex {
        &self.bins[context.index()]
    }

    /// Sets every accumulator to 1.0, sized to the current agent count.
    /// Called once per step, before the first context.
    pub fn reset_probabilities(&mut self) {
        let n = self.store.len();
        for acc in &mut self.prob {
            acc.reset(n);
        }
    }

    /// Runs one interaction context over this patch for every disease.
    pub fn interact_agents(&mut self, context: InteractionContext, diseases: &[DiseaseParameters], scale: f64) {
        self.ensure_bins(context);
        let bins = &self.bins[context.index()];
        for acc in &self.prob {
            assert_eq!(
                acc.len(),
                self.store.len(),
                "patch {}: accumulator sized for {} agents, store holds {}; reset before interacting",
                self.index,
                acc.len(),
                self.store.len()
            );
        }
        interaction::interact_agents(&self.store, bins, context, diseases, scale, self.prob.as_slice());
    }

    /// Counts agents by status for every disease.
    pub fn totals(&self) -> Vec<DiseaseTotals> {
        self.store
            .disease
            .iter()
            .map(|state| {
                let mut t = DiseaseTotals::default();
                for status in &state.status {
                    match status {
                        Status::Susceptible => t.susceptible += 1,
                        Status::Infected => t.infected += 1,
                        Status::Immune => t.immune += 1,
                        Status::Dead => t.dead += 1,
                    }
                }
                t
            })
            .collect()
    }
}

/// The whole simulated domain, split into patches.
#[derive(Debug)]
pub struct Domain {
    pub geom: Geometry,
    pub patches: Vec<Patch>,
    max_patch_size: i32,
    patches_x: usize,
}

impl Domain {
    pub fn new(geom: Geometry, max_patch_size: u32, num_diseases: usize) -> Self {
        let max_patch_size = max_patch_size.max(1) as i32;
        let tiles = geom.domain.chop(max_patch_size);
        let patches_x = (geom.domain.len(0) as usize).div_ceil(max_patch_size as usize);
        let patches = tiles
            .into_iter()
            .enumerate()
            .map(|(index, valid)| Patch::new(index, valid, &geom, num_diseases))
            .collect::<Vec<_>>();
        debug!(
            "Domain of {}x{} cells split into {} patches of at most {} cells per side.",
            geom.domain.len(0),
            geom.domain.len(1),
            patches.len(),
            max_patch_size
        );
        Self { geom, patches, max_patch_size, patches_x }
    }

    pub fn num_diseases(&self) -> usize {
        self.patches.first().map_or(0, |p| p.store.num_diseases())
    }

    pub fn num_agents(&self) -> usize {
        self.patches.iter().map(Patch::num_agents).sum()
    }

    /// Cell owning `pos`, clamped into the domain.
    pub fn cell_of(&self, pos: Vec2) -> [i32; 2] {
        let cell = self.geom.cell_of(pos);
        let d = self.geom.domain;
        [cell[0].clamp(d.lo[0], d.hi[0]), cell[1].clamp(d.lo[1], d.hi[1])]
    }

    /// Index of the patch whose valid box contains `cell`.
    pub fn patch_of_cell(&self, cell: [i32; 2]) -> usize {
        let px = ((cell[0] - self.geom.domain.lo[0]) / self.max_patch_size) as usize;
        let py = ((cell[1] - self.geom.domain.lo[1]) / self.max_patch_size) as usize;
        py * self.patches_x + px
    }

    /// Adds an agent to the patch that owns its position.
    pub fn insert(&mut self, record: AgentRecord) {
        let p = self.patch_of_cell(self.cell_of(record.pos));
        self.patches[p].store.push(record);
        self.patches[p].mark_moved();
    }

    pub fn reset_probabilities(&mut self) {
        self.patches.par_iter_mut().for_each(Patch::reset_probabilities);
    }

    /// Runs one interaction context over every patch, patches in parallel.
    pub fn interact_agents(&mut self, context: InteractionContext, diseases: &[DiseaseParameters], scale: f64) {
        self.patches
            .par_iter_mut()
            .for_each(|patch| patch.interact_agents(context, diseases, scale));
    }

    /// Moves every agent whose position now lies outside its patch into the
    /// owning patch. Returns the number of agents moved.
    pub fn redistribute(&mut self) -> usize {
        let mut outgoing = Vec::new();
        for p in 0..self.patches.len() {
            let leaving: Vec<usize> = {
                let patch = &self.patches[p];
                (0..patch.num_agents())
                    .filter(|&i| !patch.valid.contains(self.cell_of(patch.store.position(i))))
                    .collect()
            };
            // Highest index first so swap_remove never moves a pending agent.
            for &i in leaving.iter().rev() {
                outgoing.push(self.patches[p].store.swap_remove(i));
            }
        }
        let moved = outgoing.len();
        for record in outgoing {
            let p = self.patch_of_cell(self.cell_of(record.pos));
            self.patches[p].store.push(record);
        }
        for patch in &mut self.patches {
            patch.mark_moved();
        }
        moved
    }

    /// Domain-wide counts by status, one entry per disease.
    pub fn totals(&self) -> Vec<DiseaseTotals> {
        let mut totals = vec![DiseaseTotals::default(); self.num_diseases()];
        for patch in &self.patches {
            for (acc, t) in totals.iter_mut().zip(patch.totals()) {
                acc.merge(&t);
            }
        }
        totals
    }

    pub fn num_withdrawn(&self) -> usize {
        self.patches
            .iter()
            .map(|p| p.store.withdrawn.iter().filter(|&&w| w).count())
            .sum()
    }
}
