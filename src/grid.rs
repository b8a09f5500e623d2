use epi_common::{Geometry, IndexBox, Vec2};
use log::trace;
use rayon::prelude::*;
use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

/// Maps an agent position to the flat index of its cell inside a patch.
///
/// The build pass and every later lookup go through [`Binner::bin_of`], so both
/// use the same truncation rule.
#[derive(Debug, Clone, Copy)]
pub struct Binner {
    prob_lo: [f32; 2],
    dxi: [f32; 2],
    valid: IndexBox,
}

impl Binner {
    pub fn new(geom: &Geometry, valid: IndexBox) -> Self {
        Self { prob_lo: geom.prob_lo, dxi: geom.dxi, valid }
    }

    #[inline(always)]
    pub fn num_bins(&self) -> usize {
        self.valid.num_cells()
    }

    /// Calculates the flat bin index for a given position
    #[inline(always)]
    pub fn bin_of(&self, pos: Vec2) -> usize {
        let cx = ((pos.x - self.prob_lo[0]) * self.dxi[0]).floor() as i32;
        let cy = ((pos.y - self.prob_lo[1]) * self.dxi[1]).floor() as i32;
        // Clamp to the valid box to handle positions sitting exactly on an edge
        let cell = [
            cx.clamp(self.valid.lo[0], self.valid.hi[0]),
            cy.clamp(self.valid.lo[1], self.valid.hi[1]),
        ];
        self.valid.flat_index(cell)
    }
}

/// Agents of a patch bucketed by cell: `permutation[offsets[c]..offsets[c + 1]]`
/// holds the indices of the agents in cell `c`, in ascending order.
#[derive(Debug, Default)]
pub struct SpatialBinIndex {
    binner: Option<Binner>,
    /// Bin of each agent, as computed during the last build.
    agent_bins: Vec<u32>,
    counts: Vec<u32>,
    offsets: Vec<u32>,
    permutation: Vec<u32>,
    /// Running write counters per bin, used during the parallel scatter.
    write_offsets: Vec<AtomicU32>,
    /// Position epoch of the patch this index was built for.
    built_epoch: Option<u64>,
}

impl SpatialBinIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if the index was built for the given position epoch.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.built_epoch == Some(epoch)
    }

    /// Builds the index with a counting sort over the bins of `binner`.
    ///
    /// Positions are read from `pos_x`/`pos_y`; both must have one entry per
    /// agent.
    pub fn build(&mut self, pos_x: &[f32], pos_y: &[f32], binner: Binner, epoch: u64) {
        assert_eq!(
            pos_x.len(),
            pos_y.len(),
            "position columns disagree: {} x entries, {} y entries",
            pos_x.len(),
            pos_y.len()
        );
        let num_agents = pos_x.len();
        let num_bins = binner.num_bins();
        assert!(
            num_agents <= u32::MAX as usize,
            "patch holds {} agents, more than a u32 permutation can address",
            num_agents
        );

        // Cell of every agent.
        self.agent_bins.resize(num_agents, 0);
        self.agent_bins.par_iter_mut().enumerate().for_each(|(idx, bin_out)| {
            *bin_out = binner.bin_of(Vec2::new(pos_x[idx], pos_y[idx])) as u32;
        });

        // Occupancy per cell.
        self.counts.clear();
        self.counts.resize(num_bins, 0);
        for &bin in &self.agent_bins {
            self.counts[bin as usize] += 1;
        }

        // offsets[c] is the first permutation slot of cell c.
        self.offsets.clear();
        self.offsets.reserve(num_bins + 1);
        let mut total_sum = 0u32;
        self.offsets.push(0);
        for &count in &self.counts {
            total_sum += count;
            self.offsets.push(total_sum);
        }
        assert_eq!(
            total_sum as usize, num_agents,
            "bin counts sum to {} but the patch holds {} agents",
            total_sum, num_agents
        );

        // Claim slots with per-cell counters, then write them in one pass.
        self.write_offsets.resize_with(num_bins, || AtomicU32::new(0));
        self.write_offsets.par_iter().for_each(|a| a.store(0, Ordering::Relaxed));

        let agent_bins = &self.agent_bins;
        let offsets = &self.offsets;
        let write_offsets = &self.write_offsets;
        let write_data: Vec<(usize, u32)> = (0..num_agents)
            .into_par_iter()
            .map(|agent| {
                let bin = agent_bins[agent] as usize;
                let slot = write_offsets[bin].fetch_add(1, Ordering::Relaxed);
                ((offsets[bin] + slot) as usize, agent as u32)
            })
            .collect();

        self.permutation.clear();
        self.permutation.resize(num_agents, u32::MAX);
        for (write_idx, agent) in write_data {
            self.permutation[write_idx] = agent;
        }

        // Scatter order inside a bin depends on scheduling; sort each bin so
        // the same positions always give the same permutation.
        let mut segments = Vec::with_capacity(num_bins);
        let mut rest: &mut [u32] = &mut self.permutation;
        for w in self.offsets.windows(2) {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut((w[1] - w[0]) as usize);
            segments.push(head);
            rest = tail;
        }
        segments.into_par_iter().for_each(|segment| segment.sort_unstable());

        self.binner = Some(binner);
        self.built_epoch = Some(epoch);

        trace!(
            "Built bin index: {} agents in {} bins (max occupancy {}).",
            num_agents,
            num_bins,
            self.counts.iter().copied().max().unwrap_or(0)
        );
    }

    /// The binner used for the last build.
    ///
    /// # Panics
    /// If the index has never been built.
    pub fn binner(&self) -> &Binner {
        self.binner.as_ref().expect("bin index queried before it was built")
    }

    #[inline]
    pub fn num_items(&self) -> usize {
        self.permutation.len()
    }

    #[cfg(test)]
    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn permutation(&self) -> &[u32] {
        &self.permutation
    }

    #[cfg(test)]
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Bin recorded for `agent` during the last build.
    #[cfg(test)]
    pub fn bin_of_agent(&self, agent: usize) -> usize {
        self.agent_bins[agent] as usize
    }

    /// Range of `permutation` covering bin `bin`.
    #[inline(always)]
    pub fn bin_range(&self, bin: usize) -> Range<usize> {
        self.offsets[bin] as usize..self.offsets[bin + 1] as usize
    }

    /// Agents in bin `bin`.
    #[inline(always)]
    pub fn members(&self, bin: usize) -> &[u32] {
        &self.permutation[self.bin_range(bin)]
    }
}
