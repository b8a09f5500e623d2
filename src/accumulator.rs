use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

/// An `f64` stored as its bit pattern in an `AtomicU64`.
///
/// Rust has no native atomic float, so multiply is a compare-and-swap loop.
/// Under contention a writer retries, which is bounded in practice by the
/// number of infectious agents sharing one cell with the target.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        AtomicF64(AtomicU64::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Exclusive access, no atomics needed.
    #[inline]
    pub fn set_mut(&mut self, value: f64) {
        *self.0.get_mut() = value.to_bits();
    }

    /// Atomically replaces the value with `value * factor`, returning the
    /// previous value.
    #[inline]
    pub fn fetch_mul(&self, factor: f64) -> f64 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) * factor).to_bits();
            match self.0.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(previous) => return f64::from_bits(previous),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Destination for pairwise escape-probability factors.
pub trait ProbabilitySink: Sync {
    /// Multiplies the target agent's accumulator by `factor` as one
    /// indivisible operation.
    fn multiply(&self, agent: usize, factor: f64);
}

/// Running probability of *not* being infected this step, one entry per agent
/// of a patch, for a single disease.
///
/// Reset to 1.0 once per step before the first interaction context, multiplied
/// by every context, then read once by the status update.
#[derive(Debug, Default)]
pub struct ProbabilityAccumulator {
    cells: Vec<AtomicF64>,
}

impl ProbabilityAccumulator {
    pub fn new(num_agents: usize) -> Self {
        Self { cells: (0..num_agents).map(|_| AtomicF64::new(1.0)).collect() }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Resizes to `num_agents` entries and sets every entry to 1.0.
    pub fn reset(&mut self, num_agents: usize) {
        self.cells.resize_with(num_agents, || AtomicF64::new(1.0));
        self.cells.par_iter_mut().for_each(|c| c.set_mut(1.0));
    }

    /// Current escape probability of `agent`.
    #[inline]
    pub fn get(&self, agent: usize) -> f64 {
        self.cells[agent].load()
    }

    /// `1 - accumulator`, the value the status update draws against.
    #[inline]
    pub fn infection_probability(&self, agent: usize) -> f64 {
        1.0 - self.get(agent)
    }

    #[cfg(test)]
    pub fn to_vec(&self) -> Vec<f64> {
        self.cells.iter().map(AtomicF64::load).collect()
    }
}

impl ProbabilitySink for ProbabilityAccumulator {
    #[inline]
    fn multiply(&self, agent: usize, factor: f64) {
        self.cells[agent].fetch_mul(factor);
    }
}
