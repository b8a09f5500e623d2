use serde::{Deserialize, Serialize};

/// Agent counts by status for one disease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseTotals {
    pub susceptible: u64,
    pub infected: u64,
    pub immune: u64,
    pub dead: u64,
}

impl DiseaseTotals {
    pub fn total(&self) -> u64 {
        self.susceptible + self.infected + self.immune + self.dead
    }

    /// Adds another patch's counts into this one.
    pub fn merge(&mut self, other: &DiseaseTotals) {
        self.susceptible += other.susceptible;
        self.infected += other.infected;
        self.immune += other.immune;
        self.dead += other.dead;
    }
}

/// Population totals at the end of a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Step number (0 is the initial state).
    pub step: u32,
    /// Number of agents in the domain.
    pub total_agents: u64,
    /// One entry per disease, in config order.
    pub totals: Vec<DiseaseTotals>,
    /// Agents currently isolating.
    pub withdrawn: u64,
}
