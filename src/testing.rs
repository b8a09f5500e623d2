//! Fixtures shared by the unit tests.

use crate::accumulator::{ProbabilityAccumulator, ProbabilitySink};
use crate::agents::{AgentRecord, AgentStore};
use epi_common::{DiseaseParameters, SimulationConfig};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn sample_disease() -> DiseaseParameters {
    DiseaseParameters {
        name: "flu".to_string(),
        infect: 0.5,
        vac_eff: 0.8,
        xmit_work: 0.1,
        xmit_comm: [0.01, 0.02, 0.03, 0.04, 0.05],
        xmit_comm_sc: [0.02, 0.04, 0.06, 0.08, 0.10],
        xmit_hood: [0.1, 0.2, 0.3, 0.4, 0.5],
        xmit_hood_sc: [0.2, 0.3, 0.4, 0.5, 0.6],
        incubation_length: 3.0,
        infectious_length: 6.0,
        mortality: 0.0,
        initial_infected: 0,
    }
}

/// Small two-disease configuration: 8x6 cells of unit size in 4x4 patches.
pub fn sample_config() -> SimulationConfig {
    let toml = r#"
[domain]
size = [8, 6]
prob_lo = [0.0, 0.0]
prob_hi = [8.0, 6.0]
max_patch_size = 4

[timing]
nsteps = 5
travel_interval_steps = 2

[population]
agents_per_cell = 25
num_nborhoods = 3
workgroup_size = 5
isolation_compliance = 0.5
seed = 1234

[movement]
random_walk_sd = 0.3
travel_fraction = 0.05

[[disease]]
name = "flu"
infect = 0.3
xmit_work = 0.1
xmit_comm = [0.01, 0.02, 0.02, 0.01, 0.01]
xmit_comm_sc = [0.02, 0.04, 0.04, 0.02, 0.02]
xmit_hood = [0.1, 0.2, 0.1, 0.1, 0.1]
xmit_hood_sc = [0.2, 0.3, 0.2, 0.2, 0.2]
incubation_length = 2.0
infectious_length = 4.0
mortality = 0.1
initial_infected = 12

[[disease]]
name = "cov"
infect = 0.2
vac_eff = 0.5
xmit_work = 0.2
xmit_comm = [0.01, 0.01, 0.01, 0.01, 0.01]
xmit_comm_sc = [0.01, 0.01, 0.01, 0.01, 0.01]
xmit_hood = [0.1, 0.1, 0.1, 0.1, 0.1]
xmit_hood_sc = [0.1, 0.1, 0.1, 0.1, 0.1]
incubation_length = 3.0
infectious_length = 5.0
initial_infected = 4

[output]
base_filename = "test_run"
save_stats = false
"#;
    SimulationConfig::from_toml_str(toml).expect("sample config is valid")
}

/// Store holding `records` in order; the disease count comes from the first
/// record.
pub fn store_from(records: Vec<AgentRecord>) -> AgentStore {
    let num_diseases = records.first().map_or(1, |r| r.status.len());
    let mut store = AgentStore::new(num_diseases);
    for r in records {
        store.push(r);
    }
    store
}

/// Accumulator that also counts the multiplies it receives.
pub struct CountingSink {
    inner: ProbabilityAccumulator,
    calls: AtomicUsize,
    calls_per_agent: Vec<AtomicUsize>,
}

impl CountingSink {
    pub fn new(num_agents: usize) -> Self {
        Self {
            inner: ProbabilityAccumulator::new(num_agents),
            calls: AtomicUsize::new(0),
            calls_per_agent: (0..num_agents).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn count_for(&self, agent: usize) -> usize {
        self.calls_per_agent[agent].load(Ordering::Relaxed)
    }

    pub fn value(&self, agent: usize) -> f64 {
        self.inner.get(agent)
    }
}

impl ProbabilitySink for CountingSink {
    fn multiply(&self, agent: usize, factor: f64) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.calls_per_agent[agent].fetch_add(1, Ordering::Relaxed);
        self.inner.multiply(agent, factor);
    }
}
