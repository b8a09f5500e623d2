use epi_common::Vec2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Workgroup sentinel: not assigned to any workgroup.
pub const NO_WORKGROUP: u32 = 0;
/// Work cell sentinel: no work location.
pub const NO_WORK_CELL: i32 = -1;

/// Independent RNG stream for one agent in one step. `stream` separates the
/// phases that draw in the same step (status update, movement, ...).
pub fn agent_rng(seed: u64, id: u64, step: u32, stream: u64) -> StdRng {
    let agent_seed = seed
        .wrapping_add(id.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add((step as u64).wrapping_mul(0xD1B5_4A32_D192_ED03))
        .wrapping_add(stream);
    StdRng::seed_from_u64(agent_seed)
}

/// Disease status of an agent, tracked separately for every disease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Susceptible,
    Infected,
    Immune,
    Dead,
}

/// Per-disease columns of the agent store.
#[derive(Debug, Clone, Default)]
pub struct DiseaseState {
    pub status: Vec<Status>,
    /// Days since infection.
    pub counter: Vec<f32>,
}

/// One agent's attributes, used to move agents between patch stores and to
/// build stores during initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRecord {
    pub id: u64,
    pub pos: Vec2,
    pub age_group: u8,
    pub home: [i32; 2],
    pub work: [i32; 2],
    pub workgroup: u32,
    pub nborhood: i32,
    pub school: i32,
    pub withdrawn: bool,
    pub status: Vec<Status>,
    pub counter: Vec<f32>,
}

impl AgentRecord {
    /// A susceptible agent with no workplace, no school and neighborhood 0.
    pub fn new(id: u64, pos: Vec2, num_diseases: usize) -> Self {
        Self {
            id,
            pos,
            age_group: 0,
            home: [0, 0],
            work: [NO_WORK_CELL, NO_WORK_CELL],
            workgroup: NO_WORKGROUP,
            nborhood: 0,
            school: -1,
            withdrawn: false,
            status: vec![Status::Susceptible; num_diseases],
            counter: vec![0.0; num_diseases],
        }
    }
}

/// Structure-of-arrays storage for the agents of one patch.
///
/// Every column has `len()` entries and an agent is addressed by its index.
/// Indices are only stable between redistributions.
#[derive(Debug, Default)]
pub struct AgentStore {
    pub id: Vec<u64>,
    pub pos_x: Vec<f32>,
    pub pos_y: Vec<f32>,
    pub age_group: Vec<u8>,
    pub home_i: Vec<i32>,
    pub home_j: Vec<i32>,
    pub work_i: Vec<i32>,
    pub work_j: Vec<i32>,
    pub workgroup: Vec<u32>,
    pub nborhood: Vec<i32>,
    /// Negative: not attending school today.
    pub school: Vec<i32>,
    /// Isolating agents neither infect nor get infected.
    pub withdrawn: Vec<bool>,
    /// One entry per disease.
    pub disease: Vec<DiseaseState>,
}

impl AgentStore {
    pub fn new(num_diseases: usize) -> Self {
        Self { disease: vec![DiseaseState::default(); num_diseases], ..Default::default() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn num_diseases(&self) -> usize {
        self.disease.len()
    }

    #[inline(always)]
    pub fn position(&self, agent: usize) -> Vec2 {
        Vec2::new(self.pos_x[agent], self.pos_y[agent])
    }

    #[inline(always)]
    pub fn status(&self, agent: usize, disease: usize) -> Status {
        self.disease[disease].status[agent]
    }

    #[inline(always)]
    pub fn counter(&self, agent: usize, disease: usize) -> f32 {
        self.disease[disease].counter[agent]
    }

    /// `true` once the agent has died of any disease.
    #[inline]
    pub fn is_dead(&self, agent: usize) -> bool {
        self.disease.iter().any(|d| d.status[agent] == Status::Dead)
    }

    /// Appends an agent and returns its index.
    pub fn push(&mut self, record: AgentRecord) -> usize {
        assert_eq!(
            record.status.len(),
            self.num_diseases(),
            "agent {} carries state for {} diseases, store expects {}",
            record.id,
            record.status.len(),
            self.num_diseases()
        );
        self.id.push(record.id);
        self.pos_x.push(record.pos.x);
        self.pos_y.push(record.pos.y);
        self.age_group.push(record.age_group);
        self.home_i.push(record.home[0]);
        self.home_j.push(record.home[1]);
        self.work_i.push(record.work[0]);
        self.work_j.push(record.work[1]);
        self.workgroup.push(record.workgroup);
        self.nborhood.push(record.nborhood);
        self.school.push(record.school);
        self.withdrawn.push(record.withdrawn);
        for (d, state) in self.disease.iter_mut().enumerate() {
            state.status.push(record.status[d]);
            state.counter.push(record.counter[d]);
        }
        self.len() - 1
    }

    /// Copies one agent out of the columns.
    pub fn record(&self, agent: usize) -> AgentRecord {
        AgentRecord {
            id: self.id[agent],
            pos: self.position(agent),
            age_group: self.age_group[agent],
            home: [self.home_i[agent], self.home_j[agent]],
            work: [self.work_i[agent], self.work_j[agent]],
            workgroup: self.workgroup[agent],
            nborhood: self.nborhood[agent],
            school: self.school[agent],
            withdrawn: self.withdrawn[agent],
            status: self.disease.iter().map(|d| d.status[agent]).collect(),
            counter: self.disease.iter().map(|d| d.counter[agent]).collect(),
        }
    }

    /// Removes an agent, moving the last agent into its slot.
    pub fn swap_remove(&mut self, agent: usize) -> AgentRecord {
        let record = self.record(agent);
        self.id.swap_remove(agent);
        self.pos_x.swap_remove(agent);
        self.pos_y.swap_remove(agent);
        self.age_group.swap_remove(agent);
        self.home_i.swap_remove(agent);
        self.home_j.swap_remove(agent);
        self.work_i.swap_remove(agent);
        self.work_j.swap_remove(agent);
        self.workgroup.swap_remove(agent);
        self.nborhood.swap_remove(agent);
        self.school.swap_remove(agent);
        self.withdrawn.swap_remove(agent);
        for state in &mut self.disease {
            state.status.swap_remove(agent);
            state.counter.swap_remove(agent);
        }
        record
    }
}
