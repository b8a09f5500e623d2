use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::disease::DiseaseParameters;
use crate::geometry::Geometry;
use std::path::Path;

// Spatial extent of the simulation, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DomainConfig {
    /// Number of cells in x and y.
    pub size: [u32; 2],
    #[serde(default = "default_prob_lo")]
    pub prob_lo: [f32; 2],
    #[serde(default = "default_prob_hi")]
    pub prob_hi: [f32; 2],
    /// Largest patch edge, in cells.
    #[serde(default = "default_max_patch_size")]
    pub max_patch_size: u32,
}

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub nsteps: u32,
    /// Steps between random-travel moves (0 disables travel).
    #[serde(default)]
    pub travel_interval_steps: u32,
}

// Demo population generator settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PopulationConfig {
    pub agents_per_cell: u32,
    #[serde(default = "default_num_nborhoods")]
    pub num_nborhoods: u32,
    #[serde(default = "default_workgroup_size")]
    pub workgroup_size: u32,
    /// Share of working-age agents with a workplace.
    #[serde(default = "default_work_fraction")]
    pub work_fraction: f64,
    /// Share of school-aged agents attending school.
    #[serde(default = "default_school_attendance")]
    pub school_attendance: f64,
    /// Probability an agent isolates once it becomes infectious.
    #[serde(default)]
    pub isolation_compliance: f64,
    pub seed: u64,
}

// Per-context transmission scale factors
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InteractionConfig {
    #[serde(default = "default_scale")]
    pub work_scale: f64,
    #[serde(default = "default_scale")]
    pub social_scale: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MovementConfig {
    /// Standard deviation of the per-step random walk, in cells.
    #[serde(default = "default_random_walk_sd")]
    pub random_walk_sd: f32,
    /// Share of agents relocated on a travel step.
    #[serde(default)]
    pub travel_fraction: f64,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_stats: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
    #[serde(default)]
    pub save_totals_csv: bool,
    #[serde(default = "default_record_interval")]
    pub record_interval_steps: u32,
}

fn default_prob_lo() -> [f32; 2] {
    [0.0, 0.0]
}

fn default_prob_hi() -> [f32; 2] {
    [1.0, 1.0]
}

fn default_max_patch_size() -> u32 {
    16
}

fn default_num_nborhoods() -> u32 {
    4
}

fn default_workgroup_size() -> u32 {
    20
}

fn default_work_fraction() -> f64 {
    0.586
}

fn default_school_attendance() -> f64 {
    0.9
}

fn default_scale() -> f64 {
    1.0
}

fn default_random_walk_sd() -> f32 {
    0.25
}

fn default_record_interval() -> u32 {
    1
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig { work_scale: 1.0, social_scale: 1.0 }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        MovementConfig { random_walk_sd: default_random_walk_sd(), travel_fraction: 0.0 }
    }
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub domain: DomainConfig,
    pub timing: TimingConfig,
    pub population: PopulationConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(rename = "disease")]
    pub diseases: Vec<DiseaseParameters>,
    pub output: OutputConfig,
    /// Rayon worker threads (0 or absent: rayon's default).
    #[serde(default)]
    pub threads: usize,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;
        Ok(config)
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.domain.size[0] == 0 || self.domain.size[1] == 0 {
            anyhow::bail!("domain.size must be positive in both dimensions.");
        }
        for d in 0..2 {
            if self.domain.prob_hi[d] <= self.domain.prob_lo[d] {
                anyhow::bail!("domain.prob_hi must exceed domain.prob_lo.");
            }
        }
        if self.domain.max_patch_size == 0 {
            anyhow::bail!("domain.max_patch_size must be greater than 0.");
        }
        if self.diseases.is_empty() {
            anyhow::bail!("at least one [[disease]] table is required.");
        }
        if self.population.workgroup_size == 0 || self.population.num_nborhoods == 0 {
            anyhow::bail!("population.workgroup_size and num_nborhoods must be greater than 0.");
        }
        let fractions = [
            ("work_fraction", self.population.work_fraction),
            ("school_attendance", self.population.school_attendance),
            ("isolation_compliance", self.population.isolation_compliance),
            ("travel_fraction", self.movement.travel_fraction),
        ];
        for (label, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be in [0, 1], got {}.", label, value);
            }
        }
        for disease in &self.diseases {
            disease.validate()?;
        }
        Ok(())
    }

    /// Domain geometry derived from the `[domain]` section.
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.domain.size, self.domain.prob_lo, self.domain.prob_hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[domain]
size = [8, 6]
max_patch_size = 4

[timing]
nsteps = 10

[population]
agents_per_cell = 20
seed = 7

[[disease]]
name = "flu"
infect = 0.1
xmit_work = 0.1
xmit_comm = [0.01, 0.01, 0.01, 0.01, 0.01]
xmit_comm_sc = [0.02, 0.02, 0.02, 0.02, 0.02]
xmit_hood = [0.1, 0.1, 0.1, 0.1, 0.1]
xmit_hood_sc = [0.2, 0.2, 0.2, 0.2, 0.2]
incubation_length = 3.0
infectious_length = 6.0

[output]
base_filename = "run"
save_stats = false
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = SimulationConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.diseases.len(), 1);
        assert_eq!(config.diseases[0].vac_eff, 1.0);
        assert_eq!(config.interaction.work_scale, 1.0);
        assert_eq!(config.population.num_nborhoods, 4);
        assert_eq!(config.output.record_interval_steps, 1);
        let geom = config.geometry();
        assert_eq!(geom.domain.num_cells(), 48);
    }

    #[test]
    fn rejects_invalid_disease_table() {
        let bad = SAMPLE.replace("infect = 0.1", "infect = 0.1\nvac_eff = 2.0");
        assert!(SimulationConfig::from_toml_str(&bad).is_err());
    }

    #[test]
    fn rejects_wrong_age_array_length() {
        let bad = SAMPLE.replace(
            "xmit_hood = [0.1, 0.1, 0.1, 0.1, 0.1]",
            "xmit_hood = [0.1, 0.1, 0.1]",
        );
        assert!(SimulationConfig::from_toml_str(&bad).is_err());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(config.timing.nsteps, 10);

        assert!(SimulationConfig::load("/nonexistent/config.toml").is_err());
    }
}
