pub mod config;
pub mod disease;
pub mod geometry;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, DomainConfig, TimingConfig, PopulationConfig, InteractionConfig, MovementConfig, OutputConfig};
pub use disease::{DiseaseParameters, NUM_AGE_GROUPS, SCHOOL_AGE_GROUP, WORKING_AGE_GROUPS};
pub use geometry::{Geometry, IndexBox};
pub use snapshot::{DiseaseTotals, Snapshot};
pub use vecmath::Vec2;
