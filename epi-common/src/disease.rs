use serde::{Deserialize, Serialize};

/// Number of age groups: under 5, 5-17, 18-29, 30-64, 65+.
pub const NUM_AGE_GROUPS: usize = 5;

/// Age group of school-aged children (5-17).
pub const SCHOOL_AGE_GROUP: u8 = 1;

/// Age groups eligible for a workplace assignment (18-29 and 30-64).
pub const WORKING_AGE_GROUPS: [u8; 2] = [2, 3];

/// Transmission coefficients and natural-history parameters for one disease.
/// Loaded once from the `[[disease]]` tables of the config file and never
/// mutated afterwards.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DiseaseParameters {
    pub name: String,
    /// Base per-contact infection hazard.
    pub infect: f64,
    /// Vaccine efficacy multiplier applied on top of `infect`.
    #[serde(default = "default_vac_eff")]
    pub vac_eff: f64,
    /// Workgroup transmission coefficient.
    pub xmit_work: f64,
    /// Community coefficients, indexed by the target's age group.
    pub xmit_comm: [f64; NUM_AGE_GROUPS],
    /// Community coefficients when the source is not attending school.
    pub xmit_comm_sc: [f64; NUM_AGE_GROUPS],
    /// Neighborhood coefficients, indexed by the target's age group.
    pub xmit_hood: [f64; NUM_AGE_GROUPS],
    /// Neighborhood coefficients when the source is not attending school.
    pub xmit_hood_sc: [f64; NUM_AGE_GROUPS],
    /// Days after infection before an agent becomes infectious.
    pub incubation_length: f32,
    /// Days an agent stays infectious before resolving.
    pub infectious_length: f32,
    /// Probability that an infection ends in death.
    #[serde(default)]
    pub mortality: f64,
    /// Agents seeded as infectious at step 0.
    #[serde(default)]
    pub initial_infected: u32,
}

fn default_vac_eff() -> f64 {
    1.0
}

impl DiseaseParameters {
    /// Per-contact hazard after vaccine reduction.
    #[inline(always)]
    pub fn hazard(&self) -> f64 {
        self.infect * self.vac_eff
    }

    /// Days from infection until the infection resolves.
    #[inline]
    pub fn course_length(&self) -> f32 {
        self.incubation_length + self.infectious_length
    }

    /// Largest single-contact reduction this disease can produce at `scale`.
    /// Values above 1.0 mean a pairwise factor can go negative.
    pub fn max_contact_product(&self, scale: f64) -> f64 {
        let rates = self
            .xmit_comm
            .iter()
            .chain(&self.xmit_comm_sc)
            .chain(&self.xmit_hood)
            .chain(&self.xmit_hood_sc)
            .chain(std::iter::once(&self.xmit_work));
        rates.fold(0.0_f64, |acc, &r| acc.max(self.hazard() * r * scale))
    }

    /// Rejects tables the interaction engine would silently misbehave on.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.vac_eff) {
            anyhow::bail!("disease '{}': vac_eff must be in [0, 1], got {}", self.name, self.vac_eff);
        }
        if !(0.0..=1.0).contains(&self.mortality) {
            anyhow::bail!("disease '{}': mortality must be in [0, 1], got {}", self.name, self.mortality);
        }
        if self.infect < 0.0 || self.xmit_work < 0.0 {
            anyhow::bail!("disease '{}': infect and xmit_work must be non-negative", self.name);
        }
        let arrays = [
            ("xmit_comm", &self.xmit_comm),
            ("xmit_comm_sc", &self.xmit_comm_sc),
            ("xmit_hood", &self.xmit_hood),
            ("xmit_hood_sc", &self.xmit_hood_sc),
        ];
        for (label, rates) in arrays {
            if rates.iter().any(|&r| r < 0.0) {
                anyhow::bail!("disease '{}': {} has a negative entry", self.name, label);
            }
        }
        if self.incubation_length < 0.0 || self.infectious_length <= 0.0 {
            anyhow::bail!(
                "disease '{}': incubation_length must be >= 0 and infectious_length > 0",
                self.name
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_disease() -> DiseaseParameters {
        DiseaseParameters {
            name: "flu".to_string(),
            infect: 0.5,
            vac_eff: 1.0,
            xmit_work: 0.1,
            xmit_comm: [0.01, 0.02, 0.03, 0.04, 0.05],
            xmit_comm_sc: [0.02, 0.04, 0.06, 0.08, 0.10],
            xmit_hood: [0.1, 0.2, 0.3, 0.4, 0.5],
            xmit_hood_sc: [0.2, 0.3, 0.4, 0.5, 0.6],
            incubation_length: 3.0,
            infectious_length: 6.0,
            mortality: 0.01,
            initial_infected: 10,
        }
    }

    #[test]
    fn hazard_applies_vaccine_efficacy() {
        let mut d = sample_disease();
        d.vac_eff = 0.4;
        assert!((d.hazard() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn validate_accepts_sample() {
        assert!(sample_disease().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_efficacy_and_negative_rates() {
        let mut d = sample_disease();
        d.vac_eff = 1.5;
        assert!(d.validate().is_err());

        let mut d = sample_disease();
        d.xmit_hood_sc[3] = -0.1;
        assert!(d.validate().is_err());
    }

    #[test]
    fn max_contact_product_flags_negative_factors() {
        let mut d = sample_disease();
        assert!(d.max_contact_product(1.0) < 1.0);
        d.infect = 5.0;
        assert!(d.max_contact_product(1.0) > 1.0);
    }
}
