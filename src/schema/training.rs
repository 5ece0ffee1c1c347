//! Training run configuration: evolution settings plus the lineage groups to train.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{CarProfile, EvolutionConfig, EvolutionConfigError};

/// Configuration of a multi-group training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Evolution settings shared by every group.
    #[serde(default)]
    pub evolution: EvolutionConfig,
    /// Explicit car profiles, one lineage group each.
    #[serde(default = "default_groups")]
    pub groups: Vec<CarProfile>,
    /// Additional groups with randomly sampled profiles.
    #[serde(default)]
    pub random_groups: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            evolution: EvolutionConfig::default(),
            groups: default_groups(),
            random_groups: 0,
        }
    }
}

fn default_groups() -> Vec<CarProfile> {
    vec![CarProfile::default()]
}

impl TrainingConfig {
    /// All profiles to train, explicit ones first.
    ///
    /// Random profiles are drawn from the evolution seed when one is set.
    pub fn profiles(&self) -> Vec<CarProfile> {
        let mut rng = match self.evolution.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut profiles = self.groups.clone();
        profiles.extend((0..self.random_groups).map(|_| CarProfile::random(&mut rng)));
        profiles
    }

    /// Validate the run configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.evolution.validate()?;
        if self.groups.is_empty() && self.random_groups == 0 {
            return Err(EvolutionConfigError::NoLineageGroups);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_training_config() {
        let config = TrainingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.profiles().len(), 1);
    }

    #[test]
    fn test_no_groups_rejected() {
        let config = TrainingConfig {
            groups: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::NoLineageGroups)
        ));
    }

    #[test]
    fn test_random_groups_seeded() {
        let mut config = TrainingConfig {
            groups: Vec::new(),
            random_groups: 3,
            ..Default::default()
        };
        config.evolution.random_seed = Some(9);

        let first = config.profiles();
        let second = config.profiles();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_minimal_json() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{ "evolution": { "population": { "size": 4 } } }"#).unwrap();
        assert_eq!(config.evolution.population.size, 4);
        assert_eq!(config.evolution.population.max_generations, 100);
        assert_eq!(config.groups.len(), 1);
    }
}
