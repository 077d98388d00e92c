use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ConfigError, LocationSpec};

/// A service provider as seen by search: read-only, sourced from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCandidate {
    pub id: Uuid,
    pub display_name: String,
    pub skill: String,
    pub raw_location: LocationSpec,
    pub rating: f64,
    pub review_count: i64,
    pub rate_per_hour: Decimal,
    pub is_verified: bool,
}

/// One provider entry in a seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSeed {
    pub display_name: String,
    pub skill: String,
    #[serde(default)]
    pub location: LocationSpec,
    pub rate_per_hour: Decimal,
    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProviderSeedFile {
    pub providers: Vec<ProviderSeed>,
}

/// Load and validate a provider seed file (YAML).
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_provider_seed(path: &Path) -> Result<ProviderSeedFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SeedFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let seed: ProviderSeedFile = serde_yaml::from_str(&content)?;
    validate_seed(&seed)?;
    Ok(seed)
}

fn validate_seed(seed: &ProviderSeedFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for provider in &seed.providers {
        if provider.display_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "provider display_name must be non-empty".to_string(),
            ));
        }

        if provider.skill.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "provider '{}' has an empty skill",
                provider.display_name
            )));
        }

        if provider.rate_per_hour.is_sign_negative() {
            return Err(ConfigError::Validation(format!(
                "provider '{}' has negative rate_per_hour {}",
                provider.display_name, provider.rate_per_hour
            )));
        }

        if !seen_names.insert(provider.display_name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate provider display_name: '{}'",
                provider.display_name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<ProviderSeedFile, ConfigError> {
        let seed: ProviderSeedFile = serde_yaml::from_str(yaml)?;
        validate_seed(&seed)?;
        Ok(seed)
    }

    #[test]
    fn seed_accepts_mixed_location_shapes() {
        let seed = parse(
            r#"
providers:
  - display_name: Sipho Plumbing
    skill: plumber
    location: "-29.8587, 31.0218"
    rate_per_hour: "350.00"
    is_verified: true
  - display_name: Umhlanga Electric
    skill: electrician
    location: { lat: -29.7256, lng: 31.0849 }
    rate_per_hour: "420"
  - display_name: Anywhere Handyman
    skill: handyman
    rate_per_hour: "200"
"#,
        )
        .expect("valid seed");

        assert_eq!(seed.providers.len(), 3);
        assert!(matches!(seed.providers[0].location, LocationSpec::Text(_)));
        assert!(matches!(
            seed.providers[1].location,
            LocationSpec::Structured(_)
        ));
        assert_eq!(seed.providers[2].location, LocationSpec::Absent);
        assert!(!seed.providers[1].is_verified);
    }

    #[test]
    fn seed_rejects_duplicate_names_case_insensitively() {
        let err = parse(
            r#"
providers:
  - { display_name: "Bongani Paint", skill: painter, rate_per_hour: "100" }
  - { display_name: "bongani paint", skill: painter, rate_per_hour: "100" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn seed_rejects_empty_skill() {
        let err = parse(
            r#"
providers:
  - { display_name: "No Skill", skill: "  ", rate_per_hour: "100" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn seed_rejects_negative_rate() {
        let err = parse(
            r#"
providers:
  - { display_name: "Cheap", skill: cleaner, rate_per_hour: "-1" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("negative")));
    }

    #[test]
    fn load_provider_seed_reports_missing_file() {
        let err = load_provider_seed(Path::new("/nonexistent/providers.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::SeedFileIo { .. }));
    }

    #[test]
    fn bundled_sample_seed_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/providers.yaml");
        let seed = load_provider_seed(&path).expect("sample seed loads");
        assert_eq!(seed.providers.len(), 6);
        assert!(seed
            .providers
            .iter()
            .any(|p| matches!(p.location, LocationSpec::Structured(_))));
    }
}
