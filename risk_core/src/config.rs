use crate::error::{Result, RiskError};
use crate::gbm::GbmParams;
use crate::zone::RiskZone;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_MODEL_PATH: &str = "risk_model.json";

/// Pipeline settings. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Where the model bundle is persisted
    pub model_path: PathBuf,
    /// Trips generated when training from scratch
    pub training_trips: usize,
    /// Trips generated for browsing and scoring
    pub browse_trips: usize,
    /// Seeds data generation, the split and the booster (overrides `gbm.seed`)
    pub seed: u64,
    pub test_fraction: f64,
    pub zone: RiskZone,
    pub gbm: GbmParams,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            training_trips: 1000,
            browse_trips: 50,
            seed: 42,
            test_fraction: 0.2,
            zone: RiskZone::default(),
            gbm: GbmParams::default(),
        }
    }
}

impl RiskConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .map_err(|e| RiskError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let cfg: RiskConfig = serde_json::from_str(&data)
            .map_err(|e| RiskError::Config(format!("invalid config JSON in {}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Settings for the binaries: the JSON file named by `CONFIG_PATH` (or
    /// defaults when unset), then environment overrides.
    pub fn from_env() -> Result<Self> {
        let base = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        base.with_env_overrides()
    }

    /// Apply `MODEL_PATH`, `TRAINING_TRIPS` and `RISK_SEED` from the environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("MODEL_PATH") {
            self.model_path = PathBuf::from(path);
        }
        if let Some(trips) = parse_override(&lookup, "TRAINING_TRIPS")? {
            self.training_trips = trips;
        }
        if let Some(seed) = parse_override(&lookup, "RISK_SEED")? {
            self.seed = seed;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.training_trips == 0 || self.browse_trips == 0 {
            return Err(RiskError::Config(
                "training_trips and browse_trips must be at least 1".to_string(),
            ));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(RiskError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }

    /// Booster parameters with the pipeline seed applied.
    pub fn gbm_params(&self) -> GbmParams {
        GbmParams {
            seed: self.seed,
            ..self.gbm.clone()
        }
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| RiskError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let path = tmp.path().join("risk.json");
        fs::write(&path, r#"{"training_trips": 200, "gbm": {"n_estimators": 30}}"#).unwrap();

        let cfg = RiskConfig::load(&path).unwrap();
        assert_eq!(cfg.training_trips, 200);
        assert_eq!(cfg.gbm.n_estimators, 30);
        assert_eq!(cfg.gbm.max_depth, 5);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let path = tmp.path().join("risk.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(RiskConfig::load(&path), Err(RiskError::Config(_))));
        assert!(matches!(
            RiskConfig::load(tmp.path().join("missing.json")),
            Err(RiskError::Config(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("MODEL_PATH", "/tmp/m.json"),
            ("TRAINING_TRIPS", "250"),
            ("RISK_SEED", "7"),
        ]
        .into_iter()
        .collect();

        let cfg = RiskConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("/tmp/m.json"));
        assert_eq!(cfg.training_trips, 250);
        assert_eq!(cfg.gbm_params().seed, 7);
    }

    #[test]
    fn test_bad_override_rejected() {
        let err = RiskConfig::default()
            .with_overrides(|k| (k == "TRAINING_TRIPS").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, RiskError::Config(_)));

        let err = RiskConfig::default()
            .with_overrides(|k| (k == "TRAINING_TRIPS").then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, RiskError::Config(_)));
    }
}
