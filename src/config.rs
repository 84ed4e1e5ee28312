//! Pipeline configuration

use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding [`PipelineConfig::capacity`]
pub const ENV_CAPACITY: &str = "AUDIT_QUEUE_CAPACITY";
/// Environment variable overriding [`PipelineConfig::workers`]
pub const ENV_WORKERS: &str = "AUDIT_QUEUE_WORKERS";

/// Sizing of the audit pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Maximum number of entries held in the buffer
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Number of worker tasks persisting entries
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_capacity() -> usize {
    1000
}

fn default_workers() -> usize {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            workers: default_workers(),
        }
    }
}

impl PipelineConfig {
    pub fn new(capacity: usize, workers: usize) -> Self {
        Self { capacity, workers }
    }

    /// Both sizes must be positive
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(AuditError::Config(
                "buffer capacity must be greater than zero".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(AuditError::Config(
                "worker count must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Defaults overlaid with `AUDIT_QUEUE_CAPACITY` / `AUDIT_QUEUE_WORKERS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_CAPACITY) {
            config.capacity = parse_size(ENV_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_WORKERS) {
            config.workers = parse_size(ENV_WORKERS, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_size(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|e| AuditError::Config(format!("Invalid {} '{}': {}", key, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.workers, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(matches!(
            PipelineConfig::new(0, 1).validate(),
            Err(AuditError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::new(1, 0).validate(),
            Err(AuditError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config =
            PipelineConfig::from_lookup(lookup(&[(ENV_CAPACITY, "64"), (ENV_WORKERS, " 2 ")]))
                .unwrap();
        assert_eq!(config, PipelineConfig::new(64, 2));

        let config = PipelineConfig::from_lookup(lookup(&[(ENV_WORKERS, "8")])).unwrap();
        assert_eq!(config, PipelineConfig::new(1000, 8));
    }

    #[test]
    fn test_env_invalid_values() {
        let err = PipelineConfig::from_lookup(lookup(&[(ENV_CAPACITY, "lots")])).unwrap_err();
        assert!(err.to_string().contains(ENV_CAPACITY));

        assert!(PipelineConfig::from_lookup(lookup(&[(ENV_WORKERS, "0")])).is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PipelineConfig = serde_json::from_str(r#"{"capacity": 10}"#).unwrap();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.workers, 5);
    }
}
