//! Configuration types for Verdant.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::lifecycle::LifecycleConfig;
use crate::storage::OwnershipPolicy;

/// Environment variable overriding `tick_interval_ms`.
pub const ENV_TICK_INTERVAL_MS: &str = "VERDANT_TICK_INTERVAL_MS";
/// Environment variable overriding `neglect_window_ms`.
pub const ENV_NEGLECT_WINDOW_MS: &str = "VERDANT_NEGLECT_WINDOW_MS";
/// Environment variable overriding `decay_amount`.
pub const ENV_DECAY_AMOUNT: &str = "VERDANT_DECAY_AMOUNT";
/// Environment variable overriding `water_boost`.
pub const ENV_WATER_BOOST: &str = "VERDANT_WATER_BOOST";
/// Environment variable overriding `feed_boost`.
pub const ENV_FEED_BOOST: &str = "VERDANT_FEED_BOOST";
/// Environment variable overriding `ownership` (`single_plant` / `multiple_plants`).
pub const ENV_OWNERSHIP: &str = "VERDANT_OWNERSHIP";
/// Environment variable overriding `data_dir`.
pub const ENV_DATA_DIR: &str = "VERDANT_DATA_DIR";

const HEALTH_CEILING: u8 = 100;

/// Top-level simulator configuration.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GardenConfig {
    /// How often the decay scheduler sweeps the store (milliseconds).
    pub tick_interval_ms: u64,

    /// Time without water or food before a plant decays (milliseconds).
    pub neglect_window_ms: u64,

    /// Health lost per decay step.
    pub decay_amount: u8,

    /// Health gained per watering (capped at 100).
    pub water_boost: u8,

    /// Health gained per feeding (capped at 100).
    pub feed_boost: u8,

    /// Whether an owner may hold more than one plant.
    pub ownership: OwnershipPolicy,

    /// Snapshot directory; `None` keeps everything in memory only.
    pub data_dir: Option<PathBuf>,
}

impl Default for GardenConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5_000,
            neglect_window_ms: 10_000,
            decay_amount: 10,
            water_boost: 10,
            feed_boost: 10,
            ownership: OwnershipPolicy::SinglePlant,
            data_dir: None,
        }
    }
}

fn invalid(reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidConfig {
        reason: reason.into(),
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ValidationError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| invalid(format!("{name}={raw:?}: {e}")))
}

fn parse_ownership(raw: &str) -> Result<OwnershipPolicy, ValidationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "single" | "single_plant" => Ok(OwnershipPolicy::SinglePlant),
        "multiple" | "multiple_plants" => Ok(OwnershipPolicy::MultiplePlants),
        other => Err(invalid(format!(
            "{ENV_OWNERSHIP}={other:?}: expected single_plant or multiple_plants"
        ))),
    }
}

impl GardenConfig {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(|e| invalid(format!("malformed config: {e}")))
    }

    /// Read and parse a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| invalid(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// Apply `VERDANT_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ValidationError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment, in production).
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ValidationError> {
        if let Some(raw) = lookup(ENV_TICK_INTERVAL_MS) {
            self.tick_interval_ms = parse_var(ENV_TICK_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_NEGLECT_WINDOW_MS) {
            self.neglect_window_ms = parse_var(ENV_NEGLECT_WINDOW_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DECAY_AMOUNT) {
            self.decay_amount = parse_var(ENV_DECAY_AMOUNT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_WATER_BOOST) {
            self.water_boost = parse_var(ENV_WATER_BOOST, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FEED_BOOST) {
            self.feed_boost = parse_var(ENV_FEED_BOOST, &raw)?;
        }
        if let Some(raw) = lookup(ENV_OWNERSHIP) {
            self.ownership = parse_ownership(&raw)?;
        }
        if let Some(raw) = lookup(ENV_DATA_DIR) {
            let trimmed = raw.trim();
            self.data_dir = (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
        }
        Ok(self)
    }

    /// Check the values make sense together.
    ///
    /// The sweep interval must be shorter than the neglect window so decay is
    /// observed within one window of it becoming due.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms must be positive"));
        }
        if self.neglect_window_ms == 0 {
            return Err(invalid("neglect_window_ms must be positive"));
        }
        if self.tick_interval_ms >= self.neglect_window_ms {
            return Err(invalid(format!(
                "tick_interval_ms ({}) must be shorter than neglect_window_ms ({})",
                self.tick_interval_ms, self.neglect_window_ms
            )));
        }
        if i64::try_from(self.neglect_window_ms).is_err() {
            return Err(invalid("neglect_window_ms is too large"));
        }
        if self.decay_amount == 0 {
            return Err(invalid("decay_amount must be positive"));
        }
        for (name, value) in [
            ("decay_amount", self.decay_amount),
            ("water_boost", self.water_boost),
            ("feed_boost", self.feed_boost),
        ] {
            if value > HEALTH_CEILING {
                return Err(invalid(format!("{name} ({value}) exceeds {HEALTH_CEILING}")));
            }
        }
        Ok(())
    }

    /// Sweep interval as a `std` duration.
    #[must_use]
    pub const fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }

    /// Lifecycle rules derived from this config.
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            neglect_window: crate::time::to_chrono(std::time::Duration::from_millis(self.neglect_window_ms)),
            decay_amount: self.decay_amount,
            water_boost: self.water_boost,
            feed_boost: self.feed_boost,
            health_ceiling: HEALTH_CEILING,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid_and_match_lifecycle_defaults() {
        let config = GardenConfig::default();
        config.validate().unwrap();
        assert_eq!(config.lifecycle(), LifecycleConfig::default());
        assert_eq!(config.tick_interval(), std::time::Duration::from_secs(5));
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(GardenConfig::from_json_str("{}").unwrap(), GardenConfig::default());
    }

    #[test]
    fn json_fields_override_defaults() {
        let config = GardenConfig::from_json_str(
            r#"{"tick_interval_ms": 1000, "ownership": "multiple_plants", "data_dir": "/tmp/garden"}"#,
        )
        .unwrap();
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.neglect_window_ms, 10_000);
        assert_eq!(config.ownership, OwnershipPolicy::MultiplePlants);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/garden")));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = GardenConfig::from_json_str(r#"{"tick_interval": 5}"#).unwrap_err();
        assert!(err.to_string().contains("malformed config"));
    }

    #[test]
    fn overrides_apply_on_top() {
        let vars: HashMap<&str, &str> = [
            (ENV_TICK_INTERVAL_MS, "250"),
            (ENV_NEGLECT_WINDOW_MS, " 2000 "),
            (ENV_OWNERSHIP, "Multiple"),
            (ENV_WATER_BOOST, "25"),
        ]
        .into_iter()
        .collect();

        let config = GardenConfig::default()
            .with_overrides_from(|name| vars.get(name).map(ToString::to_string))
            .unwrap();
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.neglect_window_ms, 2000);
        assert_eq!(config.ownership, OwnershipPolicy::MultiplePlants);
        assert_eq!(config.water_boost, 25);
        assert_eq!(config.feed_boost, 10);
        config.validate().unwrap();
    }

    #[test]
    fn bad_override_names_the_variable() {
        let err = GardenConfig::default()
            .with_overrides_from(|name| (name == ENV_DECAY_AMOUNT).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_DECAY_AMOUNT));
    }

    #[test]
    fn validate_rejects_inconsistent_values() {
        let slow_tick = GardenConfig {
            tick_interval_ms: 10_000,
            ..GardenConfig::default()
        };
        assert!(slow_tick.validate().is_err());

        let zero_tick = GardenConfig {
            tick_interval_ms: 0,
            ..GardenConfig::default()
        };
        assert!(zero_tick.validate().is_err());

        let huge_boost = GardenConfig {
            feed_boost: 150,
            ..GardenConfig::default()
        };
        assert!(huge_boost.validate().is_err());

        let no_decay = GardenConfig {
            decay_amount: 0,
            ..GardenConfig::default()
        };
        assert!(no_decay.validate().is_err());
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("garden.json");
        std::fs::write(&path, r#"{"decay_amount": 20}"#).unwrap();
        assert_eq!(GardenConfig::from_file(&path).unwrap().decay_amount, 20);
        assert!(GardenConfig::from_file(dir.path().join("missing.json")).is_err());
    }
}
