//! Versioning, persistence and per-caller resolution of the tuning config.
//!
//! Exactly one config record is stored, under [`CONFIG_KEY`]. Saving a new
//! one replaces it; there is no history table, so a request for any version
//! other than the stored one misses and resolves to the neutral default.
//!
//! Regenerate-then-save is a plain read-modify-write: two concurrent
//! regenerations from the same base both succeed and the later write wins.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::EngineError;
use super::tuning::TuningConfig;

pub const CONFIG_KEY: &str = "recommendation_tuning_config";

/// Key-value persistence for the single current config record.
pub trait ConfigStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>>;
    fn upsert(&self, key: &str, value: &serde_json::Value) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Control,
    Treatment,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Control => "control",
            Variant::Treatment => "treatment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "control" => Some(Variant::Control),
            "treatment" => Some(Variant::Treatment),
            _ => None,
        }
    }
}

/// Sticky caller → variant lookup, keyed by (caller, experiment).
pub trait VariantAssigner: Send + Sync {
    fn assign(&self, caller_id: &str, experiment: &str) -> Result<Variant>;
}

#[derive(Clone)]
pub struct ConfigManager {
    store: Arc<dyn ConfigStore>,
    assigner: Arc<dyn VariantAssigner>,
}

impl ConfigManager {
    pub fn new(store: Arc<dyn ConfigStore>, assigner: Arc<dyn VariantAssigner>) -> Self {
        ConfigManager { store, assigner }
    }

    /// The stored config, or the neutral default if none was ever saved.
    pub fn get_effective_config(&self) -> Result<TuningConfig> {
        let Some(raw) = self.store.load(CONFIG_KEY)? else {
            return Ok(TuningConfig::neutral());
        };
        let config: TuningConfig = serde_json::from_value(raw)
            .map_err(|e| EngineError::MalformedConfig(e.to_string()))?;
        Ok(config)
    }

    pub fn get_config_version(&self) -> Result<i64> {
        Ok(self.get_effective_config()?.version)
    }

    /// Replace the current config. A negative version is rejected and the
    /// previous config stays current.
    pub fn save_config(&self, config: &TuningConfig) -> Result<()> {
        if config.version < 0 {
            return Err(EngineError::InvalidConfigVersion(config.version).into());
        }
        let value = serde_json::to_value(config).context("Failed to serialize tuning config")?;
        self.store.upsert(CONFIG_KEY, &value)?;
        info!("Saved tuning config v{}", config.version);
        Ok(())
    }

    /// Only the currently stored version can ever be found.
    pub fn get_config_by_version(&self, version: i64) -> Result<Option<TuningConfig>> {
        if self.store.load(CONFIG_KEY)?.is_none() {
            return Ok(None);
        }
        let current = self.get_effective_config()?;
        Ok((current.version == version).then_some(current))
    }

    /// Resolve the config a specific caller should see.
    ///
    /// Under an A-B rollout, callers bucketed into `control` get the previous
    /// version; when that version cannot be found they get the neutral
    /// default. An assignment failure serves the current config.
    pub fn get_effective_config_for_caller(&self, caller_id: &str) -> Result<TuningConfig> {
        let current = self.get_effective_config()?;
        let Some(experiment) = current.active_experiment() else {
            return Ok(current);
        };

        let variant = match self.assigner.assign(caller_id, experiment) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    "Variant assignment failed for {} in {}: {}; serving current config",
                    caller_id, experiment, e
                );
                return Ok(current);
            }
        };

        match variant {
            Variant::Treatment => Ok(current),
            Variant::Control => {
                let previous = current.version - 1;
                match self.get_config_by_version(previous)? {
                    Some(cfg) => Ok(cfg),
                    None => {
                        warn!(
                            "Control config v{} not found for experiment {}; using neutral default",
                            previous, experiment
                        );
                        Ok(TuningConfig::neutral())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryStore {
        pub records: Mutex<HashMap<String, serde_json::Value>>,
    }

    impl ConfigStore for MemoryStore {
        fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
            Ok(self.records.lock().unwrap().get(key).cloned())
        }

        fn upsert(&self, key: &str, value: &serde_json::Value) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert(key.to_string(), value.clone());
            Ok(())
        }
    }

    pub struct FixedAssigner(pub Option<Variant>);

    impl VariantAssigner for FixedAssigner {
        fn assign(&self, _caller_id: &str, _experiment: &str) -> Result<Variant> {
            self.0.ok_or_else(|| anyhow::anyhow!("assignment service unavailable"))
        }
    }
}
