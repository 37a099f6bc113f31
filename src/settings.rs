//! Compiler settings the host can tune (spec.md §3) and the engine-wide
//! configuration knobs SPEC_FULL.md §2 adds (debounce, cache TTL/capacity,
//! eviction fraction), built with a `#[must_use]` chained-setter builder in
//! the style of the teacher's `ProjectBuilder` (`src/lib.rs`).

use crate::standard_json::{OptimizerSettings, OutputSelection, StandardJsonSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recognized solc options (spec.md §3). Changing any field invalidates
/// the full-analysis cache — enforced by
/// [`crate::service::CompilationService::update_settings`], not by this
/// type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerSettings {
    pub optimizer_enabled: bool,
    pub optimizer_runs: u32,
    pub evm_version: String,
    pub via_ir: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            optimizer_enabled: true,
            optimizer_runs: 200,
            evm_version: "paris".to_string(),
            via_ir: false,
        }
    }
}

impl CompilerSettings {
    pub fn to_standard_json(&self) -> StandardJsonSettings {
        StandardJsonSettings {
            optimizer: OptimizerSettings {
                enabled: self.optimizer_enabled,
                runs: self.optimizer_runs,
            },
            evm_version: self.evm_version.clone(),
            via_ir: self.via_ir,
            output_selection: OutputSelection::default(),
        }
    }
}

/// A sparse update to [`CompilerSettings`], for
/// `updateCompilerSettings(partial)` (spec.md §6). Every field left `None`
/// keeps its current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompilerSettingsPatch {
    pub optimizer_enabled: Option<bool>,
    pub optimizer_runs: Option<u32>,
    pub evm_version: Option<String>,
    pub via_ir: Option<bool>,
}

impl CompilerSettingsPatch {
    pub fn apply_to(&self, base: &CompilerSettings) -> CompilerSettings {
        CompilerSettings {
            optimizer_enabled: self.optimizer_enabled.unwrap_or(base.optimizer_enabled),
            optimizer_runs: self.optimizer_runs.unwrap_or(base.optimizer_runs),
            evm_version: self.evm_version.clone().unwrap_or_else(|| base.evm_version.clone()),
            via_ir: self.via_ir.unwrap_or(base.via_ir),
        }
    }
}

const DEBOUNCE_MIN: Duration = Duration::from_millis(100);
const DEBOUNCE_MAX: Duration = Duration::from_millis(1000);

/// Engine-wide knobs (SPEC_FULL.md §2 "Configuration"), defaults matching
/// spec.md §3/§4.5 exactly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    debounce: Duration,
    cache_ttl: Duration,
    cache_capacity: usize,
    eviction_fraction: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            cache_ttl: Duration::from_secs(5 * 60),
            cache_capacity: 100,
            eviction_fraction: 0.2,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    pub fn eviction_fraction(&self) -> f64 {
        self.eviction_fraction
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfigOverrides,
}

#[derive(Debug, Clone, Default)]
struct EngineConfigOverrides {
    debounce: Option<Duration>,
    cache_ttl: Option<Duration>,
    cache_capacity: Option<usize>,
    eviction_fraction: Option<f64>,
}

impl EngineConfigBuilder {
    /// Sets the `change`-trigger debounce, clamped to `[100ms, 1000ms]`
    /// per spec.md §4.5's scheduling table.
    #[must_use]
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.config.debounce = Some(debounce.clamp(DEBOUNCE_MIN, DEBOUNCE_MAX));
        self
    }

    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn eviction_fraction(mut self, fraction: f64) -> Self {
        self.config.eviction_fraction = Some(fraction.clamp(0.0, 1.0));
        self
    }

    pub fn build(self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            debounce: self.config.debounce.unwrap_or(defaults.debounce),
            cache_ttl: self.config.cache_ttl.unwrap_or(defaults.cache_ttl),
            cache_capacity: self.config.cache_capacity.unwrap_or(defaults.cache_capacity),
            eviction_fraction: self
                .config
                .eviction_fraction
                .unwrap_or(defaults.eviction_fraction),
        }
    }
}
